use thiserror::Error;

use crate::subscribers::ChatId;

/// Failures a pipeline tick can surface. The first four abort the tick;
/// `Send` is handled per-subscriber inside the fan-out and never aborts it.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("failed to fetch news candidates: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("no usable candidate articles")]
    NoCandidates,

    #[error("language model request failed: {0}")]
    ModelRequest(#[source] anyhow::Error),

    #[error("language model response contained no keywords")]
    EmptyExtraction,

    #[error("failed to deliver digest to subscriber {chat_id}: {source}")]
    Send {
        chat_id: ChatId,
        #[source]
        source: anyhow::Error,
    },
}
