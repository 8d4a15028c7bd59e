use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::DigestError;
use crate::extract;
use crate::format;
use crate::llm::CompletionProvider;
use crate::news::NewsSource;
use crate::selector;
use crate::subscribers::Registry;
use crate::telegram::Transport;

/// Outcome of one completed tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub article_title: String,
    pub delivered: usize,
    pub failed: usize,
}

/// Sequences fetch → select → extract → format → fan-out once per
/// scheduled tick. Collaborators are injected so every stage is testable
/// with stubs.
pub struct Pipeline {
    news: Arc<dyn NewsSource>,
    llm: Arc<dyn CompletionProvider>,
    transport: Arc<dyn Transport>,
    registry: Registry,
    language: String,
    // Single-flight guard: an overlapping invocation is skipped, not queued.
    running: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        news: Arc<dyn NewsSource>,
        llm: Arc<dyn CompletionProvider>,
        transport: Arc<dyn Transport>,
        registry: Registry,
        language: impl Into<String>,
    ) -> Self {
        Self {
            news,
            llm,
            transport,
            registry,
            language: language.into(),
            running: Mutex::new(()),
        }
    }

    /// Run one digest tick. Returns `Ok(None)` when a previous tick is
    /// still in flight. A failure before the fan-out aborts the tick;
    /// a failed delivery only skips that subscriber.
    pub async fn run_tick(&self) -> Result<Option<TickReport>, DigestError> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("pipeline: previous tick still running, skipping this one");
            return Ok(None);
        };

        let candidates = self
            .news
            .fetch_candidates(&self.language)
            .await
            .map_err(DigestError::Fetch)?;
        info!(count = candidates.len(), "pipeline: fetched candidates");

        let article = selector::select_best(candidates)?;
        info!(title = %article.title, "pipeline: selected article");

        let digest = extract::extract(self.llm.as_ref(), &article).await?;
        info!(keywords = digest.keywords.len(), "pipeline: extracted digest");

        let message = format::format_message(&article, &digest);

        let subscribers = self.registry.snapshot().await;
        let mut delivered = 0;
        let mut failed = 0;
        for chat_id in subscribers {
            match self.transport.send(chat_id, &message).await {
                Ok(()) => delivered += 1,
                Err(source) => {
                    // One bad subscriber never blocks the rest of the fan-out.
                    let error = DigestError::Send { chat_id, source };
                    warn!(%error, "pipeline: delivery failed");
                    failed += 1;
                }
            }
        }

        info!(
            title = %article.title,
            delivered,
            failed,
            "pipeline: tick complete"
        );

        Ok(Some(TickReport {
            article_title: article.title,
            delivered,
            failed,
        }))
    }
}
