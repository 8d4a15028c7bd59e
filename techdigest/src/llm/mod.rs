use anyhow::Result;

/// A completion backend (OpenAI-compatible remote, or a stub in tests).
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Request for a single completion.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

impl LlmRequest {
    /// Request relying entirely on the provider's configured defaults.
    pub fn with_prompt(prompt: String) -> Self {
        Self {
            prompt,
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        }
    }
}

/// Completion response text plus accounting metadata.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage reported by the provider.
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod remote;
