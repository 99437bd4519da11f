//! Outbound contract to the paid translation service.

pub mod openai;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiProvider;

/// One provider call. Language tags are opaque to the core and forwarded as-is.
#[derive(Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub text: &'a str,
    pub source_language: &'a str,
    pub target_language: &'a str,
    pub credential: &'a str,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRequest")
            .field("text_chars", &self.text.chars().count())
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider rejected the credential (HTTP {status})")]
    Auth { status: u16 },
    #[error("provider rate limit hit")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("provider call timed out")]
    Timeout,
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate `request.text`, returning only the translated text.
    async fn translate(&self, request: ProviderRequest<'_>) -> Result<String, ProviderError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "provider"
    }
}
