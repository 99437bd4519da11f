use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Clone, Error)]
pub enum TranslateError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("an identical translation is already in progress, retry later")]
    DuplicateInFlight,
    #[error("provider authentication failed")]
    ProviderAuth,
    #[error("provider rate limit exceeded")]
    ProviderRateLimit { retry_after_secs: Option<u64> },
    #[error("provider did not answer within {timeout_ms}ms")]
    ProviderTimeout { timeout_ms: u64 },
    #[error("translation failed: {0}")]
    ProviderGeneric(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TranslateError {
    /// Stable machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslateError::Validation(_) => "validation_error",
            TranslateError::DuplicateInFlight => "duplicate_in_flight",
            TranslateError::ProviderAuth => "provider_auth_error",
            TranslateError::ProviderRateLimit { .. } => "provider_rate_limit",
            TranslateError::ProviderTimeout { .. } => "provider_timeout",
            TranslateError::ProviderGeneric(_) => "provider_error",
            TranslateError::Internal(_) => "internal_error",
        }
    }

    /// HTTP-equivalent status signalled to the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            TranslateError::Validation(_) => 400,
            TranslateError::DuplicateInFlight => 409,
            TranslateError::ProviderAuth => 401,
            TranslateError::ProviderRateLimit { .. } => 429,
            TranslateError::ProviderTimeout { .. } => 504,
            TranslateError::ProviderGeneric(_) => 502,
            TranslateError::Internal(_) => 500,
        }
    }

    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            TranslateError::ProviderAuth
                | TranslateError::ProviderRateLimit { .. }
                | TranslateError::ProviderTimeout { .. }
                | TranslateError::ProviderGeneric(_)
        )
    }
}

impl From<ProviderError> for TranslateError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Auth { .. } => TranslateError::ProviderAuth,
            ProviderError::RateLimited { retry_after_secs } => {
                TranslateError::ProviderRateLimit { retry_after_secs }
            }
            // Timeout inside the provider; the coordinator fills in its own budget.
            ProviderError::Timeout => TranslateError::ProviderTimeout { timeout_ms: 0 },
            other => TranslateError::ProviderGeneric(other.to_string()),
        }
    }
}

/// A failed request together with the time spent before it failed.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct TranslationFailure {
    #[source]
    pub error: TranslateError,
    pub processing_time_ms: f64,
}
