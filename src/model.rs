use serde::{Deserialize, Serialize};

use crate::stats::StatsSnapshot;

/// Source language of a request: either an explicit tag or "auto".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceLanguage {
    #[default]
    Auto,
    Tag(String),
}

impl SourceLanguage {
    pub fn as_str(&self) -> &str {
        match self {
            SourceLanguage::Auto => "auto",
            SourceLanguage::Tag(tag) => tag,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, SourceLanguage::Auto)
    }
}

impl From<String> for SourceLanguage {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            SourceLanguage::Auto
        } else {
            SourceLanguage::Tag(value)
        }
    }
}

impl From<&str> for SourceLanguage {
    fn from(value: &str) -> Self {
        SourceLanguage::from(value.to_string())
    }
}

impl From<SourceLanguage> for String {
    fn from(value: SourceLanguage) -> Self {
        match value {
            SourceLanguage::Auto => "auto".to_string(),
            SourceLanguage::Tag(tag) => tag,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    #[serde(default)]
    pub source_language: SourceLanguage,
    pub target_language: String,
    /// Opaque provider credential, passed through to the provider untouched.
    pub credential: String,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<SourceLanguage>,
        target_language: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            credential: credential.into(),
        }
    }
}

// Manual impl so the credential never ends up in logs.
impl std::fmt::Debug for TranslationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationRequest")
            .field("text_chars", &self.text.chars().count())
            .field("source_language", &self.source_language)
            .field("target_language", &self.target_language)
            .field("credential", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translation: String,
    pub from_cache: bool,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub cache_size: usize,
    pub max_cache_size: usize,
    pub ttl_seconds: u64,
    pub in_flight_count: usize,
    pub stats: StatsSnapshot,
}
