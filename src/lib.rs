//! Caching and request-coalescing front for a slow, paid translation provider.
//!
//! [`coordinator::TranslationCoordinator`] is the entry point; the HTTP
//! surface in [`gateway`] is a thin wrapper around it.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod inflight;
pub mod model;
pub mod provider;
pub mod stats;

pub use coordinator::TranslationCoordinator;
pub use error::{TranslateError, TranslationFailure};
pub use model::{SourceLanguage, StatusSnapshot, TranslationRequest, TranslationResult};
