//! Request lifecycle: validate, look up, claim the in-flight slot, call the
//! provider, store the result.
//!
//! A request whose fingerprint is already being computed is rejected with
//! [`TranslateError::DuplicateInFlight`] instead of waiting on the running
//! call. Callers retry; no request ever blocks on another.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{derive_key, CacheKey, ExpiringStore};
use crate::config::CoordinatorConfig;
use crate::error::{TranslateError, TranslationFailure};
use crate::inflight::InFlightTracker;
use crate::model::{StatusSnapshot, TranslationRequest, TranslationResult};
use crate::provider::{ProviderRequest, TranslationProvider};
use crate::stats::CoreStats;

pub struct TranslationCoordinator {
    config: CoordinatorConfig,
    store: Arc<ExpiringStore>,
    in_flight: Arc<InFlightTracker>,
    provider: Arc<dyn TranslationProvider>,
    stats: CoreStats,
}

/// How a successful request was served.
enum Served {
    Cache(String),
    Provider(String),
}

impl TranslationCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        store: Arc<ExpiringStore>,
        in_flight: Arc<InFlightTracker>,
        provider: Arc<dyn TranslationProvider>,
    ) -> Self {
        Self {
            config,
            store,
            in_flight,
            provider,
            stats: CoreStats::new(),
        }
    }

    /// Build with a fresh store and tracker sized from `config`.
    ///
    /// # Panics
    /// If `config.max_entries` is zero.
    pub fn with_provider(config: CoordinatorConfig, provider: Arc<dyn TranslationProvider>) -> Self {
        let store = Arc::new(ExpiringStore::new(config.max_entries, config.ttl()));
        Self::new(config, store, Arc::new(InFlightTracker::new()), provider)
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ExpiringStore> {
        &self.store
    }

    pub fn in_flight(&self) -> &Arc<InFlightTracker> {
        &self.in_flight
    }

    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult, TranslationFailure> {
        let started = Instant::now();
        let outcome = self.run(request).await;
        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Served::Cache(translation)) => Ok(TranslationResult {
                translation,
                from_cache: true,
                processing_time_ms,
            }),
            Ok(Served::Provider(translation)) => {
                info!(
                    target_language = %request.target_language,
                    elapsed_ms = processing_time_ms,
                    "translated via provider"
                );
                Ok(TranslationResult {
                    translation,
                    from_cache: false,
                    processing_time_ms,
                })
            }
            Err(error) => Err(TranslationFailure {
                error,
                processing_time_ms,
            }),
        }
    }

    /// Translate every request concurrently; results come back in input order.
    pub async fn translate_batch(
        &self,
        requests: &[TranslationRequest],
    ) -> Vec<Result<TranslationResult, TranslationFailure>> {
        join_all(requests.iter().map(|r| self.translate(r))).await
    }

    async fn run(&self, request: &TranslationRequest) -> Result<Served, TranslateError> {
        if let Err(e) = self.validate(request) {
            self.stats.record_validation_failure();
            return Err(e);
        }

        let key = derive_key(
            &request.text,
            &request.target_language,
            request.source_language.as_str(),
        );

        if let Some(cached) = self.store.get(&key) {
            self.stats.record_hit();
            debug!(key = %key.short(), "cache hit");
            return Ok(Served::Cache(cached));
        }

        // Read before claiming the slot, so a clear() anywhere after this
        // point keeps the result out of the store.
        let generation = self.store.generation();
        let Some(slot) = self.in_flight.acquire_slot(key) else {
            self.stats.record_miss();
            self.stats.record_duplicate();
            warn!(key = %key.short(), "duplicate request rejected while in flight");
            return Err(TranslateError::DuplicateInFlight);
        };

        // The previous owner may have stored its result and released the
        // slot between our lookup and the acquire.
        if let Some(cached) = self.store.get(&key) {
            self.stats.record_hit();
            debug!(key = %key.short(), "cache hit after acquiring slot");
            return Ok(Served::Cache(cached));
        }
        self.stats.record_miss();

        // `slot` is released when this function returns by any path,
        // or when the caller drops the future mid-call.
        let translation = self.call_provider(&key, request).await?;
        if !self
            .store
            .put_if_generation(key, translation.clone(), generation)
        {
            debug!(key = %key.short(), "cache cleared during call, result not cached");
        }
        drop(slot);
        Ok(Served::Provider(translation))
    }

    fn validate(&self, request: &TranslationRequest) -> Result<(), TranslateError> {
        if request.text.trim().is_empty() {
            return Err(TranslateError::Validation("text is empty".into()));
        }
        let chars = request.text.chars().count();
        if chars > self.config.max_input_chars {
            return Err(TranslateError::Validation(format!(
                "text is {chars} characters, limit is {}",
                self.config.max_input_chars
            )));
        }
        if request.credential.trim().is_empty() {
            return Err(TranslateError::Validation("credential is missing".into()));
        }
        Ok(())
    }

    async fn call_provider(
        &self,
        key: &CacheKey,
        request: &TranslationRequest,
    ) -> Result<String, TranslateError> {
        let timeout = self.config.provider_timeout();
        let call = self.provider.translate(ProviderRequest {
            text: &request.text,
            source_language: request.source_language.as_str(),
            target_language: &request.target_language,
            credential: &request.credential,
            timeout,
        });

        let started = Instant::now();
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(translation)) => Ok(translation),
            Ok(Err(e)) => Err(TranslateError::from(e)),
            Err(_) => Err(TranslateError::ProviderTimeout {
                timeout_ms: self.config.provider_timeout_ms,
            }),
        };
        let latency = started.elapsed();

        match result {
            Ok(translation) => {
                self.stats.record_provider_success(latency);
                Ok(translation)
            }
            Err(e) => {
                self.stats.record_provider_failure(latency);
                warn!(
                    key = %key.short(),
                    provider = self.provider.name(),
                    error = %e,
                    "provider call failed"
                );
                Err(match e {
                    TranslateError::ProviderTimeout { .. } => TranslateError::ProviderTimeout {
                        timeout_ms: self.config.provider_timeout_ms,
                    },
                    other => other,
                })
            }
        }
    }

    /// Sweep expired entries, then report live sizes.
    pub fn status(&self) -> StatusSnapshot {
        self.store.sweep_expired();
        StatusSnapshot {
            cache_size: self.store.len(),
            max_cache_size: self.store.capacity(),
            ttl_seconds: self.store.ttl().as_secs(),
            in_flight_count: self.in_flight.len(),
            stats: self.stats.snapshot(),
        }
    }

    /// Empty both the store and the in-flight set.
    pub fn clear_cache(&self) {
        let cached = self.store.len();
        let in_flight = self.in_flight.len();
        self.store.clear();
        self.in_flight.clear();
        info!(cached, in_flight, "cache cleared");
    }
}
