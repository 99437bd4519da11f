use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use translate_edge::config::CoordinatorConfig;
use translate_edge::provider::{ProviderError, ProviderRequest, TranslationProvider};
use translate_edge::{TranslateError, TranslationCoordinator, TranslationRequest};

/// Counts calls, optionally sleeps, then answers or fails.
struct StubProvider {
    calls: AtomicUsize,
    delay: Duration,
    fail_with: Option<ProviderError>,
}

impl StubProvider {
    fn ok() -> Arc<Self> {
        Self::with(Duration::ZERO, None)
    }

    fn with(delay: Duration, fail_with: Option<ProviderError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail_with,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for StubProvider {
    async fn translate(&self, request: ProviderRequest<'_>) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(format!("<{}>{}", request.target_language, request.text)),
        }
    }
}

/// Blocks every call until the test hands out a permit.
struct GatedProvider {
    calls: AtomicUsize,
    gate: Semaphore,
}

#[async_trait]
impl TranslationProvider for GatedProvider {
    async fn translate(&self, request: ProviderRequest<'_>) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(request.text.to_uppercase())
    }
}

fn request(text: &str) -> TranslationRequest {
    TranslationRequest::new(text, "auto", "繁體中文", "sk-test-credential")
}

fn coordinator(provider: Arc<dyn TranslationProvider>) -> TranslationCoordinator {
    TranslationCoordinator::with_provider(CoordinatorConfig::default(), provider)
}

#[tokio::test]
async fn repeated_request_is_served_from_cache() {
    let provider = StubProvider::ok();
    let c = coordinator(provider.clone());

    let first = c.translate(&request("Good morning")).await.unwrap();
    assert!(!first.from_cache);

    for _ in 0..5 {
        let again = c.translate(&request("Good morning")).await.unwrap();
        assert!(again.from_cache);
        assert_eq!(again.translation, first.translation);
    }
    assert_eq!(provider.calls(), 1);

    let stats = c.status().stats;
    assert_eq!(stats.cache_hits, 5);
    assert_eq!(stats.cache_misses, 1);
}

#[tokio::test(start_paused = true)]
async fn cached_result_expires_after_ttl() {
    let provider = StubProvider::ok();
    let config = CoordinatorConfig {
        ttl_seconds: 60,
        ..CoordinatorConfig::default()
    };
    let c = TranslationCoordinator::with_provider(config, provider.clone());

    c.translate(&request("hello")).await.unwrap();
    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(c.translate(&request("hello")).await.unwrap().from_cache);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(!c.translate(&request("hello")).await.unwrap().from_cache);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn capacity_is_bounded_and_oldest_are_evicted() {
    let provider = StubProvider::ok();
    let config = CoordinatorConfig {
        max_entries: 4,
        ..CoordinatorConfig::default()
    };
    let c = TranslationCoordinator::with_provider(config, provider.clone());

    for n in 0..6 {
        c.translate(&request(&format!("sentence {n}"))).await.unwrap();
        assert!(c.status().cache_size <= 4);
        tokio::time::advance(Duration::from_millis(5)).await;
    }
    assert_eq!(c.status().cache_size, 4);

    // The two oldest were evicted; the rest are hits.
    for n in 2..6 {
        assert!(c.translate(&request(&format!("sentence {n}"))).await.unwrap().from_cache);
    }
    for n in 0..2 {
        assert!(!c.translate(&request(&format!("sentence {n}"))).await.unwrap().from_cache);
    }
}

#[tokio::test(start_paused = true)]
async fn identical_burst_calls_provider_once() {
    let provider = StubProvider::with(Duration::from_millis(200), None);
    let c = coordinator(provider.clone());

    let requests: Vec<_> = (0..64).map(|_| request("same text")).collect();
    let results = c.translate_batch(&requests).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(f) if matches!(f.error, TranslateError::DuplicateInFlight)))
        .count();
    assert_eq!(provider.calls(), 1);
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 63);

    let status = c.status();
    assert_eq!(status.cache_size, 1);
    assert_eq!(status.in_flight_count, 0);
    assert_eq!(status.stats.duplicates_rejected, 63);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_are_rejected_not_queued() {
    const N: usize = 50;
    let provider = Arc::new(GatedProvider {
        calls: AtomicUsize::new(0),
        gate: Semaphore::new(0),
    });
    let c = Arc::new(coordinator(provider.clone()));

    let mut tasks = JoinSet::new();
    for _ in 0..N {
        let c = Arc::clone(&c);
        tasks.spawn(async move { c.translate(&request("shared")).await });
    }

    // The winner is parked on the gate, so every other caller must come
    // back on its own, and each one must be a duplicate rejection.
    for _ in 0..N - 1 {
        let result = tasks.join_next().await.unwrap().unwrap();
        let failure = result.unwrap_err();
        assert!(matches!(failure.error, TranslateError::DuplicateInFlight));
    }
    assert_eq!(c.status().in_flight_count, 1);

    provider.gate.add_permits(1);
    let winner = tasks.join_next().await.unwrap().unwrap().unwrap();
    assert_eq!(winner.translation, "SHARED");
    assert!(!winner.from_cache);

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    let status = c.status();
    assert_eq!(status.cache_size, 1);
    assert_eq!(status.in_flight_count, 0);
}

#[tokio::test]
async fn provider_errors_release_slot_and_cache_nothing() {
    let cases = [
        (ProviderError::Auth { status: 401 }, "provider_auth_error"),
        (
            ProviderError::RateLimited {
                retry_after_secs: Some(2),
            },
            "provider_rate_limit",
        ),
        (ProviderError::Timeout, "provider_timeout"),
        (
            ProviderError::Http {
                status: 500,
                body: "boom".into(),
            },
            "provider_error",
        ),
    ];

    for (error, kind) in cases {
        let provider = StubProvider::with(Duration::ZERO, Some(error));
        let c = coordinator(provider.clone());

        for _ in 0..2 {
            let failure = c.translate(&request("doomed")).await.unwrap_err();
            assert_eq!(failure.error.kind(), kind);
        }
        // Nothing cached, so the second attempt reached the provider too.
        assert_eq!(provider.calls(), 2);
        let status = c.status();
        assert_eq!(status.in_flight_count, 0);
        assert_eq!(status.cache_size, 0);
        assert_eq!(status.stats.provider_failures, 2);
    }
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out_and_releases_slot() {
    let provider = StubProvider::with(Duration::from_secs(120), None);
    let config = CoordinatorConfig {
        provider_timeout_ms: 1_000,
        ..CoordinatorConfig::default()
    };
    let c = TranslationCoordinator::with_provider(config, provider.clone());

    let failure = c.translate(&request("slow")).await.unwrap_err();
    assert!(matches!(
        failure.error,
        TranslateError::ProviderTimeout { timeout_ms: 1_000 }
    ));
    assert!(failure.processing_time_ms >= 1_000.0);

    let status = c.status();
    assert_eq!(status.in_flight_count, 0);
    assert_eq!(status.cache_size, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_caller_releases_slot() {
    let provider = StubProvider::with(Duration::from_secs(10), None);
    let c = coordinator(provider.clone());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), c.translate(&request("abandoned"))).await;
    assert!(abandoned.is_err());
    assert_eq!(c.status().in_flight_count, 0);

    // The key is free again for the next caller.
    let provider_calls_before = provider.calls();
    let result = c.translate(&request("abandoned")).await.unwrap();
    assert!(!result.from_cache);
    assert_eq!(provider.calls(), provider_calls_before + 1);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_lookup() {
    let provider = StubProvider::ok();
    let c = coordinator(provider.clone());

    let too_long = "a".repeat(5001);
    let cases = [
        request(""),
        request(&too_long),
        TranslationRequest::new("hello", "auto", "English", ""),
    ];
    for req in &cases {
        let failure = c.translate(req).await.unwrap_err();
        assert!(matches!(failure.error, TranslateError::Validation(_)));
        assert_eq!(failure.error.status_code(), 400);
    }

    let exactly_max = "a".repeat(5000);
    assert!(c.translate(&request(&exactly_max)).await.is_ok());

    assert_eq!(provider.calls(), 1);
    let status = c.status();
    assert_eq!(status.stats.validation_failures, 3);
    assert_eq!(status.stats.cache_misses, 1);
}

#[tokio::test]
async fn clear_cache_resets_state_and_forces_fresh_miss() {
    let provider = StubProvider::ok();
    let c = coordinator(provider.clone());

    c.translate(&request("one")).await.unwrap();
    c.translate(&request("two")).await.unwrap();
    assert!(c.in_flight().try_acquire(translate_edge::cache::derive_key(
        "pending", "繁體中文", "auto"
    )));
    assert_eq!(c.status().cache_size, 2);
    assert_eq!(c.status().in_flight_count, 1);

    c.clear_cache();
    let status = c.status();
    assert_eq!(status.cache_size, 0);
    assert_eq!(status.in_flight_count, 0);

    let again = c.translate(&request("one")).await.unwrap();
    assert!(!again.from_cache);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn status_sweeps_expired_entries() {
    let config = CoordinatorConfig {
        ttl_seconds: 10,
        max_entries: 50,
        ..CoordinatorConfig::default()
    };
    let c = TranslationCoordinator::with_provider(config, StubProvider::ok());

    c.translate(&request("old")).await.unwrap();
    tokio::time::advance(Duration::from_secs(8)).await;
    c.translate(&request("new")).await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;

    let status = c.status();
    assert_eq!(status.cache_size, 1);
    assert_eq!(status.max_cache_size, 50);
    assert_eq!(status.ttl_seconds, 10);
}

#[tokio::test(start_paused = true)]
async fn clear_during_call_does_not_cache_stale_result() {
    let provider = StubProvider::with(Duration::from_secs(1), None);
    let c = Arc::new(coordinator(provider.clone()));

    let running = {
        let c = Arc::clone(&c);
        tokio::spawn(async move { c.translate(&request("racing")).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(c.status().in_flight_count, 1);

    c.clear_cache();
    let result = running.await.unwrap().unwrap();
    assert!(!result.from_cache);
    assert_eq!(c.status().cache_size, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn racing_identical_requests_never_pay_twice() {
    const CALLERS: usize = 8;
    let provider = StubProvider::ok();
    let c = Arc::new(coordinator(provider.clone()));

    for round in 0..200 {
        let text = format!("round {round}");
        let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));
        let mut tasks = JoinSet::new();
        for _ in 0..CALLERS {
            let c = Arc::clone(&c);
            let barrier = Arc::clone(&barrier);
            let text = text.clone();
            tasks.spawn(async move {
                barrier.wait().await;
                c.translate(&request(&text)).await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(failure) = joined.unwrap() {
                assert!(matches!(failure.error, TranslateError::DuplicateInFlight));
            }
        }
        // A caller that takes the slot after the winner stored its result
        // must be served from the cache, not from a second paid call.
        assert_eq!(provider.calls(), round + 1, "round {round}");
    }
    assert_eq!(c.status().in_flight_count, 0);
}
