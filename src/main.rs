use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use translate_edge::config::Config;
use translate_edge::gateway::{router, AppState};
use translate_edge::provider::OpenAiProvider;
use translate_edge::TranslationCoordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "translate_edge=info".into()),
        )
        .with_target(true)
        .init();

    let config = Config::from_env().context("loading configuration")?;

    let provider = OpenAiProvider::new(&config.provider_endpoint, &config.provider_model)
        .context("building provider client")?;
    let coordinator = Arc::new(TranslationCoordinator::with_provider(
        config.coordinator.clone(),
        Arc::new(provider),
    ));

    if config.sweep_interval_secs > 0 {
        let store = Arc::clone(coordinator.store());
        let period = Duration::from_secs(config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.sweep_expired();
            }
        });
    }

    let app = router(Arc::new(AppState { coordinator }));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(
        addr = %config.listen_addr,
        endpoint = %config.provider_endpoint,
        ttl_seconds = config.coordinator.ttl_seconds,
        max_entries = config.coordinator.max_entries,
        "translation gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("serving HTTP")?;
    Ok(())
}
