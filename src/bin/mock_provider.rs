//! Stand-in for an OpenAI-compatible chat endpoint.
//!
//! Usage: mock_provider [port] [latency_ms] [error_rate] [rate_limit_rate]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use rand::Rng;
use serde_json::Value;
use tokio::time::sleep;

#[derive(Clone)]
struct ServerConfig {
    latency_ms: u64,
    error_rate: f64,
    rate_limit_rate: f64,
}

fn arg_or<T: std::str::FromStr>(args: &[String], idx: usize, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args.get(idx) {
        Some(raw) => Ok(raw.parse::<T>()?),
        None => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let port: u16 = arg_or(&args, 1, 3001)?;
    let config = ServerConfig {
        latency_ms: arg_or(&args, 2, 500)?,
        error_rate: arg_or(&args, 3, 0.0)?,
        rate_limit_rate: arg_or(&args, 4, 0.0)?,
    };

    let app = Router::new()
        .route("/v1/chat/completions", post(handler))
        .with_state(config.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(
        %addr,
        latency_ms = config.latency_ms,
        error_rate = config.error_rate,
        rate_limit_rate = config.rate_limit_rate,
        "mock provider running"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handler(
    State(config): State<ServerConfig>,
    headers: HeaderMap,
    Json(req): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len());
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": {"message": "invalid api key"}})),
        );
    }

    let (jitter, fail, limited) = {
        let mut rng = rand::thread_rng();
        (
            rng.gen_range(0..=20),
            config.error_rate > 0.0 && rng.gen_bool(config.error_rate),
            config.rate_limit_rate > 0.0 && rng.gen_bool(config.rate_limit_rate),
        )
    };
    sleep(Duration::from_millis(config.latency_ms + jitter)).await;

    if limited {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({"error": {"message": "rate limit reached"}})),
        );
    }
    if fail {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": {"message": "simulated failure"}})),
        );
    }

    let prompt = req["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();
    // The text sits in the final quoted segment of the prompt.
    let text = prompt
        .rsplit_once("Text to translate: ")
        .map(|(_, t)| t.trim_matches('"'))
        .unwrap_or(prompt);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": "mock-response",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": format!("[mock] {text}")},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 10, "total_tokens": 20}
        })),
    )
}
