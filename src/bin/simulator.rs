//! Fires a burst of identical and distinct translate requests at a running
//! gateway and reports how they were served.
//!
//! Usage: simulator [gateway_url] [concurrency]

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::sync::Barrier;
use tokio::task::JoinSet;

#[derive(Default)]
struct Tally {
    provider: usize,
    cached: usize,
    duplicate: usize,
    other_errors: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let base = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "http://127.0.0.1:5001".to_string());
    let concurrency: usize = match args.get(2) {
        Some(raw) => raw.parse().context("concurrency must be a number")?,
        None => 100,
    };

    let client = reqwest::Client::new();
    let url = format!("{base}/translate");
    let barrier = Arc::new(Barrier::new(concurrency));
    let started = Instant::now();

    println!("Sending {concurrency} concurrent requests to {url}");
    let mut tasks = JoinSet::new();
    for i in 0..concurrency {
        let client = client.clone();
        let url = url.clone();
        let barrier = Arc::clone(&barrier);
        // First half share one text to exercise coalescing.
        let text = if i < concurrency / 2 {
            "The quick brown fox jumps over the lazy dog.".to_string()
        } else {
            format!("Unique sentence number {i}.")
        };
        tasks.spawn(async move {
            barrier.wait().await;
            let body = serde_json::json!({
                "text": text,
                "target_language": "繁體中文",
                "source_language": "auto",
                "api_key": "sk-simulator",
            });
            let resp = client.post(&url).json(&body).send().await?;
            let status = resp.status();
            let json: serde_json::Value = resp.json().await?;
            Ok::<_, reqwest::Error>((status.as_u16(), json["from_cache"].as_bool()))
        });
    }

    let mut tally = Tally::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok((200, Some(true)))) => tally.cached += 1,
            Ok(Ok((200, _))) => tally.provider += 1,
            Ok(Ok((409, _))) => tally.duplicate += 1,
            _ => tally.other_errors += 1,
        }
    }
    let elapsed = started.elapsed();

    println!("--- Results ---");
    println!("Provider calls:      {}", tally.provider);
    println!("Cache hits:          {}", tally.cached);
    println!("Duplicate rejected:  {}", tally.duplicate);
    println!("Other errors:        {}", tally.other_errors);
    println!("Total time:          {elapsed:?}");
    println!(
        "RPS:                 {:.2}",
        concurrency as f64 / elapsed.as_secs_f64()
    );

    let status: serde_json::Value = client
        .get(format!("{base}/cache/status"))
        .send()
        .await?
        .json()
        .await?;
    println!("Gateway status: {status}");
    Ok(())
}
