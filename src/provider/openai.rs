//! OpenAI-compatible chat-completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::prompt::{build_user_prompt, SYSTEM_PROMPT};
use super::{ProviderError, ProviderRequest, TranslationProvider};

pub struct OpenAiProvider {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    async fn translate(&self, request: ProviderRequest<'_>) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": build_user_prompt(
                        request.text,
                        request.source_language,
                        request.target_language,
                    ),
                }
            ],
            "temperature": 0.3,
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", request.credential))
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            let body_text = resp.text().await.unwrap_or_default();
            return Err(error_for_status(status, retry_after, &body_text));
        }

        let text = resp.text().await.map_err(map_transport_error)?;
        let translation = parse_completion(&text)?;
        debug!(endpoint = %self.endpoint, chars = translation.chars().count(), "provider call ok");
        Ok(translation)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(e.to_string())
    }
}

fn error_for_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
            status: status.as_u16(),
        },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after_secs },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout,
        _ => ProviderError::Http {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        },
    }
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn parse_completion(body: &str) -> Result<String, ProviderError> {
    let completion: Completion =
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::InvalidResponse("no choices in completion".into()))?;
    let translation = content.trim();
    if translation.is_empty() {
        return Err(ProviderError::InvalidResponse("empty translation".into()));
    }
    Ok(translation.to_string())
}
