use std::time::Duration;

use anyhow::{bail, Context};
use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "TRANSLATE_EDGE_";

/// Options the coordinator itself recognises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub ttl_seconds: u64,
    pub max_entries: usize,
    pub provider_timeout_ms: u64,
    pub max_input_chars: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            max_entries: 1000,
            provider_timeout_ms: 30_000,
            max_input_chars: 5000,
        }
    }
}

impl CoordinatorConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

/// Full process configuration for the gateway binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(flatten)]
    pub coordinator: CoordinatorConfig,
    pub listen_addr: String,
    pub provider_endpoint: String,
    pub provider_model: String,
    /// Background expiry sweep period; 0 disables it.
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            listen_addr: "127.0.0.1:5001".to_string(),
            provider_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            provider_model: "gpt-4o-mini".to_string(),
            sweep_interval_secs: 0,
        }
    }
}

impl Config {
    /// Defaults overlaid with `TRANSLATE_EDGE_*` environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config: Config = figment
            .extract()
            .with_context(|| format!("reading {ENV_PREFIX}* configuration"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.coordinator.max_entries == 0 {
            bail!("max_entries must be at least 1");
        }
        if self.coordinator.max_input_chars == 0 {
            bail!("max_input_chars must be at least 1");
        }
        if self.coordinator.provider_timeout_ms == 0 {
            bail!("provider_timeout_ms must be at least 1");
        }
        Ok(())
    }
}
