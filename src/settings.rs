use std::time::Duration;

use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use log::info;
use serde::Deserialize;

use crate::batch::batch_runner::{BatchTiming, DEFAULT_PACING_DELAY, DEFAULT_SETTLE_DELAY};

#[derive(Deserialize, Debug, Clone)]
pub struct ApiSettings {
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl UpstreamSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct BatchSettings {
    pub pacing_delay_ms: u64,
    pub settle_delay_ms: u64,
}

impl BatchSettings {
    pub fn timing(&self) -> BatchTiming {
        BatchTiming {
            pacing_delay: Duration::from_millis(self.pacing_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HealthSettings {
    pub poll_interval_ms: u64,
}

impl HealthSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ListingSettings {
    pub default_limit: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub upstream: UpstreamSettings,
    pub batch: BatchSettings,
    pub cache: CacheSettings,
    pub health: HealthSettings,
    pub listing: ListingSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = defaults()?
            .add_source(File::with_name("settings").required(false))
            .add_source(File::with_name("settings.local").required(false))
            .add_source(Environment::with_prefix("client_console").separator("__"))
            .build()?;

        let settings = s.try_deserialize()?;

        info!("Loaded settings. {:#?}", settings);

        Ok(settings)
    }
}

fn defaults() -> Result<config::ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("api.port", 8080)?
        .set_default("upstream.base_url", "http://localhost:8000")?
        .set_default("upstream.request_timeout_ms", 30_000)?
        .set_default("batch.pacing_delay_ms", DEFAULT_PACING_DELAY.as_millis() as u64)?
        .set_default("batch.settle_delay_ms", DEFAULT_SETTLE_DELAY.as_millis() as u64)?
        .set_default("cache.ttl_secs", 30)?
        .set_default("cache.max_entries", 256)?
        .set_default("health.poll_interval_ms", 15_000)?
        .set_default("listing.default_limit", 25)
}
