use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::trace;
use uuid::Uuid;

use crate::CampaignRegistration;
use crate::actors::monitor::{DEMO_PROJECT_ID, MonitorSettings};
use crate::alerts::PerformanceThresholds;
use crate::publisher::{DEFAULT_SUBJECT_PREFIX, RetryPolicy};

/// Where published events go
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    /// In-process broadcast channel
    Channel {
        #[serde(default = "default_channel_capacity")]
        capacity: usize,
    },

    /// HTTP POST to an event gateway
    Webhook(WebhookConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Channel {
            capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    /// Sent as `X-EVENT-TOKEN` when present
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub interval_secs: u64,
    pub backoff_secs: u64,
    pub project_id: Uuid,

    /// Bootstrap the demo campaigns when nothing is registered
    pub demo_campaigns: bool,

    /// Start the monitoring loop on startup
    pub autostart: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            backoff_secs: 60,
            project_id: DEMO_PROJECT_ID,
            demo_campaigns: true,
            autostart: true,
        }
    }
}

impl MonitoringConfig {
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            project_id: self.project_id,
            interval: Duration::from_secs(self.interval_secs),
            backoff: Duration::from_secs(self.backoff_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    #[serde(default)]
    pub publish_retry: RetryPolicy,

    #[serde(default)]
    pub thresholds: PerformanceThresholds,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Campaigns registered on startup
    pub campaigns: Option<Vec<CampaignRegistration>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            subject_prefix: default_subject_prefix(),
            publish_retry: RetryPolicy::default(),
            thresholds: PerformanceThresholds::default(),
            monitoring: MonitoringConfig::default(),
            campaigns: None,
        }
    }
}

fn default_subject_prefix() -> String {
    DEFAULT_SUBJECT_PREFIX.to_string()
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    serde_json::from_str(content).context("invalid configuration file provided")
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path}"))?;
    parse_config(&file_content).inspect(|config| trace!("loaded config: {config:?}"))
}
