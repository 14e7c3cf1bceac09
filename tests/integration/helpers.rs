//! Helper functions for integration tests

use std::sync::Arc;

use campaign_monitoring::config::Config;
use campaign_monitoring::publisher::RetryPolicy;
use campaign_monitoring::service::CampaignPerformanceService;
use campaign_monitoring::transport::channel::{ChannelTransport, TransportMessage};
use campaign_monitoring::{CampaignPlatform, CampaignRegistration};
use tokio::sync::broadcast;

pub const METRICS_UPDATED: &str = "zamc.events.campaign.metrics_updated";
pub const BUDGET_EXCEEDED: &str = "zamc.events.campaign.budget_exceeded";
pub const PERFORMANCE_ALERT: &str = "zamc.events.campaign.performance_alert";
pub const PERFORMANCE_THRESHOLD: &str = "zamc.events.campaign.performance_threshold";

pub struct TestService {
    pub service: Arc<CampaignPerformanceService>,
    pub transport: Arc<ChannelTransport>,
    pub events: broadcast::Receiver<TransportMessage>,
}

/// Config that never fires the monitoring loop on its own and never sleeps on
/// publish failures
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.publish_retry = RetryPolicy::none();
    config.monitoring.interval_secs = 3600;
    config.monitoring.backoff_secs = 3600;
    config.monitoring.demo_campaigns = false;
    config
}

pub fn create_test_service() -> TestService {
    create_test_service_with(test_config())
}

pub fn create_test_service_with(config: Config) -> TestService {
    let transport = Arc::new(ChannelTransport::new(4096));
    let events = transport.subscribe();
    let service = CampaignPerformanceService::from_config(&config, transport.clone());

    TestService {
        service: Arc::new(service),
        transport,
        events,
    }
}

pub fn create_registration(campaign_id: &str) -> CampaignRegistration {
    CampaignRegistration::new(
        campaign_id,
        format!("Campaign {campaign_id}"),
        CampaignPlatform::GoogleAds,
    )
}

/// Everything published so far
pub fn drain_events(events: &mut broadcast::Receiver<TransportMessage>) -> Vec<TransportMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = events.try_recv() {
        messages.push(message);
    }
    messages
}

pub fn subjects(messages: &[TransportMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.subject.as_str()).collect()
}

pub fn payloads_for(messages: &[TransportMessage], subject: &str) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter(|m| m.subject == subject)
        .map(|m| m.json().unwrap())
        .collect()
}
