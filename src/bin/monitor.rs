use std::sync::Arc;

use campaign_monitoring::{
    config::{Config, TransportConfig, read_config_file},
    service::CampaignPerformanceService,
    transport::{
        Transport,
        channel::{ChannelTransport, TransportMessage},
        webhook::WebhookTransport,
    },
    util::{get_config_path, get_log_level},
};
use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, instrument, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (falls back to $CAMPAIGN_MONITOR_CONFIG)
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let level = get_log_level();
    let filter = filter::Targets::new()
        .with_targets(vec![("campaign_monitoring", level), ("campaign_monitor", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    match args.file.clone().or_else(get_config_path) {
        Some(path) => read_config_file(&path),
        None => {
            info!("no config file given, using defaults");
            Ok(Config::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = load_config(&args)?;

    let transport: Arc<dyn Transport> = match &config.transport {
        TransportConfig::Channel { capacity } => {
            let transport = Arc::new(ChannelTransport::new(*capacity));
            tokio::spawn(log_events(transport.subscribe()));
            transport as Arc<dyn Transport>
        }
        TransportConfig::Webhook(webhook) => Arc::new(WebhookTransport::new(webhook)?),
    };

    let service = CampaignPerformanceService::from_config(&config, transport);

    if let Some(campaigns) = &config.campaigns {
        for registration in campaigns {
            service
                .register_campaign(service.project_id(), registration)
                .await;
        }
    }

    if config.monitoring.autostart {
        service.start_monitoring().await;
    }

    let health = service.health_check().await;
    info!(
        "campaign monitor up: {} campaigns, monitoring {}",
        health.active_campaigns,
        if health.monitoring_active { "active" } else { "inactive" }
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    service.stop_monitoring().await;

    Ok(())
}

/// Log every event delivered over the in-process channel
#[instrument(skip_all)]
async fn log_events(mut events: broadcast::Receiver<TransportMessage>) {
    loop {
        match events.recv().await {
            Ok(message) => match message.json() {
                Ok(payload) => debug!("{}: {payload}", message.subject),
                Err(e) => error!("{}: undecodable payload: {e}", message.subject),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!("event logger lagged, skipped {skipped} events")
            }
            Err(RecvError::Closed) => break,
        }
    }
}
