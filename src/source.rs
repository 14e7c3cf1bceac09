//! Metrics sources polled by the monitoring loop

use async_trait::async_trait;
use rand::Rng;
use tracing::trace;

use crate::{CampaignMetrics, CampaignPlatform, CampaignRegistration, MetricsUpdate};

/// Provides fresh counter values for registered campaigns
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Campaigns to register when the registry is empty at refresh time
    async fn bootstrap(&self) -> anyhow::Result<Vec<CampaignRegistration>> {
        Ok(Vec::new())
    }

    /// Produce one update per campaign that has new data
    ///
    /// Campaigns missing from the result are left untouched.
    async fn fetch(
        &self,
        campaigns: &[CampaignMetrics],
    ) -> anyhow::Result<Vec<(String, MetricsUpdate)>>;
}

/// Generates plausible, monotonically growing counters
///
/// Stands in for a real ad platform integration.
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    demo_campaigns: bool,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also bootstrap the three built-in demo campaigns
    pub fn with_demo_campaigns() -> Self {
        Self {
            demo_campaigns: true,
        }
    }
}

/// Built-in campaigns used when running without any configured campaigns
pub fn demo_campaigns() -> Vec<CampaignRegistration> {
    vec![
        CampaignRegistration::new(
            "demo_summer_sale_2024",
            "Summer Sale 2024",
            CampaignPlatform::GoogleAds,
        )
        .with_budget(1000.0),
        CampaignRegistration::new(
            "demo_brand_awareness_q4",
            "Brand Awareness Q4",
            CampaignPlatform::Meta,
        )
        .with_budget(1500.0),
        CampaignRegistration::new(
            "demo_product_launch",
            "Product Launch Campaign",
            CampaignPlatform::Linkedin,
        )
        .with_budget(800.0),
    ]
}

/// Add one random increment to the current counters
fn synthetic_update(rng: &mut impl Rng, current: &CampaignMetrics) -> MetricsUpdate {
    let counters = current.counters();

    let new_impressions: u64 = rng.random_range(1000..=5000);
    let click_rate: f64 = rng.random_range(0.02..0.08);
    let new_clicks = (new_impressions as f64 * click_rate) as u64;
    let new_spend: f64 = rng.random_range(50.0..200.0);
    let conversion_rate: f64 = rng.random_range(0.05..0.15);
    let new_conversions = (new_clicks as f64 * conversion_rate) as u64;
    let order_value: f64 = rng.random_range(25.0..100.0);
    let new_revenue = new_conversions as f64 * order_value;

    MetricsUpdate::new()
        .impressions(counters.impressions + new_impressions)
        .clicks(counters.clicks + new_clicks)
        .spend(counters.spend + new_spend)
        .conversions(counters.conversions + new_conversions)
        .revenue(counters.revenue + new_revenue)
}

fn synthetic_updates(campaigns: &[CampaignMetrics]) -> Vec<(String, MetricsUpdate)> {
    let mut rng = rand::rng();
    campaigns
        .iter()
        .map(|metrics| {
            (
                metrics.campaign_id.clone(),
                synthetic_update(&mut rng, metrics),
            )
        })
        .collect()
}

#[async_trait]
impl MetricsSource for SyntheticSource {
    async fn bootstrap(&self) -> anyhow::Result<Vec<CampaignRegistration>> {
        if self.demo_campaigns {
            Ok(demo_campaigns())
        } else {
            Ok(Vec::new())
        }
    }

    async fn fetch(
        &self,
        campaigns: &[CampaignMetrics],
    ) -> anyhow::Result<Vec<(String, MetricsUpdate)>> {
        let updates = synthetic_updates(campaigns);
        trace!("generated {} synthetic updates", updates.len());
        Ok(updates)
    }
}
