pub mod actors;
pub mod alerts;
pub mod config;
pub mod events;
pub mod metrics;
pub mod publisher;
pub mod registry;
pub mod service;
pub mod source;
pub mod tracker;
pub mod transport;
pub mod util;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{Counters, DerivedMetrics};

/// Advertising platforms a campaign can run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignPlatform {
    GoogleAds,
    Meta,
    Linkedin,
    Twitter,
}

impl CampaignPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignPlatform::GoogleAds => "google_ads",
            CampaignPlatform::Meta => "meta",
            CampaignPlatform::Linkedin => "linkedin",
            CampaignPlatform::Twitter => "twitter",
        }
    }
}

impl fmt::Display for CampaignPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a platform name does not match any supported platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePlatformError(pub String);

impl fmt::Display for ParsePlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown campaign platform: {}", self.0)
    }
}

impl std::error::Error for ParsePlatformError {}

impl FromStr for CampaignPlatform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_ads" => Ok(CampaignPlatform::GoogleAds),
            "meta" => Ok(CampaignPlatform::Meta),
            "linkedin" => Ok(CampaignPlatform::Linkedin),
            "twitter" => Ok(CampaignPlatform::Twitter),
            other => Err(ParsePlatformError(other.to_string())),
        }
    }
}

/// Current metrics snapshot of a single campaign
///
/// Raw counters and derived metrics are only reachable through accessors. A
/// snapshot is either freshly zeroed ([`CampaignMetrics::new`]) or the result of
/// merging an update over a previous snapshot ([`CampaignMetrics::apply`]), which
/// recomputes every derived metric, so the two never disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignMetrics {
    pub campaign_id: String,
    pub campaign_name: String,
    pub platform: CampaignPlatform,
    #[serde(flatten)]
    counters: Counters,
    #[serde(flatten)]
    derived: DerivedMetrics,
    timestamp: DateTime<Utc>,
    date: String,
}

impl CampaignMetrics {
    /// Zero-valued snapshot, as created by registration
    pub fn new(
        campaign_id: impl Into<String>,
        campaign_name: impl Into<String>,
        platform: CampaignPlatform,
    ) -> Self {
        let now = Utc::now();
        Self {
            campaign_id: campaign_id.into(),
            campaign_name: campaign_name.into(),
            platform,
            counters: Counters::default(),
            derived: DerivedMetrics::default(),
            timestamp: now,
            date: calendar_date(now),
        }
    }

    /// Merge `update` over this snapshot and return the resulting snapshot
    ///
    /// Fields missing from the update keep their current value. Derived metrics
    /// are recomputed from scratch.
    pub fn apply(&self, update: &MetricsUpdate, now: DateTime<Utc>) -> Self {
        let counters = self.counters.merge(update);

        Self {
            campaign_id: self.campaign_id.clone(),
            campaign_name: self.campaign_name.clone(),
            platform: self.platform,
            counters,
            derived: DerivedMetrics::compute(&counters),
            timestamp: now,
            date: calendar_date(now),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn derived(&self) -> &DerivedMetrics {
        &self.derived
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn date(&self) -> &str {
        &self.date
    }
}

fn calendar_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

/// Partial metrics update
///
/// Every field is an optional override: `None` keeps the stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impressions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clicks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
}

impl MetricsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn impressions(mut self, impressions: u64) -> Self {
        self.impressions = Some(impressions);
        self
    }

    pub fn clicks(mut self, clicks: u64) -> Self {
        self.clicks = Some(clicks);
        self
    }

    pub fn spend(mut self, spend: f64) -> Self {
        self.spend = Some(spend);
        self
    }

    pub fn conversions(mut self, conversions: u64) -> Self {
        self.conversions = Some(conversions);
        self
    }

    pub fn revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything needed to register a campaign for monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRegistration {
    pub campaign_id: String,
    pub campaign_name: String,
    pub platform: CampaignPlatform,
    #[serde(default)]
    pub budget_limit: Option<f64>,
}

impl CampaignRegistration {
    pub fn new(
        campaign_id: impl Into<String>,
        campaign_name: impl Into<String>,
        platform: CampaignPlatform,
    ) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            campaign_name: campaign_name.into(),
            platform,
            budget_limit: None,
        }
    }

    pub fn with_budget(mut self, budget_limit: f64) -> Self {
        self.budget_limit = Some(budget_limit);
        self
    }
}
