//! Derived campaign KPIs
//!
//! Every derived metric is recomputed in full from the raw counters on each
//! update. A zero denominator yields `0.0` instead of a division error or a
//! non-finite value.

use serde::Serialize;

use crate::MetricsUpdate;

/// Raw counters reported by an ad platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Counters {
    pub impressions: u64,
    pub clicks: u64,
    pub spend: f64,
    pub conversions: u64,
    pub revenue: f64,
}

impl Counters {
    /// Overlay the fields present in `update` on top of these counters
    pub fn merge(&self, update: &MetricsUpdate) -> Counters {
        Counters {
            impressions: update.impressions.unwrap_or(self.impressions),
            clicks: update.clicks.unwrap_or(self.clicks),
            spend: update.spend.unwrap_or(self.spend),
            conversions: update.conversions.unwrap_or(self.conversions),
            revenue: update.revenue.unwrap_or(self.revenue),
        }
    }
}

/// KPIs derived from [`Counters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    /// Click-through rate in percent
    pub ctr: f64,
    /// Cost per click
    pub cpc: f64,
    /// Cost per thousand impressions
    pub cpm: f64,
    /// Return on ad spend
    pub roas: f64,
}

impl DerivedMetrics {
    pub fn compute(counters: &Counters) -> DerivedMetrics {
        let impressions = counters.impressions as f64;
        let clicks = counters.clicks as f64;

        DerivedMetrics {
            ctr: ratio(clicks, impressions) * 100.0,
            cpc: ratio(counters.spend, clicks),
            cpm: ratio(counters.spend, impressions) * 1000.0,
            roas: ratio(counters.revenue, counters.spend),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
