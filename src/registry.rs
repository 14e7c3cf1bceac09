//! In-memory campaign registry
//!
//! Maps campaign ids to their current metrics snapshot and optional budget
//! limit. The registry itself is synchronous and knows nothing about events or
//! locking; [`crate::tracker::CampaignTracker`] wraps it for concurrent use.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{CampaignMetrics, CampaignRegistration, MetricsUpdate};

#[derive(Debug, Clone)]
struct CampaignEntry {
    metrics: CampaignMetrics,
    budget_limit: Option<f64>,
}

/// Snapshots before and after a single applied update
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTransition {
    pub previous: CampaignMetrics,
    pub current: CampaignMetrics,
    pub budget_limit: Option<f64>,
}

#[derive(Debug, Default)]
pub struct CampaignRegistry {
    entries: HashMap<String, CampaignEntry>,

    /// Campaign ids in first-registration order
    order: Vec<String>,
}

impl CampaignRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reset) the zero-valued entry for a campaign
    ///
    /// Only positive budget limits are stored. Registering again without a
    /// limit keeps the limit of the earlier registration.
    pub fn register(&mut self, registration: &CampaignRegistration) -> CampaignMetrics {
        let metrics = CampaignMetrics::new(
            registration.campaign_id.clone(),
            registration.campaign_name.clone(),
            registration.platform,
        );

        let new_limit = registration.budget_limit.filter(|limit| *limit > 0.0);

        match self.entries.get_mut(&registration.campaign_id) {
            Some(entry) => {
                entry.metrics = metrics.clone();
                if new_limit.is_some() {
                    entry.budget_limit = new_limit;
                }
            }
            None => {
                self.order.push(registration.campaign_id.clone());
                self.entries.insert(
                    registration.campaign_id.clone(),
                    CampaignEntry {
                        metrics: metrics.clone(),
                        budget_limit: new_limit,
                    },
                );
            }
        }

        metrics
    }

    /// Merge `update` into the stored snapshot of `campaign_id`
    ///
    /// Returns `None` if the campaign is not registered, in which case nothing
    /// changes.
    pub fn apply_update(
        &mut self,
        campaign_id: &str,
        update: &MetricsUpdate,
        now: DateTime<Utc>,
    ) -> Option<MetricsTransition> {
        let entry = self.entries.get_mut(campaign_id)?;

        let current = entry.metrics.apply(update, now);
        let previous = std::mem::replace(&mut entry.metrics, current.clone());

        Some(MetricsTransition {
            previous,
            current,
            budget_limit: entry.budget_limit,
        })
    }

    pub fn get(&self, campaign_id: &str) -> Option<&CampaignMetrics> {
        self.entries.get(campaign_id).map(|entry| &entry.metrics)
    }

    pub fn budget_limit(&self, campaign_id: &str) -> Option<f64> {
        self.entries
            .get(campaign_id)
            .and_then(|entry| entry.budget_limit)
    }

    pub fn contains(&self, campaign_id: &str) -> bool {
        self.entries.contains_key(campaign_id)
    }

    /// All snapshots, in registration order
    pub fn all(&self) -> Vec<CampaignMetrics> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| entry.metrics.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
