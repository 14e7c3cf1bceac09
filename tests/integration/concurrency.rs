//! Concurrency tests
//!
//! - Updates to distinct campaigns in parallel
//! - Contended updates to a single campaign
//! - Readers racing writers

use std::collections::HashMap;

use campaign_monitoring::MetricsUpdate;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_to_distinct_campaigns() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();
    const CAMPAIGNS: usize = 32;

    for i in 0..CAMPAIGNS {
        service
            .register_campaign(project_id, &create_registration(&format!("c{i}")))
            .await;
    }
    drain_events(&mut events);

    let mut tasks = vec![];
    for i in 0..CAMPAIGNS {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .update_campaign_metrics(
                    project_id,
                    &format!("c{i}"),
                    MetricsUpdate::new().impressions(1000 + i as u64),
                )
                .await
        }));
    }

    for task in tasks {
        assert!(task.await.unwrap().is_applied());
    }

    let messages = drain_events(&mut events);
    let payloads = payloads_for(&messages, METRICS_UPDATED);
    assert_eq!(payloads.len(), CAMPAIGNS);

    // Every campaign exactly once, carrying its own numbers
    let mut seen = HashMap::new();
    for payload in &payloads {
        let campaign_id = payload["campaign_id"].as_str().unwrap().to_string();
        assert_eq!(payload["metrics"]["campaign_id"], campaign_id.as_str());

        let index: u64 = campaign_id.trim_start_matches('c').parse().unwrap();
        assert_eq!(payload["metrics"]["impressions"], 1000 + index);

        *seen.entry(campaign_id).or_insert(0) += 1;
    }
    assert_eq!(seen.len(), CAMPAIGNS);
    assert!(seen.values().all(|count| *count == 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_contended_campaign_publishes_committed_order() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("hot"))
        .await;
    drain_events(&mut events);

    let mut tasks = vec![];
    for i in 1..=50 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .update_campaign_metrics(
                    project_id,
                    "hot",
                    MetricsUpdate::new().spend(i as f64),
                )
                .await
        }));
    }
    let mut committed = 0;
    for task in tasks {
        if task.await.unwrap().is_applied() {
            committed += 1;
        }
    }
    assert_eq!(committed, 50);

    let messages = drain_events(&mut events);
    let payloads = payloads_for(&messages, METRICS_UPDATED);
    assert_eq!(payloads.len(), committed);

    // Snapshots are published in the order they were committed
    let timestamps: Vec<DateTime<Utc>> = payloads
        .iter()
        .map(|p| p["metrics"]["timestamp"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));

    let spends: Vec<f64> = payloads
        .iter()
        .map(|p| p["metrics"]["spend"].as_f64().unwrap())
        .collect();

    // The last published snapshot is the one that stuck
    let stored = service
        .get_campaign_metrics("hot")
        .await
        .unwrap()
        .counters()
        .spend;
    assert_eq!(spends.last().copied(), Some(stored));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_consistent_snapshots() {
    let TestService { service, .. } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1"))
        .await;

    let writer = {
        let service = service.clone();
        tokio::spawn(async move {
            for i in 1..=200u64 {
                service
                    .update_campaign_metrics(
                        project_id,
                        "c1",
                        MetricsUpdate::new().impressions(i * 100).clicks(i * 2),
                    )
                    .await;
            }
        })
    };

    let reader = {
        let service = service.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let metrics = service.get_campaign_metrics("c1").await.unwrap();
                let counters = metrics.counters();
                // Counters and derived values always come from the same update
                if counters.impressions > 0 {
                    assert_eq!(counters.clicks * 50, counters.impressions);
                    assert_eq!(metrics.derived().ctr, 2.0);
                }
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
}
