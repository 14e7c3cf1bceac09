//! End-to-end tests of the register → update → publish → evaluate pipeline

use assert_matches::assert_matches;
use campaign_monitoring::MetricsUpdate;
use campaign_monitoring::tracker::{UpdateOutcome, UpdateReport};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::helpers::*;

#[tokio::test]
async fn test_registered_campaign_starts_at_zero() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    assert!(
        service
            .register_campaign(project_id, &create_registration("c1").with_budget(1000.0))
            .await
    );

    let metrics = service.get_campaign_metrics("c1").await.unwrap();
    let value = serde_json::to_value(&metrics).unwrap();
    for field in ["impressions", "clicks", "conversions"] {
        assert_eq!(value[field], 0, "{field} should start at 0");
    }
    for field in ["spend", "revenue", "ctr", "cpc", "cpm", "roas"] {
        assert_eq!(value[field], 0.0, "{field} should start at 0.0");
    }

    let messages = drain_events(&mut events);
    assert_eq!(subjects(&messages), vec![METRICS_UPDATED]);
    let payload = messages[0].json().unwrap();
    assert_eq!(payload["event_type"], "campaign.metrics_updated");
    assert_eq!(payload["project_id"], project_id.to_string());
    assert_eq!(payload["metrics"]["campaign_name"], "Campaign c1");
    assert_eq!(payload["metrics"]["platform"], "google_ads");
}

#[tokio::test]
async fn test_update_of_unregistered_campaign_changes_nothing() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();

    let outcome = service
        .update_campaign_metrics(
            Uuid::new_v4(),
            "ghost",
            MetricsUpdate::new().spend(5000.0),
        )
        .await;

    assert_eq!(outcome, UpdateOutcome::Unregistered);
    assert!(service.get_campaign_metrics("ghost").await.is_none());
    assert!(service.get_all_campaign_metrics().await.is_empty());
    assert!(drain_events(&mut events).is_empty());
}

#[tokio::test]
async fn test_budget_exceeded_by_twenty_percent() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1").with_budget(1000.0))
        .await;
    drain_events(&mut events);

    let outcome = service
        .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().spend(1200.0))
        .await;
    assert_eq!(
        outcome,
        UpdateOutcome::Applied(UpdateReport {
            metrics_published: true,
            alerts_raised: 2,
            alerts_published: 2,
        })
    );

    let messages = drain_events(&mut events);
    assert_eq!(
        subjects(&messages),
        vec![METRICS_UPDATED, BUDGET_EXCEEDED, PERFORMANCE_ALERT]
    );

    let budget = &payloads_for(&messages, BUDGET_EXCEEDED)[0];
    assert_eq!(budget["event_type"], "campaign.budget_exceeded");
    assert_eq!(budget["budget_limit"], 1000.0);
    assert_eq!(budget["current_spend"], 1200.0);
    assert_eq!(budget["percentage_exceeded"], 20.0);

    let alert = &payloads_for(&messages, PERFORMANCE_ALERT)[0]["alert"];
    assert_eq!(alert["alert_type"], "budget_exceeded");
    assert_eq!(alert["severity"], "high");
    assert_eq!(alert["message"], "Campaign budget exceeded by 20.0%");
    assert_eq!(alert["threshold"], 1000.0);
    assert_eq!(alert["current_value"], 1200.0);
}

#[tokio::test]
async fn test_budget_alert_repeats_while_over_budget() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1").with_budget(100.0))
        .await;

    for spend in [150.0, 160.0, 170.0] {
        service
            .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().spend(spend))
            .await;
    }

    let messages = drain_events(&mut events);
    assert_eq!(payloads_for(&messages, BUDGET_EXCEEDED).len(), 3);
}

#[tokio::test]
async fn test_roas_drop_fires_single_below_event() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1"))
        .await;
    service
        .update_campaign_metrics(
            project_id,
            "c1",
            MetricsUpdate::new().spend(100.0).revenue(600.0),
        )
        .await;
    assert_eq!(
        service.get_campaign_metrics("c1").await.unwrap().derived().roas,
        6.0
    );
    drain_events(&mut events);

    service
        .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().revenue(150.0))
        .await;

    let messages = drain_events(&mut events);
    let thresholds = payloads_for(&messages, PERFORMANCE_THRESHOLD);
    assert_eq!(thresholds.len(), 1);
    assert_eq!(thresholds[0]["event_type"], "campaign.performance_threshold");
    assert_eq!(thresholds[0]["metric_name"], "roas");
    assert_eq!(thresholds[0]["threshold_type"], "below");
    assert_eq!(thresholds[0]["threshold_value"], 2.0);
    assert_eq!(thresholds[0]["current_value"], 1.5);
}

#[tokio::test]
async fn test_threshold_is_edge_triggered() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1"))
        .await;
    service
        .update_campaign_metrics(
            project_id,
            "c1",
            MetricsUpdate::new().spend(100.0).revenue(300.0),
        )
        .await;
    drain_events(&mut events);

    // 3.0 → 1.5 → 1.2 → 1.0: only the first step crosses the bound
    for revenue in [150.0, 120.0, 100.0] {
        service
            .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().revenue(revenue))
            .await;
    }
    let messages = drain_events(&mut events);
    assert_eq!(payloads_for(&messages, PERFORMANCE_THRESHOLD).len(), 1);

    // Back above and down again fires again
    for revenue in [300.0, 150.0] {
        service
            .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().revenue(revenue))
            .await;
    }
    let messages = drain_events(&mut events);
    let thresholds = payloads_for(&messages, PERFORMANCE_THRESHOLD);
    assert_eq!(thresholds.len(), 1);
    assert_eq!(thresholds[0]["threshold_type"], "below");
}

#[tokio::test]
async fn test_raise_alerts_adds_threshold_alerts() {
    let mut config = test_config();
    config.thresholds.raise_alerts = true;
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service_with(config);
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1"))
        .await;
    service
        .update_campaign_metrics(
            project_id,
            "c1",
            MetricsUpdate::new().spend(100.0).revenue(300.0),
        )
        .await;
    drain_events(&mut events);

    let outcome = service
        .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().revenue(150.0))
        .await;
    assert_matches!(outcome, UpdateOutcome::Applied(UpdateReport { alerts_raised: 2, .. }));

    let messages = drain_events(&mut events);
    assert_eq!(
        subjects(&messages),
        vec![METRICS_UPDATED, PERFORMANCE_THRESHOLD, PERFORMANCE_ALERT]
    );
    let alert = &payloads_for(&messages, PERFORMANCE_ALERT)[0]["alert"];
    assert_eq!(alert["alert_type"], "threshold_crossed_below");
    assert_eq!(alert["severity"], "medium");
}

#[tokio::test]
async fn test_sequential_updates_publish_in_order() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1"))
        .await;
    drain_events(&mut events);

    let spends = [10.0, 20.0, 15.0, 40.0, 35.0];
    for spend in spends {
        service
            .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().spend(spend))
            .await;
    }

    let messages = drain_events(&mut events);
    let published: Vec<f64> = payloads_for(&messages, METRICS_UPDATED)
        .iter()
        .map(|p| p["metrics"]["spend"].as_f64().unwrap())
        .collect();
    assert_eq!(published, spends.to_vec());
}

#[tokio::test]
async fn test_snapshots_are_stable_between_updates() {
    let TestService { service, .. } = create_test_service();
    let project_id = Uuid::new_v4();

    for id in ["a", "b", "c"] {
        service
            .register_campaign(project_id, &create_registration(id))
            .await;
    }
    service
        .update_campaign_metrics(
            project_id,
            "b",
            MetricsUpdate::new().impressions(1000).clicks(30),
        )
        .await;

    let first = service.get_all_campaign_metrics().await;
    let second = service.get_all_campaign_metrics().await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first[1].derived().ctr, 3.0);
}

#[tokio::test]
async fn test_reregistration_resets_metrics_and_keeps_budget() {
    let TestService {
        service,
        mut events,
        ..
    } = create_test_service();
    let project_id = Uuid::new_v4();

    service
        .register_campaign(project_id, &create_registration("c1").with_budget(500.0))
        .await;
    service
        .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().spend(100.0))
        .await;

    service
        .register_campaign(project_id, &create_registration("c1"))
        .await;
    assert_eq!(
        service.get_campaign_metrics("c1").await.unwrap().counters().spend,
        0.0
    );
    drain_events(&mut events);

    service
        .update_campaign_metrics(project_id, "c1", MetricsUpdate::new().spend(600.0))
        .await;
    let messages = drain_events(&mut events);
    assert_eq!(payloads_for(&messages, BUDGET_EXCEEDED)[0]["budget_limit"], 500.0);
}
