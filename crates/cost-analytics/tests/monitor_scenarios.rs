use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use cost_analytics::{
    AlertKind, AlertSeverity, AnalyticsConfig, Clock, CostMonitor, ManualClock, MemoryAlertSink,
    SnapshotSource,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// Billing records for March 1..=14: 40/day on EC2 plus 10/day on S3,
/// with EC2 jumping to 140 on the 14th. Budget of 800 for the month.
fn snapshot_json() -> String {
    let mut records = Vec::new();
    for day in 1..=14 {
        let ec2 = if day == 14 { 140 } else { 40 };
        records.push(format!(
            r#"{{"date":"2024-03-{day:02}","provider":"aws","service_name":"EC2","cost":{ec2}}}"#
        ));
        records.push(format!(
            r#"{{"date":"2024-03-{day:02}","provider":"aws","service_name":"S3","cost":10}}"#
        ));
    }

    format!(
        r#"{{
            "records": [{}],
            "resources": [
                {{"id":"i-idle","type":"compute","utilization":{{"cpu":2,"memory":3}},"monthly_cost":"120.00"}}
            ],
            "budgets": [
                {{"id":"monthly","name":"March","amount":"800","alert_thresholds":[50,80,100]}}
            ]
        }}"#,
        records.join(",")
    )
}

async fn monitor_from_file(clock: Arc<ManualClock>) -> (CostMonitor, Arc<MemoryAlertSink>) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(snapshot_json().as_bytes()).unwrap();

    let source = Arc::new(SnapshotSource::load(file.path()).await.unwrap());
    let sink = Arc::new(MemoryAlertSink::new());
    let monitor = CostMonitor::new(&AnalyticsConfig::default(), source, clock)
        .unwrap()
        .with_sink(sink.clone());
    (monitor, sink)
}

#[tokio::test]
async fn test_first_tick_raises_every_alert_kind() {
    let clock = Arc::new(ManualClock::new(at(14, 12)));
    let (monitor, sink) = monitor_from_file(clock.clone()).await;

    // month to date: 13 * 50 + 150 = 800, exactly the budget
    assert_eq!(monitor.run_due(clock.now()).await, 3);

    let alerts = sink.alerts();
    let budget_levels: Vec<AlertSeverity> = alerts
        .iter()
        .filter(|a| matches!(a.kind, AlertKind::BudgetThreshold { .. }))
        .map(|a| a.severity)
        .collect();
    assert_eq!(
        budget_levels,
        vec![
            AlertSeverity::Info,
            AlertSeverity::Warning,
            AlertSeverity::Emergency
        ]
    );

    let spike = alerts
        .iter()
        .find(|a| matches!(a.kind, AlertKind::CostSpike { .. }))
        .expect("spike alert");
    // 150 against a 50/day week is +200%
    assert_eq!(spike.severity, AlertSeverity::Critical);

    let summary = alerts
        .iter()
        .find(|a| matches!(a.kind, AlertKind::DailySummary { .. }))
        .expect("summary alert");
    assert!(summary.message.contains("over 14 days"));
    assert_eq!(alerts.len(), 5);
}

#[tokio::test]
async fn test_overlapping_runs_do_not_double_alert() {
    let clock = Arc::new(ManualClock::new(at(14, 12)));
    let (monitor, sink) = monitor_from_file(clock.clone()).await;
    let monitor = Arc::new(monitor);

    let now = clock.now();
    let first = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.run_due(now).await })
    };
    let second = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.run_due(now).await })
    };

    let ran = first.await.unwrap() + second.await.unwrap();
    assert_eq!(ran, 3);
    assert_eq!(sink.len(), 5);
}

#[tokio::test]
async fn test_cooldown_then_realert() {
    let clock = Arc::new(ManualClock::new(at(14, 12)));
    let (monitor, sink) = monitor_from_file(clock.clone()).await;

    monitor.run_due(clock.now()).await;
    assert_eq!(sink.len(), 5);

    // hourly budget checks inside the cooldown stay quiet
    for _ in 0..6 {
        clock.advance(Duration::hours(1));
        monitor.run_due(clock.now()).await;
    }
    assert_eq!(sink.len(), 5);
    assert!(monitor.metrics().alerts_suppressed >= 6);

    // a day later the budget thresholds, the spike and the summary fire again
    clock.set(at(15, 12));
    monitor.run_due(clock.now()).await;
    assert_eq!(sink.len(), 10);
}
