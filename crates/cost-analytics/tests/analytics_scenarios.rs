use chrono::{Duration, NaiveDate};
use cost_analytics::{
    aggregate_daily, aggregate_services, moving_average, AnomalyDetector, AnomalySeverity,
    CloudProvider, CostForecaster, CostRecord, DailyCost, ForecastMethod, InsightsAggregator,
    OpportunityGenerator, Priority, RecommendationCategory, Resource, ResourceType, TrendAnalyzer,
    TrendDirection, Utilization,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn daily(values: &[Decimal]) -> Vec<DailyCost> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| DailyCost::new(start() + Duration::days(i as i64), *v))
        .collect()
}

#[test]
fn test_eight_day_spike_scenario() {
    let detector = AnomalyDetector::default();
    let mut values = vec![dec!(100); 7];
    values.push(dec!(500));
    let series = daily(&values);

    let report = detector.detect_with_period(&series, 8);

    // population statistics: mean 150, sigma ~132.29, threshold ~414.58
    assert_eq!(report.statistics.mean, 150.0);
    assert!((report.error_threshold - 414.575).abs() < 0.01);
    assert_eq!(report.anomaly_count(), 1);
    assert_eq!(report.anomalies[0].date, series[7].date);
    assert_eq!(report.anomalies[0].severity, AnomalySeverity::Error);
    assert_eq!(report.anomalies[0].actual_cost, dec!(500));
}

#[test]
fn test_three_sigma_outlier_is_an_error() {
    // 29 days at 100 plus one injected day well above mean + 3 sigma
    let mut values = vec![dec!(100); 29];
    values.push(dec!(400));
    let report = AnomalyDetector::default().detect(&daily(&values));

    assert_eq!(report.anomaly_count(), 1);
    assert!(report.anomalies[0].z_score > 3.0);
    assert_eq!(report.warning_count(), 0);
}

#[test]
fn test_rightsizing_scenario() {
    let resource = Resource::new(
        "vm-348",
        ResourceType::Compute,
        Utilization::new(8.0, 12.0),
        dec!(348),
    );
    let recs = OpportunityGenerator::default().generate(&[resource], &[]);

    let rec = recs
        .iter()
        .find(|r| r.category() == RecommendationCategory::Rightsizing)
        .expect("rightsizing recommendation");
    assert_eq!(rec.estimated_savings, dec!(139.2));
    assert_eq!(rec.priority, Priority::High);
}

#[test]
fn test_trend_classification() {
    let analyzer = TrendAnalyzer::default();
    let rising: Vec<Decimal> = (0..14).map(|i| Decimal::from(50 + 5 * i)).collect();
    let falling: Vec<Decimal> = rising.iter().rev().copied().collect();

    assert_eq!(analyzer.analyze(&daily(&rising)).direction, TrendDirection::Increasing);
    assert_eq!(analyzer.analyze(&daily(&falling)).direction, TrendDirection::Decreasing);
    assert_eq!(
        analyzer.analyze(&daily(&[dec!(75); 14])).direction,
        TrendDirection::Stable
    );
}

#[test]
fn test_records_to_insights_pipeline() {
    let mut records = Vec::new();
    for day in 0..21 {
        let date = start() + Duration::days(day);
        records.push(CostRecord::new(date, CloudProvider::Aws, "EC2", dec!(80)));
        records.push(CostRecord::new(date, CloudProvider::Aws, "Amazon S3", dec!(15)));
        records.push(CostRecord::new(date, CloudProvider::Azure, "Virtual Machines", dec!(20)));
    }

    let daily = aggregate_daily(&records);
    let services = aggregate_services(&records);
    assert_eq!(daily.len(), 21);
    assert_eq!(daily[0].total, dec!(115));
    assert_eq!(services.len(), 3);

    let insights = InsightsAggregator::default().analyze(&daily, &services, &[]);

    assert_eq!(insights.summary.total_cost, dec!(2415));
    assert_eq!(insights.summary.provider_totals[&CloudProvider::Azure], dec!(420));
    assert_eq!(insights.anomalies.anomaly_count(), 0);
    assert_eq!(insights.summary.trend.direction, TrendDirection::Stable);
    assert_eq!(insights.forecasts.points.len(), 30);

    // EC2 is 70% of spend; S3 is a storage service above the minimum
    let categories: Vec<RecommendationCategory> =
        insights.optimizations.iter().map(|r| r.category()).collect();
    assert!(categories.contains(&RecommendationCategory::HighSpendService));
    assert!(categories.contains(&RecommendationCategory::StorageOptimization));
    assert!(insights
        .optimizations
        .windows(2)
        .all(|w| w[0].estimated_savings >= w[1].estimated_savings));
}

#[test]
fn test_output_has_no_non_finite_values() {
    let insights = InsightsAggregator::default().analyze(&daily(&[Decimal::ZERO; 20]), &[], &[]);
    let value = serde_json::to_value(&insights).unwrap();

    // serde_json writes non-finite floats as null
    assert!(!contains_null(&value));
}

fn contains_null(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.iter().any(contains_null),
        serde_json::Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}

proptest! {
    #[test]
    fn prop_constant_series_has_no_anomalies(cost in 0u32..100_000, days in 1usize..60) {
        let series = daily(&vec![Decimal::from(cost); days]);
        let report = AnomalyDetector::default().detect(&series);

        prop_assert_eq!(report.anomaly_count(), 0);
        prop_assert_eq!(report.warning_count(), 0);
        prop_assert_eq!(report.health_score, 100);
    }

    #[test]
    fn prop_moving_average_of_constant_is_constant(cost in 0u32..100_000, days in 1usize..60, window in 1usize..15) {
        let series = daily(&vec![Decimal::from(cost); days]);
        let points = moving_average(&series, window).unwrap();

        prop_assert_eq!(points.len(), days);
        for point in points {
            prop_assert!((point.moving_average - cost as f64).abs() < 1e-6);
            prop_assert!(point.deviation.abs() < 1e-6);
            prop_assert!(point.deviation_percent.abs() < 1e-6);
        }
    }

    #[test]
    fn prop_forecast_confidence_non_increasing(
        costs in prop::collection::vec(0u32..5_000, 7..45),
        horizon in 1usize..45,
    ) {
        let series = daily(&costs.into_iter().map(Decimal::from).collect::<Vec<_>>());
        let forecaster = CostForecaster::default();

        for method in [ForecastMethod::DampedTrend, ForecastMethod::LinearRegression] {
            let forecast = forecaster.forecast_with(&series, method, horizon);
            prop_assert_eq!(forecast.points.len(), horizon);
            for pair in forecast.points.windows(2) {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
            }
        }
    }

    #[test]
    fn prop_recommendation_scores_stay_in_range(
        cpu in 0.0f64..100.0,
        memory in 0.0f64..100.0,
        cost in 0u32..10_000,
    ) {
        let resource = Resource::new("vm", ResourceType::Compute, Utilization::new(cpu, memory), Decimal::from(cost));
        for rec in OpportunityGenerator::default().generate(&[resource], &[]) {
            prop_assert!(rec.estimated_savings >= Decimal::ZERO);
            prop_assert!((0.0..=100.0).contains(&rec.savings_percentage));
            prop_assert!((0.0..=100.0).contains(&rec.confidence));
        }
    }
}
