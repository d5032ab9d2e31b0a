//! Sigma-threshold anomaly detection over the trailing period
//!
//! Over the last `period_days` days the detector computes the mean and the
//! population standard deviation, then flags every day above
//! `mean + error_sigma * sigma` as an anomaly and every remaining day above
//! `mean + warning_sigma * sigma` as a warning.

use super::statistics::{decimal_to_f64, safe_ratio, summarize};
use crate::config::AnomalyConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::{AnomalyRecord, AnomalyReport, AnomalySeverity, DailyTotal};
use tracing::debug;

/// Anomaly detector for daily cost series
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> CostAnalyticsResult<Self> {
        if config.period_days == 0 {
            return Err(CostAnalyticsError::invalid_parameter(
                "period_days",
                "must be at least 1",
            ));
        }
        if config.error_sigma <= 0.0 || config.warning_sigma <= 0.0 {
            return Err(CostAnalyticsError::invalid_parameter(
                "sigma",
                "multipliers must be positive",
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Detects anomalies over the configured trailing period
    pub fn detect<T: DailyTotal>(&self, series: &[T]) -> AnomalyReport {
        self.detect_with_period(series, self.config.period_days)
    }

    /// Detects anomalies over the last `period_days` entries of `series`
    pub fn detect_with_period<T: DailyTotal>(
        &self,
        series: &[T],
        period_days: usize,
    ) -> AnomalyReport {
        let period_days = period_days.max(1);
        let window = &series[series.len().saturating_sub(period_days)..];
        let values: Vec<f64> = window.iter().map(|p| decimal_to_f64(p.total())).collect();

        let stats = summarize(&values);
        let sigma = stats.standard_deviation;
        let error_threshold = stats.mean + self.config.error_sigma * sigma;
        let warning_threshold = stats.mean + self.config.warning_sigma * sigma;

        let mut anomalies = Vec::new();
        let mut warnings = Vec::new();

        for (point, &cost) in window.iter().zip(values.iter()) {
            let (severity, threshold) = if cost > error_threshold {
                (AnomalySeverity::Error, error_threshold)
            } else if cost > warning_threshold {
                (AnomalySeverity::Warning, warning_threshold)
            } else {
                continue;
            };

            let record = AnomalyRecord {
                date: point.date(),
                actual_cost: point.total(),
                expected_cost: stats.mean,
                threshold,
                z_score: safe_ratio(cost - stats.mean, sigma),
                deviation_percent: safe_ratio(cost - stats.mean, stats.mean) * 100.0,
                severity,
            };

            debug!(
                "Cost {} on {}: {:.2} (expected {:.2}, z={:.2})",
                severity, record.date, cost, stats.mean, record.z_score
            );

            match severity {
                AnomalySeverity::Error => anomalies.push(record),
                AnomalySeverity::Warning => warnings.push(record),
            }
        }

        let health_score = health_score(anomalies.len(), warnings.len(), &self.config);

        AnomalyReport {
            period_days,
            statistics: stats,
            error_threshold,
            warning_threshold,
            anomalies,
            warnings,
            health_score,
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            config: AnomalyConfig::default(),
        }
    }
}

/// `100 - anomaly_penalty * anomalies - warning_penalty * warnings`, floored at 0
pub fn health_score(anomalies: usize, warnings: usize, config: &AnomalyConfig) -> u32 {
    let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    let penalty = config
        .anomaly_penalty
        .saturating_mul(count(anomalies))
        .saturating_add(config.warning_penalty.saturating_mul(count(warnings)));
    100u32.saturating_sub(penalty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DailyCost;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn series(values: &[Decimal]) -> Vec<DailyCost> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DailyCost::new(start + chrono::Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_constant_series_is_healthy() {
        let detector = AnomalyDetector::default();
        let report = detector.detect(&series(&[dec!(120.50); 30]));

        assert_eq!(report.anomaly_count(), 0);
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.health_score, 100);
        assert_eq!(report.statistics.standard_deviation, 0.0);
    }

    #[test]
    fn test_single_spike_flagged_as_error() {
        let detector = AnomalyDetector::default();
        let data = series(&[
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(100),
            dec!(500),
        ]);

        let report = detector.detect_with_period(&data, 8);

        assert_eq!(report.statistics.mean, 150.0);
        assert!((report.statistics.standard_deviation - 132.288).abs() < 0.01);
        assert!((report.error_threshold - 414.575).abs() < 0.01);
        assert_eq!(report.anomaly_count(), 1);
        assert_eq!(report.warning_count(), 0);

        let anomaly = &report.anomalies[0];
        assert_eq!(anomaly.severity, AnomalySeverity::Error);
        assert_eq!(anomaly.actual_cost, dec!(500));
        assert_eq!(anomaly.date, data[7].date);
        assert!(anomaly.z_score > 2.0);
        assert_eq!(report.health_score, 85);
    }

    #[test]
    fn test_warning_band() {
        // mean 110, sigma 20: warning above 140, error above 150
        let detector = AnomalyDetector::default();
        let data = series(&[dec!(90), dec!(130), dec!(90), dec!(130)]);
        let report = detector.detect(&data);
        assert_eq!(report.anomaly_count() + report.warning_count(), 0);

        // one outlier among four points sits at z = sqrt(3)
        let data = series(&[dec!(100), dec!(100), dec!(100), dec!(160)]);
        let report = detector.detect(&data);
        assert_eq!(report.anomaly_count(), 0);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.warnings[0].severity, AnomalySeverity::Warning);
        assert!((report.warnings[0].z_score - 3f64.sqrt()).abs() < 1e-9);
        assert_eq!(report.health_score, 95);
    }

    #[test]
    fn test_period_limits_window() {
        let detector = AnomalyDetector::default();
        let mut values = vec![dec!(1000)];
        values.extend(vec![dec!(50); 10]);
        let report = detector.detect_with_period(&series(&values), 10);

        assert_eq!(report.statistics.count, 10);
        assert_eq!(report.anomaly_count(), 0);
    }

    #[test]
    fn test_empty_series() {
        let detector = AnomalyDetector::default();
        let data: Vec<DailyCost> = vec![];
        let report = detector.detect(&data);

        assert!(report.statistics.is_empty());
        assert_eq!(report.health_score, 100);
    }

    #[test]
    fn test_health_score_floor() {
        let config = AnomalyConfig::default();
        assert_eq!(health_score(0, 0, &config), 100);
        assert_eq!(health_score(2, 3, &config), 55);
        assert_eq!(health_score(7, 0, &config), 0);
        assert_eq!(health_score(usize::MAX, usize::MAX, &config), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnomalyConfig {
            period_days: 0,
            ..AnomalyConfig::default()
        };
        assert!(AnomalyDetector::new(config).is_err());
    }

    #[test]
    fn test_detection_is_repeatable() {
        let detector = AnomalyDetector::default();
        let data = series(&[dec!(10), dec!(12), dec!(11), dec!(95), dec!(10), dec!(13)]);

        assert_eq!(detector.detect(&data), detector.detect(&data));
    }
}
