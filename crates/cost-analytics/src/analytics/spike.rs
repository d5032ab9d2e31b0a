//! Day-over-trailing-window cost spike detection

use super::statistics::{average, decimal_to_f64, percent_change};
use crate::config::SpikeConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::{CostSpike, DailyTotal, SpikeSeverity};
use tracing::debug;

/// Compares every day against the average of the `lookback_days` before it
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    config: SpikeConfig,
}

impl SpikeDetector {
    pub fn new(config: SpikeConfig) -> CostAnalyticsResult<Self> {
        if config.lookback_days == 0 {
            return Err(CostAnalyticsError::invalid_parameter(
                "lookback_days",
                "must be at least 1",
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SpikeConfig {
        &self.config
    }

    /// Spikes in date order. Days whose trailing average is 0 are skipped.
    pub fn detect<T: DailyTotal>(&self, series: &[T]) -> Vec<CostSpike> {
        let lookback = self.config.lookback_days;
        let values: Vec<f64> = series.iter().map(|p| decimal_to_f64(p.total())).collect();
        let mut spikes = Vec::new();

        for i in lookback..values.len() {
            let historical_average = average(&values[i - lookback..i]);
            let Some(increase_percent) = percent_change(values[i], historical_average) else {
                continue;
            };

            if increase_percent <= self.config.threshold_percent {
                continue;
            }

            let severity = self.classify(increase_percent);
            debug!(
                "Cost spike on {}: {:.1}% over {}-day average ({})",
                series[i].date(),
                increase_percent,
                lookback,
                severity
            );

            spikes.push(CostSpike {
                date: series[i].date(),
                current_cost: series[i].total(),
                historical_average,
                increase_percent,
                severity,
            });
        }

        spikes
    }

    /// Spikes on the last day of the series only
    pub fn detect_latest<T: DailyTotal>(&self, series: &[T]) -> Option<CostSpike> {
        let last = series.last()?.date();
        self.detect(series).into_iter().find(|s| s.date == last)
    }

    fn classify(&self, increase_percent: f64) -> SpikeSeverity {
        if increase_percent > self.config.critical_percent {
            SpikeSeverity::Critical
        } else if increase_percent > self.config.high_percent {
            SpikeSeverity::High
        } else {
            SpikeSeverity::Medium
        }
    }
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self {
            config: SpikeConfig::default(),
        }
    }
}
