use super::statistics::{average, linear_regression, percent_change, safe_ratio, totals};
use crate::config::TrendConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::{DailyTotal, TrendAnalysis, TrendDirection};
use rust_decimal::Decimal;

/// Least-squares trend classification over daily totals
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl TrendAnalyzer {
    pub fn new(config: TrendConfig) -> CostAnalyticsResult<Self> {
        if config.min_data_points < 2 {
            return Err(CostAnalyticsError::invalid_parameter(
                "min_data_points",
                "a trend needs at least 2 points",
            ));
        }
        Ok(Self { config })
    }

    /// Calculate trend from a daily cost series
    ///
    /// Returns the `InsufficientData` sentinel when the series is shorter
    /// than `min_data_points`.
    pub fn analyze<T: DailyTotal>(&self, series: &[T]) -> TrendAnalysis {
        if series.len() < self.config.min_data_points {
            return TrendAnalysis::insufficient_data(series.len());
        }

        let values = totals(series);
        let Some(fit) = linear_regression(&values) else {
            return TrendAnalysis::insufficient_data(series.len());
        };

        let mean = average(&values);
        let band = self.config.stable_band * mean.abs();
        let direction = if fit.slope > band {
            TrendDirection::Increasing
        } else if fit.slope < -band {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        let total: Decimal = series.iter().map(|p| p.total()).sum();
        let average_daily = total / Decimal::from(series.len());
        let projected_monthly = average_daily * Decimal::from(self.config.days_per_month);

        let first = values[0];
        let last = values[values.len() - 1];
        let growth_rate = percent_change(last, first).unwrap_or(0.0);

        TrendAnalysis {
            direction,
            slope: fit.slope,
            intercept: fit.intercept,
            average_daily: average_daily.round_dp(2),
            projected_monthly: projected_monthly.round_dp(2),
            growth_rate,
            trend_percent: safe_ratio(fit.slope, mean) * 100.0,
            confidence: 0.0,
            data_points: series.len(),
        }
        .with_confidence(fit.r_squared)
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self {
            config: TrendConfig::default(),
        }
    }
}
