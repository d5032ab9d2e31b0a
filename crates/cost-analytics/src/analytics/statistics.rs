//! Statistical primitives shared by the analyzers
//!
//! Everything here is a pure function over in-memory slices. Ratios are
//! guarded so that callers never see NaN or infinity.

use crate::models::DailyTotal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statistical::{mean, population_standard_deviation};

/// Relative tolerance below which a spread is treated as zero
const NEGLIGIBLE_SPREAD: f64 = 1e-9;

/// Summary of a numeric series
///
/// An empty input yields the all-zero value with `count == 0`; callers must
/// read that as "insufficient data", not as a real distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub variance: f64,
    pub standard_deviation: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl SeriesStats {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Standard deviation divided by mean, 0 when the mean is 0
    pub fn coefficient_of_variation(&self) -> f64 {
        safe_ratio(self.standard_deviation, self.mean)
    }
}

/// Mean, population standard deviation, min and max of `values`
pub fn summarize(values: &[f64]) -> SeriesStats {
    if values.is_empty() {
        return SeriesStats::default();
    }

    let avg = mean(values);
    let mut std_dev = population_standard_deviation(values, Some(avg));
    if !std_dev.is_finite() || std_dev <= NEGLIGIBLE_SPREAD * avg.abs().max(1.0) {
        std_dev = 0.0;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    SeriesStats {
        mean: avg,
        variance: std_dev * std_dev,
        standard_deviation: std_dev,
        min,
        max,
        count: values.len(),
    }
}

/// Arithmetic mean, 0 for an empty slice
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        mean(values)
    }
}

/// `numerator / denominator`, or 0 when the quotient is not finite
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Percent change from `baseline` to `current`; `None` when the baseline is 0
pub fn percent_change(current: f64, baseline: f64) -> Option<f64> {
    if baseline == 0.0 {
        return None;
    }
    let change = (current - baseline) / baseline * 100.0;
    change.is_finite().then_some(change)
}

pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Converts a computed amount back to money, rounded to cents.
/// Negative and non-finite amounts become zero.
pub fn to_money(value: f64) -> Decimal {
    if !value.is_finite() || value <= 0.0 {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::ZERO)
}

/// Daily totals of a series as `f64`
pub fn totals<T: DailyTotal>(series: &[T]) -> Vec<f64> {
    series.iter().map(|p| decimal_to_f64(p.total())).collect()
}

/// Ordinary least-squares fit of `values` against x = 1..=n
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Population standard deviation of the residuals
    pub residual_std: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Least-squares line through `(i + 1, values[i])`; `None` with fewer than two points
pub fn linear_regression(values: &[f64]) -> Option<LinearFit> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for (i, &y) in values.iter().enumerate() {
        let x = (i + 1) as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let y_mean = sum_y / n;
    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let predicted = intercept + slope * (i + 1) as f64;
        ss_tot += (y - y_mean).powi(2);
        ss_res += (y - predicted).powi(2);
    }

    // A flat series has nothing to explain.
    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
        residual_std: (ss_res / n).sqrt(),
    })
}
