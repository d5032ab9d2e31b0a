//! Trailing moving average over a daily cost series

use super::statistics::{average, decimal_to_f64, safe_ratio};
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::DailyTotal;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW: usize = 7;

/// One input day with its trailing average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAveragePoint {
    pub date: NaiveDate,
    pub actual: Decimal,
    pub moving_average: f64,
    pub deviation: f64,
    /// 0 when the moving average is 0
    pub deviation_percent: f64,
}

/// Produces one point per input day.
///
/// The average for day `i` covers `[max(0, i - window + 1), i]`, so the first
/// `window - 1` days average over whatever history exists.
pub fn moving_average<T: DailyTotal>(
    series: &[T],
    window: usize,
) -> CostAnalyticsResult<Vec<MovingAveragePoint>> {
    if window == 0 {
        return Err(CostAnalyticsError::invalid_parameter(
            "window",
            "moving average window must be at least 1",
        ));
    }

    let values: Vec<f64> = series.iter().map(|p| decimal_to_f64(p.total())).collect();

    let points = series
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let start = (i + 1).saturating_sub(window);
            let moving_average = average(&values[start..=i]);
            let deviation = values[i] - moving_average;

            MovingAveragePoint {
                date: point.date(),
                actual: point.total(),
                moving_average,
                deviation,
                deviation_percent: safe_ratio(deviation, moving_average) * 100.0,
            }
        })
        .collect();

    Ok(points)
}
