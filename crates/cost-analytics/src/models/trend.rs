use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trend direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    /// Too few points to fit a trend; the other fields are zeroed
    InsufficientData,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

/// Trend analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub slope: f64, // cost change per day
    pub intercept: f64,
    pub average_daily: Decimal,
    pub projected_monthly: Decimal,
    pub growth_rate: f64,   // first to last day, percent
    pub trend_percent: f64, // slope as a percent of the daily average
    pub confidence: f64,    // r-squared, 0.0 to 1.0
    pub data_points: usize,
}

impl TrendAnalysis {
    /// Sentinel for series shorter than the minimum
    pub fn insufficient_data(data_points: usize) -> Self {
        Self {
            direction: TrendDirection::InsufficientData,
            slope: 0.0,
            intercept: 0.0,
            average_daily: Decimal::ZERO,
            projected_monthly: Decimal::ZERO,
            growth_rate: 0.0,
            trend_percent: 0.0,
            confidence: 0.0,
            data_points,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.direction == TrendDirection::InsufficientData
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Forecasting strategy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Recent-window average with a dampened week-over-week trend
    #[default]
    DampedTrend,
    /// Least-squares extrapolation over the trailing window
    LinearRegression,
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastMethod::DampedTrend => write!(f, "damped_trend"),
            ForecastMethod::LinearRegression => write!(f, "linear_regression"),
        }
    }
}

/// Forecast point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: Decimal,
    pub lower_bound: Decimal,
    pub upper_bound: Decimal,
    pub confidence: f64, // 0.0 to 1.0
}

impl ForecastPoint {
    pub fn new(
        date: NaiveDate,
        predicted: Decimal,
        lower_bound: Decimal,
        upper_bound: Decimal,
        confidence: f64,
    ) -> Self {
        Self {
            date,
            predicted,
            lower_bound: lower_bound.max(Decimal::ZERO),
            upper_bound: upper_bound.max(predicted),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Cost forecast result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostForecast {
    pub method: ForecastMethod,
    pub based_on_days: usize,
    pub sufficient_data: bool,
    pub points: Vec<ForecastPoint>,
    pub total_predicted: Decimal,
    pub avg_confidence: f64,
}

impl CostForecast {
    pub fn new(method: ForecastMethod, based_on_days: usize, points: Vec<ForecastPoint>) -> Self {
        let avg_confidence = if points.is_empty() {
            0.0
        } else {
            points.iter().map(|p| p.confidence).sum::<f64>() / points.len() as f64
        };
        let total_predicted = points.iter().map(|p| p.predicted).sum();

        Self {
            method,
            based_on_days,
            sufficient_data: true,
            points,
            total_predicted,
            avg_confidence,
        }
    }

    /// Sentinel for series too short for `method`
    pub fn insufficient_data(method: ForecastMethod, based_on_days: usize) -> Self {
        Self {
            method,
            based_on_days,
            sufficient_data: false,
            points: Vec::new(),
            total_predicted: Decimal::ZERO,
            avg_confidence: 0.0,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        !self.sufficient_data
    }
}
