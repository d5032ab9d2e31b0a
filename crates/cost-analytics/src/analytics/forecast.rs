//! Short-horizon cost forecasting
//!
//! Two strategies are available:
//!
//! * [`ForecastMethod::DampedTrend`] projects the average of the most recent
//!   window forward, adjusted by half of the change against the window
//!   before it, with a fixed relative band.
//! * [`ForecastMethod::LinearRegression`] extrapolates an OLS line fitted over
//!   the trailing window, with a band of 1.96 residual standard deviations.
//!
//! Both share the confidence schedule `max(min_confidence, 1 - i * decay)`
//! for future day `i`, so confidence never increases with the horizon.

use super::statistics::{average, linear_regression, percent_change, to_money, totals};
use crate::config::ForecastConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::{CostForecast, DailyTotal, ForecastMethod, ForecastPoint};
use chrono::{Duration, NaiveDate};
use tracing::debug;

/// Points needed before a regression line is worth extrapolating
const MIN_REGRESSION_POINTS: usize = 3;

/// z-value of the two-sided 95% band around regression forecasts
const REGRESSION_BAND_Z: f64 = 1.96;

#[derive(Debug, Clone)]
pub struct CostForecaster {
    config: ForecastConfig,
}

impl CostForecaster {
    pub fn new(config: ForecastConfig) -> CostAnalyticsResult<Self> {
        if config.recent_window == 0 {
            return Err(CostAnalyticsError::invalid_parameter(
                "recent_window",
                "must be at least 1",
            ));
        }
        if config.window_days < 2 {
            return Err(CostAnalyticsError::invalid_parameter(
                "window_days",
                "must be at least 2",
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast with the configured method and horizon
    pub fn forecast<T: DailyTotal>(&self, historical: &[T]) -> CostForecast {
        self.forecast_with(historical, self.config.method, self.config.horizon_days)
    }

    /// Forecast `days_ahead` days past the last date of `historical`
    pub fn forecast_with<T: DailyTotal>(
        &self,
        historical: &[T],
        method: ForecastMethod,
        days_ahead: usize,
    ) -> CostForecast {
        let forecast = match method {
            ForecastMethod::DampedTrend => self.damped_trend(historical, days_ahead),
            ForecastMethod::LinearRegression => self.linear(historical, days_ahead),
        };

        debug!(
            "{} forecast over {} days: {} points, total {}",
            method,
            historical.len(),
            forecast.points.len(),
            forecast.total_predicted
        );

        forecast
    }

    fn damped_trend<T: DailyTotal>(&self, historical: &[T], days_ahead: usize) -> CostForecast {
        let method = ForecastMethod::DampedTrend;
        let window = self.config.recent_window;
        let Some(last_date) = last_date(historical) else {
            return CostForecast::insufficient_data(method, 0);
        };
        if historical.len() < window {
            return CostForecast::insufficient_data(method, historical.len());
        }

        let values = totals(historical);
        let n = values.len();
        let recent_avg = average(&values[n - window..]);

        // Without a full older window there is nothing to compare against.
        let trend = if n >= 2 * window {
            let older_avg = average(&values[n - 2 * window..n - window]);
            percent_change(recent_avg, older_avg).unwrap_or(0.0) / 100.0
        } else {
            0.0
        };
        let damped = trend * self.config.damping;

        let points = (1..=days_ahead)
            .map(|day| {
                let progress = day as f64 / days_ahead as f64;
                let predicted = (recent_avg * (1.0 + damped * progress)).max(0.0);
                let width = predicted * self.config.band;

                ForecastPoint::new(
                    last_date + Duration::days(day as i64),
                    to_money(predicted),
                    to_money(predicted - width),
                    to_money(predicted + width),
                    self.confidence_at(day),
                )
            })
            .collect();

        CostForecast::new(method, n, points)
    }

    fn linear<T: DailyTotal>(&self, historical: &[T], days_ahead: usize) -> CostForecast {
        let method = ForecastMethod::LinearRegression;
        let Some(last_date) = last_date(historical) else {
            return CostForecast::insufficient_data(method, 0);
        };

        let window = &historical[historical.len().saturating_sub(self.config.window_days)..];
        if window.len() < MIN_REGRESSION_POINTS {
            return CostForecast::insufficient_data(method, window.len());
        }

        let Some(fit) = linear_regression(&totals(window)) else {
            return CostForecast::insufficient_data(method, window.len());
        };

        let n = window.len();
        let width = REGRESSION_BAND_Z * fit.residual_std;

        let points = (1..=days_ahead)
            .map(|day| {
                let predicted = fit.predict((n + day) as f64).max(0.0);

                ForecastPoint::new(
                    last_date + Duration::days(day as i64),
                    to_money(predicted),
                    to_money(predicted - width),
                    to_money(predicted + width),
                    self.confidence_at(day),
                )
            })
            .collect();

        CostForecast::new(method, n, points)
    }

    fn confidence_at(&self, day: usize) -> f64 {
        let decayed = 1.0 - day as f64 * self.config.confidence_decay;
        decayed.max(self.config.min_confidence).clamp(0.0, 1.0)
    }
}

impl Default for CostForecaster {
    fn default() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }
}

fn last_date<T: DailyTotal>(historical: &[T]) -> Option<NaiveDate> {
    historical.last().map(|p| p.date())
}
