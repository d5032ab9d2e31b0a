//! Analytics configuration
//!
//! Defaults carry every threshold the analyzers use. A config can be loaded
//! from a JSON file, and `COST_ANALYTICS_*` environment variables override
//! individual values on top of it.

use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::ForecastMethod;
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Anomaly detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Trailing days used for mean and sigma
    pub period_days: usize,
    /// Sigma multiplier for "error" anomalies
    pub error_sigma: f64,
    /// Sigma multiplier for warnings
    pub warning_sigma: f64,
    /// Health score points lost per anomaly
    pub anomaly_penalty: u32,
    /// Health score points lost per warning
    pub warning_penalty: u32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            period_days: 30,
            error_sigma: 2.0,
            warning_sigma: 1.5,
            anomaly_penalty: 15,
            warning_penalty: 5,
        }
    }
}

/// Cost spike detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeConfig {
    pub lookback_days: usize,
    /// Minimum increase over the trailing average, in percent
    pub threshold_percent: f64,
    pub high_percent: f64,
    pub critical_percent: f64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            threshold_percent: 50.0,
            high_percent: 75.0,
            critical_percent: 100.0,
        }
    }
}

/// Trend analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub min_data_points: usize,
    /// Slope band, as a fraction of the mean daily cost, classified as stable
    pub stable_band: f64,
    pub days_per_month: u32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_data_points: 7,
            stable_band: 0.01,
            days_per_month: 30,
        }
    }
}

/// Forecaster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub method: ForecastMethod,
    pub horizon_days: usize,
    /// Trailing days fitted by linear regression
    pub window_days: usize,
    /// Size of each of the two windows compared by the damped trend
    pub recent_window: usize,
    pub damping: f64,
    /// Relative half-width of the damped-trend confidence band
    pub band: f64,
    pub min_confidence: f64,
    pub confidence_decay: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            method: ForecastMethod::DampedTrend,
            horizon_days: 30,
            window_days: 30,
            recent_window: 7,
            damping: 0.5,
            band: 0.10,
            min_confidence: 0.7,
            confidence_decay: 0.05,
        }
    }
}

/// Thresholds and savings ratios of the recommendation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub rightsizing_max_utilization: f64,
    pub rightsizing_high_priority_cpu: f64,
    pub rightsizing_savings_ratio: Decimal,
    pub idle_max_utilization: f64,
    pub reserved_min_total: Decimal,
    pub reserved_min_data_points: usize,
    pub reserved_max_variation: f64,
    pub reserved_savings_ratio: Decimal,
    /// Fraction of total spend above which a service is flagged
    pub high_spend_share: f64,
    pub high_spend_savings_ratio: Decimal,
    pub growth_window_days: usize,
    pub growth_threshold_percent: f64,
    pub growth_savings_ratio: Decimal,
    pub storage_min_total: Decimal,
    pub storage_savings_ratio: Decimal,
    /// Lowercase name fragments that mark a service as storage
    pub storage_keywords: Vec<String>,
    pub ha_max_location_share: f64,
    pub ha_min_resources: usize,
    pub spot_max_cpu: f64,
    pub spot_min_candidates: usize,
    pub spot_savings_ratio: Decimal,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            rightsizing_max_utilization: 30.0,
            rightsizing_high_priority_cpu: 10.0,
            rightsizing_savings_ratio: Decimal::new(4, 1),
            idle_max_utilization: 5.0,
            reserved_min_total: Decimal::from(100),
            reserved_min_data_points: 30,
            reserved_max_variation: 0.3,
            reserved_savings_ratio: Decimal::new(3, 1),
            high_spend_share: 0.30,
            high_spend_savings_ratio: Decimal::new(15, 2),
            growth_window_days: 7,
            growth_threshold_percent: 20.0,
            growth_savings_ratio: Decimal::new(10, 2),
            storage_min_total: Decimal::from(100),
            storage_savings_ratio: Decimal::new(4, 1),
            storage_keywords: ["storage", "s3", "blob", "ebs", "disk", "bucket"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ha_max_location_share: 0.8,
            ha_min_resources: 5,
            spot_max_cpu: 60.0,
            spot_min_candidates: 3,
            spot_savings_ratio: Decimal::new(6, 1),
        }
    }
}

/// Recurring monitor jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_secs: u64,
    pub budget_check_interval_secs: u64,
    pub spike_check_interval_secs: u64,
    /// UTC wall-clock time of the daily summary
    pub daily_summary_at: NaiveTime,
    /// Minimum gap between two alerts with the same key
    pub alert_cooldown_secs: u64,
    /// Days of history the monitor requests from the data source
    pub history_days: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            budget_check_interval_secs: 3600,
            spike_check_interval_secs: 1800,
            daily_summary_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            alert_cooldown_secs: 86_400,
            history_days: 60,
        }
    }
}

impl SchedulerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn budget_check_interval(&self) -> Duration {
        Duration::from_secs(self.budget_check_interval_secs)
    }

    pub fn spike_check_interval(&self) -> Duration {
        Duration::from_secs(self.spike_check_interval_secs)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub anomaly: AnomalyConfig,
    pub spike: SpikeConfig,
    pub trend: TrendConfig,
    pub forecast: ForecastConfig,
    pub moving_average_window: usize,
    pub recommendations: RecommendationConfig,
    pub scheduler: SchedulerConfig,
    /// JSON cost snapshot read by the daemon
    pub data_path: PathBuf,
    /// Alerts are also appended here as JSON lines when set
    pub alert_log_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            anomaly: AnomalyConfig::default(),
            spike: SpikeConfig::default(),
            trend: TrendConfig::default(),
            forecast: ForecastConfig::default(),
            moving_average_window: 7,
            recommendations: RecommendationConfig::default(),
            scheduler: SchedulerConfig::default(),
            data_path: PathBuf::from("cost-snapshot.json"),
            alert_log_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl AnalyticsConfig {
    /// Reads a JSON config file; missing fields take their defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> CostAnalyticsResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `COST_ANALYTICS_*` overrides from the process environment
    pub fn from_env() -> CostAnalyticsResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CostAnalyticsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("COST_ANALYTICS_DATA_PATH") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("COST_ANALYTICS_ALERT_LOG") {
            self.alert_log_path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup("COST_ANALYTICS_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_ANOMALY_PERIOD_DAYS")? {
            self.anomaly.period_days = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_ERROR_SIGMA")? {
            self.anomaly.error_sigma = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_WARNING_SIGMA")? {
            self.anomaly.warning_sigma = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_SPIKE_LOOKBACK_DAYS")? {
            self.spike.lookback_days = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_SPIKE_THRESHOLD_PERCENT")? {
            self.spike.threshold_percent = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_MOVING_AVERAGE_WINDOW")? {
            self.moving_average_window = v;
        }
        if let Some(method) = lookup("COST_ANALYTICS_FORECAST_METHOD") {
            self.forecast.method = parse_forecast_method(&method)?;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_FORECAST_HORIZON_DAYS")? {
            self.forecast.horizon_days = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_BUDGET_CHECK_SECS")? {
            self.scheduler.budget_check_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_SPIKE_CHECK_SECS")? {
            self.scheduler.spike_check_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "COST_ANALYTICS_ALERT_COOLDOWN_SECS")? {
            self.scheduler.alert_cooldown_secs = v;
        }
        if let Some(at) = lookup("COST_ANALYTICS_DAILY_SUMMARY_AT") {
            self.scheduler.daily_summary_at = NaiveTime::parse_from_str(&at, "%H:%M")
                .map_err(|e| {
                    CostAnalyticsError::configuration(format!(
                        "COST_ANALYTICS_DAILY_SUMMARY_AT={at}: {e}"
                    ))
                })?;
        }
        Ok(())
    }

    /// Rejects values the analyzers cannot work with
    pub fn validate(&self) -> CostAnalyticsResult<()> {
        let fail = |msg: &str| -> CostAnalyticsResult<()> {
            Err(CostAnalyticsError::configuration(msg))
        };

        let r = &self.recommendations;
        let floats = [
            ("anomaly.error_sigma", self.anomaly.error_sigma),
            ("anomaly.warning_sigma", self.anomaly.warning_sigma),
            ("spike.threshold_percent", self.spike.threshold_percent),
            ("spike.high_percent", self.spike.high_percent),
            ("spike.critical_percent", self.spike.critical_percent),
            ("trend.stable_band", self.trend.stable_band),
            ("forecast.damping", self.forecast.damping),
            ("forecast.band", self.forecast.band),
            ("forecast.min_confidence", self.forecast.min_confidence),
            ("forecast.confidence_decay", self.forecast.confidence_decay),
            ("recommendations.rightsizing_max_utilization", r.rightsizing_max_utilization),
            ("recommendations.rightsizing_high_priority_cpu", r.rightsizing_high_priority_cpu),
            ("recommendations.idle_max_utilization", r.idle_max_utilization),
            ("recommendations.reserved_max_variation", r.reserved_max_variation),
            ("recommendations.high_spend_share", r.high_spend_share),
            ("recommendations.growth_threshold_percent", r.growth_threshold_percent),
            ("recommendations.ha_max_location_share", r.ha_max_location_share),
            ("recommendations.spot_max_cpu", r.spot_max_cpu),
        ];
        if let Some((name, _)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return fail(&format!("{name} must be a finite number"));
        }

        if self.anomaly.period_days == 0 {
            return fail("anomaly.period_days must be at least 1");
        }
        if self.anomaly.error_sigma <= 0.0 || self.anomaly.warning_sigma <= 0.0 {
            return fail("anomaly sigma multipliers must be positive");
        }
        if self.anomaly.warning_sigma > self.anomaly.error_sigma {
            return fail("anomaly.warning_sigma must not exceed anomaly.error_sigma");
        }
        if self.spike.lookback_days == 0 {
            return fail("spike.lookback_days must be at least 1");
        }
        if !(self.spike.threshold_percent <= self.spike.high_percent
            && self.spike.high_percent <= self.spike.critical_percent)
        {
            return fail("spike bands must satisfy threshold <= high <= critical");
        }
        if self.trend.min_data_points < 2 {
            return fail("trend.min_data_points must be at least 2");
        }
        if self.moving_average_window == 0 {
            return fail("moving_average_window must be at least 1");
        }
        if self.forecast.recent_window == 0 || self.forecast.window_days < 2 {
            return fail("forecast windows are too small");
        }
        if !(0.0..=1.0).contains(&self.forecast.damping)
            || !(0.0..=1.0).contains(&self.forecast.min_confidence)
        {
            return fail("forecast damping and min_confidence must be within 0..=1");
        }
        if self.forecast.band < 0.0 || self.forecast.confidence_decay < 0.0 {
            return fail("forecast band and confidence_decay must not be negative");
        }
        if self.trend.stable_band < 0.0 {
            return fail("trend.stable_band must not be negative");
        }
        self.validate_recommendations()?;
        if self.scheduler.tick_secs == 0
            || self.scheduler.budget_check_interval_secs == 0
            || self.scheduler.spike_check_interval_secs == 0
        {
            return fail("scheduler intervals must be positive");
        }
        Ok(())
    }

    fn validate_recommendations(&self) -> CostAnalyticsResult<()> {
        let r = &self.recommendations;
        let fail = |msg: &str| -> CostAnalyticsResult<()> {
            Err(CostAnalyticsError::configuration(msg))
        };

        let limits = [
            r.rightsizing_max_utilization,
            r.rightsizing_high_priority_cpu,
            r.idle_max_utilization,
            r.reserved_max_variation,
            r.growth_threshold_percent,
            r.spot_max_cpu,
        ];
        if limits.iter().any(|v| *v < 0.0) {
            return fail("recommendation utilization and growth limits must not be negative");
        }
        if !(0.0..=1.0).contains(&r.high_spend_share)
            || !(0.0..=1.0).contains(&r.ha_max_location_share)
        {
            return fail("recommendation shares must be within 0..=1");
        }

        let ratios = [
            r.rightsizing_savings_ratio,
            r.reserved_savings_ratio,
            r.high_spend_savings_ratio,
            r.growth_savings_ratio,
            r.storage_savings_ratio,
            r.spot_savings_ratio,
        ];
        if ratios.iter().any(|v| *v < Decimal::ZERO || *v > Decimal::ONE) {
            return fail("recommendation savings ratios must be within 0..=1");
        }
        if r.reserved_min_total < Decimal::ZERO || r.storage_min_total < Decimal::ZERO {
            return fail("recommendation minimum totals must not be negative");
        }
        if r.growth_window_days == 0 {
            return fail("recommendations.growth_window_days must be at least 1");
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> CostAnalyticsResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CostAnalyticsError::configuration(format!("{key}={raw}: {e}"))),
    }
}

fn parse_forecast_method(raw: &str) -> CostAnalyticsResult<ForecastMethod> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "damped_trend" | "damped" => Ok(ForecastMethod::DampedTrend),
        "linear_regression" | "linear" => Ok(ForecastMethod::LinearRegression),
        other => Err(CostAnalyticsError::configuration(format!(
            "unknown forecast method: {other}"
        ))),
    }
}
