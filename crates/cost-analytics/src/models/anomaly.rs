use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analytics::statistics::SeriesStats;

/// How far above the expected cost a day landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    /// Above mean + warning sigma
    Warning,
    /// Above mean + error sigma
    Error,
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySeverity::Warning => write!(f, "warning"),
            AnomalySeverity::Error => write!(f, "error"),
        }
    }
}

/// A flagged day; recomputed on every analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub date: NaiveDate,
    pub actual_cost: Decimal,
    pub expected_cost: f64,
    pub threshold: f64,
    /// 0 when the period has no spread
    pub z_score: f64,
    pub deviation_percent: f64,
    pub severity: AnomalySeverity,
}

/// Output of one anomaly detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub period_days: usize,
    pub statistics: SeriesStats,
    pub error_threshold: f64,
    pub warning_threshold: f64,
    pub anomalies: Vec<AnomalyRecord>,
    pub warnings: Vec<AnomalyRecord>,
    /// Weighted penalty heuristic in 0..=100, not a calibrated metric
    pub health_score: u32,
}

impl AnomalyReport {
    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Anomalies and warnings together, ordered by date
    pub fn flagged_days(&self) -> Vec<&AnomalyRecord> {
        let mut all: Vec<&AnomalyRecord> =
            self.anomalies.iter().chain(self.warnings.iter()).collect();
        all.sort_by_key(|r| r.date);
        all
    }
}

/// Spike band relative to the trailing average
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeSeverity {
    Medium,
    High,
    Critical,
}

impl fmt::Display for SpikeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpikeSeverity::Medium => write!(f, "medium"),
            SpikeSeverity::High => write!(f, "high"),
            SpikeSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// A day whose cost jumped above its trailing average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSpike {
    pub date: NaiveDate,
    pub current_cost: Decimal,
    pub historical_average: f64,
    pub increase_percent: f64,
    pub severity: SpikeSeverity,
}
