use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::anomaly::{CostSpike, SpikeSeverity};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl AlertSeverity {
    /// Severity ladder for a crossed budget threshold, in percent
    pub fn for_budget_threshold(threshold_percent: f64) -> Self {
        if threshold_percent >= 100.0 {
            AlertSeverity::Emergency
        } else if threshold_percent >= 90.0 {
            AlertSeverity::Critical
        } else if threshold_percent >= 80.0 {
            AlertSeverity::Warning
        } else {
            AlertSeverity::Info
        }
    }
}

impl From<SpikeSeverity> for AlertSeverity {
    fn from(severity: SpikeSeverity) -> Self {
        match severity {
            SpikeSeverity::Critical => AlertSeverity::Critical,
            SpikeSeverity::High => AlertSeverity::Warning,
            SpikeSeverity::Medium => AlertSeverity::Info,
        }
    }
}

fn default_alert_thresholds() -> Vec<f64> {
    vec![50.0, 80.0, 100.0]
}

/// Spending limit for the current month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub name: String,
    pub amount: Decimal,
    /// Percent-of-budget levels that raise an alert
    #[serde(default = "default_alert_thresholds")]
    pub alert_thresholds: Vec<f64>,
}

impl Budget {
    pub fn new(id: impl Into<String>, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount,
            alert_thresholds: default_alert_thresholds(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.alert_thresholds = thresholds;
        self
    }
}

/// What an alert is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    BudgetThreshold {
        budget_id: String,
        budget_name: String,
        threshold_percent: f64,
        utilization_percent: f64,
        spend: Decimal,
        amount: Decimal,
    },
    CostSpike {
        spike: CostSpike,
    },
    DailySummary {
        date: NaiveDate,
        total_cost: Decimal,
        savings_potential: Decimal,
        narrative: String,
    },
}

/// Notification raised by the cost monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAlert {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(flatten)]
    pub kind: AlertKind,
}

impl CostAlert {
    pub fn new(
        timestamp: DateTime<Utc>,
        severity: AlertSeverity,
        message: impl Into<String>,
        kind: AlertKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            severity,
            message: message.into(),
            kind,
        }
    }
}
