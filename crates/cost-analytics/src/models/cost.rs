use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Cloud provider a cost line is billed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
    Other,
}

impl Default for CloudProvider {
    fn default() -> Self {
        CloudProvider::Other
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "AWS"),
            CloudProvider::Azure => write!(f, "Azure"),
            CloudProvider::Gcp => write!(f, "GCP"),
            CloudProvider::Other => write!(f, "Other"),
        }
    }
}

/// Anything that carries one cost figure for one calendar day
pub trait DailyTotal {
    fn date(&self) -> NaiveDate;
    fn total(&self) -> Decimal;
}

/// Total spend for a single calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCost {
    pub date: NaiveDate,
    pub total: Decimal,
    #[serde(default)]
    pub provider_breakdown: BTreeMap<CloudProvider, Decimal>,
}

impl DailyCost {
    /// Negative totals are clamped to zero.
    pub fn new(date: NaiveDate, total: Decimal) -> Self {
        Self {
            date,
            total: total.max(Decimal::ZERO),
            provider_breakdown: BTreeMap::new(),
        }
    }

    /// Builds a day from its per-provider amounts; the total is their sum.
    pub fn from_breakdown(date: NaiveDate, breakdown: BTreeMap<CloudProvider, Decimal>) -> Self {
        let provider_breakdown: BTreeMap<CloudProvider, Decimal> = breakdown
            .into_iter()
            .map(|(provider, amount)| (provider, amount.max(Decimal::ZERO)))
            .collect();
        let total = provider_breakdown.values().copied().sum();

        Self {
            date,
            total,
            provider_breakdown,
        }
    }

    pub fn provider_cost(&self, provider: CloudProvider) -> Decimal {
        self.provider_breakdown
            .get(&provider)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl DailyTotal for DailyCost {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn total(&self) -> Decimal {
        self.total
    }
}

/// One day of spend for a single service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceCostPoint {
    pub date: NaiveDate,
    pub cost: Decimal,
}

impl DailyTotal for ServiceCostPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn total(&self) -> Decimal {
        self.cost
    }
}

/// Daily spend history of one service on one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCostSeries {
    pub service_name: String,
    pub cloud_provider: CloudProvider,
    pub data_points: Vec<ServiceCostPoint>,
    pub total: Decimal,
}

impl ServiceCostSeries {
    /// Points are sorted by date and `total` is derived from them.
    pub fn new(
        service_name: impl Into<String>,
        cloud_provider: CloudProvider,
        mut data_points: Vec<ServiceCostPoint>,
    ) -> Self {
        for point in &mut data_points {
            point.cost = point.cost.max(Decimal::ZERO);
        }
        data_points.sort_by_key(|p| p.date);
        let total = data_points.iter().map(|p| p.cost).sum();

        Self {
            service_name: service_name.into(),
            cloud_provider,
            data_points,
            total,
        }
    }

    pub fn costs(&self) -> Vec<Decimal> {
        self.data_points.iter().map(|p| p.cost).collect()
    }
}
