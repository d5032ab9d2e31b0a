//! Cost data boundary of the monitor
//!
//! Persistence lives outside this crate. The monitor only sees the
//! [`CostDataSource`] trait; [`SnapshotSource`] serves a JSON snapshot from
//! memory and is what the daemon uses.

use crate::aggregation::{aggregate_daily, aggregate_services, CostRecord};
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::{Budget, DailyCost, Resource, ServiceCostSeries};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Read access to cost history, inventory and budgets
#[async_trait]
pub trait CostDataSource: Send + Sync {
    /// The most recent `days` daily totals, ascending by date
    async fn daily_costs(&self, days: usize) -> CostAnalyticsResult<Vec<DailyCost>>;

    /// Per-service histories trimmed to the most recent `days` days
    async fn service_costs(&self, days: usize) -> CostAnalyticsResult<Vec<ServiceCostSeries>>;

    async fn resources(&self) -> CostAnalyticsResult<Vec<Resource>>;

    async fn budgets(&self) -> CostAnalyticsResult<Vec<Budget>>;

    /// Spend from the first of `today`'s month through `today`
    async fn month_to_date_spend(&self, today: NaiveDate) -> CostAnalyticsResult<Decimal>;
}

/// Everything the monitor needs, in one JSON document
///
/// Daily totals and service series may be given directly or derived from
/// raw billing `records`; explicit values win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSnapshot {
    pub records: Vec<CostRecord>,
    pub daily_costs: Vec<DailyCost>,
    pub services: Vec<ServiceCostSeries>,
    pub resources: Vec<Resource>,
    pub budgets: Vec<Budget>,
}

impl CostSnapshot {
    /// Fills in daily totals and service series from `records` where missing
    ///
    /// Values read from JSON go through the model constructors, so amounts
    /// are clamped at zero and derived totals are recomputed.
    pub fn normalized(mut self) -> Self {
        if self.daily_costs.is_empty() {
            self.daily_costs = aggregate_daily(&self.records);
        } else {
            self.daily_costs = self
                .daily_costs
                .into_iter()
                .map(|d| {
                    if d.provider_breakdown.is_empty() {
                        DailyCost::new(d.date, d.total)
                    } else {
                        DailyCost::from_breakdown(d.date, d.provider_breakdown)
                    }
                })
                .collect();
            self.daily_costs.sort_by_key(|d| d.date);
        }
        if self.services.is_empty() {
            self.services = aggregate_services(&self.records);
        } else {
            self.services = self
                .services
                .into_iter()
                .map(|s| ServiceCostSeries::new(s.service_name, s.cloud_provider, s.data_points))
                .collect();
        }
        for resource in &mut self.resources {
            resource.monthly_cost = resource.monthly_cost.max(Decimal::ZERO);
        }
        self
    }
}

/// In-memory [`CostDataSource`] over a [`CostSnapshot`]
#[derive(Debug, Default)]
pub struct SnapshotSource {
    snapshot: RwLock<CostSnapshot>,
}

impl SnapshotSource {
    pub fn new(snapshot: CostSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot.normalized()),
        }
    }

    /// Loads a snapshot from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> CostAnalyticsResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            CostAnalyticsError::DataSource {
                message: format!("cannot read {}: {e}", path.display()),
            }
        })?;
        let snapshot: CostSnapshot = serde_json::from_str(&raw)?;

        info!(
            "Loaded cost snapshot from {}: {} records, {} resources, {} budgets",
            path.display(),
            snapshot.records.len(),
            snapshot.resources.len(),
            snapshot.budgets.len()
        );

        Ok(Self::new(snapshot))
    }

    /// Swaps in fresh data; later reads see the new snapshot
    pub fn replace(&self, snapshot: CostSnapshot) {
        *self.snapshot.write() = snapshot.normalized();
    }
}

#[async_trait]
impl CostDataSource for SnapshotSource {
    async fn daily_costs(&self, days: usize) -> CostAnalyticsResult<Vec<DailyCost>> {
        let snapshot = self.snapshot.read();
        let daily = &snapshot.daily_costs;
        Ok(daily[daily.len().saturating_sub(days)..].to_vec())
    }

    async fn service_costs(&self, days: usize) -> CostAnalyticsResult<Vec<ServiceCostSeries>> {
        let snapshot = self.snapshot.read();
        let Some(cutoff) = snapshot
            .daily_costs
            .len()
            .checked_sub(days)
            .and_then(|i| snapshot.daily_costs.get(i))
            .map(|d| d.date)
        else {
            return Ok(snapshot.services.clone());
        };

        Ok(snapshot
            .services
            .iter()
            .map(|s| {
                let points = s
                    .data_points
                    .iter()
                    .filter(|p| p.date >= cutoff)
                    .copied()
                    .collect();
                ServiceCostSeries::new(s.service_name.clone(), s.cloud_provider, points)
            })
            .collect())
    }

    async fn resources(&self) -> CostAnalyticsResult<Vec<Resource>> {
        Ok(self.snapshot.read().resources.clone())
    }

    async fn budgets(&self) -> CostAnalyticsResult<Vec<Budget>> {
        Ok(self.snapshot.read().budgets.clone())
    }

    async fn month_to_date_spend(&self, today: NaiveDate) -> CostAnalyticsResult<Decimal> {
        let snapshot = self.snapshot.read();
        Ok(snapshot
            .daily_costs
            .iter()
            .filter(|d| d.date <= today)
            .filter(|d| d.date.year() == today.year() && d.date.month() == today.month())
            .map(|d| d.total)
            .sum())
    }
}
