//! Roll-up of raw billing lines into the series the analyzers consume

use crate::models::{CloudProvider, DailyCost, ServiceCostPoint, ServiceCostSeries};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One billing line: a service's charge on one provider for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub provider: CloudProvider,
    pub service_name: String,
    pub cost: Decimal,
}

impl CostRecord {
    pub fn new(
        date: NaiveDate,
        provider: CloudProvider,
        service_name: impl Into<String>,
        cost: Decimal,
    ) -> Self {
        Self {
            date,
            provider,
            service_name: service_name.into(),
            cost,
        }
    }
}

/// Daily totals in ascending date order
///
/// Days between the first and last record with no billing lines are
/// emitted as zero-cost days so that the series has no calendar gaps.
pub fn aggregate_daily(records: &[CostRecord]) -> Vec<DailyCost> {
    let mut by_day: BTreeMap<NaiveDate, BTreeMap<CloudProvider, Decimal>> = BTreeMap::new();
    for record in records {
        *by_day
            .entry(record.date)
            .or_default()
            .entry(record.provider)
            .or_default() += record.cost.max(Decimal::ZERO);
    }

    let (Some(&first), Some(&last)) = (by_day.keys().next(), by_day.keys().next_back()) else {
        return Vec::new();
    };

    let mut daily = Vec::new();
    let mut date = first;
    while date <= last {
        let breakdown = by_day.remove(&date).unwrap_or_default();
        daily.push(DailyCost::from_breakdown(date, breakdown));
        date += Duration::days(1);
    }
    daily
}

/// One series per (service, provider), ordered by service name then provider
pub fn aggregate_services(records: &[CostRecord]) -> Vec<ServiceCostSeries> {
    let mut grouped: BTreeMap<(&str, CloudProvider), BTreeMap<NaiveDate, Decimal>> =
        BTreeMap::new();
    for record in records {
        *grouped
            .entry((record.service_name.as_str(), record.provider))
            .or_default()
            .entry(record.date)
            .or_default() += record.cost.max(Decimal::ZERO);
    }

    grouped
        .into_iter()
        .map(|((service, provider), days)| {
            let points = days
                .into_iter()
                .map(|(date, cost)| ServiceCostPoint { date, cost })
                .collect();
            ServiceCostSeries::new(service, provider, points)
        })
        .collect()
}
