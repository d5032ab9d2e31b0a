//! Rule-based optimization opportunity generation
//!
//! Each rule looks at one resource or one service on its own; the only
//! cross-entity inputs are the total spend (for concentration) and the
//! fleet-wide region and spot checks. Confidence values are linear
//! heuristics of the same inputs and are not calibrated probabilities.

use super::statistics::{decimal_to_f64, percent_change, safe_ratio, summarize, totals};
use crate::config::RecommendationConfig;
use crate::models::{
    Priority, Recommendation, RecommendationDetail, Resource, ResourceType, ServiceCostSeries,
};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Opportunity generator for creating optimization recommendations
#[derive(Debug, Clone)]
pub struct OpportunityGenerator {
    config: RecommendationConfig,
}

impl OpportunityGenerator {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Runs every rule and returns the results sorted by estimated savings, largest first
    pub fn generate(
        &self,
        resources: &[Resource],
        services: &[ServiceCostSeries],
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        for resource in resources {
            recommendations.extend(self.create_rightsizing_opportunity(resource));
            recommendations.extend(self.create_idle_opportunity(resource));
        }

        let total_spend: Decimal = services.iter().map(|s| s.total).sum();
        for service in services {
            recommendations.extend(self.create_reserved_instance_opportunity(service));
            recommendations.extend(self.create_high_spend_opportunity(service, total_spend));
            recommendations.extend(self.create_rapid_growth_opportunity(service));
            recommendations.extend(self.create_storage_opportunity(service));
        }

        recommendations.extend(self.create_high_availability_opportunity(resources));
        recommendations.extend(self.create_spot_opportunity(resources));

        recommendations.sort_by(|a, b| b.estimated_savings.cmp(&a.estimated_savings));

        debug!(
            "Generated {} recommendations from {} resources and {} services",
            recommendations.len(),
            resources.len(),
            services.len()
        );

        recommendations
    }

    /// Sum of estimated savings over `recommendations`
    ///
    /// Terminating an idle resource already saves its full cost, so a
    /// rightsizing entry for the same resource is not counted again.
    pub fn total_savings(recommendations: &[Recommendation]) -> Decimal {
        let idle: HashSet<&str> = recommendations
            .iter()
            .filter_map(|r| match &r.detail {
                RecommendationDetail::IdleResource { resource_id, .. } => Some(resource_id.as_str()),
                _ => None,
            })
            .collect();

        recommendations
            .iter()
            .filter(|r| match &r.detail {
                RecommendationDetail::Rightsizing { resource_id, .. } => {
                    !idle.contains(resource_id.as_str())
                }
                _ => true,
            })
            .map(|r| r.estimated_savings)
            .sum()
    }

    fn create_rightsizing_opportunity(&self, resource: &Resource) -> Option<Recommendation> {
        let limit = self.config.rightsizing_max_utilization;
        let util = resource.utilization;
        if !(util.cpu < limit && util.memory < limit) {
            return None;
        }

        let priority = if util.cpu < self.config.rightsizing_high_priority_cpu {
            Priority::High
        } else {
            Priority::Medium
        };
        let ratio = self.config.rightsizing_savings_ratio;
        let confidence = (70.0 + (limit - util.peak())).min(95.0);

        Some(Recommendation::new(
            RecommendationDetail::Rightsizing {
                resource_id: resource.id.clone(),
                cpu_percent: util.cpu,
                memory_percent: util.memory,
                monthly_cost: resource.monthly_cost,
            },
            priority,
            format!("Rightsize underutilized resource {}", display_id(&resource.id)),
            format!(
                "Average utilization is {:.1}% CPU and {:.1}% memory. A smaller instance size would cover this load.",
                util.cpu, util.memory
            ),
            resource.monthly_cost * ratio,
            ratio_percent(ratio),
            confidence,
        ))
    }

    fn create_idle_opportunity(&self, resource: &Resource) -> Option<Recommendation> {
        let limit = self.config.idle_max_utilization;
        let util = resource.utilization;
        if !(util.cpu < limit && util.memory < limit) {
            return None;
        }

        let confidence = (80.0 + (limit - util.peak()) * 3.0).min(95.0);

        Some(Recommendation::new(
            RecommendationDetail::IdleResource {
                resource_id: resource.id.clone(),
                cpu_percent: util.cpu,
                memory_percent: util.memory,
                monthly_cost: resource.monthly_cost,
            },
            Priority::High,
            format!("Terminate idle resource {}", display_id(&resource.id)),
            format!(
                "Resource is nearly idle at {:.1}% CPU and {:.1}% memory. Stopping it removes its full monthly cost.",
                util.cpu, util.memory
            ),
            resource.monthly_cost,
            100.0,
            confidence,
        ))
    }

    fn create_reserved_instance_opportunity(
        &self,
        service: &ServiceCostSeries,
    ) -> Option<Recommendation> {
        if service.total <= self.config.reserved_min_total
            || service.data_points.len() < self.config.reserved_min_data_points
        {
            return None;
        }

        let cv = summarize(&totals(&service.data_points)).coefficient_of_variation();
        if cv >= self.config.reserved_max_variation {
            return None;
        }

        let ratio = self.config.reserved_savings_ratio;
        let confidence = (60.0 + (self.config.reserved_max_variation - cv) * 100.0).min(95.0);

        Some(Recommendation::new(
            RecommendationDetail::ReservedInstance {
                service_name: service.service_name.clone(),
                provider: service.cloud_provider,
                coefficient_of_variation: cv,
                data_points: service.data_points.len(),
            },
            Priority::Medium,
            format!("Reserve capacity for {}", service.service_name),
            format!(
                "{} on {} has steady usage (variation {:.2}). A 1-year commitment lowers its rate.",
                service.service_name, service.cloud_provider, cv
            ),
            service.total * ratio,
            ratio_percent(ratio),
            confidence,
        ))
    }

    fn create_high_spend_opportunity(
        &self,
        service: &ServiceCostSeries,
        total_spend: Decimal,
    ) -> Option<Recommendation> {
        let share = safe_ratio(decimal_to_f64(service.total), decimal_to_f64(total_spend));
        if share <= self.config.high_spend_share {
            return None;
        }

        let ratio = self.config.high_spend_savings_ratio;
        let share_percent = share * 100.0;

        Some(Recommendation::new(
            RecommendationDetail::HighSpendService {
                service_name: service.service_name.clone(),
                provider: service.cloud_provider,
                share_percent,
            },
            Priority::High,
            format!("Review high spend on {}", service.service_name),
            format!(
                "{} accounts for {:.1}% of total spend. Review its configuration and pricing options.",
                service.service_name, share_percent
            ),
            service.total * ratio,
            ratio_percent(ratio),
            65.0,
        ))
    }

    fn create_rapid_growth_opportunity(&self, service: &ServiceCostSeries) -> Option<Recommendation> {
        let window = self.config.growth_window_days;
        let (Some(first), Some(last)) = (service.data_points.first(), service.data_points.last())
        else {
            return None;
        };
        if window == 0 {
            return None;
        }

        // Windows are calendar days ending at the last billed day, so missing
        // days count as zero spend.
        let recent_start = last.date - Duration::days(window as i64 - 1);
        let previous_start = recent_start - Duration::days(window as i64);
        if first.date > previous_start {
            return None;
        }

        let sum_from = |from: NaiveDate, until: NaiveDate| -> Decimal {
            service
                .data_points
                .iter()
                .filter(|p| p.date >= from && p.date < until)
                .map(|p| p.cost)
                .sum()
        };
        let recent = sum_from(recent_start, last.date + Duration::days(1));
        let previous = sum_from(previous_start, recent_start);
        let growth = percent_change(decimal_to_f64(recent), decimal_to_f64(previous))?;
        if growth <= self.config.growth_threshold_percent {
            return None;
        }

        let ratio = self.config.growth_savings_ratio;
        let priority = if growth > 2.0 * self.config.growth_threshold_percent {
            Priority::High
        } else {
            Priority::Medium
        };

        Some(Recommendation::new(
            RecommendationDetail::RapidGrowth {
                service_name: service.service_name.clone(),
                provider: service.cloud_provider,
                growth_percent: growth,
            },
            priority,
            format!("Investigate cost growth in {}", service.service_name),
            format!(
                "{} spend grew {:.1}% over the last {} days compared to the {} days before.",
                service.service_name, growth, window, window
            ),
            service.total * ratio,
            ratio_percent(ratio),
            (50.0 + growth / 2.0).min(90.0),
        ))
    }

    fn create_storage_opportunity(&self, service: &ServiceCostSeries) -> Option<Recommendation> {
        if service.total <= self.config.storage_min_total || !self.is_storage(&service.service_name) {
            return None;
        }

        let ratio = self.config.storage_savings_ratio;

        Some(Recommendation::new(
            RecommendationDetail::StorageOptimization {
                service_name: service.service_name.clone(),
                provider: service.cloud_provider,
            },
            Priority::Medium,
            format!("Optimize storage tiers for {}", service.service_name),
            "Move infrequently accessed data to a colder tier and add lifecycle rules.".to_string(),
            service.total * ratio,
            ratio_percent(ratio),
            70.0,
        ))
    }

    fn create_high_availability_opportunity(&self, resources: &[Resource]) -> Option<Recommendation> {
        if resources.len() <= self.config.ha_min_resources {
            return None;
        }

        let mut by_location: BTreeMap<&str, usize> = BTreeMap::new();
        for resource in resources {
            if let Some(region) = resource.region.as_deref() {
                *by_location.entry(region).or_default() += 1;
            }
        }

        // Ties go to the alphabetically first location.
        let (location, count) = by_location
            .into_iter()
            .fold(None, |best: Option<(&str, usize)>, (loc, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((loc, count)),
            })?;

        let share = safe_ratio(count as f64, resources.len() as f64);
        if share <= self.config.ha_max_location_share {
            return None;
        }

        let share_percent = share * 100.0;

        Some(Recommendation::new(
            RecommendationDetail::HighAvailability {
                location: location.to_string(),
                share_percent,
                resource_count: count,
            },
            Priority::Medium,
            format!("Spread workloads beyond {location}"),
            format!(
                "{count} of {} resources ({share_percent:.0}%) run in {location}. An outage there would affect most of the fleet.",
                resources.len()
            ),
            Decimal::ZERO,
            0.0,
            80.0,
        ))
    }

    fn create_spot_opportunity(&self, resources: &[Resource]) -> Option<Recommendation> {
        let candidates: Vec<&Resource> = resources
            .iter()
            .filter(|r| r.resource_type == ResourceType::Compute)
            .filter(|r| r.utilization.cpu < self.config.spot_max_cpu)
            .collect();

        if candidates.len() <= self.config.spot_min_candidates {
            return None;
        }

        let combined_cost: Decimal = candidates.iter().map(|r| r.monthly_cost).sum();
        let ratio = self.config.spot_savings_ratio;

        Some(Recommendation::new(
            RecommendationDetail::SpotInstances {
                resource_ids: candidates.iter().map(|r| r.id.clone()).collect(),
                combined_cost,
            },
            Priority::Medium,
            format!("Move {} compute resources to spot capacity", candidates.len()),
            "Interruptible workloads on these instances can run on spot pricing.".to_string(),
            combined_cost * ratio,
            ratio_percent(ratio),
            75.0,
        ))
    }

    fn is_storage(&self, service_name: &str) -> bool {
        let name = service_name.to_lowercase();
        self.config
            .storage_keywords
            .iter()
            .any(|keyword| name.contains(keyword.as_str()))
    }
}

impl Default for OpportunityGenerator {
    fn default() -> Self {
        Self::new(RecommendationConfig::default())
    }
}

fn ratio_percent(ratio: Decimal) -> f64 {
    decimal_to_f64(ratio) * 100.0
}

fn display_id(id: &str) -> &str {
    if id.is_empty() {
        "(unnamed)"
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CloudProvider, RecommendationCategory, ServiceCostPoint, Utilization};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn resource(id: &str, cpu: f64, memory: f64, cost: Decimal) -> Resource {
        Resource::new(id, ResourceType::Compute, Utilization::new(cpu, memory), cost)
    }

    fn service(name: &str, costs: &[Decimal]) -> ServiceCostSeries {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let points = costs
            .iter()
            .enumerate()
            .map(|(i, c)| ServiceCostPoint {
                date: start + chrono::Duration::days(i as i64),
                cost: *c,
            })
            .collect();
        ServiceCostSeries::new(name, CloudProvider::Aws, points)
    }

    fn of_category(
        recs: &[Recommendation],
        category: RecommendationCategory,
    ) -> Vec<&Recommendation> {
        recs.iter().filter(|r| r.category() == category).collect()
    }

    #[test]
    fn test_rightsizing_savings_and_priority() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(&[resource("vm-1", 8.0, 12.0, dec!(348))], &[]);

        let rightsizing = of_category(&recs, RecommendationCategory::Rightsizing);
        assert_eq!(rightsizing.len(), 1);
        assert_eq!(rightsizing[0].estimated_savings, dec!(139.2));
        assert_eq!(rightsizing[0].priority, Priority::High);
        assert_eq!(rightsizing[0].savings_percentage, 40.0);
        assert_eq!(rightsizing[0].confidence, 88.0);
    }

    #[test]
    fn test_rightsizing_medium_priority() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(&[resource("vm-2", 20.0, 25.0, dec!(100))], &[]);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Medium);
        assert_eq!(recs[0].estimated_savings, dec!(40.0));
    }

    #[test]
    fn test_idle_resource_saves_full_cost() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(&[resource("vm-idle", 1.0, 2.0, dec!(210.55))], &[]);

        let idle = of_category(&recs, RecommendationCategory::IdleResource);
        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].estimated_savings, dec!(210.55));
        assert_eq!(idle[0].savings_percentage, 100.0);
        assert_eq!(idle[0].priority, Priority::High);
        assert_eq!(idle[0].confidence, 89.0);

        // an idle resource is also underutilized
        assert_eq!(of_category(&recs, RecommendationCategory::Rightsizing).len(), 1);
    }

    #[test]
    fn test_busy_resource_has_no_recommendation() {
        let generator = OpportunityGenerator::default();
        assert!(generator
            .generate(&[resource("vm-busy", 85.0, 10.0, dec!(500))], &[])
            .is_empty());
    }

    #[test]
    fn test_reserved_instance_for_steady_service() {
        let generator = OpportunityGenerator::default();
        let mut costs = vec![dec!(10); 15];
        costs.extend(vec![dec!(11); 15]);
        let recs = generator.generate(&[], &[service("EC2", &costs)]);

        let reserved = of_category(&recs, RecommendationCategory::ReservedInstance);
        assert_eq!(reserved.len(), 1);
        assert_eq!(reserved[0].estimated_savings, dec!(94.5)); // 315 * 0.3
    }

    #[test]
    fn test_reserved_instance_needs_history() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(&[], &[service("EC2", &vec![dec!(50); 29])]);
        assert!(of_category(&recs, RecommendationCategory::ReservedInstance).is_empty());
    }

    #[test]
    fn test_high_spend_service() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(
            &[],
            &[
                service("Compute Engine", &[dec!(40)]),
                service("BigQuery", &[dec!(30)]),
                service("Cloud Run", &[dec!(30)]),
            ],
        );

        let flagged = of_category(&recs, RecommendationCategory::HighSpendService);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].estimated_savings, dec!(6.00));
        match &flagged[0].detail {
            RecommendationDetail::HighSpendService {
                service_name,
                share_percent,
                ..
            } => {
                assert_eq!(service_name, "Compute Engine");
                assert!((share_percent - 40.0).abs() < 1e-9);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_rapid_growth() {
        let generator = OpportunityGenerator::default();
        let mut costs = vec![dec!(10); 7];
        costs.extend(vec![dec!(13); 7]);
        let recs = generator.generate(&[], &[service("Lambda", &costs)]);

        let growth = of_category(&recs, RecommendationCategory::RapidGrowth);
        assert_eq!(growth.len(), 1);
        assert_eq!(growth[0].estimated_savings, dec!(16.10)); // 161 * 0.10
        assert_eq!(growth[0].priority, Priority::Medium);
    }

    #[test]
    fn test_rapid_growth_uses_calendar_windows() {
        let generator = OpportunityGenerator::default();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let point = |day: i64, cost: Decimal| ServiceCostPoint {
            date: start + chrono::Duration::days(day),
            cost,
        };

        // a week at 10/day, six weeks with no billing, then a week at 13/day
        let mut points: Vec<ServiceCostPoint> = (0..7).map(|d| point(d, dec!(10))).collect();
        points.extend((50..57).map(|d| point(d, dec!(13))));
        let sparse = ServiceCostSeries::new("Lambda", CloudProvider::Aws, points);

        let recs = generator.generate(&[], &[sparse]);
        assert!(of_category(&recs, RecommendationCategory::RapidGrowth).is_empty());

        // a missing day inside the previous week counts as zero spend
        let mut points: Vec<ServiceCostPoint> = (0..7)
            .filter(|d| *d != 3)
            .map(|d| point(d, dec!(10)))
            .collect();
        points.extend((7..14).map(|d| point(d, dec!(11))));
        let gappy = ServiceCostSeries::new("Lambda", CloudProvider::Aws, points);

        let recs = generator.generate(&[], &[gappy]);
        let growth = of_category(&recs, RecommendationCategory::RapidGrowth);
        assert_eq!(growth.len(), 1);
        match &growth[0].detail {
            RecommendationDetail::RapidGrowth { growth_percent, .. } => {
                // 77 against 60, with the missing day at zero
                assert!((growth_percent - 100.0 * 17.0 / 60.0).abs() < 1e-9);
            }
            other => panic!("unexpected detail {other:?}"),
        }
    }

    #[test]
    fn test_rapid_growth_needs_two_full_windows() {
        let generator = OpportunityGenerator::default();
        let mut costs = vec![dec!(10); 6];
        costs.extend(vec![dec!(30); 7]);
        let recs = generator.generate(&[], &[service("Lambda", &costs)]);

        assert!(of_category(&recs, RecommendationCategory::RapidGrowth).is_empty());
    }

    #[test]
    fn test_storage_optimization() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(
            &[],
            &[
                service("Amazon S3", &[dec!(60), dec!(60)]),
                service("Blob Storage", &[dec!(50), dec!(50)]),
            ],
        );

        let storage = of_category(&recs, RecommendationCategory::StorageOptimization);
        assert_eq!(storage.len(), 1);
        assert_eq!(storage[0].estimated_savings, dec!(48.0));
    }

    #[test]
    fn test_region_concentration() {
        let generator = OpportunityGenerator::default();
        let mut resources: Vec<Resource> = (0..6)
            .map(|i| resource(&format!("vm-{i}"), 70.0, 70.0, dec!(10)).with_region("us-east-1"))
            .collect();

        let recs = generator.generate(&resources, &[]);
        let ha = of_category(&recs, RecommendationCategory::HighAvailability);
        assert_eq!(ha.len(), 1);
        assert_eq!(ha[0].estimated_savings, Decimal::ZERO);

        resources[0].region = Some("eu-west-1".to_string());
        resources[1].region = Some("eu-west-1".to_string());
        let recs = generator.generate(&resources, &[]);
        assert!(of_category(&recs, RecommendationCategory::HighAvailability).is_empty());
    }

    #[test]
    fn test_spot_candidates() {
        let generator = OpportunityGenerator::default();
        let resources: Vec<Resource> = (0..4)
            .map(|i| resource(&format!("vm-{i}"), 50.0, 70.0, dec!(100)))
            .collect();

        let recs = generator.generate(&resources, &[]);
        let spot = of_category(&recs, RecommendationCategory::SpotInstances);
        assert_eq!(spot.len(), 1);
        assert_eq!(spot[0].estimated_savings, dec!(240.0));

        let recs = generator.generate(&resources[..3], &[]);
        assert!(of_category(&recs, RecommendationCategory::SpotInstances).is_empty());
    }

    #[test]
    fn test_sorted_by_savings() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(
            &[
                resource("small", 20.0, 20.0, dec!(50)),
                resource("idle", 1.0, 1.0, dec!(30)),
                resource("large", 8.0, 12.0, dec!(348)),
            ],
            &[],
        );

        assert!(recs
            .windows(2)
            .all(|w| w[0].estimated_savings >= w[1].estimated_savings));
        assert_eq!(recs[0].estimated_savings, dec!(139.2));
        // the idle resource's rightsizing entry is not counted on top of termination
        assert_eq!(recs.len(), 4);
        assert_eq!(
            OpportunityGenerator::total_savings(&recs),
            dec!(139.2) + dec!(20.0) + dec!(30)
        );
    }

    #[test]
    fn test_idle_savings_not_double_counted() {
        let generator = OpportunityGenerator::default();
        let recs = generator.generate(&[resource("vm-idle", 2.0, 3.0, dec!(100))], &[]);

        assert_eq!(recs.len(), 2);
        assert_eq!(OpportunityGenerator::total_savings(&recs), dec!(100));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let generator = OpportunityGenerator::default();
        let resources = vec![resource("vm-1", 8.0, 12.0, dec!(348))];
        let first = generator.generate(&resources, &[]);
        let second = generator.generate(&resources, &[]);

        let strip = |recs: Vec<Recommendation>| {
            recs.into_iter()
                .map(|r| (r.detail, r.estimated_savings, r.priority))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(first), strip(second));
    }
}
