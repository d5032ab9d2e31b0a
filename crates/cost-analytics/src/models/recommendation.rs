use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::cost::CloudProvider;

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

/// Which rule produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Rightsizing,
    IdleResource,
    ReservedInstance,
    HighSpendService,
    RapidGrowth,
    StorageOptimization,
    HighAvailability,
    SpotInstances,
}

impl fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationCategory::Rightsizing => write!(f, "Rightsizing"),
            RecommendationCategory::IdleResource => write!(f, "Idle Resource"),
            RecommendationCategory::ReservedInstance => write!(f, "Reserved Instance"),
            RecommendationCategory::HighSpendService => write!(f, "High Spend Service"),
            RecommendationCategory::RapidGrowth => write!(f, "Rapid Growth"),
            RecommendationCategory::StorageOptimization => write!(f, "Storage Optimization"),
            RecommendationCategory::HighAvailability => write!(f, "High Availability"),
            RecommendationCategory::SpotInstances => write!(f, "Spot Instances"),
        }
    }
}

/// Rule-specific evidence behind a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum RecommendationDetail {
    Rightsizing {
        resource_id: String,
        cpu_percent: f64,
        memory_percent: f64,
        monthly_cost: Decimal,
    },
    IdleResource {
        resource_id: String,
        cpu_percent: f64,
        memory_percent: f64,
        monthly_cost: Decimal,
    },
    ReservedInstance {
        service_name: String,
        provider: CloudProvider,
        coefficient_of_variation: f64,
        data_points: usize,
    },
    HighSpendService {
        service_name: String,
        provider: CloudProvider,
        share_percent: f64,
    },
    RapidGrowth {
        service_name: String,
        provider: CloudProvider,
        growth_percent: f64,
    },
    StorageOptimization {
        service_name: String,
        provider: CloudProvider,
    },
    HighAvailability {
        location: String,
        share_percent: f64,
        resource_count: usize,
    },
    SpotInstances {
        resource_ids: Vec<String>,
        combined_cost: Decimal,
    },
}

impl RecommendationDetail {
    pub fn category(&self) -> RecommendationCategory {
        match self {
            RecommendationDetail::Rightsizing { .. } => RecommendationCategory::Rightsizing,
            RecommendationDetail::IdleResource { .. } => RecommendationCategory::IdleResource,
            RecommendationDetail::ReservedInstance { .. } => {
                RecommendationCategory::ReservedInstance
            }
            RecommendationDetail::HighSpendService { .. } => {
                RecommendationCategory::HighSpendService
            }
            RecommendationDetail::RapidGrowth { .. } => RecommendationCategory::RapidGrowth,
            RecommendationDetail::StorageOptimization { .. } => {
                RecommendationCategory::StorageOptimization
            }
            RecommendationDetail::HighAvailability { .. } => {
                RecommendationCategory::HighAvailability
            }
            RecommendationDetail::SpotInstances { .. } => RecommendationCategory::SpotInstances,
        }
    }
}

/// A scored optimization opportunity, immutable once generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    #[serde(flatten)]
    pub detail: RecommendationDetail,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub estimated_savings: Decimal,
    /// 0 to 100
    pub savings_percentage: f64,
    /// Deterministic heuristic, 0 to 100; not a calibrated probability
    pub confidence: f64,
}

impl Recommendation {
    pub fn new(
        detail: RecommendationDetail,
        priority: Priority,
        title: impl Into<String>,
        description: impl Into<String>,
        estimated_savings: Decimal,
        savings_percentage: f64,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            detail,
            priority,
            title: title.into(),
            description: description.into(),
            estimated_savings: estimated_savings.max(Decimal::ZERO),
            savings_percentage: clamp_percent(savings_percentage),
            confidence: clamp_percent(confidence),
        }
    }

    pub fn category(&self) -> RecommendationCategory {
        self.detail.category()
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
