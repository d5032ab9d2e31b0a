//! Data model shared by the analyzers and the monitor

pub mod alert;
pub mod anomaly;
pub mod cost;
pub mod recommendation;
pub mod resource;
pub mod trend;

pub use alert::{AlertKind, AlertSeverity, Budget, CostAlert};
pub use anomaly::{AnomalyRecord, AnomalyReport, AnomalySeverity, CostSpike, SpikeSeverity};
pub use cost::{CloudProvider, DailyCost, DailyTotal, ServiceCostPoint, ServiceCostSeries};
pub use recommendation::{Priority, Recommendation, RecommendationCategory, RecommendationDetail};
pub use resource::{Resource, ResourceType, Utilization};
pub use trend::{CostForecast, ForecastMethod, ForecastPoint, TrendAnalysis, TrendDirection};
