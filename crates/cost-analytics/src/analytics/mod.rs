//! Pure analyzers over in-memory cost series

pub mod anomaly;
pub mod forecast;
pub mod insights;
pub mod moving_average;
pub mod opportunity_generator;
pub mod spike;
pub mod statistics;
pub mod trend;

pub use anomaly::{health_score, AnomalyDetector};
pub use forecast::CostForecaster;
pub use insights::{CostInsights, InsightSummary, InsightsAggregator};
pub use moving_average::{moving_average, MovingAveragePoint, DEFAULT_WINDOW};
pub use opportunity_generator::OpportunityGenerator;
pub use spike::SpikeDetector;
pub use statistics::{linear_regression, summarize, LinearFit, SeriesStats};
pub use trend::TrendAnalyzer;
