//! Multi-cloud cost analytics
//!
//! This crate provides the analysis layer behind a cloud cost dashboard:
//! - Descriptive statistics and trailing moving averages over daily spend
//! - Sigma-threshold anomaly detection with a health score
//! - Day-over-window cost spike detection
//! - Least-squares trend classification and monthly projection
//! - Damped-trend and linear-regression forecasting
//! - Rule-based optimization recommendations
//! - Scheduled budget, spike and summary alerts with cooldown guards
//!
//! The analyzers are pure functions over in-memory series. Only the
//! [`monitor`] module does I/O, through the [`monitor::CostDataSource`] and
//! [`monitor::AlertSink`] traits.

pub mod aggregation;
pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;

pub use error::{CostAnalyticsError, CostAnalyticsResult};

// Configuration
pub use config::{
    AnalyticsConfig, AnomalyConfig, ForecastConfig, RecommendationConfig, SchedulerConfig,
    SpikeConfig, TrendConfig,
};

// Data model
pub use models::{
    AlertKind, AlertSeverity, AnomalyRecord, AnomalyReport, AnomalySeverity, Budget,
    CloudProvider, CostAlert, CostForecast, CostSpike, DailyCost, DailyTotal, ForecastMethod,
    ForecastPoint, Priority, Recommendation, RecommendationCategory, RecommendationDetail,
    Resource, ResourceType, ServiceCostPoint, ServiceCostSeries, SpikeSeverity, TrendAnalysis,
    TrendDirection, Utilization,
};

// Aggregation
pub use aggregation::{aggregate_daily, aggregate_services, CostRecord};

// Analyzers
pub use analytics::{
    moving_average, summarize, AnomalyDetector, CostForecaster, CostInsights, InsightSummary,
    InsightsAggregator, MovingAveragePoint, OpportunityGenerator, SeriesStats, SpikeDetector,
    TrendAnalyzer,
};

// Monitoring
pub use monitor::{
    AlertGuard, AlertSink, Clock, CostDataSource, CostMonitor, CostSnapshot, JsonLinesAlertSink,
    ManualClock, MemoryAlertSink, MonitorMetrics, Schedule, SnapshotSource, SystemClock,
    TaskScheduler, TracingAlertSink,
};
