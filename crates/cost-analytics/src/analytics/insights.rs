//! Insights aggregation
//!
//! Runs every analyzer over one data set and condenses the results into a
//! single report with a templated one-sentence narrative.

use super::anomaly::AnomalyDetector;
use super::forecast::CostForecaster;
use super::moving_average::{moving_average, MovingAveragePoint, DEFAULT_WINDOW};
use super::opportunity_generator::OpportunityGenerator;
use super::spike::SpikeDetector;
use super::trend::TrendAnalyzer;
use crate::config::AnalyticsConfig;
use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::{
    AnomalyReport, CloudProvider, CostForecast, CostSpike, DailyCost, Priority, Recommendation,
    Resource, ServiceCostSeries, TrendAnalysis, TrendDirection,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Advice lines derived from the top opportunities
const MAX_ADVICE_LINES: usize = 3;

/// Headline figures of an analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSummary {
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub days: usize,
    pub total_cost: Decimal,
    pub provider_totals: BTreeMap<CloudProvider, Decimal>,
    pub trend: TrendAnalysis,
    pub health_score: u32,
}

/// Composite analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostInsights {
    pub summary: InsightSummary,
    pub anomalies: AnomalyReport,
    pub spikes: Vec<CostSpike>,
    pub moving_average: Vec<MovingAveragePoint>,
    /// Plain-language advice, most valuable first
    pub recommendations: Vec<String>,
    pub forecasts: CostForecast,
    pub optimizations: Vec<Recommendation>,
    pub savings_potential: Decimal,
    pub narrative: String,
}

/// Runs all analyzers with one configuration
#[derive(Debug, Clone)]
pub struct InsightsAggregator {
    anomaly_detector: AnomalyDetector,
    spike_detector: SpikeDetector,
    trend_analyzer: TrendAnalyzer,
    forecaster: CostForecaster,
    generator: OpportunityGenerator,
    moving_average_window: usize,
}

impl InsightsAggregator {
    pub fn new(config: &AnalyticsConfig) -> CostAnalyticsResult<Self> {
        if config.moving_average_window == 0 {
            return Err(CostAnalyticsError::invalid_parameter(
                "moving_average_window",
                "must be at least 1",
            ));
        }
        Ok(Self {
            anomaly_detector: AnomalyDetector::new(config.anomaly.clone())?,
            spike_detector: SpikeDetector::new(config.spike.clone())?,
            trend_analyzer: TrendAnalyzer::new(config.trend.clone())?,
            forecaster: CostForecaster::new(config.forecast.clone())?,
            generator: OpportunityGenerator::new(config.recommendations.clone()),
            moving_average_window: config.moving_average_window,
        })
    }

    pub fn spike_detector(&self) -> &SpikeDetector {
        &self.spike_detector
    }

    pub fn generator(&self) -> &OpportunityGenerator {
        &self.generator
    }

    /// Analyze daily totals, service histories and resources together
    ///
    /// `daily` must be in ascending date order.
    pub fn analyze(
        &self,
        daily: &[DailyCost],
        services: &[ServiceCostSeries],
        resources: &[Resource],
    ) -> CostInsights {
        let anomalies = self.anomaly_detector.detect(daily);
        let spikes = self.spike_detector.detect(daily);
        let moving_average =
            moving_average(daily, self.moving_average_window).unwrap_or_default();
        let trend = self.trend_analyzer.analyze(daily);
        let forecasts = self.forecaster.forecast(daily);
        let optimizations = self.generator.generate(resources, services);
        let savings_potential = OpportunityGenerator::total_savings(&optimizations);

        let mut provider_totals: BTreeMap<CloudProvider, Decimal> = BTreeMap::new();
        for day in daily {
            for (provider, amount) in &day.provider_breakdown {
                *provider_totals.entry(*provider).or_default() += *amount;
            }
        }

        let summary = InsightSummary {
            period_start: daily.first().map(|d| d.date),
            period_end: daily.last().map(|d| d.date),
            days: daily.len(),
            total_cost: daily.iter().map(|d| d.total).sum(),
            provider_totals,
            trend,
            health_score: anomalies.health_score,
        };

        let recommendations = advice(&summary, &anomalies, &optimizations);
        let narrative = narrative(&summary, &anomalies, &optimizations, savings_potential);

        info!(
            "Insights over {} days: total {}, {} anomalies, {} opportunities worth {}",
            summary.days,
            summary.total_cost,
            anomalies.anomaly_count(),
            optimizations.len(),
            savings_potential
        );

        CostInsights {
            summary,
            anomalies,
            spikes,
            moving_average,
            recommendations,
            forecasts,
            optimizations,
            savings_potential,
            narrative,
        }
    }
}

impl Default for InsightsAggregator {
    fn default() -> Self {
        Self {
            anomaly_detector: AnomalyDetector::default(),
            spike_detector: SpikeDetector::default(),
            trend_analyzer: TrendAnalyzer::default(),
            forecaster: CostForecaster::default(),
            generator: OpportunityGenerator::default(),
            moving_average_window: DEFAULT_WINDOW,
        }
    }
}

fn advice(
    summary: &InsightSummary,
    anomalies: &AnomalyReport,
    optimizations: &[Recommendation],
) -> Vec<String> {
    let mut lines: Vec<String> = optimizations
        .iter()
        .filter(|r| r.priority == Priority::High || r.estimated_savings > Decimal::ZERO)
        .take(MAX_ADVICE_LINES)
        .map(|r| format!("{} (saves ~${}/month)", r.title, r.estimated_savings.round_dp(2)))
        .collect();

    if summary.trend.direction == TrendDirection::Increasing {
        lines.push(format!(
            "Spend is rising {:.1}% per day; set a budget alert before month end",
            summary.trend.trend_percent
        ));
    }
    if anomalies.anomaly_count() > 0 {
        lines.push(format!(
            "Review the {} day(s) flagged as anomalous",
            anomalies.anomaly_count()
        ));
    }

    lines
}

/// Single sentence describing the run
pub fn narrative(
    summary: &InsightSummary,
    anomalies: &AnomalyReport,
    optimizations: &[Recommendation],
    savings_potential: Decimal,
) -> String {
    let trend = match summary.trend.direction {
        TrendDirection::InsufficientData => "not enough history to establish a trend".to_string(),
        direction => format!(
            "spend {} ({:+.1}% per day)",
            direction, summary.trend.trend_percent
        ),
    };

    format!(
        "Total spend over {} days was ${} with {}; {} anomalies were detected and {} optimization opportunities could save ${} per month.",
        summary.days,
        summary.total_cost.round_dp(2),
        trend,
        anomalies.anomaly_count(),
        optimizations.len(),
        savings_potential.round_dp(2)
    )
}
