//! Scheduled cost monitoring
//!
//! Three recurring jobs run against a [`CostDataSource`]: the budget check,
//! spike detection and the daily summary. Jobs are fire-and-forget: a
//! failing job is logged and counted, and the next tick tries again. Every
//! alert passes through an [`AlertGuard`] so a job that runs twice inside
//! the cooldown never alerts twice.

use super::clock::Clock;
use super::guard::AlertGuard;
use super::scheduler::{Schedule, TaskScheduler};
use super::sink::AlertSink;
use super::source::CostDataSource;
use crate::analytics::statistics::{decimal_to_f64, safe_ratio};
use crate::analytics::InsightsAggregator;
use crate::config::{AnalyticsConfig, SchedulerConfig};
use crate::error::CostAnalyticsResult;
use crate::models::{AlertKind, AlertSeverity, CostAlert};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const BUDGET_CHECK: &str = "budget_check";
pub const SPIKE_CHECK: &str = "spike_check";
pub const DAILY_SUMMARY: &str = "daily_summary";

/// Monitor counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorMetrics {
    pub jobs_run: u64,
    pub job_failures: u64,
    pub alerts_sent: u64,
    pub alerts_suppressed: u64,
    pub delivery_failures: u64,
}

/// Runs the recurring cost checks and dispatches their alerts
pub struct CostMonitor {
    config: SchedulerConfig,
    source: Arc<dyn CostDataSource>,
    clock: Arc<dyn Clock>,
    sinks: Vec<Arc<dyn AlertSink>>,
    scheduler: TaskScheduler,
    guard: AlertGuard,
    insights: InsightsAggregator,
    metrics: Arc<RwLock<MonitorMetrics>>,
}

impl CostMonitor {
    pub fn new(
        config: &AnalyticsConfig,
        source: Arc<dyn CostDataSource>,
        clock: Arc<dyn Clock>,
    ) -> CostAnalyticsResult<Self> {
        config.validate()?;

        let scheduler_config = config.scheduler.clone();
        let mut scheduler = TaskScheduler::new();
        scheduler.register(
            BUDGET_CHECK,
            Schedule::Every(scheduler_config.budget_check_interval()),
        );
        scheduler.register(
            SPIKE_CHECK,
            Schedule::Every(scheduler_config.spike_check_interval()),
        );
        scheduler.register(
            DAILY_SUMMARY,
            Schedule::DailyAt(scheduler_config.daily_summary_at),
        );

        Ok(Self {
            guard: AlertGuard::new(scheduler_config.alert_cooldown()),
            config: scheduler_config,
            source,
            clock,
            sinks: Vec::new(),
            scheduler,
            insights: InsightsAggregator::new(config)?,
            metrics: Arc::new(RwLock::new(MonitorMetrics::default())),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn metrics(&self) -> MonitorMetrics {
        self.metrics.read().clone()
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Compares month-to-date spend with every budget threshold
    ///
    /// Returns the alerts that were actually dispatched.
    pub async fn check_budgets(&self, now: DateTime<Utc>) -> CostAnalyticsResult<Vec<CostAlert>> {
        let budgets = self.source.budgets().await?;
        let spend = self.source.month_to_date_spend(now.date_naive()).await?;
        let mut sent = Vec::new();

        for budget in &budgets {
            if budget.amount <= Decimal::ZERO {
                warn!("Skipping budget {} with non-positive amount", budget.id);
                continue;
            }

            let utilization = safe_ratio(decimal_to_f64(spend), decimal_to_f64(budget.amount)) * 100.0;
            debug!(
                "Budget {} at {:.1}% ({} of {})",
                budget.id, utilization, spend, budget.amount
            );

            let mut thresholds = budget.alert_thresholds.clone();
            thresholds.sort_by(|a, b| a.total_cmp(b));

            for threshold in thresholds.into_iter().filter(|t| utilization >= *t) {
                let alert = CostAlert::new(
                    now,
                    AlertSeverity::for_budget_threshold(threshold),
                    format!(
                        "Budget '{}' has reached {:.1}% of {} ({} spent, {:.0}% threshold)",
                        budget.name, utilization, budget.amount, spend, threshold
                    ),
                    AlertKind::BudgetThreshold {
                        budget_id: budget.id.clone(),
                        budget_name: budget.name.clone(),
                        threshold_percent: threshold,
                        utilization_percent: utilization,
                        spend,
                        amount: budget.amount,
                    },
                );

                let key = format!("budget:{}:{}", budget.id, threshold);
                if self.dispatch(&key, &alert, now).await {
                    sent.push(alert);
                }
            }
        }

        Ok(sent)
    }

    /// Alerts on a spike on the most recent day of the series
    pub async fn check_spikes(&self, now: DateTime<Utc>) -> CostAnalyticsResult<Option<CostAlert>> {
        let daily = self.source.daily_costs(self.config.history_days).await?;
        let Some(spike) = self.insights.spike_detector().detect_latest(&daily) else {
            return Ok(None);
        };

        let key = format!("spike:{}", spike.date);
        let alert = CostAlert::new(
            now,
            spike.severity.into(),
            format!(
                "Cost spike on {}: {} is {:.1}% above the trailing average of {:.2}",
                spike.date, spike.current_cost, spike.increase_percent, spike.historical_average
            ),
            AlertKind::CostSpike { spike },
        );

        if self.dispatch(&key, &alert, now).await {
            Ok(Some(alert))
        } else {
            Ok(None)
        }
    }

    /// Runs the full analysis and sends its narrative as an informational alert
    pub async fn send_daily_summary(
        &self,
        now: DateTime<Utc>,
    ) -> CostAnalyticsResult<Option<CostAlert>> {
        let history = self.config.history_days;
        let daily = self.source.daily_costs(history).await?;
        let services = self.source.service_costs(history).await?;
        let resources = self.source.resources().await?;

        let insights = self.insights.analyze(&daily, &services, &resources);
        let date = now.date_naive();

        let alert = CostAlert::new(
            now,
            AlertSeverity::Info,
            insights.narrative.clone(),
            AlertKind::DailySummary {
                date,
                total_cost: insights.summary.total_cost,
                savings_potential: insights.savings_potential,
                narrative: insights.narrative,
            },
        );

        if self.dispatch(&format!("summary:{date}"), &alert, now).await {
            Ok(Some(alert))
        } else {
            Ok(None)
        }
    }

    /// Runs every job due at `now` and returns how many ran
    ///
    /// Job errors are logged and counted, never returned.
    pub async fn run_due(&self, now: DateTime<Utc>) -> usize {
        let mut ran = 0;

        let pruned = self.guard.prune(now);
        if pruned > 0 {
            debug!("Forgot {} expired alert keys", pruned);
        }

        for task in self.scheduler.due(now) {
            if !self.scheduler.try_begin(&task, now) {
                continue;
            }

            let result = match task.as_str() {
                BUDGET_CHECK => self.check_budgets(now).await.map(|_| ()),
                SPIKE_CHECK => self.check_spikes(now).await.map(|_| ()),
                DAILY_SUMMARY => self.send_daily_summary(now).await.map(|_| ()),
                other => {
                    warn!("No job registered for task {}", other);
                    continue;
                }
            };

            ran += 1;
            let mut metrics = self.metrics.write();
            metrics.jobs_run += 1;
            if let Err(e) = result {
                metrics.job_failures += 1;
                error!("Scheduled job {} failed: {}", task, e);
            }
        }

        ran
    }

    /// Drives [`run_due`](Self::run_due) every tick until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.tick());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Cost monitor started: {} task(s), tick every {}s",
            self.scheduler.task_names().count(),
            self.config.tick_secs
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_due(self.clock.now()).await;
                }
                _ = &mut shutdown => {
                    info!("Cost monitor stopping");
                    break;
                }
            }
        }
    }

    /// Sends `alert` to every sink unless `key` is cooling down
    async fn dispatch(&self, key: &str, alert: &CostAlert, now: DateTime<Utc>) -> bool {
        if !self.guard.should_fire(key, now) {
            debug!("Suppressing alert {} inside cooldown", key);
            self.metrics.write().alerts_suppressed += 1;
            return false;
        }

        let mut failures = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.send(alert).await {
                failures += 1;
                warn!("Alert {} not delivered to {}: {}", alert.id, sink.name(), e);
            }
        }

        let mut metrics = self.metrics.write();
        metrics.alerts_sent += 1;
        metrics.delivery_failures += failures;
        true
    }
}
