use std::sync::Arc;

use anyhow::Context;
use cost_analytics::{
    AnalyticsConfig, CostDataSource, CostMonitor, InsightsAggregator, JsonLinesAlertSink,
    SnapshotSource, SystemClock, TracingAlertSink,
};
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<AnalyticsConfig> {
    match std::env::var("COST_ANALYTICS_CONFIG") {
        Ok(path) => {
            let mut config = AnalyticsConfig::load_from_file(&path)
                .with_context(|| format!("loading config from {path}"))?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }
        Err(_) => Ok(AnalyticsConfig::from_env()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        "Starting cost-analytics with data from {}",
        config.data_path.display()
    );

    let source = Arc::new(SnapshotSource::load(&config.data_path).await?);

    // One-shot report before the scheduled jobs take over
    let history = config.scheduler.history_days;
    let insights = InsightsAggregator::new(&config)?.analyze(
        &source.daily_costs(history).await?,
        &source.service_costs(history).await?,
        &source.resources().await?,
    );
    tracing::info!("{}", insights.narrative);
    for line in &insights.recommendations {
        tracing::info!("Recommendation: {}", line);
    }

    let mut monitor = CostMonitor::new(&config, source, Arc::new(SystemClock))?
        .with_sink(Arc::new(TracingAlertSink));
    if let Some(path) = &config.alert_log_path {
        tracing::info!("Appending alerts to {}", path.display());
        monitor = monitor.with_sink(Arc::new(JsonLinesAlertSink::new(path.clone())));
    }

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    let metrics = monitor.metrics();
    tracing::info!(
        "Shutting down: {} jobs run, {} failed, {} alerts sent, {} suppressed, {} delivery failures",
        metrics.jobs_run,
        metrics.job_failures,
        metrics.alerts_sent,
        metrics.alerts_suppressed,
        metrics.delivery_failures
    );

    Ok(())
}
