use crate::error::{CostAnalyticsError, CostAnalyticsResult};
use crate::models::{AlertSeverity, CostAlert};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

/// Destination for alerts raised by the monitor
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Channel name used in logs and delivery errors
    fn name(&self) -> &str;

    async fn send(&self, alert: &CostAlert) -> CostAnalyticsResult<()>;
}

/// Writes alerts to the log at a level matching their severity
#[derive(Debug, Default)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, alert: &CostAlert) -> CostAnalyticsResult<()> {
        match alert.severity {
            AlertSeverity::Info => info!("[{:?}] {}", alert.severity, alert.message),
            AlertSeverity::Warning => warn!("[{:?}] {}", alert.severity, alert.message),
            AlertSeverity::Critical | AlertSeverity::Emergency => {
                error!("[{:?}] {}", alert.severity, alert.message)
            }
        }
        Ok(())
    }
}

/// Keeps every alert in memory
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: RwLock<Vec<CostAlert>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<CostAlert> {
        self.alerts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.read().is_empty()
    }

    pub fn clear(&self) {
        self.alerts.write().clear();
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, alert: &CostAlert) -> CostAnalyticsResult<()> {
        self.alerts.write().push(alert.clone());
        Ok(())
    }
}

/// Appends each alert as one JSON line to a file
#[derive(Debug, Clone)]
pub struct JsonLinesAlertSink {
    path: PathBuf,
}

impl JsonLinesAlertSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn delivery_error(&self, reason: impl std::fmt::Display) -> CostAnalyticsError {
        CostAnalyticsError::AlertDelivery {
            channel: self.name().to_string(),
            reason: format!("{}: {reason}", self.path.display()),
        }
    }
}

#[async_trait]
impl AlertSink for JsonLinesAlertSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn send(&self, alert: &CostAlert) -> CostAnalyticsResult<()> {
        let mut line = serde_json::to_vec(alert).map_err(|e| self.delivery_error(e))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.delivery_error(e))?;
        file.write_all(&line)
            .await
            .map_err(|e| self.delivery_error(e))?;
        file.flush().await.map_err(|e| self.delivery_error(e))?;

        debug!("Appended alert {} to {}", alert.id, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertKind;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn alert(severity: AlertSeverity) -> CostAlert {
        CostAlert::new(
            Utc::now(),
            severity,
            "Daily cost summary",
            AlertKind::DailySummary {
                date: Utc::now().date_naive(),
                total_cost: dec!(1200),
                savings_potential: dec!(139.2),
                narrative: "Total spend over 8 days was $1200.".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemoryAlertSink::new();
        sink.send(&alert(AlertSeverity::Info)).await.unwrap();
        sink.send(&alert(AlertSeverity::Critical)).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.alerts()[1].severity, AlertSeverity::Critical);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_every_severity() {
        let sink = TracingAlertSink;
        for severity in [
            AlertSeverity::Info,
            AlertSeverity::Warning,
            AlertSeverity::Critical,
            AlertSeverity::Emergency,
        ] {
            assert!(sink.send(&alert(severity)).await.is_ok());
        }
        assert_eq!(sink.name(), "log");
    }

    #[tokio::test]
    async fn test_json_lines_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesAlertSink::new(dir.path().join("alerts.jsonl"));

        sink.send(&alert(AlertSeverity::Info)).await.unwrap();
        sink.send(&alert(AlertSeverity::Warning)).await.unwrap();

        let written = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<CostAlert> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].severity, AlertSeverity::Warning);
        assert_eq!(lines[0].kind, alert(AlertSeverity::Info).kind);
    }

    #[tokio::test]
    async fn test_json_lines_sink_reports_delivery_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesAlertSink::new(dir.path().join("missing").join("alerts.jsonl"));

        match sink.send(&alert(AlertSeverity::Critical)).await {
            Err(CostAnalyticsError::AlertDelivery { channel, reason }) => {
                assert_eq!(channel, "jsonl");
                assert!(reason.contains("alerts.jsonl"));
            }
            other => panic!("expected a delivery error, got {other:?}"),
        }
    }
}
