//! Scheduled budget, spike and summary alerts

pub mod clock;
pub mod cost_monitor;
pub mod guard;
pub mod scheduler;
pub mod sink;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cost_monitor::{CostMonitor, MonitorMetrics, BUDGET_CHECK, DAILY_SUMMARY, SPIKE_CHECK};
pub use guard::AlertGuard;
pub use scheduler::{Schedule, TaskScheduler};
pub use sink::{AlertSink, JsonLinesAlertSink, MemoryAlertSink, TracingAlertSink};
pub use source::{CostDataSource, CostSnapshot, SnapshotSource};
