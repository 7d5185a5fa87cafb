//! Task monitors for observability.
//!
//! Monitors receive start, progress, completion, and failure notifications.
//! They are side channels only and never influence scheduling.

mod sink;
mod tee;

pub use sink::{
    CollectingMonitor, LoggingMonitor, Monitor, MonitorEvent, MonitorEventKind, NoOpMonitor,
};
pub use tee::TeeMonitor;
