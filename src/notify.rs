//! Notification surface for export progress
//!
//! Notifications are cosmetic: a run reports its start, each phase, and
//! exactly one terminal success or failure. Per-chart failures never reach
//! the notifier; they only go to the log.

use crate::export::ExportFormat;
use crate::ReportCategory;
use log::{error, info};
use std::fmt;

/// Stage of an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchingMetrics,
    CapturingCharts(ReportCategory),
    Generating,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::FetchingMetrics => f.write_str("fetching report metrics"),
            Phase::CapturingCharts(c) => write!(f, "capturing charts for {}", c),
            Phase::Generating => f.write_str("generating export file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    Started { format: ExportFormat },
    Progress(Phase),
    Succeeded { format: ExportFormat },
    Failed { reason: String },
}

pub trait Notifier {
    fn notify(&self, event: &ExportEvent);
}

/// Writes every event to the `log` facade
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &ExportEvent) {
        match event {
            ExportEvent::Started { format } => info!("Export started ({})", format),
            ExportEvent::Progress(phase) => info!("Export: {}...", phase),
            ExportEvent::Succeeded { format } => info!("Export finished ({})", format),
            ExportEvent::Failed { reason } => error!("Export failed: {}", reason),
        }
    }
}

/// Discards every event
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &ExportEvent) {}
}
