//! Presentation layer. The orchestrator only talks to [`Renderer`]; everything
//! here maps already-fetched data to text or SVG.
mod console;
pub mod format;
pub mod sparkline;

use crate::engine::{BucketSeries, PosRollup};
use crate::models::{
    AlertRecord, AssignmentSnapshot, ErrorGroup, EventRecord, LogRecord, MetricsSummary,
    QueueSnapshot, TokenStatusReport,
};

pub use console::ConsoleRenderer;

/// Display regions. Each render call replaces one panel's content wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Panel {
    Metrics,
    Tokens,
    Traffic,
    Logs,
    Events,
    Errors,
    Alerts,
    Queue,
    Assignments,
    PosList,
    Operations,
    WsfePos,
    WsfeParams,
}

impl Panel {
    pub fn title(&self) -> &'static str {
        match self {
            Panel::Metrics => "Metrics",
            Panel::Tokens => "Tokens",
            Panel::Traffic => "Traffic",
            Panel::Logs => "Request Logs",
            Panel::Events => "Domain Events",
            Panel::Errors => "Errors by Type",
            Panel::Alerts => "Active Alerts",
            Panel::Queue => "CAEA Queue",
            Panel::Assignments => "CAEA Assignments by POS",
            Panel::PosList => "POS List",
            Panel::Operations => "Operations",
            Panel::WsfePos => "WSFE POS List",
            Panel::WsfeParams => "WSFE New Params Snapshot",
        }
    }
}

/// Sink for dashboard data. Implementations must not fail; presentation
/// problems are theirs to log.
pub trait Renderer: Send + Sync {
    fn render_metrics(&self, summary: &MetricsSummary);
    fn render_tokens(&self, tokens: &TokenStatusReport);
    fn render_logs(&self, logs: &[LogRecord]);
    /// Extended table used by the logs-only viewer.
    fn render_log_view(&self, logs: &[LogRecord]);
    fn render_events(&self, events: &[EventRecord]);
    fn render_errors(&self, groups: &[ErrorGroup]);
    fn render_alerts(&self, alerts: &[AlertRecord]);
    fn render_queue(&self, queue: &QueueSnapshot);
    fn render_assignments(&self, assignments: &AssignmentSnapshot);
    fn render_pos_list(&self, rollup: &PosRollup);
    fn render_operations(&self, operations: &serde_json::Value);
    fn render_operations_failure(&self, message: &str);
    fn render_series(&self, series: &BucketSeries);
    fn render_wsfe(&self, panel: Panel, content: &str);

    /// Called once after a batch of render calls.
    fn commit(&self) {}
}
