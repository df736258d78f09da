use super::format::*;
use super::sparkline::{sparkline_svg, sparkline_text, ERROR_STYLE, TRAFFIC_STYLE};
use super::{Panel, Renderer};
use crate::engine::{BucketSeries, PosRollup};
use crate::models::{
    AlertRecord, AssignmentSnapshot, ErrorGroup, EventRecord, LogRecord, MetricsSummary,
    QueueSnapshot, TokenStatusReport,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Keeps the latest content of every panel and prints the whole board on `commit`.
/// Panels that are not re-rendered keep their previous content.
pub struct ConsoleRenderer {
    panels: Mutex<BTreeMap<Panel, String>>,
    out: Mutex<Box<dyn Write + Send>>,
    svg_dir: Option<PathBuf>,
}

impl ConsoleRenderer {
    pub fn new(out: Box<dyn Write + Send>, svg_dir: Option<PathBuf>) -> Self {
        Self {
            panels: Mutex::new(BTreeMap::new()),
            out: Mutex::new(out),
            svg_dir,
        }
    }

    pub fn stdout(svg_dir: Option<PathBuf>) -> Self {
        Self::new(Box::new(std::io::stdout()), svg_dir)
    }

    pub fn panel(&self, panel: Panel) -> Option<String> {
        self.panels
            .lock()
            .ok()
            .and_then(|panels| panels.get(&panel).cloned())
    }

    fn set(&self, panel: Panel, content: String) {
        match self.panels.lock() {
            Ok(mut panels) => {
                panels.insert(panel, content);
            }
            Err(e) => warn!("[RENDER] Panel store poisoned: {}", e),
        }
    }

    fn set_lines(&self, panel: Panel, header: Option<String>, lines: Vec<String>) {
        let mut content = header.map(|h| vec![h]).unwrap_or_default();
        content.extend(lines);
        self.set(panel, content.join("\n"));
    }

    fn write_svg(&self, name: &str, svg: &str) {
        let Some(dir) = &self.svg_dir else {
            return;
        };
        let path = dir.join(name);
        if let Err(e) = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, svg)) {
            warn!("[RENDER] Failed to write {:?}: {}", path, e);
        } else {
            debug!("[RENDER] Sparkline written to {:?}", path);
        }
    }
}

impl Renderer for ConsoleRenderer {
    fn render_metrics(&self, summary: &MetricsSummary) {
        self.set(Panel::Metrics, format_metrics(summary));
    }

    fn render_tokens(&self, tokens: &TokenStatusReport) {
        self.set_lines(
            Panel::Tokens,
            None,
            vec![
                format_token("WSAA", tokens.wsaa.as_ref()),
                format_token("WSPCI", tokens.wspci.as_ref()),
            ],
        );
    }

    fn render_logs(&self, logs: &[LogRecord]) {
        self.set_lines(Panel::Logs, None, format_logs(logs));
    }

    fn render_log_view(&self, logs: &[LogRecord]) {
        self.set_lines(
            Panel::Logs,
            Some(format!("{} records", logs.len())),
            format_log_view(logs),
        );
    }

    fn render_events(&self, events: &[EventRecord]) {
        self.set_lines(Panel::Events, None, format_events(events));
    }

    fn render_errors(&self, groups: &[ErrorGroup]) {
        self.set_lines(Panel::Errors, None, format_errors(groups));
    }

    fn render_alerts(&self, alerts: &[AlertRecord]) {
        self.set_lines(Panel::Alerts, None, format_alerts(alerts));
    }

    fn render_queue(&self, queue: &QueueSnapshot) {
        self.set_lines(
            Panel::Queue,
            Some(format_queue_summary(&queue.summary)),
            format_queue_rows(&queue.items),
        );
    }

    fn render_assignments(&self, assignments: &AssignmentSnapshot) {
        self.set_lines(
            Panel::Assignments,
            Some(format_assignments_summary(assignments)),
            format_assignment_rows(&assignments.items),
        );
    }

    fn render_pos_list(&self, rollup: &PosRollup) {
        self.set_lines(Panel::PosList, None, format_pos_list(rollup));
    }

    fn render_operations(&self, operations: &serde_json::Value) {
        self.set(Panel::Operations, format_json(operations));
    }

    fn render_operations_failure(&self, message: &str) {
        self.set(Panel::Operations, message.to_string());
    }

    fn render_series(&self, series: &BucketSeries) {
        self.set_lines(
            Panel::Traffic,
            Some(format!("bucket={}m", series.bucket_minutes)),
            vec![
                format!("requests {}", sparkline_text(&series.requests)),
                format!("errors   {}", sparkline_text(&series.errors)),
            ],
        );
        self.write_svg("traffic.svg", &sparkline_svg(&series.requests, TRAFFIC_STYLE));
        self.write_svg("errors.svg", &sparkline_svg(&series.errors, ERROR_STYLE));
    }

    fn render_wsfe(&self, panel: Panel, content: &str) {
        self.set(panel, content.to_string());
    }

    fn commit(&self) {
        let board = match self.panels.lock() {
            Ok(panels) => panels
                .iter()
                .map(|(panel, content)| format!("== {} ==\n{}", panel.title(), content))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => {
                warn!("[RENDER] Panel store poisoned: {}", e);
                return;
            }
        };
        if let Ok(mut out) = self.out.lock() {
            if let Err(e) = writeln!(out, "{}\n", board).and_then(|_| out.flush()) {
                warn!("[RENDER] Failed to write dashboard: {}", e);
            }
        }
    }
}
