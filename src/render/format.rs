use crate::engine::PosRollup;
use crate::models::{
    AlertRecord, AssignmentRecord, AssignmentSnapshot, ErrorGroup, EventRecord, LogRecord,
    MetricsSummary, QueueItem, QueueStatus, QueueSummary, TokenStatus,
};
use chrono::{DateTime, Local, NaiveDateTime};

pub const LOG_ROWS: usize = 20;
pub const EVENT_ROWS: usize = 20;
pub const ERROR_ROWS: usize = 8;
pub const QUEUE_ROWS: usize = 30;
pub const ASSIGNMENT_ROWS: usize = 200;

/// Local-time rendering; unparseable values pass through and absent ones become `-`.
pub fn fmt_date(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return "-".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
    }
    match NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => naive
            .and_utc()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => value.to_string(),
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

pub fn format_metrics(summary: &MetricsSummary) -> String {
    format!(
        "requests={} | errors={} | p95={} ms | avg={} ms",
        summary.total_requests, summary.error_count, summary.p95_ms, summary.avg_ms
    )
}

pub fn format_token(label: &str, status: Option<&TokenStatus>) -> String {
    let Some(status) = status else {
        return format!("{}: - | -", label);
    };
    let state = if status.valid { "VALID" } else { "INVALID" };
    let detail = match status.expires_at.as_deref() {
        Some(exp) if !exp.is_empty() => format!("exp {}", fmt_date(Some(exp))),
        _ => or_dash(status.last_error.as_deref()).to_string(),
    };
    format!("{}: {} | {}", label, state, detail)
}

fn status_class(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

pub fn format_logs(logs: &[LogRecord]) -> Vec<String> {
    logs.iter()
        .take(LOG_ROWS)
        .map(|row| {
            format!(
                "{} | {} | {} {} | {} | {} | {} | {}",
                fmt_date(Some(&row.timestamp)),
                row.path,
                row.status_code,
                status_class(row.ok),
                row.duration_ms,
                or_dash(row.service.as_deref()),
                or_dash(row.error_type.as_deref()),
                or_dash(row.trace_id.as_deref()),
            )
        })
        .collect()
}

/// Logs viewer rows: every fetched record, with method and CUIT.
pub fn format_log_view(logs: &[LogRecord]) -> Vec<String> {
    logs.iter()
        .map(|row| {
            let cuit = row
                .cuit
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{} | {} | {} | {} {} | {} | {} | {} | {} | {}",
                fmt_date(Some(&row.timestamp)),
                or_dash(row.method.as_deref()),
                row.path,
                row.status_code,
                status_class(row.ok),
                row.duration_ms,
                or_dash(row.service.as_deref()),
                or_dash(row.error_type.as_deref()),
                cuit,
                or_dash(row.trace_id.as_deref()),
            )
        })
        .collect()
}

pub fn format_events(events: &[EventRecord]) -> Vec<String> {
    events
        .iter()
        .take(EVENT_ROWS)
        .map(|row| {
            format!(
                "{} | {} | {} {} | {} | {} | {}",
                fmt_date(Some(&row.timestamp)),
                row.event_type,
                row.status,
                status_class(row.is_success()),
                row.service,
                or_dash(row.error_type.as_deref()),
                or_dash(row.trace_id.as_deref()),
            )
        })
        .collect()
}

pub fn format_errors(groups: &[ErrorGroup]) -> Vec<String> {
    if groups.is_empty() {
        return vec!["No errors in selected window.".to_string()];
    }
    groups
        .iter()
        .take(ERROR_ROWS)
        .map(|g| {
            format!(
                "{} | count={} | last={}",
                g.key,
                g.count,
                fmt_date(g.last_seen.as_deref())
            )
        })
        .collect()
}

pub fn format_alerts(alerts: &[AlertRecord]) -> Vec<String> {
    if alerts.is_empty() {
        return vec!["No active alerts.".to_string()];
    }
    alerts
        .iter()
        .map(|a| format!("[{}] {}", a.severity, a.title))
        .collect()
}

pub fn format_queue_summary(summary: &QueueSummary) -> String {
    format!(
        "pending={} | retrying={} | processing={} | done={} | failed={}",
        summary.pending, summary.retrying, summary.processing, summary.done, summary.failed
    )
}

fn format_queue_row(row: &QueueItem) -> String {
    let marker = match row.status {
        QueueStatus::Done => " ok",
        QueueStatus::Failed => " error",
        _ => "",
    };
    format!(
        "{} | {} | {}{} | {} | {} | {}",
        row.id,
        row.job_type,
        row.status.as_str(),
        marker,
        row.attempts,
        fmt_date(row.next_retry_at.as_deref()),
        or_dash(row.last_error.as_deref()),
    )
}

pub fn format_queue_rows(items: &[QueueItem]) -> Vec<String> {
    items.iter().take(QUEUE_ROWS).map(format_queue_row).collect()
}

pub fn format_assignments_summary(snapshot: &AssignmentSnapshot) -> String {
    format!("rows={}", snapshot.row_count())
}

fn format_assignment_row(row: &AssignmentRecord) -> String {
    let errors = if row.error_count > 0 {
        format!("{} error", row.error_count)
    } else {
        row.error_count.to_string()
    };
    format!(
        "{} | {} | {} | {} | {} | {} | {}-{} | {} | {} | {} | {}",
        row.periodo,
        row.orden,
        row.cuit,
        row.pto_vta,
        row.cbte_tipo,
        or_dash(row.caea_code.as_deref()),
        row.cbte_from,
        row.cbte_to,
        row.invoices_count,
        row.informed_count,
        row.pending_inform_count,
        errors,
    )
}

pub fn format_assignment_rows(items: &[AssignmentRecord]) -> Vec<String> {
    items
        .iter()
        .take(ASSIGNMENT_ROWS)
        .map(format_assignment_row)
        .collect()
}

pub fn format_pos_list(rollup: &PosRollup) -> Vec<String> {
    if rollup.is_empty() {
        return vec!["No POS with CAEA movements yet.".to_string()];
    }
    rollup
        .ordered()
        .into_iter()
        .map(|(pos, entry)| {
            format!(
                "POS {} | types={} | invoices={}",
                pos,
                entry.display_types(),
                entry.total
            )
        })
        .collect()
}

pub fn format_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
