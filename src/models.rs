use serde::{Deserialize, Serialize};

/// Request status filter as understood by `/ui/logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Any,
    Ok,
    Error,
}

impl StatusFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Some(StatusFilter::Any),
            "ok" => Some(StatusFilter::Ok),
            "error" => Some(StatusFilter::Error),
            _ => None,
        }
    }

    /// Value for the logs endpoint (`ok` / `error` / empty).
    pub fn as_log_status(&self) -> &'static str {
        match self {
            StatusFilter::Any => "",
            StatusFilter::Ok => "ok",
            StatusFilter::Error => "error",
        }
    }

    /// Domain events use `success` where request logs use `ok`.
    pub fn as_event_status(&self) -> &'static str {
        match self {
            StatusFilter::Any => "",
            StatusFilter::Ok => "success",
            StatusFilter::Error => "error",
        }
    }
}

/// Operator-selected filters, read fresh on every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub service: Option<String>,
    pub status: StatusFilter,
    pub window_minutes: u32,
    pub log_endpoint: Option<String>,
    pub log_error_type: Option<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            service: None,
            status: StatusFilter::Any,
            window_minutes: 60,
            log_endpoint: None,
            log_error_type: None,
        }
    }
}

impl FilterState {
    /// Normalises user input: trims text filters, drops empty ones, keeps the window positive.
    pub fn normalized(mut self) -> Self {
        self.service = non_empty(self.service);
        self.log_endpoint = non_empty(self.log_endpoint);
        self.log_error_type = non_empty(self.log_error_type);
        self.window_minutes = self.window_minutes.max(1);
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    #[serde(default)]
    pub window_minutes: Option<u32>,
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub p95_ms: f64,
    #[serde(default)]
    pub avg_ms: f64,
}

/// One request log entry as served by `/ui/logs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub path: String,
    pub status_code: u16,
    pub ok: bool,
    #[serde(default)]
    pub duration_ms: f64,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub cuit: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: String,
    pub event_type: String,
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
}

impl EventRecord {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Paged listing envelope shared by logs and events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: None,
            page_size: None,
            total: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorGroup {
    pub key: String,
    pub count: u64,
    #[serde(default)]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorGroups {
    #[serde(default)]
    pub items: Vec<ErrorGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenStatus {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Validity of both backend credential kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenStatusReport {
    #[serde(default)]
    pub wsaa: Option<TokenStatus>,
    #[serde(default)]
    pub wspci: Option<TokenStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub severity: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alerts {
    #[serde(default)]
    pub active: Vec<AlertRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Retrying,
    Processing,
    Done,
    Failed,
    #[serde(other)]
    Unknown,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Retrying => "retrying",
            QueueStatus::Processing => "processing",
            QueueStatus::Done => "done",
            QueueStatus::Failed => "failed",
            QueueStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub job_type: String,
    pub status: QueueStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub next_retry_at: Option<String>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Per-status job counts; statuses missing from the payload count as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub retrying: u64,
    #[serde(default)]
    pub processing: u64,
    #[serde(default)]
    pub done: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default)]
    pub summary: QueueSummary,
    #[serde(default)]
    pub items: Vec<QueueItem>,
}

/// CAEA number range assigned to a point of sale for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub periodo: i64,
    pub orden: i64,
    pub cuit: i64,
    pub pto_vta: i64,
    pub cbte_tipo: i64,
    #[serde(default)]
    pub caea_code: Option<String>,
    #[serde(default)]
    pub cbte_from: i64,
    #[serde(default)]
    pub cbte_to: i64,
    #[serde(default)]
    pub invoices_count: i64,
    #[serde(default)]
    pub informed_count: i64,
    #[serde(default)]
    pub pending_inform_count: i64,
    #[serde(default)]
    pub error_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub items: Vec<AssignmentRecord>,
}

impl AssignmentSnapshot {
    pub fn row_count(&self) -> u64 {
        self.count.unwrap_or(self.items.len() as u64)
    }
}

/// Inputs for the WSFE parameter snapshot; zero means "not provided".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamsRequest {
    pub cuit: i64,
    pub mon_id: Option<String>,
    pub fch_cotiz: Option<String>,
    pub pto_vta: i64,
    pub cbte_tipo: i64,
    pub cbte_nro: i64,
}
