use crate::models::{FilterState, StatusFilter};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Which poll loop the monitor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorMode {
    /// Nine-resource fan-out refresh.
    Dashboard,
    /// Logs table only.
    LogsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStore {
    Memory,
    File,
    Keyring,
}

/// Page sizes and batch limits sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchLimits {
    pub logs_page_size: u32,
    pub log_view_page_size: u32,
    pub events_page_size: u32,
    pub queue_limit: u32,
    pub assignments_limit: u32,
    pub retry_batch: u32,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            logs_page_size: 300,
            log_view_page_size: 500,
            events_page_size: 200,
            queue_limit: 200,
            assignments_limit: 200,
            retry_batch: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub api_base_url: String,
    pub poll_interval: Duration,
    /// `None` keeps requests unbounded.
    pub request_timeout: Option<Duration>,
    pub mode: MonitorMode,
    pub token: Option<String>,
    pub token_store: TokenStore,
    pub token_file: PathBuf,
    pub svg_dir: Option<PathBuf>,
    pub filters: FilterState,
    pub limits: FetchLimits,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            poll_interval: Duration::from_secs(15),
            request_timeout: None,
            mode: MonitorMode::Dashboard,
            token: None,
            token_store: TokenStore::File,
            token_file: default_token_file(),
            svg_dir: None,
            filters: FilterState::default(),
            limits: FetchLimits::default(),
        }
    }
}

fn default_token_file() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(format!(".{}", crate::ipc::STORED_TOKEN_KEY))
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source; unknown or invalid
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get("AFRELAY_MONITOR_URL") {
            config.api_base_url = url;
        }
        config.token = get("AFRELAY_MONITOR_TOKEN");
        if let Some(store) = get("AFRELAY_MONITOR_TOKEN_STORE") {
            config.token_store = match store.to_ascii_lowercase().as_str() {
                "memory" => TokenStore::Memory,
                "file" => TokenStore::File,
                "keyring" => TokenStore::Keyring,
                other => {
                    warn!("[CONFIG] Unknown token store '{}', using file", other);
                    TokenStore::File
                }
            };
        }
        if let Some(path) = get("AFRELAY_MONITOR_TOKEN_FILE") {
            config.token_file = PathBuf::from(path);
        }
        if let Some(secs) = parse_number::<u64>(get("AFRELAY_MONITOR_INTERVAL_SECS"), "AFRELAY_MONITOR_INTERVAL_SECS") {
            if secs > 0 {
                config.poll_interval = Duration::from_secs(secs);
            }
        }
        config.request_timeout =
            parse_number::<u64>(get("AFRELAY_MONITOR_TIMEOUT_SECS"), "AFRELAY_MONITOR_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs);
        if let Some(mode) = get("AFRELAY_MONITOR_MODE") {
            config.mode = match mode.to_ascii_lowercase().as_str() {
                "logs" => MonitorMode::LogsOnly,
                "dashboard" => MonitorMode::Dashboard,
                other => {
                    warn!("[CONFIG] Unknown mode '{}', using dashboard", other);
                    MonitorMode::Dashboard
                }
            };
        }
        config.svg_dir = get("AFRELAY_MONITOR_SVG_DIR").map(PathBuf::from);

        let status = match get("AFRELAY_MONITOR_STATUS") {
            Some(raw) => StatusFilter::parse(&raw).unwrap_or_else(|| {
                warn!("[CONFIG] Unknown status filter '{}', ignoring", raw);
                StatusFilter::Any
            }),
            None => StatusFilter::Any,
        };
        config.filters = FilterState {
            service: get("AFRELAY_MONITOR_SERVICE"),
            status,
            window_minutes: parse_number::<u32>(get("AFRELAY_MONITOR_WINDOW"), "AFRELAY_MONITOR_WINDOW")
                .unwrap_or(60),
            log_endpoint: get("AFRELAY_MONITOR_ENDPOINT"),
            log_error_type: get("AFRELAY_MONITOR_ERROR_TYPE"),
        }
        .normalized();

        config
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, key: &str) -> Option<T> {
    let raw = value?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("[CONFIG] Invalid value for {}: '{}', using default", key, raw);
            None
        }
    }
}
