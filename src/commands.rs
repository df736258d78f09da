//! Operator commands read line by line from stdin.
use crate::config::MonitorMode;
use crate::models::{ParamsRequest, StatusFilter};
use crate::sync::{DashboardManager, RefreshOutcome};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh,
    Logs,
    Events,
    Queue,
    Retry,
    Assignments,
    Token(String),
    Filter(Vec<(String, String)>),
    Pos(i64),
    Params(ParamsRequest),
    Help,
    Quit,
}

#[derive(Debug, PartialEq)]
pub enum CommandError {
    Unknown(String),
    InvalidArgument(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(s) => write!(f, "Unknown command '{}', try 'help'", s),
            CommandError::InvalidArgument(s) => write!(f, "Invalid argument: {}", s),
        }
    }
}

impl std::error::Error for CommandError {}

pub const HELP: &str = "\
commands:
  refresh                      refresh the dashboard (or the log table in logs mode)
  logs | events | queue        reload a single panel
  assignments                  reload assignments and POS list
  retry                        retry failed CAEA jobs, then reload the queue
  token <jwt>                  save bearer token (empty clears) and refresh
  filter key=value ...         service, status (ok|error|any), window, endpoint, error_type
  pos <cuit>                   WSFE points of sale
  params <cuit> [mon=USD] [date=YYYYMMDD] [pto=N] [tipo=N] [nro=N]
  quit";

fn key_values(args: &[&str]) -> Result<Vec<(String, String)>, CommandError> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
                .ok_or_else(|| CommandError::InvalidArgument(format!("expected key=value, got '{}'", arg)))
        })
        .collect()
}

/// Blank input parses as 0, which the lookups treat as "not provided".
fn number(value: &str, what: &str) -> Result<i64, CommandError> {
    if value.trim().is_empty() {
        return Ok(0);
    }
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| CommandError::InvalidArgument(format!("{} must be a number, got '{}'", what, value)))
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err(CommandError::Unknown(String::new()));
    };
    let args: Vec<&str> = parts.collect();

    match head.to_ascii_lowercase().as_str() {
        "refresh" | "r" => Ok(Command::Refresh),
        "logs" => Ok(Command::Logs),
        "events" => Ok(Command::Events),
        "queue" => Ok(Command::Queue),
        "retry" => Ok(Command::Retry),
        "assignments" => Ok(Command::Assignments),
        "token" => Ok(Command::Token(args.join(" "))),
        "filter" => Ok(Command::Filter(key_values(&args)?)),
        "pos" => Ok(Command::Pos(number(args.first().copied().unwrap_or(""), "cuit")?)),
        "params" => {
            let cuit = number(args.first().copied().unwrap_or(""), "cuit")?;
            let mut request = ParamsRequest {
                cuit,
                ..Default::default()
            };
            for (key, value) in key_values(args.get(1..).unwrap_or(&[]))? {
                match key.as_str() {
                    "mon" => request.mon_id = Some(value),
                    "date" => request.fch_cotiz = Some(value),
                    "pto" => request.pto_vta = number(&value, "pto")?,
                    "tipo" => request.cbte_tipo = number(&value, "tipo")?,
                    "nro" => request.cbte_nro = number(&value, "nro")?,
                    other => {
                        return Err(CommandError::InvalidArgument(format!(
                            "unknown params key '{}'",
                            other
                        )))
                    }
                }
            }
            Ok(Command::Params(request))
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn describe(outcome: &RefreshOutcome) -> String {
    match outcome {
        RefreshOutcome::Rendered(snapshot) => format!(
            "refreshed: {} logs, {} events, {} POS",
            snapshot.logs.items.len(),
            snapshot.events.items.len(),
            snapshot.rollup.len()
        ),
        RefreshOutcome::RenderedLogs(n) => format!("refreshed: {} logs", n),
        RefreshOutcome::Failed(message) => message.clone(),
        RefreshOutcome::Superseded => "refresh superseded by a newer one".to_string(),
        RefreshOutcome::Skipped => "refresh skipped".to_string(),
    }
}

/// Applies `key=value` pairs to the current filters.
pub fn apply_filter(manager: &DashboardManager, pairs: &[(String, String)]) -> Result<(), String> {
    let mut filters = manager.filters();
    for (key, value) in pairs {
        let text = if value.is_empty() { None } else { Some(value.clone()) };
        match key.as_str() {
            "service" => filters.service = text,
            "status" => {
                filters.status = StatusFilter::parse(value)
                    .ok_or_else(|| format!("status must be ok, error or any, got '{}'", value))?
            }
            "window" => {
                filters.window_minutes = value
                    .parse::<u32>()
                    .map_err(|_| format!("window must be a positive number, got '{}'", value))?
            }
            "endpoint" => filters.log_endpoint = text,
            "error_type" => filters.log_error_type = text,
            other => return Err(format!("unknown filter '{}'", other)),
        }
    }
    manager.set_filters(filters);
    Ok(())
}

/// Runs one command. Errors from the per-panel handlers are passed through untouched.
pub async fn execute(manager: &DashboardManager, command: Command) -> Result<String, String> {
    match &command {
        Command::Token(_) => info!("[CMD] Token(<redacted>)"),
        other => info!("[CMD] {:?}", other),
    }
    match command {
        Command::Refresh => Ok(describe(&manager.refresh().await)),
        Command::Logs if manager.mode() == MonitorMode::LogsOnly => {
            match manager.refresh().await {
                RefreshOutcome::Failed(message) => Err(message),
                outcome => Ok(describe(&outcome)),
            }
        }
        Command::Logs => manager
            .refresh_logs()
            .await
            .map(|n| format!("logs: {} records", n))
            .map_err(|e| e.to_string()),
        Command::Events => manager
            .refresh_events()
            .await
            .map(|n| format!("events: {} records", n))
            .map_err(|e| e.to_string()),
        Command::Queue => manager
            .refresh_queue()
            .await
            .map(|q| format!("queue: {} items", q.items.len()))
            .map_err(|e| e.to_string()),
        Command::Retry => manager
            .retry_queue()
            .await
            .map(|q| format!("retry requested, {} failed jobs remain", q.summary.failed))
            .map_err(|e| e.to_string()),
        Command::Assignments => manager
            .refresh_assignments()
            .await
            .map(|rollup| format!("assignments: {} POS", rollup.len()))
            .map_err(|e| e.to_string()),
        Command::Token(token) => {
            manager
                .set_token(&token)
                .map_err(|e| format!("Failed to save token: {}", e))?;
            Ok(describe(&manager.refresh().await))
        }
        Command::Filter(pairs) => {
            apply_filter(manager, &pairs)?;
            Ok(describe(&manager.refresh().await))
        }
        Command::Pos(cuit) => manager
            .lookup_points_of_sale(cuit)
            .await
            .map(|_| format!("points of sale loaded for {}", cuit))
            .map_err(|e| e.to_string()),
        Command::Params(request) => manager
            .lookup_params_snapshot(&request)
            .await
            .map(|_| format!("params snapshot loaded for {}", request.cuit))
            .map_err(|e| e.to_string()),
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok("bye".to_string()),
    }
}
