use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

mod auth;
mod commands;
mod config;
mod engine;
mod ipc;
mod models;
mod monitor;
mod network;
mod query;
mod render;
mod sync;

#[cfg(test)]
mod tests;

pub use auth::{AuthError, CredentialProvider, FileCredentials, KeyringCredentials, MemoryCredentials};
pub use commands::{execute, parse_command, Command, CommandError};
pub use config::{FetchLimits, MonitorConfig, MonitorMode, TokenStore};
pub use engine::{build_series, bucket_minutes_for_window, rollup_by_pos, BucketSeries, PosEntry, PosRollup};
pub use models::*;
pub use monitor::PollingMonitor;
pub use network::{ApiClient, ApiError};
pub use query::{build_query, QueryBuilder, QueryValue};
pub use render::sparkline::{sparkline_svg, sparkline_text, svg_data_uri};
pub use render::{ConsoleRenderer, Panel, Renderer};
pub use sync::{DashboardManager, DashboardSnapshot, LookupError, RefreshOutcome};

fn credential_provider(config: &MonitorConfig) -> Arc<dyn CredentialProvider> {
    match config.token_store {
        TokenStore::Memory => Arc::new(MemoryCredentials::new()),
        TokenStore::File => Arc::new(FileCredentials::new(config.token_file.clone())),
        TokenStore::Keyring => match KeyringCredentials::new() {
            Ok(keyring) => Arc::new(keyring),
            Err(e) => {
                warn!(
                    "[AUTH] Keyring unavailable ({}), falling back to {}",
                    e,
                    config.token_file.display()
                );
                Arc::new(FileCredentials::new(config.token_file.clone()))
            }
        },
    }
}

/// Reads operator commands until `quit`, EOF or Ctrl-C.
async fn command_loop(manager: DashboardManager) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("[APP] Interrupted");
                return;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                error!("[APP] Failed to read stdin: {}", e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("[CMD] {}", e);
                continue;
            }
        };
        let quit = command == Command::Quit;
        match execute(&manager, command).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => error!("[CMD] {}", e),
        }
        if quit {
            return;
        }
    }
}

pub fn run() {
    // Default to info when RUST_LOG is unset so the [SYNC]/[AUTH] lines are visible.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MonitorConfig::from_env();
    info!(
        "[APP] Monitoring {} every {}s ({:?} mode)",
        config.api_base_url,
        config.poll_interval.as_secs_f64(),
        config.mode
    );

    let credentials = credential_provider(&config);
    if let Some(token) = &config.token {
        if let Err(e) = credentials.set_token(token) {
            warn!("[AUTH] Failed to store token from environment: {}", e);
        }
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("[APP] Failed to create runtime: {}", e);
            return;
        }
    };

    rt.block_on(async {
        let api = ApiClient::with_timeout(&config.api_base_url, credentials, config.request_timeout);
        let renderer = Arc::new(ConsoleRenderer::stdout(config.svg_dir.clone()));
        let manager = DashboardManager::new_with_config(api, renderer, &config);

        let monitor = PollingMonitor::new();
        monitor.start(manager.clone(), config.poll_interval);

        command_loop(manager).await;
        monitor.stop();
    });
    info!("[APP] Shut down");
}
