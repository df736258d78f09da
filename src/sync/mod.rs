use crate::auth::AuthError;
use crate::config::{FetchLimits, MonitorConfig, MonitorMode};
use crate::engine::{build_series, rollup_by_pos, BucketSeries, PosRollup};
use crate::ipc::paths;
use crate::models::{
    Alerts, AssignmentSnapshot, ErrorGroups, EventRecord, FilterState, LogRecord, MetricsSummary,
    Page, QueueSnapshot, TokenStatusReport,
};
use crate::network::{ApiClient, ApiError};
use crate::render::Renderer;
use chrono::Utc;
use scopeguard::guard;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

pub mod queries;
mod wsfe;

pub use wsfe::LookupError;

/// Everything one fan-out refresh fetched, plus the views derived from it.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub summary: MetricsSummary,
    pub logs: Page<LogRecord>,
    pub errors: ErrorGroups,
    pub tokens: TokenStatusReport,
    pub operations: serde_json::Value,
    pub alerts: Alerts,
    pub events: Page<EventRecord>,
    pub queue: QueueSnapshot,
    pub assignments: AssignmentSnapshot,
    pub series: BucketSeries,
    pub rollup: PosRollup,
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Rendered(Box<DashboardSnapshot>),
    /// Logs-only poll rendered this many records.
    RenderedLogs(usize),
    /// Carries the message written to the operations panel.
    Failed(String),
    /// A newer refresh started before this one finished; results were dropped.
    Superseded,
    /// A timer tick fired while the previous poll was still running.
    Skipped,
}

impl RefreshOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(
            self,
            RefreshOutcome::Rendered(_) | RefreshOutcome::RenderedLogs(_)
        )
    }
}

/// Dashboard orchestrator: fans out fetches, derives views and feeds the renderer.
/// It is the only error boundary for the periodic refresh.
#[derive(Clone)]
pub struct DashboardManager {
    pub(crate) api: ApiClient,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) filters: Arc<RwLock<FilterState>>,
    pub(crate) limits: FetchLimits,
    pub(crate) mode: MonitorMode,
    /// Single-flight for timer-driven polls
    pub(crate) is_polling: Arc<AtomicBool>,
    /// Issued refresh numbers; only the latest one may render.
    pub(crate) generation: Arc<AtomicU64>,
    /// Serialises the generation check with the render calls that follow it.
    pub(crate) render_lock: Arc<Mutex<()>>,
}

impl DashboardManager {
    pub fn new(api: ApiClient, renderer: Arc<dyn Renderer>) -> Self {
        Self::new_with_config(api, renderer, &MonitorConfig::default())
    }

    pub fn new_with_config(
        api: ApiClient,
        renderer: Arc<dyn Renderer>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            api,
            renderer,
            filters: Arc::new(RwLock::new(config.filters.clone().normalized())),
            limits: config.limits.clone(),
            mode: config.mode,
            is_polling: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            render_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn mode(&self) -> MonitorMode {
        self.mode
    }

    pub fn filters(&self) -> FilterState {
        match self.filters.read() {
            Ok(f) => f.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_filters(&self, filters: FilterState) {
        let filters = filters.normalized();
        info!("[SYNC] Filters updated: {:?}", filters);
        match self.filters.write() {
            Ok(mut current) => *current = filters,
            Err(poisoned) => *poisoned.into_inner() = filters,
        }
    }

    pub fn set_token(&self, token: &str) -> Result<(), AuthError> {
        self.api.credentials().set_token(token)?;
        info!("[AUTH] Token saved (present: {})", !token.trim().is_empty());
        Ok(())
    }

    /// Issues the nine dashboard requests concurrently. Any failure fails the whole join.
    async fn fetch_all(&self, filters: &FilterState) -> Result<DashboardSnapshot, ApiError> {
        let window = queries::window_query(filters);
        let summary_path = format!("{}{}", paths::METRICS_SUMMARY, window);
        let logs_path = format!(
            "{}{}",
            paths::LOGS,
            queries::logs_query(filters, self.limits.logs_page_size)
        );
        let errors_path = format!("{}{}", paths::ERRORS, queries::errors_query(filters));
        let operations_path = format!("{}{}", paths::OPERATIONS_SUMMARY, window);
        let events_path = format!(
            "{}{}",
            paths::EVENTS,
            queries::events_query(filters, self.limits.events_page_size)
        );
        let queue_path = format!(
            "{}{}",
            paths::CAEA_QUEUE,
            queries::limit_query(self.limits.queue_limit)
        );
        let assignments_path = format!(
            "{}{}",
            paths::CAEA_ASSIGNMENTS,
            queries::limit_query(self.limits.assignments_limit)
        );

        let (summary, logs, errors, tokens, operations, alerts, events, queue, assignments) = tokio::try_join!(
            self.api.get::<MetricsSummary>(&summary_path),
            self.api.get::<Page<LogRecord>>(&logs_path),
            self.api.get::<ErrorGroups>(&errors_path),
            self.api.get::<TokenStatusReport>(paths::TOKENS_STATUS),
            self.api.get::<serde_json::Value>(&operations_path),
            self.api.get::<Alerts>(paths::ALERTS),
            self.api.get::<Page<EventRecord>>(&events_path),
            self.api.get::<QueueSnapshot>(&queue_path),
            self.api.get::<AssignmentSnapshot>(&assignments_path),
        )?;

        let series = build_series(&logs.items, filters.window_minutes, Utc::now());
        if series.unparseable > 0 {
            warn!(
                "[SYNC] {} log records had unparseable timestamps and were not bucketed",
                series.unparseable
            );
        }
        let rollup = rollup_by_pos(&assignments.items);

        Ok(DashboardSnapshot {
            summary,
            logs,
            errors,
            tokens,
            operations,
            alerts,
            events,
            queue,
            assignments,
            series,
            rollup,
        })
    }

    fn render_snapshot(&self, snapshot: &DashboardSnapshot) {
        let r = &self.renderer;
        r.render_metrics(&snapshot.summary);
        r.render_tokens(&snapshot.tokens);
        r.render_logs(&snapshot.logs.items);
        r.render_events(&snapshot.events.items);
        r.render_errors(&snapshot.errors.items);
        r.render_alerts(&snapshot.alerts.active);
        r.render_queue(&snapshot.queue);
        r.render_assignments(&snapshot.assignments);
        r.render_pos_list(&snapshot.rollup);
        r.render_operations(&snapshot.operations);
        r.render_series(&snapshot.series);
        r.commit();
    }

    /// Full refresh. Renders every panel on success; on failure only the
    /// operations panel gets the error and the rest keep their last content.
    pub async fn refresh_all(&self) -> RefreshOutcome {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let filters = self.filters();
        debug!("[SYNC] Refresh #{} started (window {}m)", generation, filters.window_minutes);

        let result = self.fetch_all(&filters).await;

        let _render = self.render_lock.lock().unwrap_or_else(|p| p.into_inner());
        let latest = self.generation.load(Ordering::Acquire);
        if latest != generation {
            info!(
                "[SYNC] Refresh #{} superseded by #{}, discarding its results",
                generation, latest
            );
            return RefreshOutcome::Superseded;
        }

        match result {
            Ok(snapshot) => {
                self.render_snapshot(&snapshot);
                info!(
                    "[SYNC] Refresh #{} rendered: {} logs, {} events, {} queue items, {} POS",
                    generation,
                    snapshot.logs.items.len(),
                    snapshot.events.items.len(),
                    snapshot.queue.items.len(),
                    snapshot.rollup.len()
                );
                RefreshOutcome::Rendered(Box::new(snapshot))
            }
            Err(e) => {
                error!("[SYNC] Refresh #{} failed: {}", generation, e);
                let message = format!("Monitor refresh failed: {}", e);
                self.renderer.render_operations_failure(&message);
                self.renderer.commit();
                RefreshOutcome::Failed(message)
            }
        }
    }

    /// Logs-viewer poll: one request, extended table.
    async fn poll_log_view(&self) -> RefreshOutcome {
        let filters = self.filters();
        let path = format!(
            "{}{}",
            paths::LOGS,
            queries::logs_query(&filters, self.limits.log_view_page_size)
        );
        match self.api.get::<Page<LogRecord>>(&path).await {
            Ok(page) => {
                self.renderer.render_log_view(&page.items);
                self.renderer.commit();
                RefreshOutcome::RenderedLogs(page.items.len())
            }
            Err(e) => {
                error!("[SYNC] Logs refresh failed: {}", e);
                RefreshOutcome::Failed(format!("Logs refresh failed: {}", e))
            }
        }
    }

    /// Timer entry point. Skips the tick if the previous poll has not finished.
    /// The flag is reset via scopeguard, even on panic.
    pub async fn poll_once(&self) -> RefreshOutcome {
        if self
            .is_polling
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            debug!("[SYNC] Previous poll still in flight, skipping tick");
            return RefreshOutcome::Skipped;
        }

        let _guard = guard((), |_| {
            self.is_polling.store(false, Ordering::Release);
        });

        self.refresh().await
    }

    /// Refresh for the configured mode: the full fan-out on the dashboard,
    /// only the extended log table in the logs viewer.
    pub async fn refresh(&self) -> RefreshOutcome {
        match self.mode {
            MonitorMode::Dashboard => self.refresh_all().await,
            MonitorMode::LogsOnly => self.poll_log_view().await,
        }
    }

    // On-demand handlers: a single resource each, errors go straight to the caller.

    pub async fn refresh_logs(&self) -> Result<usize, ApiError> {
        let filters = self.filters();
        let path = format!(
            "{}{}",
            paths::LOGS,
            queries::logs_query(&filters, self.limits.logs_page_size)
        );
        let page: Page<LogRecord> = self.api.get(&path).await?;
        self.renderer.render_logs(&page.items);
        self.renderer.commit();
        Ok(page.items.len())
    }

    pub async fn refresh_events(&self) -> Result<usize, ApiError> {
        let filters = self.filters();
        let path = format!(
            "{}{}",
            paths::EVENTS,
            queries::events_query(&filters, self.limits.events_page_size)
        );
        let page: Page<EventRecord> = self.api.get(&path).await?;
        self.renderer.render_events(&page.items);
        self.renderer.commit();
        Ok(page.items.len())
    }

    pub async fn refresh_queue(&self) -> Result<QueueSnapshot, ApiError> {
        let path = format!(
            "{}{}",
            paths::CAEA_QUEUE,
            queries::limit_query(self.limits.queue_limit)
        );
        let queue: QueueSnapshot = self.api.get(&path).await?;
        self.renderer.render_queue(&queue);
        self.renderer.commit();
        Ok(queue)
    }

    /// Asks the backend to retry up to `retry_batch` jobs, then re-reads the queue.
    /// Local state is never updated optimistically.
    pub async fn retry_queue(&self) -> Result<QueueSnapshot, ApiError> {
        let path = format!(
            "{}{}",
            paths::CAEA_QUEUE_RETRY,
            queries::limit_query(self.limits.retry_batch)
        );
        let result: serde_json::Value = self.api.post_json(&path, None).await?;
        info!("[SYNC] Queue retry requested: {}", result);
        self.refresh_queue().await
    }

    pub async fn refresh_assignments(&self) -> Result<PosRollup, ApiError> {
        let path = format!(
            "{}{}",
            paths::CAEA_ASSIGNMENTS,
            queries::limit_query(self.limits.assignments_limit)
        );
        let assignments: AssignmentSnapshot = self.api.get(&path).await?;
        let rollup = rollup_by_pos(&assignments.items);
        self.renderer.render_assignments(&assignments);
        self.renderer.render_pos_list(&rollup);
        self.renderer.commit();
        Ok(rollup)
    }
}
