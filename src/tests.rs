use crate::auth::*;
use crate::engine::*;
use crate::ipc::{paths, wsfe};
use crate::models::*;
use crate::network::*;
use crate::render::{ConsoleRenderer, Panel, Renderer};
use crate::sync::*;
use crate::*;
use chrono::{Duration as ChronoDuration, Utc};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(test)]
mod tests {
    use super::*;

    fn log_at(timestamp: &str, ok: bool) -> LogRecord {
        LogRecord {
            timestamp: timestamp.to_string(),
            path: "/wsfe/invoices".to_string(),
            status_code: if ok { 200 } else { 500 },
            ok,
            duration_ms: 10.0,
            service: Some("wsfe".to_string()),
            error_type: None,
            trace_id: None,
            method: Some("POST".to_string()),
            cuit: None,
        }
    }

    fn assignment(pto_vta: i64, cbte_tipo: i64, invoices_count: i64) -> AssignmentRecord {
        AssignmentRecord {
            periodo: 202405,
            orden: 1,
            cuit: 20111111112,
            pto_vta,
            cbte_tipo,
            caea_code: Some("12345678901234".to_string()),
            cbte_from: 1,
            cbte_to: 100,
            invoices_count,
            informed_count: 0,
            pending_inform_count: invoices_count,
            error_count: 0,
        }
    }

    /// Records which renderer hooks were called, in order.
    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingRenderer {
        fn record(&self, name: &str) {
            self.calls.lock().unwrap().push(name.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Renderer for RecordingRenderer {
        fn render_metrics(&self, _: &MetricsSummary) {
            self.record("metrics");
        }
        fn render_tokens(&self, _: &TokenStatusReport) {
            self.record("tokens");
        }
        fn render_logs(&self, _: &[LogRecord]) {
            self.record("logs");
        }
        fn render_log_view(&self, _: &[LogRecord]) {
            self.record("log_view");
        }
        fn render_events(&self, _: &[EventRecord]) {
            self.record("events");
        }
        fn render_errors(&self, _: &[ErrorGroup]) {
            self.record("errors");
        }
        fn render_alerts(&self, _: &[AlertRecord]) {
            self.record("alerts");
        }
        fn render_queue(&self, _: &QueueSnapshot) {
            self.record("queue");
        }
        fn render_assignments(&self, _: &AssignmentSnapshot) {
            self.record("assignments");
        }
        fn render_pos_list(&self, _: &PosRollup) {
            self.record("pos_list");
        }
        fn render_operations(&self, _: &serde_json::Value) {
            self.record("operations");
        }
        fn render_operations_failure(&self, _: &str) {
            self.record("operations_failure");
        }
        fn render_series(&self, _: &BucketSeries) {
            self.record("series");
        }
        fn render_wsfe(&self, panel: Panel, _: &str) {
            self.record(&format!("wsfe:{}", panel.title()));
        }
        fn commit(&self) {
            self.record("commit");
        }
    }

    fn manager_for(
        server: &MockServer,
        credentials: Arc<dyn CredentialProvider>,
        renderer: Arc<dyn Renderer>,
    ) -> DashboardManager {
        DashboardManager::new(ApiClient::new(&server.base_url(), credentials), renderer)
    }

    /// Mounts the nine dashboard endpoints. `failing` answers 500 instead.
    async fn mount_dashboard(server: &MockServer, failing: Option<&str>, delay_ms: u64) {
        let now = Utc::now();
        let recent = (now - ChronoDuration::minutes(5)).to_rfc3339();
        let bodies = vec![
            (
                paths::METRICS_SUMMARY,
                json!({"window_minutes": 60, "total_requests": 10, "error_count": 1, "p95_ms": 120.5, "avg_ms": 40.0}),
            ),
            (
                paths::LOGS,
                json!({"items": [
                    {"timestamp": recent, "path": "/wsfe/invoices", "status_code": 200, "ok": true, "duration_ms": 12.0},
                    {"timestamp": recent, "path": "/wsfe/invoices", "status_code": 502, "ok": false, "duration_ms": 80.0, "error_type": "upstream"}
                ], "page": 1, "page_size": 300, "total": 2}),
            ),
            (paths::ERRORS, json!({"items": [{"key": "upstream", "count": 1}]})),
            (
                paths::TOKENS_STATUS,
                json!({"wsaa": {"valid": true, "expires_at": "2024-05-01T10:00:00Z"}, "wspci": {"valid": false, "last_error": "expired"}}),
            ),
            (paths::OPERATIONS_SUMMARY, json!({"invoices": 3})),
            (paths::ALERTS, json!({"active": [{"severity": "warning", "title": "Queue backlog"}]})),
            (
                paths::EVENTS,
                json!({"items": [{"timestamp": recent, "event_type": "caea.request", "status": "success", "service": "wsfe"}]}),
            ),
            (
                paths::CAEA_QUEUE,
                json!({"summary": {"pending": 1, "failed": 2}, "items": [{"id": 7, "job_type": "inform", "status": "failed", "attempts": 3}]}),
            ),
            (
                paths::CAEA_ASSIGNMENTS,
                json!({"count": 3, "items": [
                    {"periodo": 202405, "orden": 1, "cuit": 20111111112i64, "pto_vta": 1, "cbte_tipo": 1, "invoices_count": 5},
                    {"periodo": 202405, "orden": 1, "cuit": 20111111112i64, "pto_vta": 1, "cbte_tipo": 2, "invoices_count": 3},
                    {"periodo": 202405, "orden": 1, "cuit": 20111111112i64, "pto_vta": 2, "cbte_tipo": 6, "invoices_count": 7}
                ]}),
            ),
        ];

        for (path, body) in bodies {
            let fail = failing == Some(path);
            server
                .mock_async(|when, then| {
                    when.method(GET).path(path);
                    let then = then.delay(Duration::from_millis(delay_ms));
                    if fail {
                        then.status(500).body("boom");
                    } else {
                        then.status(200)
                            .header("content-type", "application/json")
                            .json_body(body.clone());
                    }
                })
                .await;
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_empty_builder_yields_empty_string() {
            assert_eq!(QueryBuilder::new().build(), "");
            assert_eq!(
                QueryBuilder::new()
                    .param("service", "")
                    .param("status", None::<String>)
                    .build(),
                ""
            );
        }

        #[test]
        fn test_keeps_insertion_order_and_encodes() {
            let query = QueryBuilder::new()
                .param("page", 1u32)
                .param("service", "wsfe api")
                .param("endpoint", "/a&b")
                .build();
            assert_eq!(query, "?page=1&service=wsfe%20api&endpoint=%2Fa%26b");
        }

        #[test]
        fn test_zero_is_kept() {
            assert_eq!(QueryBuilder::new().param("limit", 0i64).build(), "?limit=0");
        }
    }

    mod series_tests {
        use super::*;

        #[test]
        fn test_bucket_count_small_window() {
            let now = Utc::now();
            for window in [1u32, 15, 60, 180] {
                let series = build_series(&[], window, now);
                assert_eq!(series.bucket_minutes, 1);
                assert_eq!(series.len(), window as usize);
                assert_eq!(series.errors.len(), series.requests.len());
            }
        }

        #[test]
        fn test_bucket_count_large_window() {
            let series = build_series(&[], 360, Utc::now());
            assert_eq!(series.bucket_minutes, 3);
            assert_eq!(series.len(), 120);

            let series = build_series(&[], 1440, Utc::now());
            assert_eq!(series.bucket_minutes, 12);
            assert_eq!(series.len(), 120);

            assert_eq!(bucket_minutes_for_window(181), 2);
        }

        #[test]
        fn test_record_at_now_lands_in_last_bucket() {
            let now = Utc::now();
            let records = vec![log_at(&now.to_rfc3339(), true)];
            let series = build_series(&records, 60, now);
            assert_eq!(series.requests[59], 1);
            assert_eq!(series.requests.iter().sum::<u64>(), 1);
        }

        #[test]
        fn test_error_counted_in_same_bucket() {
            let now = Utc::now();
            let ts = (now - ChronoDuration::seconds(90)).to_rfc3339();
            let records = vec![log_at(&ts, false), log_at(&ts, true)];
            let series = build_series(&records, 60, now);
            let idx = series
                .requests
                .iter()
                .position(|&n| n > 0)
                .expect("one bucket should be filled");
            assert_eq!(series.requests[idx], 2);
            assert_eq!(series.errors[idx], 1);
            assert_eq!(series.errors.iter().sum::<u64>(), 1);
        }

        #[test]
        fn test_invalid_and_out_of_window_records_are_skipped() {
            let now = Utc::now();
            let old = (now - ChronoDuration::hours(3)).to_rfc3339();
            let future = (now + ChronoDuration::minutes(5)).to_rfc3339();
            let records = vec![
                log_at("not a date", false),
                log_at(&old, true),
                log_at(&future, true),
            ];
            let series = build_series(&records, 60, now);
            assert_eq!(series.requests.iter().sum::<u64>(), 0);
            assert_eq!(series.errors.iter().sum::<u64>(), 0);
            assert_eq!(series.unparseable, 1);
            assert_eq!(series.out_of_window, 2);
            assert_eq!(series.skipped(), 3);
        }

        #[test]
        fn test_total_never_exceeds_records() {
            let now = Utc::now();
            let records: Vec<LogRecord> = (0..50)
                .map(|i| log_at(&(now - ChronoDuration::minutes(i * 3)).to_rfc3339(), i % 4 != 0))
                .collect();
            let series = build_series(&records, 90, now);
            let total: u64 = series.requests.iter().sum();
            assert!(total as usize <= records.len());
            assert_eq!(total as usize + series.skipped(), records.len());
            for (r, e) in series.requests.iter().zip(&series.errors) {
                assert!(e <= r);
            }
        }

        #[test]
        fn test_zero_window_is_empty() {
            let now = Utc::now();
            let series = build_series(&[log_at(&now.to_rfc3339(), true)], 0, now);
            assert!(series.is_empty());
        }
    }

    mod rollup_tests {
        use super::*;

        #[test]
        fn test_rollup_groups_by_pos() {
            let records = vec![assignment(1, 1, 5), assignment(1, 2, 3), assignment(2, 6, 7)];
            let rollup = rollup_by_pos(&records);

            assert_eq!(rollup.len(), 2);
            let pos1 = rollup.get("1").unwrap();
            assert_eq!(pos1.total, 8);
            assert_eq!(pos1.sorted_types(), vec!["1", "2"]);
            assert_eq!(pos1.display_types(), "1, 2");
            assert_eq!(rollup.get("2").unwrap().total, 7);
            assert_eq!(rollup.keys(), vec!["1", "2"]);
        }

        #[test]
        fn test_rollup_orders_numerically() {
            let records = vec![assignment(10, 11, 1), assignment(2, 1, 1), assignment(1, 1, 1)];
            assert_eq!(rollup_by_pos(&records).keys(), vec!["1", "2", "10"]);
        }

        #[test]
        fn test_rollup_is_deterministic() {
            let records = vec![assignment(3, 1, 2), assignment(3, 1, 4), assignment(4, 6, 1)];
            assert_eq!(rollup_by_pos(&records), rollup_by_pos(&records));
            assert_eq!(rollup_by_pos(&records).get("3").unwrap().types.len(), 1);
            assert!(rollup_by_pos(&[]).is_empty());
        }
    }

    mod credentials_tests {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn test_memory_credentials() {
            let creds = MemoryCredentials::new();
            assert_eq!(creds.get_token(), None);
            creds.set_token("  abc  ").unwrap();
            assert_eq!(creds.get_token(), Some("abc".to_string()));
            creds.set_token("").unwrap();
            assert_eq!(creds.get_token(), None);
        }

        #[test]
        fn test_file_credentials_roundtrip_and_clear() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("nested").join("token");
            let creds = FileCredentials::new(&path);

            assert_eq!(creds.get_token(), None);
            creds.set_token("jwt-value").unwrap();
            assert_eq!(std::fs::read_to_string(&path).unwrap(), "jwt-value");
            assert_eq!(creds.get_token(), Some("jwt-value".to_string()));

            creds.set_token("   ").unwrap();
            assert!(!path.exists());
            assert_eq!(creds.get_token(), None);
            // Clearing twice is fine
            creds.set_token("").unwrap();
        }
    }

    mod api_client_tests {
        use super::*;

        #[test]
        fn test_bearer_header_only_with_token() {
            let anonymous = ApiClient::new("http://localhost:8000/", Arc::new(MemoryCredentials::new()));
            let request = anonymous.get_request(paths::ALERTS).build().unwrap();
            assert!(request.headers().get("authorization").is_none());
            assert_eq!(request.url().as_str(), "http://localhost:8000/ui/alerts");

            let authed = ApiClient::new(
                "http://localhost:8000",
                Arc::new(MemoryCredentials::with_token("abc")),
            );
            let request = authed.get_request(paths::ALERTS).build().unwrap();
            assert_eq!(request.headers().get("authorization").unwrap(), "Bearer abc");
        }

        #[test]
        fn test_post_request_sends_json() {
            let api = ApiClient::new("http://localhost:8000", Arc::new(MemoryCredentials::new()));
            let request = api.post_request(paths::CAEA_QUEUE_RETRY, None).build().unwrap();
            assert_eq!(
                request.headers().get("content-type").unwrap(),
                "application/json"
            );
            let body = request.body().and_then(|b| b.as_bytes()).unwrap();
            assert_eq!(body, b"{}");
        }

        #[tokio::test]
        async fn test_get_parses_json() {
            let server = MockServer::start_async().await;
            let mock = server
                .mock_async(|when, then| {
                    when.method(GET).path("/ui/thing").header("Authorization", "Bearer t0k");
                    then.status(200).json_body(json!({"a": 1}));
                })
                .await;

            let api = ApiClient::new(&server.base_url(), Arc::new(MemoryCredentials::with_token("t0k")));
            let value: serde_json::Value = api.get("/ui/thing").await.unwrap();
            assert_eq!(value, json!({"a": 1}));
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn test_non_success_carries_status_and_body() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/ui/missing");
                    then.status(404).body("not found");
                })
                .await;

            let api = ApiClient::new(&server.base_url(), Arc::new(MemoryCredentials::new()));
            let err = api.get::<serde_json::Value>("/ui/missing").await.unwrap_err();
            assert_eq!(err.status(), Some(404));
            let message = err.to_string();
            assert!(message.contains("404"), "{}", message);
            assert!(message.contains("not found"), "{}", message);
        }

        #[tokio::test]
        async fn test_undecodable_body_is_decode_error() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/ui/alerts");
                    then.status(200).body("<html>");
                })
                .await;

            let api = ApiClient::new(&server.base_url(), Arc::new(MemoryCredentials::new()));
            let err = api.get::<Alerts>(paths::ALERTS).await.unwrap_err();
            assert!(matches!(err, ApiError::Decode(_)));
        }

        #[tokio::test]
        async fn test_unreachable_host_is_network_error() {
            let api = ApiClient::new("http://127.0.0.1:9", Arc::new(MemoryCredentials::new()));
            let err = api.get::<Alerts>(paths::ALERTS).await.unwrap_err();
            assert!(matches!(err, ApiError::Network(_)));
            assert_eq!(err.status(), None);
        }
    }

    mod dashboard_tests {
        use super::*;

        #[tokio::test]
        async fn test_refresh_all_renders_every_panel() {
            let server = MockServer::start_async().await;
            mount_dashboard(&server, None, 0).await;
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let outcome = manager.refresh_all().await;
            let snapshot = match outcome {
                RefreshOutcome::Rendered(snapshot) => snapshot,
                other => panic!("expected a rendered refresh, got {:?}", other),
            };
            assert_eq!(snapshot.logs.items.len(), 2);
            assert_eq!(snapshot.series.len(), 60);
            assert_eq!(snapshot.series.requests.iter().sum::<u64>(), 2);
            assert_eq!(snapshot.series.errors.iter().sum::<u64>(), 1);
            assert_eq!(snapshot.rollup.keys(), vec!["1", "2"]);
            assert_eq!(snapshot.queue.summary.failed, 2);

            let calls = renderer.calls();
            for panel in [
                "metrics", "tokens", "logs", "events", "errors", "alerts", "queue",
                "assignments", "pos_list", "operations", "series",
            ] {
                assert!(calls.contains(&panel.to_string()), "missing {}", panel);
            }
            assert!(!calls.contains(&"operations_failure".to_string()));
            assert_eq!(calls.last().map(String::as_str), Some("commit"));
        }

        #[tokio::test]
        async fn test_refresh_sends_filters_as_query() {
            let server = MockServer::start_async().await;
            let logs = server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path(paths::LOGS)
                        .query_param("page", "1")
                        .query_param("page_size", "300")
                        .query_param("status", "error")
                        .query_param("service", "wsfe");
                    then.status(200).json_body(json!({"items": []}));
                })
                .await;
            let events = server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path(paths::EVENTS)
                        .query_param("page_size", "200")
                        .query_param("status", "error");
                    then.status(200).json_body(json!({"items": []}));
                })
                .await;
            let errors = server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path(paths::ERRORS)
                        .query_param("window_minutes", "360")
                        .query_param("group_by", "error_type");
                    then.status(200).json_body(json!({"items": []}));
                })
                .await;
            for path in [
                paths::METRICS_SUMMARY,
                paths::TOKENS_STATUS,
                paths::OPERATIONS_SUMMARY,
                paths::ALERTS,
                paths::CAEA_QUEUE,
                paths::CAEA_ASSIGNMENTS,
            ] {
                server
                    .mock_async(|when, then| {
                        when.method(GET).path(path);
                        then.status(200).json_body(json!({}));
                    })
                    .await;
            }

            let manager = manager_for(
                &server,
                Arc::new(MemoryCredentials::new()),
                Arc::new(RecordingRenderer::default()),
            );
            manager.set_filters(FilterState {
                service: Some(" wsfe ".to_string()),
                status: StatusFilter::Error,
                window_minutes: 360,
                log_endpoint: Some("".to_string()),
                log_error_type: None,
            });

            let outcome = manager.refresh_all().await;
            assert!(outcome.is_rendered(), "{:?}", outcome);
            logs.assert_async().await;
            events.assert_async().await;
            errors.assert_async().await;
        }

        #[tokio::test]
        async fn test_single_failure_fails_whole_refresh() {
            let server = MockServer::start_async().await;
            mount_dashboard(&server, Some(paths::ERRORS), 0).await;
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let outcome = manager.refresh_all().await;
            let message = match outcome {
                RefreshOutcome::Failed(message) => message,
                other => panic!("expected failure, got {:?}", other),
            };
            assert!(message.starts_with("Monitor refresh failed:"), "{}", message);
            assert!(message.contains("500"), "{}", message);
            assert_eq!(renderer.calls(), vec!["operations_failure", "commit"]);
        }

        #[tokio::test]
        async fn test_failure_keeps_previous_panels() {
            let ok_server = MockServer::start_async().await;
            mount_dashboard(&ok_server, None, 0).await;
            let bad_server = MockServer::start_async().await;
            mount_dashboard(&bad_server, Some(paths::ALERTS), 0).await;

            let renderer = Arc::new(ConsoleRenderer::new(Box::new(std::io::sink()), None));
            let creds: Arc<dyn CredentialProvider> = Arc::new(MemoryCredentials::new());
            let good = manager_for(&ok_server, creds.clone(), renderer.clone());
            let bad = manager_for(&bad_server, creds, renderer.clone());

            assert!(good.refresh_all().await.is_rendered());
            let metrics = renderer.panel(Panel::Metrics).unwrap();
            let pos_list = renderer.panel(Panel::PosList).unwrap();
            assert!(pos_list.contains("POS 1 | types=1, 2 | invoices=8"), "{}", pos_list);
            assert!(pos_list.contains("POS 2 | types=6 | invoices=7"), "{}", pos_list);

            assert!(!bad.refresh_all().await.is_rendered());
            assert_eq!(renderer.panel(Panel::Metrics).unwrap(), metrics);
            assert_eq!(renderer.panel(Panel::PosList).unwrap(), pos_list);
            let operations = renderer.panel(Panel::Operations).unwrap();
            assert!(operations.contains("Monitor refresh failed"), "{}", operations);
        }

        #[tokio::test]
        async fn test_older_refresh_is_superseded() {
            let server = MockServer::start_async().await;
            mount_dashboard(&server, None, 300).await;
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let (first, second) = tokio::join!(manager.refresh_all(), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                manager.refresh_all().await
            });

            assert!(matches!(first, RefreshOutcome::Superseded), "{:?}", first);
            assert!(second.is_rendered(), "{:?}", second);
            let metrics_renders = renderer.calls().iter().filter(|c| *c == "metrics").count();
            assert_eq!(metrics_renders, 1);
        }

        #[tokio::test]
        async fn test_overlapping_tick_is_skipped() {
            let server = MockServer::start_async().await;
            mount_dashboard(&server, None, 300).await;
            let manager = manager_for(
                &server,
                Arc::new(MemoryCredentials::new()),
                Arc::new(RecordingRenderer::default()),
            );

            let (first, second) = tokio::join!(manager.poll_once(), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                manager.poll_once().await
            });
            assert!(first.is_rendered(), "{:?}", first);
            assert!(matches!(second, RefreshOutcome::Skipped), "{:?}", second);

            // The flag is released once the poll finishes
            assert!(manager.poll_once().await.is_rendered());
        }

        #[tokio::test]
        async fn test_logs_only_mode_polls_logs() {
            let server = MockServer::start_async().await;
            let logs = server
                .mock_async(|when, then| {
                    when.method(GET).path(paths::LOGS).query_param("page_size", "500");
                    then.status(200).json_body(json!({"items": [
                        {"timestamp": "2024-05-01T10:00:00Z", "path": "/x", "status_code": 200, "ok": true}
                    ]}));
                })
                .await;

            let config = MonitorConfig {
                api_base_url: server.base_url(),
                mode: MonitorMode::LogsOnly,
                ..Default::default()
            };
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = DashboardManager::new_with_config(
                ApiClient::new(&config.api_base_url, Arc::new(MemoryCredentials::new())),
                renderer.clone(),
                &config,
            );

            let outcome = manager.poll_once().await;
            assert!(matches!(outcome, RefreshOutcome::RenderedLogs(1)), "{:?}", outcome);
            assert_eq!(renderer.calls(), vec!["log_view", "commit"]);
            logs.assert_async().await;
        }
    }

    mod on_demand_tests {
        use super::*;

        #[tokio::test]
        async fn test_retry_refetches_queue() {
            let server = MockServer::start_async().await;
            let retry = server
                .mock_async(|when, then| {
                    when.method(POST)
                        .path(paths::CAEA_QUEUE_RETRY)
                        .query_param("limit", "30");
                    then.status(200).json_body(json!({"retried": 2}));
                })
                .await;
            let queue = server
                .mock_async(|when, then| {
                    when.method(GET).path(paths::CAEA_QUEUE).query_param("limit", "200");
                    then.status(200).json_body(json!({
                        "summary": {"pending": 2},
                        "items": [{"id": 1, "job_type": "inform", "status": "retrying", "attempts": 1}]
                    }));
                })
                .await;

            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let snapshot = manager.retry_queue().await.unwrap();
            assert_eq!(snapshot.summary.pending, 2);
            assert_eq!(snapshot.summary.failed, 0);
            assert_eq!(snapshot.items[0].status, QueueStatus::Retrying);
            retry.assert_async().await;
            queue.assert_async().await;
            assert_eq!(renderer.calls(), vec!["queue", "commit"]);
        }

        #[tokio::test]
        async fn test_retry_failure_skips_queue_reload() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(POST).path(paths::CAEA_QUEUE_RETRY);
                    then.status(503).body("busy");
                })
                .await;
            let queue = server
                .mock_async(|when, then| {
                    when.method(GET).path(paths::CAEA_QUEUE);
                    then.status(200).json_body(json!({}));
                })
                .await;

            let manager = manager_for(
                &server,
                Arc::new(MemoryCredentials::new()),
                Arc::new(RecordingRenderer::default()),
            );
            let err = manager.retry_queue().await.unwrap_err();
            assert_eq!(err.status(), Some(503));
            queue.assert_calls_async(0).await;
        }

        #[tokio::test]
        async fn test_assignments_render_pos_list() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path(paths::CAEA_ASSIGNMENTS);
                    then.status(200).json_body(json!({"items": [
                        {"periodo": 202405, "orden": 2, "cuit": 1, "pto_vta": 4, "cbte_tipo": 11, "invoices_count": 9}
                    ]}));
                })
                .await;
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let rollup = manager.refresh_assignments().await.unwrap();
            assert_eq!(rollup.get("4").unwrap().total, 9);
            assert_eq!(renderer.calls(), vec!["assignments", "pos_list", "commit"]);
        }

        #[tokio::test]
        async fn test_logs_error_reaches_caller() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path(paths::LOGS);
                    then.status(401).body("unauthorized");
                })
                .await;
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let err = manager.refresh_logs().await.unwrap_err();
            assert_eq!(err.status(), Some(401));
            assert!(renderer.calls().is_empty());
        }
    }

    mod wsfe_tests {
        use super::*;

        #[tokio::test]
        async fn test_invalid_cuit_makes_no_request() {
            let server = MockServer::start_async().await;
            let pos = server
                .mock_async(|when, then| {
                    when.method(POST).path(wsfe::PUNTOS_VENTA);
                    then.status(200).json_body(json!([]));
                })
                .await;
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let err = manager.lookup_points_of_sale(0).await.unwrap_err();
            assert!(matches!(err, LookupError::InvalidCuit));
            assert_eq!(err.to_string(), "Please enter a valid CUIT.");
            assert!(manager.lookup_params_snapshot(&ParamsRequest::default()).await.is_err());
            pos.assert_calls_async(0).await;
        }

        #[tokio::test]
        async fn test_points_of_sale_lookup() {
            let server = MockServer::start_async().await;
            let pos = server
                .mock_async(|when, then| {
                    when.method(POST)
                        .path(wsfe::PUNTOS_VENTA)
                        .json_body(json!({"Cuit": 20111111112i64}));
                    then.status(200).json_body(json!([{"Nro": 1}]));
                })
                .await;
            let manager = manager_for(
                &server,
                Arc::new(MemoryCredentials::new()),
                Arc::new(RecordingRenderer::default()),
            );

            let doc = manager.lookup_points_of_sale(20111111112).await.unwrap();
            assert_eq!(doc["cuit"], json!(20111111112i64));
            assert_eq!(doc["puntos_venta"][0]["Nro"], json!(1));
            pos.assert_async().await;
        }

        #[tokio::test]
        async fn test_params_snapshot_skips_missing_invoice_inputs() {
            let server = MockServer::start_async().await;
            for path in [
                wsfe::PUNTOS_VENTA,
                wsfe::COTIZACION,
                wsfe::TYPES_CONCEPTO,
                wsfe::TYPES_OPCIONAL,
                wsfe::TYPES_PAISES,
                wsfe::ACTIVIDADES,
            ] {
                server
                    .mock_async(|when, then| {
                        when.method(POST).path(path);
                        then.status(200).json_body(json!({"ok": true}));
                    })
                    .await;
            }
            let last = server
                .mock_async(|when, then| {
                    when.method(POST).path(wsfe::LAST_AUTHORIZED);
                    then.status(200).json_body(json!({}));
                })
                .await;

            let manager = manager_for(
                &server,
                Arc::new(MemoryCredentials::new()),
                Arc::new(RecordingRenderer::default()),
            );
            let request = ParamsRequest {
                cuit: 20111111112,
                ..Default::default()
            };
            let doc = manager.lookup_params_snapshot(&request).await.unwrap();

            assert_eq!(doc["last_authorized"]["status"], json!("skipped"));
            assert_eq!(doc["invoice_query"]["status"], json!("skipped"));
            assert_eq!(doc["cotizacion"], json!({"ok": true}));
            last.assert_calls_async(0).await;
        }

        #[tokio::test]
        async fn test_params_snapshot_failure_is_reported() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(POST).path(wsfe::COTIZACION);
                    then.status(500).body("upstream");
                })
                .await;
            for path in [
                wsfe::PUNTOS_VENTA,
                wsfe::TYPES_CONCEPTO,
                wsfe::TYPES_OPCIONAL,
                wsfe::TYPES_PAISES,
                wsfe::ACTIVIDADES,
            ] {
                server
                    .mock_async(|when, then| {
                        when.method(POST).path(path);
                        then.status(200).json_body(json!([]));
                    })
                    .await;
            }

            let renderer = Arc::new(ConsoleRenderer::new(Box::new(std::io::sink()), None));
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());
            let request = ParamsRequest {
                cuit: 20111111112,
                ..Default::default()
            };

            let err = manager.lookup_params_snapshot(&request).await.unwrap_err();
            assert!(matches!(err, LookupError::Api(_)));
            let panel = renderer.panel(Panel::WsfeParams).unwrap();
            assert!(panel.contains("WSFE params refresh failed"), "{}", panel);
        }
    }

    mod command_tests {
        use super::*;

        #[tokio::test]
        async fn test_token_command_saves_and_refreshes() {
            let server = MockServer::start_async().await;
            mount_dashboard(&server, None, 0).await;
            let creds = Arc::new(MemoryCredentials::new());
            let manager = manager_for(&server, creds.clone(), Arc::new(RecordingRenderer::default()));

            let reply = execute(&manager, Command::Token("new-jwt".to_string())).await.unwrap();
            assert!(reply.starts_with("refreshed"), "{}", reply);
            assert_eq!(creds.get_token(), Some("new-jwt".to_string()));
        }

        #[tokio::test]
        async fn test_filter_command_updates_state() {
            let server = MockServer::start_async().await;
            mount_dashboard(&server, None, 0).await;
            let manager = manager_for(
                &server,
                Arc::new(MemoryCredentials::new()),
                Arc::new(RecordingRenderer::default()),
            );

            let command = parse_command("filter status=ok window=0 service=wsfe").unwrap();
            execute(&manager, command).await.unwrap();
            let filters = manager.filters();
            assert_eq!(filters.status, StatusFilter::Ok);
            assert_eq!(filters.window_minutes, 1);
            assert_eq!(filters.service.as_deref(), Some("wsfe"));

            let bad = parse_command("filter status=maybe").unwrap();
            assert!(execute(&manager, bad).await.is_err());
            assert_eq!(manager.filters().status, StatusFilter::Ok);
        }

        #[tokio::test]
        async fn test_logs_mode_commands_reload_only_the_log_view() {
            let server = MockServer::start_async().await;
            let logs = server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path(paths::LOGS)
                        .query_param("page_size", "500")
                        .query_param("service", "wsfe");
                    then.status(200).json_body(json!({"items": [
                        {"timestamp": "2024-05-01T10:00:00Z", "path": "/x", "status_code": 200, "ok": true, "method": "GET", "cuit": 20111111112i64}
                    ]}));
                })
                .await;

            let config = MonitorConfig {
                api_base_url: server.base_url(),
                mode: MonitorMode::LogsOnly,
                ..Default::default()
            };
            let creds = Arc::new(MemoryCredentials::new());
            let renderer = Arc::new(ConsoleRenderer::new(Box::new(std::io::sink()), None));
            let manager = DashboardManager::new_with_config(
                ApiClient::new(&config.api_base_url, creds.clone()),
                renderer.clone(),
                &config,
            );

            let filter = parse_command("filter service=wsfe").unwrap();
            assert_eq!(execute(&manager, filter).await.unwrap(), "refreshed: 1 logs");
            let token = Command::Token("abc".to_string());
            assert_eq!(execute(&manager, token).await.unwrap(), "refreshed: 1 logs");
            assert_eq!(creds.get_token(), Some("abc".to_string()));
            assert_eq!(execute(&manager, Command::Refresh).await.unwrap(), "refreshed: 1 logs");
            assert_eq!(execute(&manager, Command::Logs).await.unwrap(), "refreshed: 1 logs");

            logs.assert_calls_async(4).await;
            assert!(renderer.panel(Panel::Operations).is_none());
            let view = renderer.panel(Panel::Logs).unwrap();
            assert!(view.starts_with("1 records"), "{}", view);
        }

        #[tokio::test]
        async fn test_logs_mode_failure_is_returned() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path(paths::LOGS);
                    then.status(503).body("down");
                })
                .await;
            let config = MonitorConfig {
                api_base_url: server.base_url(),
                mode: MonitorMode::LogsOnly,
                ..Default::default()
            };
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = DashboardManager::new_with_config(
                ApiClient::new(&config.api_base_url, Arc::new(MemoryCredentials::new())),
                renderer.clone(),
                &config,
            );

            let err = execute(&manager, Command::Logs).await.unwrap_err();
            assert!(err.contains("503"), "{}", err);
            assert!(renderer.calls().is_empty());
        }

        #[tokio::test]
        async fn test_handler_error_is_returned() {
            let server = MockServer::start_async().await;
            server
                .mock_async(|when, then| {
                    when.method(GET).path(paths::EVENTS);
                    then.status(500).body("db down");
                })
                .await;
            let manager = manager_for(
                &server,
                Arc::new(MemoryCredentials::new()),
                Arc::new(RecordingRenderer::default()),
            );

            let err = execute(&manager, Command::Events).await.unwrap_err();
            assert!(err.contains("500"), "{}", err);
            assert!(err.contains("db down"), "{}", err);
        }
    }

    mod monitor_tests {
        use super::*;

        #[tokio::test]
        async fn test_stop_cancels_poll_in_flight() {
            let server = MockServer::start_async().await;
            mount_dashboard(&server, None, 300).await;
            let renderer = Arc::new(RecordingRenderer::default());
            let manager = manager_for(&server, Arc::new(MemoryCredentials::new()), renderer.clone());

            let monitor = PollingMonitor::new();
            assert!(monitor.start(manager.clone(), Duration::from_secs(60)));
            tokio::time::sleep(Duration::from_millis(50)).await;
            monitor.stop();

            tokio::time::sleep(Duration::from_millis(500)).await;
            assert!(renderer.calls().is_empty(), "{:?}", renderer.calls());

            // The cancelled poll released the single-flight flag
            assert!(manager.poll_once().await.is_rendered());
        }
    }
}
