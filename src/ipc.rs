//! Centralized API paths and storage key names.
//! Prevents typos between the orchestrator, the commands and the tests.

/// Key under which the operator's bearer token is stored.
pub const STORED_TOKEN_KEY: &str = "afrelay_monitor_jwt";

/// Monitoring endpoints (`/ui/*`).
pub mod paths {
    pub const METRICS_SUMMARY: &str = "/ui/metrics/summary";
    pub const LOGS: &str = "/ui/logs";
    pub const ERRORS: &str = "/ui/errors";
    pub const TOKENS_STATUS: &str = "/ui/tokens/status";
    pub const OPERATIONS_SUMMARY: &str = "/ui/operations/summary";
    pub const ALERTS: &str = "/ui/alerts";
    pub const EVENTS: &str = "/ui/events";
    pub const CAEA_QUEUE: &str = "/ui/caea/queue";
    pub const CAEA_QUEUE_RETRY: &str = "/ui/caea/queue/retry";
    pub const CAEA_ASSIGNMENTS: &str = "/ui/caea/assignments";
}

/// Backend-proxied WSFE lookups (`/wsfe/*`), all POST with a JSON payload keyed by `Cuit`.
pub mod wsfe {
    pub const PUNTOS_VENTA: &str = "/wsfe/params/puntos-venta";
    pub const COTIZACION: &str = "/wsfe/params/cotizacion";
    pub const TYPES_CONCEPTO: &str = "/wsfe/params/types-concepto";
    pub const TYPES_OPCIONAL: &str = "/wsfe/params/types-opcional";
    pub const TYPES_PAISES: &str = "/wsfe/params/types-paises";
    pub const ACTIVIDADES: &str = "/wsfe/params/actividades";
    pub const LAST_AUTHORIZED: &str = "/wsfe/invoices/last-authorized";
    pub const INVOICE_QUERY: &str = "/wsfe/invoices/query";
}
