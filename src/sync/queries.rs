//! Query suffixes derived from the current filters.
use crate::models::FilterState;
use crate::query::QueryBuilder;

pub fn logs_query(filters: &FilterState, page_size: u32) -> String {
    QueryBuilder::new()
        .param("page", 1u32)
        .param("page_size", page_size)
        .param("service", filters.service.as_deref())
        .param("status", filters.status.as_log_status())
        .param("endpoint", filters.log_endpoint.as_deref())
        .param("error_type", filters.log_error_type.as_deref())
        .build()
}

pub fn events_query(filters: &FilterState, page_size: u32) -> String {
    QueryBuilder::new()
        .param("page", 1u32)
        .param("page_size", page_size)
        .param("service", filters.service.as_deref())
        .param("status", filters.status.as_event_status())
        .build()
}

pub fn window_query(filters: &FilterState) -> String {
    QueryBuilder::new()
        .param("window_minutes", filters.window_minutes)
        .build()
}

pub fn errors_query(filters: &FilterState) -> String {
    QueryBuilder::new()
        .param("window_minutes", filters.window_minutes)
        .param("group_by", "error_type")
        .build()
}

pub fn limit_query(limit: u32) -> String {
    QueryBuilder::new().param("limit", limit).build()
}
