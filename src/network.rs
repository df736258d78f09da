use crate::auth::CredentialProvider;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Failures surfaced by [`ApiClient`]. No variant is retried automatically.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Non-2xx response; `body` is the raw response text.
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    Network(String),
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http {
                status,
                status_text,
                body,
            } => write!(f, "{} {} {}", status, status_text, body),
            ApiError::Network(s) => write!(f, "Network error: {}", s),
            ApiError::Decode(s) => write!(f, "Invalid JSON response: {}", s),
        }
    }
}

impl std::error::Error for ApiError {}

/// Authenticated JSON client for the monitoring API.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_timeout(base_url, credentials, None)
    }

    /// `timeout = None` leaves requests unbounded.
    pub fn with_timeout(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Option<Duration>,
    ) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
        }
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attaches `Authorization: Bearer <token>` only when a token is present.
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.get_token() {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    pub(crate) fn get_request(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.url(path)))
    }

    pub(crate) fn post_request(
        &self,
        path: &str,
        payload: Option<&serde_json::Value>,
    ) -> RequestBuilder {
        let empty = serde_json::json!({});
        let body = payload.unwrap_or(&empty);
        self.authorize(
            self.client
                .post(self.url(path))
                .header("Content-Type", "application/json")
                .json(body),
        )
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!("[API] GET {}", path);
        let response = self
            .get_request(path)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    /// POSTs `payload` (or `{}`) as JSON.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: Option<&serde_json::Value>,
    ) -> Result<T, ApiError> {
        debug!("[API] POST {}", path);
        let response = self
            .post_request(path, payload)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                body,
            });
        }

        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
