use std::sync::Arc;

use causelist_gateway::{Forwarder, RequestEnvelope, ResponseEnvelope};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::auth::AuthContext;
use crate::models::{
    CaseSearch, Cause, ProgressSnapshot, RelatedCase, ScraperLogEntry, ScraperStatus,
    TokenResponse, TriggerResponse,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Non-2xx answer, relayed or fabricated by the gateway. `body` is untouched.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        body: Value,
    },
    #[error("Please login first")]
    MissingAuth,
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("session store: {0}")]
    Session(String),
}

impl ApiError {
    fn upstream(response: ResponseEnvelope, fallback: &str) -> Self {
        let message = payload_message(&response.body).unwrap_or_else(|| fallback.to_string());
        ApiError::Upstream {
            status: response.status,
            message,
            body: response.body,
        }
    }

    /// Plain text for display.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// `message`, else FastAPI's `detail`, else the gateway's `error`.
pub fn payload_message(body: &Value) -> Option<String> {
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| match body.get(key)? {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Required,
    IfPresent,
    Anonymous,
}

/// Typed calls against the upstream API, issued through a [`Forwarder`].
///
/// Point the forwarder at the gateway's `/proxy` prefix, or straight at the
/// upstream origin; the request shapes are identical.
#[derive(Clone)]
pub struct ApiClient {
    forwarder: Arc<dyn Forwarder>,
    auth: AuthContext,
}

impl ApiClient {
    pub fn new(forwarder: Arc<dyn Forwarder>, auth: AuthContext) -> Self {
        Self { forwarder, auth }
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();
        let request = RequestEnvelope::post("/api/auth/token")
            .with_body("application/x-www-form-urlencoded", form);
        // Any rejection reads as bad credentials, whatever the upstream detail says.
        let body = match self.send(request, Auth::Anonymous, "Invalid credentials").await {
            Err(ApiError::Upstream { status, body, .. }) => {
                return Err(ApiError::Upstream {
                    status,
                    message: "Invalid credentials".to_string(),
                    body,
                })
            }
            other => other?,
        };
        let token: TokenResponse = decode(body)?;
        self.auth
            .store_token(&token.access_token)
            .map_err(|err| ApiError::Session(err.to_string()))
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.auth
            .clear_token()
            .map_err(|err| ApiError::Session(err.to_string()))
    }

    /// Long-lived: resolves only when the upstream run ends.
    pub async fn trigger(&self, target_date: Option<NaiveDate>) -> Result<TriggerResponse, ApiError> {
        let mut request = RequestEnvelope::post("/api/scraper/trigger");
        if let Some(date) = target_date {
            request = request.with_query(format!("target_date={}", date.format("%Y-%m-%d")));
        }
        let body = self
            .send(request, Auth::Required, "Failed to trigger scraper")
            .await?;
        decode(body)
    }

    /// The acknowledgement's shape is not checked.
    pub async fn stop(&self) -> Result<(), ApiError> {
        let request = RequestEnvelope::post("/api/scraper/stop");
        self.send(request, Auth::Required, "Failed to stop scraper")
            .await
            .map(|_| ())
    }

    pub async fn progress(&self) -> Result<ProgressSnapshot, ApiError> {
        let request = RequestEnvelope::get("/api/scraper/progress");
        let body = self
            .send(request, Auth::Required, "Failed to load progress")
            .await?;
        decode(body)
    }

    pub async fn status(&self) -> Result<ScraperStatus, ApiError> {
        let request = RequestEnvelope::get("/api/scraper/status");
        let body = self.send(request, Auth::Required, "Failed to load data").await?;
        decode(body)
    }

    pub async fn logs(&self, limit: Option<u32>) -> Result<Vec<ScraperLogEntry>, ApiError> {
        let mut request = RequestEnvelope::get("/api/scraper/logs");
        if let Some(limit) = limit {
            request = request.with_query(format!("limit={limit}"));
        }
        let body = self.send(request, Auth::Required, "Failed to load data").await?;
        decode(body)
    }

    pub async fn search(&self, search: &CaseSearch) -> Result<Vec<Cause>, ApiError> {
        let query = search.to_query();
        let mut request = RequestEnvelope::get("/api/cases/search");
        if !query.is_empty() {
            request = request.with_query(query);
        }
        let body = self.send(request, Auth::IfPresent, "Search failed").await?;
        decode(body)
    }

    pub async fn case(&self, id: i64) -> Result<Cause, ApiError> {
        let request = RequestEnvelope::get(&format!("/api/cases/{id}"));
        let body = self
            .send(request, Auth::IfPresent, "Failed to fetch case details")
            .await?;
        decode(body)
    }

    pub async fn related(&self, id: i64) -> Result<Vec<RelatedCase>, ApiError> {
        let request = RequestEnvelope::get(&format!("/api/cases/{id}/related"));
        let body = self
            .send(request, Auth::IfPresent, "Failed to fetch related cases")
            .await?;
        decode(body)
    }

    async fn send(
        &self,
        mut request: RequestEnvelope,
        auth: Auth,
        fallback: &str,
    ) -> Result<Value, ApiError> {
        request.headers.authorization = match auth {
            Auth::Required => {
                let token = self.auth.token().ok_or(ApiError::MissingAuth)?;
                Some(format!("Bearer {token}"))
            }
            Auth::IfPresent => self.auth.headers().authorization,
            Auth::Anonymous => None,
        };

        let response = self.forwarder.forward(request).await;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(ApiError::upstream(response, fallback))
        }
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|err| ApiError::Decode(err.to_string()))
}
