use causelist_logging::{cl_info, cl_warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::{ConfigError, Method, RequestEnvelope, ResponseEnvelope};

/// Sends one envelope to an upstream and relays whatever comes back.
///
/// `forward` never fails: transport problems are folded into a fabricated
/// [`ResponseEnvelope::network_failure`].
#[async_trait::async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: RequestEnvelope) -> ResponseEnvelope;
}

/// Forwards to a fixed origin over HTTP.
///
/// No retries, no caching and no request timeout: a hung upstream hangs the
/// caller.
#[derive(Debug, Clone)]
pub struct ReqwestForwarder {
    origin: String,
    client: reqwest::Client,
}

impl ReqwestForwarder {
    pub fn new(origin: &str) -> Result<Self, ConfigError> {
        let origin = normalize_origin(origin)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;
        Ok(Self { origin, client })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn upstream_url(&self, request: &RequestEnvelope) -> String {
        format!("{}{}", self.origin, request.path_and_query())
    }
}

#[async_trait::async_trait]
impl Forwarder for ReqwestForwarder {
    async fn forward(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let url = self.upstream_url(&request);
        let parsed = match reqwest::Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(err) => {
                cl_warn!("{} {} rejected: {}", request.method, request.upstream_path(), err);
                return ResponseEnvelope::network_failure(err);
            }
        };

        let mut builder = match request.method {
            Method::Get => self.client.get(parsed),
            Method::Post => self.client.post(parsed),
        };
        if let Some(authorization) = &request.headers.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if request.method == Method::Post {
            if let Some(content_type) = &request.headers.content_type {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            if let Some(body) = request.body.clone() {
                builder = builder.body(body);
            }
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                cl_warn!(
                    "{} {} failed without response: {}",
                    request.method,
                    request.upstream_path(),
                    err
                );
                return ResponseEnvelope::network_failure(err);
            }
        };

        let status = response.status().as_u16();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                cl_warn!(
                    "{} {} body read failed: {}",
                    request.method,
                    request.upstream_path(),
                    err
                );
                return ResponseEnvelope::network_failure(err);
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(body) => {
                cl_info!("{} {} -> {}", request.method, request.upstream_path(), status);
                ResponseEnvelope { status, body }
            }
            Err(err) => {
                cl_warn!(
                    "{} {} -> {} with non-JSON body: {}",
                    request.method,
                    request.upstream_path(),
                    status,
                    err
                );
                ResponseEnvelope::network_failure(format!("invalid JSON from upstream: {err}"))
            }
        }
    }
}

/// Validates the origin and drops trailing slashes so `origin + "/path"` never doubles them.
fn normalize_origin(origin: &str) -> Result<String, ConfigError> {
    let trimmed = origin.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|err| ConfigError::InvalidOrigin(format!("{origin}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidOrigin(format!(
            "{origin}: unsupported scheme {}",
            parsed.scheme()
        )));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ConfigError::InvalidOrigin(format!(
            "{origin}: origin must not carry a query or fragment"
        )));
    }
    Ok(trimmed.to_string())
}
