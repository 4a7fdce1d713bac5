use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use causelist_logging::cl_warn;

use crate::{ForwardHeaders, Forwarder, Method, RequestEnvelope, ResponseEnvelope};

pub const PROXY_PREFIX: &str = "/proxy";

/// Routes `GET|POST /proxy/{*path}` (and the bare `/proxy` root) to the forwarder.
pub fn router(forwarder: Arc<dyn Forwarder>) -> Router {
    Router::new()
        .route("/proxy", get(proxy_get).post(proxy_post))
        .route("/proxy/", get(proxy_get).post(proxy_post))
        .route("/proxy/{*path}", get(proxy_get).post(proxy_post))
        .with_state(forwarder)
}

async fn proxy_get(
    State(forwarder): State<Arc<dyn Forwarder>>,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let envelope = inbound_envelope(Method::Get, &uri, &headers, None);
    relay(forwarder.forward(envelope).await)
}

async fn proxy_post(
    State(forwarder): State<Arc<dyn Forwarder>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // An empty inbound body is forwarded as no body at all.
    let body = (!body.is_empty()).then_some(body);
    let envelope = inbound_envelope(Method::Post, &uri, &headers, body);
    relay(forwarder.forward(envelope).await)
}

/// Builds the envelope from the raw request URI so segments and query stay undecoded.
fn inbound_envelope(
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Option<Bytes>,
) -> RequestEnvelope {
    let rest = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or(uri.path());
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let path_segments = rest.split('/').map(ToOwned::to_owned).collect();

    let header_text = |name: header::HeaderName| {
        let value = headers.get(&name)?;
        // Non-ASCII values are kept as long as they are UTF-8.
        match std::str::from_utf8(value.as_bytes()) {
            Ok(text) => Some(text.to_owned()),
            Err(err) => {
                cl_warn!("Dropping inbound {} header that is not UTF-8: {}", name, err);
                None
            }
        }
    };
    let forwarded = ForwardHeaders {
        authorization: header_text(header::AUTHORIZATION),
        content_type: match method {
            Method::Post => header_text(header::CONTENT_TYPE),
            Method::Get => None,
        },
    };

    RequestEnvelope {
        method,
        path_segments,
        query: uri.query().map(ToOwned::to_owned),
        headers: forwarded,
        body: match method {
            Method::Post => body,
            Method::Get => None,
        },
    }
}

fn relay(response: ResponseEnvelope) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body))
}
