mod common;

use std::sync::Arc;

use causelist_client::{ApiClient, AuthContext, JobController, MemoryTokenStore, NullSink};
use causelist_core::JobState;
use causelist_gateway::{router, ReqwestForwarder};
use common::{fast_settings, init_logging};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves the gateway on an ephemeral port in front of `upstream`; returns the client base.
async fn start_gateway(upstream: &MockServer) -> String {
    let forwarder = ReqwestForwarder::new(&upstream.uri()).unwrap();
    let app = router(Arc::new(forwarder));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/proxy")
}

fn client(base: &str, token: Option<&str>) -> ApiClient {
    let store = match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    };
    let forwarder = ReqwestForwarder::new(base).unwrap();
    ApiClient::new(Arc::new(forwarder), AuthContext::new(Arc::new(store)))
}

#[tokio::test]
async fn login_and_status_pass_through_the_gateway() {
    init_logging();
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access_token": "gw-token"})),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/scraper/status"))
        .and(header("authorization", "Bearer gw-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "idle",
            "last_run": null,
            "last_status": null,
            "total_records": 0
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let base = start_gateway(&upstream).await;
    let api = client(&base, None);
    api.login("clerk", "secret").await.unwrap();
    let status = api.status().await.unwrap();
    assert_eq!(status.status, "idle");
    assert_eq!(status.last_run, None);
}

#[tokio::test]
async fn upstream_status_code_is_relayed() {
    init_logging();
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cases/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Case not found"})))
        .mount(&upstream)
        .await;

    let base = start_gateway(&upstream).await;
    let err = client(&base, None).case(99).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Case not found");
}

#[tokio::test]
async fn job_runs_end_to_end_through_the_gateway() {
    init_logging();
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/scraper/trigger"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_millis(150))
                .set_body_json(json!({
                    "records_extracted": 8,
                    "message": "Scraper completed successfully",
                    "status": "success"
                })),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/scraper/progress"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"logs": ["Fetching PDF"]})),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/scraper/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "last_run": "2024-06-03T10:00:00",
            "last_status": "success",
            "total_records": 8,
            "last_extraction_count": 8
        })))
        .mount(&upstream)
        .await;

    let base = start_gateway(&upstream).await;
    let mut controller =
        JobController::spawn(client(&base, Some("abc")), fast_settings(), Arc::new(NullSink));
    controller.trigger(None);

    let view = controller
        .wait_for(|view| view.logs == vec!["Fetching PDF".to_string()])
        .await
        .unwrap();
    assert_eq!(view.state, JobState::Running);

    let view = controller
        .wait_for(|view| view.finished_runs == 1)
        .await
        .unwrap();
    assert_eq!(view.state, JobState::Idle);
    assert_eq!(view.last_extraction_count, 8);
    assert_eq!(
        view.last_message.as_deref(),
        Some("Scraper completed! Extracted 8 records.")
    );
    controller.shutdown().await;
}
