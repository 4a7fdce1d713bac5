#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use causelist_client::{
    ApiClient, AuthContext, ControllerSettings, DisplaySink, MemoryTokenStore, TokenStore,
};
use causelist_core::{ControllerView, ReentryPolicy};
use causelist_gateway::{Forwarder, RequestEnvelope, ResponseEnvelope};
use serde_json::json;
use tokio::sync::Semaphore;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(causelist_logging::initialize_for_tests);
}

/// In-process upstream. Trigger responses (and optionally progress
/// responses) are held until the test releases a permit.
pub struct ScriptedForwarder {
    requests: Mutex<Vec<RequestEnvelope>>,
    snapshots: Mutex<VecDeque<Vec<String>>>,
    last_snapshot: Mutex<Vec<String>>,
    pub trigger_gate: Semaphore,
    pub progress_gate: Option<Semaphore>,
    trigger_response: Mutex<ResponseEnvelope>,
    stop_response: ResponseEnvelope,
}

impl ScriptedForwarder {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            snapshots: Mutex::new(VecDeque::new()),
            last_snapshot: Mutex::new(Vec::new()),
            trigger_gate: Semaphore::new(0),
            progress_gate: None,
            trigger_response: Mutex::new(ResponseEnvelope {
                status: 200,
                body: json!({"records_extracted": 0, "message": "ok", "status": "success"}),
            }),
            stop_response: ResponseEnvelope {
                status: 200,
                body: json!({"message": "stop requested"}),
            },
        }
    }

    pub fn with_gated_progress(mut self) -> Self {
        self.progress_gate = Some(Semaphore::new(0));
        self
    }

    pub fn with_stop_response(mut self, response: ResponseEnvelope) -> Self {
        self.stop_response = response;
        self
    }

    pub fn with_snapshots(self, snapshots: &[&[&str]]) -> Self {
        *self.snapshots.lock().unwrap() = snapshots
            .iter()
            .map(|lines| lines.iter().map(|line| line.to_string()).collect())
            .collect();
        self
    }

    pub fn respond_to_trigger(&self, response: ResponseEnvelope) {
        *self.trigger_response.lock().unwrap() = response;
    }

    pub fn release_trigger(&self) {
        self.trigger_gate.add_permits(1);
    }

    pub fn release_progress(&self) {
        if let Some(gate) = &self.progress_gate {
            gate.add_permits(1);
        }
    }

    pub fn requests(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.upstream_path() == path)
            .count()
    }
}

#[async_trait::async_trait]
impl Forwarder for ScriptedForwarder {
    async fn forward(&self, request: RequestEnvelope) -> ResponseEnvelope {
        self.requests.lock().unwrap().push(request.clone());
        match request.upstream_path().as_str() {
            "/api/scraper/trigger" => {
                self.trigger_gate
                    .acquire()
                    .await
                    .expect("trigger gate closed")
                    .forget();
                self.trigger_response.lock().unwrap().clone()
            }
            "/api/scraper/stop" => self.stop_response.clone(),
            "/api/scraper/progress" => {
                if let Some(gate) = &self.progress_gate {
                    gate.acquire().await.expect("progress gate closed").forget();
                }
                let next = self.snapshots.lock().unwrap().pop_front();
                let mut last = self.last_snapshot.lock().unwrap();
                if let Some(next) = next {
                    *last = next;
                }
                ResponseEnvelope {
                    status: 200,
                    body: json!({ "logs": last.clone() }),
                }
            }
            "/api/scraper/status" => ResponseEnvelope {
                status: 200,
                body: json!({
                    "status": "success",
                    "last_run": "2024-05-01",
                    "last_status": "success",
                    "total_records": 100,
                    "last_extraction_count": 10
                }),
            },
            other => ResponseEnvelope {
                status: 404,
                body: json!({ "detail": format!("no route {other}") }),
            },
        }
    }
}

/// Records every rendered view.
#[derive(Default)]
pub struct RecordingSink {
    views: Mutex<Vec<ControllerView>>,
}

impl RecordingSink {
    pub fn rendered_logs(&self) -> Vec<Vec<String>> {
        self.views
            .lock()
            .unwrap()
            .iter()
            .map(|view| view.logs.clone())
            .collect()
    }
}

impl DisplaySink for RecordingSink {
    fn render(&self, view: &ControllerView) {
        self.views.lock().unwrap().push(view.clone());
    }
}

pub fn logged_in_client(forwarder: Arc<ScriptedForwarder>) -> ApiClient {
    let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::with_token("test-token"));
    ApiClient::new(forwarder, AuthContext::new(store))
}

pub fn fast_settings() -> ControllerSettings {
    ControllerSettings {
        poll_interval: Duration::from_millis(20),
        reentry: ReentryPolicy::Allow,
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
