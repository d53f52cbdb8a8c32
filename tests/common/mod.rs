//! Shared test helpers: an in-process Kibana `/api/status` mock.

#![allow(dead_code)]

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::get, Router};
use kibana_exporter::kibana::{StatusCollector, TargetProfile};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const GREEN_PAYLOAD: &str = r#"{
    "version": {"number": "7.17.1", "build_hash": "78e8422ed4e7d2054bd35b82a91299b3f7bd6231", "build_number": 46635},
    "status": {"overall": {"state": "green", "title": "Green"}},
    "metrics": {
        "concurrent_connections": 3,
        "process": {
            "uptime_in_millis": 123456.5,
            "memory": {"heap": {"total_in_bytes": 536870912, "used_in_bytes": 268435456}}
        },
        "os": {"load": {"1m": 0.25, "5m": 0.5, "15m": 0.75}},
        "response_times": {"avg_in_millis": 12.5, "max_in_millis": 250},
        "requests": {"disconnects": 2, "total": 1024}
    }
}"#;

/// Same document with the given overall state
pub fn payload_with_state(state: &str) -> String {
    GREEN_PAYLOAD.replace(r#""state": "green""#, &format!(r#""state": "{}""#, state))
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Arc<Mutex<String>>,
    auth_seen: Arc<Mutex<Vec<Option<String>>>>,
    accept_seen: Arc<Mutex<Vec<Option<String>>>>,
}

/// Running mock of a Kibana instance
pub struct MockKibana {
    pub addr: SocketAddr,
    body: Arc<Mutex<String>>,
    auth_seen: Arc<Mutex<Vec<Option<String>>>>,
    accept_seen: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockKibana {
    pub async fn start(status: StatusCode, body: &str) -> Self {
        let state = MockState {
            status,
            body: Arc::new(Mutex::new(body.to_string())),
            auth_seen: Arc::new(Mutex::new(Vec::new())),
            accept_seen: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/api/status", get(status_handler))
            .route("/kibana/api/status", get(status_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            body: state.body,
            auth_seen: state.auth_seen,
            accept_seen: state.accept_seen,
        }
    }

    pub async fn green() -> Self {
        Self::start(StatusCode::OK, GREEN_PAYLOAD).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Replace the document served by later requests
    pub fn set_body(&self, body: &str) {
        *self.body.lock().unwrap() = body.to_string();
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.auth_seen.lock().unwrap().clone()
    }

    pub fn accept_headers(&self) -> Vec<Option<String>> {
        self.accept_seen.lock().unwrap().clone()
    }

    pub fn collector(&self, name: &str) -> StatusCollector {
        collector_for(name, &self.url())
    }
}

async fn status_handler(State(state): State<MockState>, headers: HeaderMap) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.auth_seen.lock().unwrap().push(header("authorization"));
    state.accept_seen.lock().unwrap().push(header("accept"));
    let body = state.body.lock().unwrap().clone();
    (state.status, body)
}

/// Collector for an arbitrary URL, without credentials
pub fn collector_for(name: &str, url: &str) -> StatusCollector {
    let profile = TargetProfile::from_url(name, url, None, None, false, false)
        .expect("Failed to build profile");
    StatusCollector::new(profile).expect("Failed to build collector")
}

/// Address nothing listens on
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Metric family names in the order of their `# TYPE` lines
pub fn family_order(rendered: &str) -> Vec<String> {
    rendered
        .lines()
        .filter_map(|line| line.strip_prefix("# TYPE "))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
