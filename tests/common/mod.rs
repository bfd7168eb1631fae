//! Shared utilities for integration testing against a mock grievance service.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use grievance_client::api::client::REQUEST_ID_HEADER;
use grievance_client::{GrievanceClient, RetryPolicy, Session};
use serde_json::Value;

/// A request as seen by the mock service.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path with the `/api` prefix removed.
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

type Responder = dyn Fn(u32, &RecordedRequest) -> (u16, Value) + Send + Sync;
type Delay = dyn Fn(&RecordedRequest) -> Duration + Send + Sync;

#[derive(Clone)]
struct MockState {
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responder: Arc<Responder>,
    delay: Arc<Delay>,
}

/// Handle to a running mock service.
pub struct MockService {
    pub base_url: String,
    hits: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl MockService {
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }
}

/// Start a programmable mock service on an ephemeral port.
///
/// `respond` receives the zero-based hit number and the recorded request and
/// returns the status and JSON body to send back.
pub async fn start_programmable_backend<F>(respond: F) -> MockService
where
    F: Fn(u32, &RecordedRequest) -> (u16, Value) + Send + Sync + 'static,
{
    start_delayed_backend(|_| Duration::ZERO, respond).await
}

/// Like `start_programmable_backend`, but holds each response for the
/// duration `delay` picks for that request.
pub async fn start_delayed_backend<D, F>(delay: D, respond: F) -> MockService
where
    D: Fn(&RecordedRequest) -> Duration + Send + Sync + 'static,
    F: Fn(u32, &RecordedRequest) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = MockState {
        hits: Arc::new(AtomicU32::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
        responder: Arc::new(respond),
        delay: Arc::new(delay),
    };
    let service = MockService {
        base_url: format!("http://{}/api", addr),
        hits: state.hits.clone(),
        requests: state.requests.clone(),
    };

    let app = Router::new().fallback(handle).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    service
}

/// A mock service that always answers with the same status and body.
#[allow(dead_code)]
pub async fn start_fixed_backend(status: u16, body: Value) -> MockService {
    start_programmable_backend(move |_, _| (status, body.clone())).await
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let request = RecordedRequest {
        method: method.to_string(),
        path: uri.path().trim_start_matches("/api").to_string(),
        authorization: header("authorization"),
        request_id: header(REQUEST_ID_HEADER),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let hit = state.hits.fetch_add(1, Ordering::SeqCst);
    let hold = (state.delay)(&request);
    state.requests.lock().unwrap().push(request.clone());
    if !hold.is_zero() {
        tokio::time::sleep(hold).await;
    }
    let (status, reply) = (state.responder)(hit, &request);

    let status = StatusCode::from_u16(status).unwrap();
    (status, Json(reply)).into_response()
}

/// Retry policy with the default retry set but millisecond delays.
#[allow(dead_code)]
pub fn fast_retries() -> RetryPolicy {
    RetryPolicy::new(3, vec![408, 429, 500, 502, 503, 504], 5)
}

/// Client pointed at `base_url`, bypassing any environment proxy.
#[allow(dead_code)]
pub fn client_for(base_url: &str, session: Arc<Session>) -> GrievanceClient {
    let http = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();
    GrievanceClient::with_http_client(http, base_url, session).with_retry_policy(fast_retries())
}
