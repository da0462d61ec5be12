//! In-process mock of the queue emulator

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use parking_lot::Mutex;
use queuedash_core::{QueueRecord, QueueStatistics};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

/// A control request as received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    pub action: String,
    pub queue_url: String,
    pub version: String,
    pub content_type: String,
}

#[derive(Default)]
struct EmulatorState {
    queues: Mutex<Vec<QueueRecord>>,
    statistics_requests: AtomicUsize,
    statistics_failure: Mutex<Option<u16>>,
    control_failure: Mutex<Option<u16>>,
    control_delay: Mutex<Option<Duration>>,
    control_requests: Mutex<Vec<ControlRequest>>,
}

/// A running mock emulator bound to a random local port
pub struct MockEmulator {
    addr: SocketAddr,
    base_url: String,
    state: Arc<EmulatorState>,
    task: JoinHandle<()>,
}

impl MockEmulator {
    /// Bind to `127.0.0.1:0` and start serving
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(EmulatorState::default());

        let router = Router::new()
            .route("/statistics/queues", get(handle_statistics))
            .route("/", post(handle_control))
            .with_state(state.clone());

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        info!(addr = %addr, "Mock emulator listening");

        Ok(Self {
            addr,
            base_url: format!("http://{}", addr),
            state,
            task,
        })
    }

    /// Base URL serving both endpoints
    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn add_queue(&self, name: &str, visible: u64, invisible: u64, delayed: u64) {
        self.state.queues.lock().push(QueueRecord::new(
            name,
            QueueStatistics::new(visible, invisible, delayed),
        ));
    }

    pub fn queue(&self, name: &str) -> Option<QueueRecord> {
        self.state
            .queues
            .lock()
            .iter()
            .find(|q| q.name == name)
            .cloned()
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.state
            .queues
            .lock()
            .iter()
            .map(|q| q.name.clone())
            .collect()
    }

    /// Number of `GET /statistics/queues` requests served so far
    pub fn statistics_requests(&self) -> usize {
        self.state.statistics_requests.load(Ordering::SeqCst)
    }

    pub fn control_requests(&self) -> Vec<ControlRequest> {
        self.state.control_requests.lock().clone()
    }

    /// Answer statistics requests with `status` until cleared with `None`
    pub fn fail_statistics(&self, status: Option<u16>) {
        *self.state.statistics_failure.lock() = status;
    }

    /// Answer control requests with `status` until cleared with `None`
    pub fn fail_control(&self, status: Option<u16>) {
        *self.state.control_failure.lock() = status;
    }

    /// Hold each control response for `delay`
    pub fn delay_control(&self, delay: Option<Duration>) {
        *self.state.control_delay.lock() = delay;
    }
}

impl Drop for MockEmulator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_statistics(State(state): State<Arc<EmulatorState>>) -> Response {
    state.statistics_requests.fetch_add(1, Ordering::SeqCst);

    if let Some(status) = *state.statistics_failure.lock() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "statistics unavailable").into_response();
    }

    let body = serde_json::to_string(&*state.queues.lock()).unwrap_or_else(|_| "[]".to_string());
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn handle_control(
    State(state): State<Arc<EmulatorState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params: HashMap<String, String> = form_urlencoded::parse(&body).into_owned().collect();
    let param = |key: &str| params.get(key).cloned().unwrap_or_default();

    let request = ControlRequest {
        action: param("Action"),
        queue_url: param("QueueUrl"),
        version: param("Version"),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    };
    state.control_requests.lock().push(request.clone());

    let delay = *state.control_delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if let Some(status) = *state.control_failure.lock() {
        return error_response(
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "InternalError",
            "Injected failure",
        );
    }

    let queue_name = request
        .queue_url
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let mut queues = state.queues.lock();
    let Some(index) = queues.iter().position(|q| q.name == queue_name) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "AWS.SimpleQueueService.NonExistentQueue",
            "The specified queue does not exist.",
        );
    };

    match request.action.as_str() {
        "PurgeQueue" => {
            queues[index].statistics = QueueStatistics::default();
            xml_response("<PurgeQueueResponse></PurgeQueueResponse>")
        }
        "DeleteQueue" => {
            queues.remove(index);
            xml_response("<DeleteQueueResponse></DeleteQueueResponse>")
        }
        other => error_response(
            StatusCode::BAD_REQUEST,
            "InvalidAction",
            &format!("Unknown action: {}", other),
        ),
    }
}

fn xml_response(body: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body.to_string(),
    )
        .into_response()
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let xml = format!(
        r#"<ErrorResponse xmlns="http://queue.amazonaws.com/doc/2012-11-05/">
  <Error>
    <Type>Sender</Type>
    <Code>{}</Code>
    <Message>{}</Message>
    <Detail/>
  </Error>
  <RequestId>{}</RequestId>
</ErrorResponse>"#,
        code,
        message,
        uuid::Uuid::new_v4()
    );
    (status, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}
