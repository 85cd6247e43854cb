//! HTTP processing API
//!
//! - `POST /process/{mode}` - multipart field `file`, answers with the processed JPEG
//! - `GET /ping` - liveness check
//! - `GET /status` - queue and worker pool snapshot
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! Uploads go through the same intake and worker pool as Telegram photos; the
//! handler waits on a ticket for the result.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use retouchcore::core::{config, metrics};
use retouchcore::enhance::{
    FailureKind, Intake, PoolMonitor, ProcessingResult, Requester, SourceRef, SubmitError, TicketBoard,
};
use retouchcore::Mode;

/// Application state for the API server
#[derive(Clone)]
pub struct ApiState {
    pub intake: Intake,
    pub tickets: Arc<TicketBoard>,
    pub monitor: PoolMonitor,
}

/// JSON error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    kind: Option<&'static str>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            kind: None,
        }
    }

    fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        let status = match err {
            SubmitError::UnknownMode(_) => StatusCode::BAD_REQUEST,
            SubmitError::QueueFull { .. } | SubmitError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self::new(status, err.to_string()).with_kind(err.reason())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.kind {
            Some(kind) => json!({ "error": self.message, "kind": kind }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/process/{mode}", post(process_handler))
        .route("/ping", get(ping_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(config::api::MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Start the API server on `port`
pub async fn start_api_server(state: ApiState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Starting API server on http://{}", addr);
    log::info!("  POST /process/{{mode}} - process an image ({})", Mode::names().join(", "));
    log::info!("  /ping, /status, /metrics");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn process_handler(
    State(state): State<ApiState>,
    Path(mode): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    // Reject unknown modes before reading the upload
    if Mode::parse(&mode).is_none() {
        metrics::record_rejection("unknown_mode");
        return Err(ApiError::from(SubmitError::UnknownMode(mode)));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?;
            upload = Some(data);
            break;
        }
    }
    let upload = upload
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Missing 'file' field"))?;

    let (ticket, result) = state.tickets.issue();
    let accepted = match state
        .intake
        .submit(SourceRef::Inline(upload), &mode, Requester::Ticket(ticket))
        .await
    {
        Ok(accepted) => accepted,
        Err(e) => {
            state.tickets.cancel(ticket);
            return Err(e.into());
        }
    };
    log::info!(
        "API request queued as item {} (mode {}, position {})",
        accepted.id,
        accepted.mode,
        accepted.position
    );

    let result = result
        .await
        .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Result was lost"))?;

    match result {
        ProcessingResult::Success(image) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/jpeg")],
            image.bytes,
        )
            .into_response()),
        ProcessingResult::Failure(failure) => {
            let status = match failure.kind {
                FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FailureKind::Processor | FailureKind::Source => StatusCode::UNPROCESSABLE_ENTITY,
            };
            Err(ApiError::new(status, failure.message).with_kind(failure.kind.label()))
        }
    }
}

async fn ping_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn status_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.monitor.status().await)
}

async fn metrics_handler() -> Response {
    match metrics::render() {
        Ok((content_type, body)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            log::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to encode metrics: {}", e)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use retouchcore::enhance::{LocalSource, PoolConfig, RoutingNotifier, WorkQueue, WorkerPool};
    use retouchcore::processing::{DispatchTable, PassthroughProcessor};
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "retouch-test-boundary";

    fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"photo.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
                field
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload(uri: &str, field: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(field, data)))
            .unwrap()
    }

    async fn test_app(temp: &tempfile::TempDir, capacity: usize) -> (Router, WorkerPool) {
        let queue = Arc::new(WorkQueue::new(capacity));
        let tickets = Arc::new(TicketBoard::new());
        let pool = WorkerPool::spawn(
            Arc::clone(&queue),
            Arc::new(DispatchTable::uniform(Arc::new(PassthroughProcessor))),
            Arc::new(LocalSource),
            Arc::new(RoutingNotifier::new(None, Arc::clone(&tickets))),
            PoolConfig {
                workers: 1,
                timeout: Duration::from_secs(5),
                temp_dir: temp.path().to_path_buf(),
            },
        )
        .await
        .unwrap();

        let state = ApiState {
            intake: Intake::new(queue),
            tickets,
            monitor: pool.monitor(),
        };
        (router(state), pool)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let temp = tempfile::TempDir::new().unwrap();
        let (app, _pool) = test_app(&temp, 10).await;

        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_process_returns_result_bytes() {
        let temp = tempfile::TempDir::new().unwrap();
        let (app, _pool) = test_app(&temp, 10).await;

        let response = app
            .oneshot(upload("/process/upscale", "file", b"fake-jpeg"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"fake-jpeg");
    }

    #[tokio::test]
    async fn test_unknown_mode_is_bad_request() {
        let temp = tempfile::TempDir::new().unwrap();
        let (app, _pool) = test_app(&temp, 10).await;

        let response = app.oneshot(upload("/process/bogus", "file", b"x")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "unknown_mode");
        assert!(body["error"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn test_missing_file_field_is_bad_request() {
        let temp = tempfile::TempDir::new().unwrap();
        let (app, _pool) = test_app(&temp, 10).await;

        let response = app.oneshot(upload("/process/poster", "image", b"x")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing 'file' field");
    }

    #[tokio::test]
    async fn test_closed_queue_is_service_unavailable() {
        let temp = tempfile::TempDir::new().unwrap();
        let (app, pool) = test_app(&temp, 10).await;
        pool.shutdown().await;

        let response = app.oneshot(upload("/process/poster", "file", b"x")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["kind"], "closed");
    }

    #[tokio::test]
    async fn test_status_reports_pool() {
        let temp = tempfile::TempDir::new().unwrap();
        let (app, _pool) = test_app(&temp, 7).await;

        let response = app
            .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["capacity"], 7);
        assert_eq!(body["workers"], 1);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        metrics::init_metrics();
        let temp = tempfile::TempDir::new().unwrap();
        let (app, _pool) = test_app(&temp, 10).await;

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("retouch_items_total"));
    }
}
