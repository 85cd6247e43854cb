//! End-to-end tests: HTTP upload -> intake -> worker pool -> local filters -> HTTP response.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use retouch::api::{router, ApiState};
use retouchcore::enhance::{Intake, LocalSource, PoolConfig, RoutingNotifier, TicketBoard, WorkQueue, WorkerPool};
use retouchcore::Backend;

const BOUNDARY: &str = "pipeline-boundary";

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgb([200, 40, 40])
        } else {
            Rgb([20, 20, 160])
        }
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn upload(mode: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n",
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("/process/{}", mode))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn local_app(temp: &tempfile::TempDir) -> (axum::Router, WorkerPool) {
    let table = Backend::from_name("local", 2, "").unwrap().dispatch_table().unwrap();
    let queue = Arc::new(WorkQueue::new(16));
    let tickets = Arc::new(TicketBoard::new());
    let pool = WorkerPool::spawn(
        Arc::clone(&queue),
        Arc::new(table),
        Arc::new(LocalSource),
        Arc::new(RoutingNotifier::new(None, Arc::clone(&tickets))),
        PoolConfig {
            workers: 2,
            timeout: Duration::from_secs(30),
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

async fn decode_response(response: axum::response::Response) -> DynamicImage {
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap()
}

#[tokio::test]
async fn upscale_doubles_dimensions() {
    let temp = tempfile::TempDir::new().unwrap();
    let (app, _pool) = local_app(&temp).await;

    let response = app.oneshot(upload("upscale", &sample_png(32, 24))).await.unwrap();

    assert_eq!(decode_response(response).await.dimensions(), (64, 48));
}

#[tokio::test]
async fn face_restore_doubles_dimensions() {
    let temp = tempfile::TempDir::new().unwrap();
    let (app, _pool) = local_app(&temp).await;

    let response = app.oneshot(upload("face_restore", &sample_png(20, 30))).await.unwrap();

    assert_eq!(decode_response(response).await.dimensions(), (40, 60));
}

#[tokio::test]
async fn illustration_and_poster_keep_dimensions() {
    let temp = tempfile::TempDir::new().unwrap();
    let (app, _pool) = local_app(&temp).await;

    for mode in ["illustration", "poster"] {
        let response = app.clone().oneshot(upload(mode, &sample_png(40, 16))).await.unwrap();
        assert_eq!(decode_response(response).await.dimensions(), (40, 16), "mode {}", mode);
    }
}

#[tokio::test]
async fn undecodable_upload_is_unprocessable_and_cleaned_up() {
    let temp = tempfile::TempDir::new().unwrap();
    let (app, pool) = local_app(&temp).await;

    let response = app.oneshot(upload("poster", b"definitely not an image")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["kind"], "processor");

    pool.shutdown().await;
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}
