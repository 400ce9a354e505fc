//! Test helper utilities: spawn the backend against a mock external
//! detection service, both on ephemeral ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tempfile::TempDir;

use defect_inspect::app_state::AppState;
use defect_inspect::services::{
    processing::ProcessingClient, snapshot::SnapshotWriter, storage::ImageStore,
};
use defect_inspect::store::TaskStore;

/// In-memory stand-in for the external defect detection service.
///
/// Submissions are assigned sequential "img-N" identifiers with status
/// "pending"; tests flip statuses and attach detection payloads to drive
/// reconciliation.
#[derive(Clone, Default)]
pub struct MockProcessor {
    next_id: Arc<AtomicUsize>,
    statuses: Arc<Mutex<HashMap<String, String>>>,
    detections: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl MockProcessor {
    pub fn complete_image(&self, image_id: &str, detections: serde_json::Value) {
        self.statuses
            .lock()
            .unwrap()
            .insert(image_id.to_string(), "completed".to_string());
        self.detections
            .lock()
            .unwrap()
            .insert(image_id.to_string(), detections);
    }

    pub fn fail_image(&self, image_id: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(image_id.to_string(), "failed".to_string());
    }

    pub fn submission_count(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }
}

async fn mock_submit(
    State(mock): State<MockProcessor>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, StatusCode> {
    // Drain the upload; the mock only cares that a file arrived.
    let mut saw_file = false;
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        if field.name() == Some("file") {
            field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            saw_file = true;
        }
    }
    if !saw_file {
        return Err(StatusCode::BAD_REQUEST);
    }

    let n = mock.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let id = format!("img-{n}");
    mock.statuses
        .lock()
        .unwrap()
        .insert(id.clone(), "pending".to_string());
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn mock_statuses(State(mock): State<MockProcessor>) -> Json<HashMap<String, String>> {
    Json(mock.statuses.lock().unwrap().clone())
}

async fn mock_detections(
    State(mock): State<MockProcessor>,
    Path(image_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let detections = mock.detections.lock().unwrap().get(&image_id).cloned();
    match detections {
        Some(d) => Ok(Json(serde_json::json!({ "detections": d }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// Spawn the mock detection service, returning its base URL and handle.
pub async fn spawn_mock_processor() -> (String, MockProcessor) {
    let mock = MockProcessor::default();
    let router = Router::new()
        .route("/api/images", post(mock_submit))
        .route("/api/images/status", get(mock_statuses))
        .route("/api/images/{image_id}", get(mock_detections))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock processor");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), mock)
}

/// A running backend wired to a mock processor, with its temp
/// directories kept alive for the duration of the test.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    pub mock: MockProcessor,
    pub images_dir: TempDir,
    pub snapshot_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let (processor_url, mock) = spawn_mock_processor().await;

    let images_dir = tempfile::tempdir().expect("Failed to create images dir");
    let snapshot_dir = tempfile::tempdir().expect("Failed to create snapshot dir");

    let images = ImageStore::new(images_dir.path())
        .await
        .expect("Failed to initialize image store");
    let processor = ProcessingClient::new(&processor_url);
    let snapshots = SnapshotWriter::new(snapshot_dir.path(), "tasks");
    let store = TaskStore::new();

    let state = AppState::new(store, images, processor, snapshots);

    let router = defect_inspect::routes::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind app");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{addr}"),
        client: reqwest::Client::new(),
        state,
        mock,
        images_dir,
        snapshot_dir,
    }
}

/// Smallest payload `image::guess_format` recognizes as PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(b"fake png body for tests");
    bytes
}

/// POST /tasks with a multipart form: name, optional date_time, files.
pub async fn create_task(
    app: &TestApp,
    name: &str,
    date_time: Option<&str>,
    files: &[(&str, Vec<u8>)],
) -> reqwest::Response {
    let mut form = reqwest::multipart::Form::new().text("name", name.to_string());
    if let Some(dt) = date_time {
        form = form.text("date_time", dt.to_string());
    }
    for (filename, bytes) in files {
        form = form.part(
            "files",
            reqwest::multipart::Part::bytes(bytes.clone())
                .file_name(filename.to_string())
                .mime_str("image/png")
                .unwrap(),
        );
    }

    app.client
        .post(format!("{}/tasks", app.base_url))
        .multipart(form)
        .send()
        .await
        .expect("create task request failed")
}
