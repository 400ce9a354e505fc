use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::counter;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::task::{ImageResult, Task, TaskListResponse, TaskResponse, TaskStatus};
use crate::routes::ApiError;

#[derive(Debug, Deserialize)]
pub struct SliceParams {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

/// GET /tasks — list tasks, optionally a contiguous slice by list
/// offsets. A pure query: reconciliation runs in the background job, not
/// here.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<SliceParams>,
) -> Json<TaskListResponse> {
    let tasks = state.store.slice(params.min, params.max).await;
    Json(TaskListResponse {
        count: tasks.len(),
        tasks,
    })
}

/// GET /tasks/{task_id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.store.get(&task_id).await?;
    Ok(Json(TaskResponse { task }))
}

/// POST /tasks — multipart form: `name`, optional `date_time`, one or
/// more `files`. Each file is stored locally under a task-id prefix and
/// forwarded to the external detection service; a forwarding failure
/// aborts the request.
pub async fn create_task(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TaskResponse>, ApiError> {
    let task_id = Uuid::new_v4().to_string();
    let mut name: Option<String> = None;
    let mut date: Option<DateTime<Utc>> = None;
    let mut files: Vec<String> = Vec::new();
    let mut results: Vec<ImageResult> = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        // Field accessors consume the field, so copy the name out first
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => name = Some(field.text().await?),
            Some("date_time") => {
                let raw = field.text().await?;
                let parsed = parse_capture_time(&raw)
                    .ok_or_else(|| ApiError::BadRequest(format!("invalid date_time: {raw}")))?;
                date = Some(parsed);
            }
            Some("files") => {
                let original = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("file field has no filename".into()))?;
                let data = field.bytes().await?;

                let content_type = image::guess_format(&data)
                    .map(|f| f.to_mime_type())
                    .unwrap_or("application/octet-stream");

                let stored = state.images.save(&task_id, &original, &data).await?;
                let external_id = state
                    .processor
                    .submit_image(&stored, data.to_vec(), content_type)
                    .await?;

                files.push(stored.clone());
                results.push(ImageResult::pending(external_id, stored));
            }
            _ => {}
        }
    }

    let name = name.ok_or_else(|| ApiError::BadRequest("name field is required".into()))?;

    let task = Task {
        id: task_id,
        name,
        date: date.unwrap_or_else(Utc::now),
        status: TaskStatus::Pending,
        files,
        results,
    };

    counter!("tasks_created_total").increment(1);
    counter!("images_uploaded_total").increment(task.results.len() as u64);
    tracing::info!(
        task_id = %task.id,
        name = %task.name,
        images = task.results.len(),
        "task created"
    );

    state.store.insert(task.clone()).await;
    Ok(Json(TaskResponse { task }))
}

/// DELETE /tasks/{task_id} — removes exactly one entry, returning it.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = state.store.remove(&task_id).await?;
    counter!("tasks_deleted_total").increment(1);
    tracing::info!(task_id = %task.id, "task deleted");
    Ok(Json(TaskResponse { task }))
}

// Capture timestamps arrive either as RFC 3339 or as a bare local
// datetime ("2022-11-13T15:16:00"); bare values are taken as UTC.
fn parse_capture_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
