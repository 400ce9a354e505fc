use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Processing state of a task or of a single uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

/// Defect location in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One detected defect: display label, presence score in [0, 1], location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub defect: String,
    pub presence: f64,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Per-image processing state, keyed by the identifier the external
/// detection service assigned at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    pub id: String,
    pub filename: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    pub result: Vec<DetectionResult>,
}

impl ImageResult {
    /// A freshly submitted image: no detections yet, no rendered output.
    pub fn pending(id: String, filename: String) -> Self {
        Self {
            id,
            filename,
            status: TaskStatus::Pending,
            download_url: None,
            result: Vec::new(),
        }
    }
}

/// A survey task grouping one or more uploaded images and their
/// processing outcome. Held in memory only; lost on restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub status: TaskStatus,
    pub files: Vec<String>,
    pub results: Vec<ImageResult>,
}

/// Response wrapper for single-task endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task: Task,
}

/// Response wrapper for the task listing endpoint. `count` is the number
/// of tasks actually returned, which may be a slice of the full set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub count: usize,
    pub tasks: Vec<Task>,
}
