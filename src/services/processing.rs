use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;

use crate::models::task::BoundingBox;

/// Client for the external defect detection service.
///
/// No timeout, retry, or backoff policy: callers see network failures as
/// errors and decide what to do with them (the reconciliation job skips
/// and retries on its next tick; the upload path aborts the request).
pub struct ProcessingClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Deserialize)]
struct DetailResponse {
    detections: Vec<ExternalDetection>,
}

/// One detection as the external service reports it, class name still in
/// the model vocabulary.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalDetection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub presence: f64,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl ProcessingClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit an image for processing, returning the identifier the
    /// service assigned to it.
    pub async fn submit_image(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ProcessingError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/images", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let submitted: SubmitResponse = response.json().await?;
        Ok(submitted.id)
    }

    /// Bulk status listing: external image identifier → status string
    /// ("pending", "completed", "failed", ...).
    pub async fn fetch_statuses(&self) -> Result<HashMap<String, String>, ProcessingError> {
        let response = self
            .http
            .get(format!("{}/api/images/status", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Detection metadata for one processed image.
    pub async fn fetch_detections(
        &self,
        image_id: &str,
    ) -> Result<Vec<ExternalDetection>, ProcessingError> {
        let response = self
            .http
            .get(format!("{}/api/images/{image_id}", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        let detail: DetailResponse = response.json().await?;
        Ok(detail.detections)
    }

    /// Download link for the rendered output image the service produces
    /// for a completed job.
    pub fn render_url(&self, image_id: &str) -> String {
        format!("{}/api/images/{image_id}/render", self.base_url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("processing service request failed: {0}")]
    Http(#[from] reqwest::Error),
}
