//! Background reconciliation of external processing state.
//!
//! A scheduled pass fetches the external status listing once, completes
//! every image result the service has finished (detections translated to
//! display labels, download link attached), refreshes task statuses, and
//! snapshots the task list when anything changed. Listing tasks over HTTP
//! stays a pure query.

use std::time::Duration;

use metrics::counter;
use tokio::time::sleep;

use crate::app_state::AppState;
use crate::models::task::{DetectionResult, ImageResult, Task, TaskStatus};
use crate::services::defects;
use crate::services::processing::{ExternalDetection, ProcessingError};

/// What one pass changed.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassSummary {
    pub images_completed: usize,
    pub images_failed: usize,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
}

impl PassSummary {
    pub fn changed(&self) -> bool {
        self.images_completed > 0 || self.images_failed > 0
    }
}

/// Run reconciliation passes forever. Pass failures are logged and
/// retried on the next tick; this loop never exits.
pub async fn run_loop(state: AppState, interval: Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "reconciliation job started");
    loop {
        match run_pass(&state).await {
            Ok(summary) if summary.changed() => {
                tracing::info!(
                    images_completed = summary.images_completed,
                    images_failed = summary.images_failed,
                    tasks_completed = summary.tasks_completed,
                    tasks_failed = summary.tasks_failed,
                    "reconciliation pass applied updates"
                );
            }
            Ok(_) => {
                tracing::trace!("reconciliation pass made no changes");
            }
            Err(e) => {
                tracing::warn!(error = %e, "reconciliation pass failed, will retry next tick");
            }
        }
        sleep(interval).await;
    }
}

/// One reconciliation pass over every incomplete task.
///
/// A failing per-image metadata fetch is logged and skipped; a failing
/// status listing aborts the whole pass.
pub async fn run_pass(state: &AppState) -> Result<PassSummary, ProcessingError> {
    let statuses = state.processor.fetch_statuses().await?;
    counter!("reconcile_passes_total").increment(1);

    let mut summary = PassSummary::default();

    for task in state.store.list().await {
        if task.status == TaskStatus::Completed || task.results.is_empty() {
            continue;
        }

        let mut task_changed = false;

        for image in &task.results {
            if image.status != TaskStatus::Pending {
                continue;
            }

            match statuses.get(&image.id).map(String::as_str) {
                Some("completed") => {
                    let detections = match state.processor.fetch_detections(&image.id).await {
                        Ok(d) => d,
                        Err(e) => {
                            tracing::warn!(
                                task_id = %task.id,
                                image_id = %image.id,
                                error = %e,
                                "failed to fetch detections, skipping image"
                            );
                            continue;
                        }
                    };

                    let translated: Vec<DetectionResult> =
                        detections.into_iter().map(to_detection).collect();
                    let download_url = state.processor.render_url(&image.id);

                    let applied = state
                        .store
                        .modify(&task.id, |t| {
                            find_image(t, &image.id)
                                .map(|img| complete_image(img, translated, download_url))
                                .unwrap_or(false)
                        })
                        .await
                        .unwrap_or(false);

                    if applied {
                        summary.images_completed += 1;
                        task_changed = true;
                        counter!("reconcile_images_completed_total").increment(1);
                    }
                }
                Some("failed") => {
                    let applied = state
                        .store
                        .modify(&task.id, |t| {
                            find_image(t, &image.id)
                                .map(|img| {
                                    if img.status == TaskStatus::Pending {
                                        img.status = TaskStatus::Failed;
                                        true
                                    } else {
                                        false
                                    }
                                })
                                .unwrap_or(false)
                        })
                        .await
                        .unwrap_or(false);

                    if applied {
                        summary.images_failed += 1;
                        task_changed = true;
                    }
                }
                _ => {}
            }
        }

        if task_changed {
            let new_status = state
                .store
                .modify(&task.id, |t| {
                    refresh_task_status(t);
                    t.status
                })
                .await
                .ok();

            // Count transitions only; `task` still holds the status from
            // the start of the pass.
            match new_status {
                Some(TaskStatus::Completed) if task.status != TaskStatus::Completed => {
                    summary.tasks_completed += 1;
                    counter!("reconcile_tasks_completed_total").increment(1);
                    tracing::info!(task_id = %task.id, "task completed");
                }
                Some(TaskStatus::Failed) if task.status != TaskStatus::Failed => {
                    summary.tasks_failed += 1;
                    tracing::info!(task_id = %task.id, "task failed");
                }
                _ => {}
            }
        }
    }

    if summary.changed() {
        let tasks = state.store.list().await;
        match state.snapshots.write(&tasks).await {
            Ok(path) => tracing::debug!(path = %path.display(), "task list snapshot written"),
            Err(e) => tracing::warn!(error = %e, "failed to write task list snapshot"),
        }
    }

    Ok(summary)
}

fn to_detection(det: ExternalDetection) -> DetectionResult {
    DetectionResult {
        defect: defects::display_label(&det.class_name),
        presence: det.presence,
        bbox: det.bbox,
    }
}

fn find_image<'a>(task: &'a mut Task, image_id: &str) -> Option<&'a mut ImageResult> {
    task.results.iter_mut().find(|i| i.id == image_id)
}

/// Record detections and mark an image result completed. Already-completed
/// images are left untouched, so re-running a pass never duplicates
/// detections.
pub(crate) fn complete_image(
    image: &mut ImageResult,
    detections: Vec<DetectionResult>,
    download_url: String,
) -> bool {
    if image.status == TaskStatus::Completed {
        return false;
    }
    image.result = detections;
    image.download_url = Some(download_url);
    image.status = TaskStatus::Completed;
    true
}

/// Derive task status from its image results. A task with zero image
/// results stays as it is; one with every image completed becomes
/// COMPLETED; one with any failed image becomes FAILED.
pub(crate) fn refresh_task_status(task: &mut Task) {
    if task.status == TaskStatus::Completed || task.results.is_empty() {
        return;
    }
    if task.results.iter().any(|i| i.status == TaskStatus::Failed) {
        task.status = TaskStatus::Failed;
    } else if task.results.iter().all(|i| i.status == TaskStatus::Completed) {
        task.status = TaskStatus::Completed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::BoundingBox;
    use chrono::Utc;

    fn sample_detection() -> DetectionResult {
        to_detection(ExternalDetection {
            class_name: "cracks".to_string(),
            presence: 0.8,
            bbox: BoundingBox {
                x: 0.1,
                y: 0.2,
                width: 0.3,
                height: 0.4,
            },
        })
    }

    fn task_with_images(images: Vec<ImageResult>) -> Task {
        Task {
            id: "t1".to_string(),
            name: "Bridge Survey".to_string(),
            date: Utc::now(),
            status: TaskStatus::Pending,
            files: images.iter().map(|i| i.filename.clone()).collect(),
            results: images,
        }
    }

    #[test]
    fn detections_are_translated() {
        let det = sample_detection();
        assert_eq!(det.defect, "Трещина(ы)");
        assert_eq!(det.presence, 0.8);
        assert_eq!(det.bbox.x, 0.1);
    }

    #[test]
    fn completing_an_image_is_idempotent() {
        let mut image = ImageResult::pending("img-1".to_string(), "t1_frame.jpg".to_string());

        assert!(complete_image(
            &mut image,
            vec![sample_detection()],
            "http://proc/api/images/img-1/render".to_string(),
        ));
        assert_eq!(image.status, TaskStatus::Completed);
        assert_eq!(image.result.len(), 1);

        // A second pass over the same external state must not duplicate
        // detections.
        assert!(!complete_image(
            &mut image,
            vec![sample_detection(), sample_detection()],
            "http://proc/api/images/img-1/render".to_string(),
        ));
        assert_eq!(image.result.len(), 1);
    }

    #[test]
    fn task_completes_only_when_all_images_complete() {
        let mut task = task_with_images(vec![
            ImageResult::pending("img-1".to_string(), "a.jpg".to_string()),
            ImageResult::pending("img-2".to_string(), "b.jpg".to_string()),
        ]);

        complete_image(&mut task.results[0], vec![], "u1".to_string());
        refresh_task_status(&mut task);
        assert_eq!(task.status, TaskStatus::Pending);

        complete_image(&mut task.results[1], vec![], "u2".to_string());
        refresh_task_status(&mut task);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn task_without_images_never_completes() {
        let mut task = task_with_images(Vec::new());
        refresh_task_status(&mut task);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn failed_image_fails_the_task() {
        let mut task = task_with_images(vec![
            ImageResult::pending("img-1".to_string(), "a.jpg".to_string()),
            ImageResult::pending("img-2".to_string(), "b.jpg".to_string()),
        ]);

        task.results[0].status = TaskStatus::Failed;
        complete_image(&mut task.results[1], vec![], "u".to_string());
        refresh_task_status(&mut task);
        assert_eq!(task.status, TaskStatus::Failed);
    }
}
