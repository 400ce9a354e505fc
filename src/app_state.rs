use std::sync::Arc;

use crate::services::{
    processing::ProcessingClient, snapshot::SnapshotWriter, storage::ImageStore,
};
use crate::store::TaskStore;

/// Shared application state passed to all route handlers and to the
/// background reconciliation job.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TaskStore>,
    pub images: Arc<ImageStore>,
    pub processor: Arc<ProcessingClient>,
    pub snapshots: Arc<SnapshotWriter>,
}

impl AppState {
    pub fn new(
        store: TaskStore,
        images: ImageStore,
        processor: ProcessingClient,
        snapshots: SnapshotWriter,
    ) -> Self {
        Self {
            store: Arc::new(store),
            images: Arc::new(images),
            processor: Arc::new(processor),
            snapshots: Arc::new(snapshots),
        }
    }
}
