use std::path::PathBuf;

use chrono::Utc;

use crate::models::task::Task;

/// Writes timestamped JSON dumps of the full task list.
///
/// Filenames follow `{prefix}_{YYYY-MM-DD HH-MM-SS}_.json`. Old snapshots
/// are never removed.
pub struct SnapshotWriter {
    dir: PathBuf,
    prefix: String,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
        }
    }

    /// Serialize the task list to a new snapshot file, returning its path.
    pub async fn write(&self, tasks: &[Task]) -> Result<PathBuf, SnapshotError> {
        let filename = format!(
            "{}_{}_.json",
            self.prefix,
            Utc::now().format("%Y-%m-%d %H-%M-%S")
        );
        let path = self.dir.join(filename);

        let body = serde_json::to_vec_pretty(tasks)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
