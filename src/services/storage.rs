use std::path::{Component, Path, PathBuf};

/// Local-disk store for uploaded images.
///
/// Stored names are the original filename prefixed with the owning task's
/// identifier, so concurrent uploads of identically named files cannot
/// collide.
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Write uploaded bytes, returning the stored filename.
    pub async fn save(
        &self,
        task_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        // Browsers may send a full client-side path; keep the final
        // component only.
        let base = Path::new(original_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        let stored = format!("{task_id}_{base}");
        tokio::fs::write(self.root.join(&stored), bytes).await?;
        Ok(stored)
    }

    /// Read a stored file back by name. Names that resolve outside the
    /// storage directory report NotFound, same as missing files.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The storage directory must exist and be a directory.
    pub async fn health_check(&self) -> Result<(), StorageError> {
        let meta = tokio::fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StorageError::NotFound(self.root.display().to_string()));
        }
        Ok(())
    }

    // Reject any name that is not a single plain path component, so
    // "../", absolute paths, and encoded traversals all surface as
    // NotFound instead of escaping the directory.
    fn resolve(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let requested = Path::new(filename);
        let mut components = requested.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(StorageError::NotFound(filename.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),

    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
