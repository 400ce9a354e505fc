use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the external defect detection service.
    pub processor_url: String,

    /// Directory for uploaded images.
    #[serde(default = "default_images_dir")]
    pub images_dir: String,

    /// Directory for task list snapshots.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Snapshot filename prefix.
    #[serde(default = "default_snapshot_prefix")]
    pub snapshot_prefix: String,

    /// Seconds between background reconciliation passes.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_images_dir() -> String {
    "images".to_string()
}

fn default_snapshot_dir() -> String {
    "snapshots".to_string()
}

fn default_snapshot_prefix() -> String {
    "tasks".to_string()
}

fn default_reconcile_interval_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
