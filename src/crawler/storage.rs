use serde::Serialize;
use serde::de::DeserializeOwned;
use std::{io, path::Path, path::PathBuf};
use tokio::fs;
use tracing::info;

use crate::insights::InsightSummary;
use crate::patterns::PatternRecord;

/// Default file for the pattern record array
pub const DEFAULT_RECORDS_FILE: &str = "blog_patterns.json";

/// Default file for the insight summary
pub const DEFAULT_INSIGHTS_FILE: &str = "blog_pattern_insights.json";

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Where the pattern record array is written
    pub records_path: PathBuf,

    /// Where the insight summary is written
    pub insights_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from(DEFAULT_RECORDS_FILE),
            insights_path: PathBuf::from(DEFAULT_INSIGHTS_FILE),
        }
    }
}

impl StorageConfig {
    /// Place both files under one directory with their default names
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            records_path: dir.as_ref().join(DEFAULT_RECORDS_FILE),
            insights_path: dir.as_ref().join(DEFAULT_INSIGHTS_FILE),
        }
    }
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for crate::error::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => crate::error::Error::Io(e),
            StorageError::Json(e) => crate::error::Error::Json(e),
            StorageError::NotFound(_) => crate::error::Error::Storage(err.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, StorageError>;

/// Storage manager for harvest results
///
/// Records are written as one JSON array and the summary as a separate JSON
/// document; both files are replaced on every store.
#[derive(Debug, Clone)]
pub struct Storage {
    config: StorageConfig,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    /// Create a new storage with default configuration
    pub fn new() -> Self {
        Self {
            config: StorageConfig::default(),
        }
    }

    /// Create a new storage with custom configuration
    pub fn with_config(config: StorageConfig) -> Self {
        Self { config }
    }

    /// Path of the pattern record file
    pub fn records_path(&self) -> &Path {
        &self.config.records_path
    }

    /// Path of the insight summary file
    pub fn insights_path(&self) -> &Path {
        &self.config.insights_path
    }

    /// Stores all pattern records, replacing earlier contents
    pub async fn store_records(&self, records: &[PatternRecord]) -> Result<()> {
        let path = self.records_path();
        write_json(path, &records).await?;
        info!("Saved {} patterns to {}", records.len(), path.display());
        Ok(())
    }

    /// Loads the stored pattern records
    pub async fn load_records(&self) -> Result<Vec<PatternRecord>> {
        read_json(self.records_path()).await
    }

    /// Stores the insight summary, replacing earlier contents
    pub async fn store_summary(&self, summary: &InsightSummary) -> Result<()> {
        let path = self.insights_path();
        write_json(path, summary).await?;
        info!(
            "Saved insights for {} patterns to {}",
            summary.total_patterns,
            path.display()
        );
        Ok(())
    }

    /// Loads the stored insight summary
    pub async fn load_summary(&self) -> Result<InsightSummary> {
        read_json(self.insights_path()).await
    }
}

/// Creates necessary directories for a file
async fn ensure_directories(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Writes a value as pretty-printed JSON
async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_directories(path).await?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    Ok(())
}

/// Reads a JSON document
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !fs::try_exists(path).await? {
        return Err(StorageError::NotFound(path.display().to_string()));
    }
    let json = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&json)?)
}
