//! External interfaces Ingestion depends on but does not implement (§6).
//! Concrete browser/storage backends are out of scope; these traits are
//! the seam an orchestrator wires a real implementation into, the way
//! `compliance_db`'s repository traits stand in for a real database.

use async_trait::async_trait;
use compliance_core::model::{DownloadableFile, Format};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    LaunchFailed(String),
    #[error("failed to navigate to {url}: {reason}")]
    NavigationFailed { url: String, reason: String },
    #[error("download failed: {0}")]
    DownloadFailed(String),
}

/// A downloaded file's raw bytes plus the metadata the site reported.
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub format: Format,
}

/// Browser automation collaborator (§6). One instance per ingestion
/// operation; `close` must run on every exit path, including failure.
#[async_trait]
pub trait BrowserAutomation: Send + Sync {
    async fn launch(&mut self) -> Result<(), BrowserError>;
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;
    async fn identify_downloadable_files(
        &mut self,
        patterns: &[String],
    ) -> Result<Vec<DownloadableFile>, BrowserError>;
    async fn download(&mut self, url: &str) -> Result<DownloadedFile, BrowserError>;
    async fn close(&mut self);
}

/// Content-addressed blob storage collaborator (§6).
#[async_trait]
pub trait DownloadStorage: Send + Sync {
    async fn save(&self, bytes: &[u8], file_name: &str, format: Format) -> Result<String, std::io::Error>;
}

/// Checksum dedupe ledger collaborator (§6).
#[async_trait]
pub trait DownloadTracker: Send + Sync {
    async fn is_duplicate(&self, checksum: &str) -> bool;
    async fn record(&self, checksum: &str);
}

/// File metadata sink collaborator (§6). Failure here is non-fatal to
/// ingestion (§4.4 step 2): the file has already been saved.
#[async_trait]
pub trait FileMetadataLogger: Send + Sync {
    async fn log_file_metadata(&self, metadata: &compliance_core::model::FileMetadata) -> Result<(), std::io::Error>;
}
