//! Reference `compliance_ingestion` collaborators (§6) backed by the local
//! filesystem. A "site" is a local directory addressed as
//! `https://local<path>` so it still passes Ingestion's http/https check;
//! `navigate` just records which directory, and
//! `identify_downloadable_files` walks it and glob-matches `file_patterns`
//! against an in-memory candidate list, in place of a real browser driver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use compliance_core::model::{DownloadableFile, FileMetadata, Format};
use compliance_db::FileMetadataRepository;
use compliance_ingestion::{BrowserAutomation, BrowserError, DownloadStorage, DownloadTracker, DownloadedFile, FileMetadataLogger};

/// Every "site" URL this browser accepts is `https://local<absolute path>`
/// so it still satisfies Ingestion's http/https validation (§4.4 step 0)
/// while addressing a directory on the local filesystem.
const LOCAL_SITE_PREFIX: &str = "https://local";

fn path_from_url(url: &str) -> PathBuf {
    PathBuf::from(url.trim_start_matches(LOCAL_SITE_PREFIX))
}

/// Treats `root` as the remote site: every regular file under it (one level
/// deep) is a downloadable candidate once `navigate` has been called.
pub struct LocalDirectoryBrowser {
    root: Option<PathBuf>,
}

impl LocalDirectoryBrowser {
    pub fn new() -> Self {
        Self { root: None }
    }
}

fn glob_match(pattern: &str, name: &str) -> bool {
    // `*` wildcard only; good enough for the fixed extension-style patterns
    // this CLI accepts ("*.xml", "*.pdf", …).
    match pattern.split_once('*') {
        Some((prefix, suffix)) => name.starts_with(prefix) && name.ends_with(suffix),
        None => name == pattern,
    }
}

#[async_trait]
impl BrowserAutomation for LocalDirectoryBrowser {
    async fn launch(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let path = path_from_url(url);
        if !path.is_dir() {
            return Err(BrowserError::NavigationFailed {
                url: url.to_string(),
                reason: format!("{} is not a directory", path.display()),
            });
        }
        self.root = Some(path);
        Ok(())
    }

    async fn identify_downloadable_files(&mut self, patterns: &[String]) -> Result<Vec<DownloadableFile>, BrowserError> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| BrowserError::NavigationFailed { url: String::new(), reason: "navigate() was not called".to_string() })?;

        let mut candidates = Vec::new();
        let entries = std::fs::read_dir(root)
            .map_err(|e| BrowserError::NavigationFailed { url: root.display().to_string(), reason: e.to_string() })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
            if !patterns.iter().any(|p| glob_match(p, &file_name)) {
                continue;
            }
            let bytes = std::fs::read(&path).unwrap_or_default();
            let format = compliance_extraction::identify_format(&bytes, &file_name);
            candidates.push(DownloadableFile {
                url: format!("{LOCAL_SITE_PREFIX}{}", path.display()),
                file_name,
                format,
            });
        }
        Ok(candidates)
    }

    async fn download(&mut self, url: &str) -> Result<DownloadedFile, BrowserError> {
        let path = path_from_url(url);
        let bytes = std::fs::read(&path).map_err(|e| BrowserError::DownloadFailed(format!("{}: {e}", path.display())))?;
        let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        let format = compliance_extraction::identify_format(&bytes, &file_name);
        Ok(DownloadedFile { bytes, file_name, format })
    }

    async fn close(&mut self) {
        self.root = None;
    }
}

/// Writes downloaded bytes under `<root>/intake/`, returning the path as
/// the opaque storage token.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DownloadStorage for LocalFileStorage {
    async fn save(&self, bytes: &[u8], file_name: &str, _format: Format) -> Result<String, std::io::Error> {
        let dir = self.root.join("intake");
        std::fs::create_dir_all(&dir)?;
        let target = dir.join(format!("{}_{}", uuid::Uuid::new_v4(), file_name));
        std::fs::write(&target, bytes)?;
        Ok(target.to_string_lossy().into_owned())
    }
}

/// Checksum dedupe ledger. A real deployment would back this with the same
/// store `FileMetadataRepository` uses; this keeps its own set so a CLI run
/// with a fresh in-memory repository still dedupes within the run.
#[derive(Default)]
pub struct InMemoryChecksumTracker {
    seen: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl InMemoryChecksumTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DownloadTracker for InMemoryChecksumTracker {
    async fn is_duplicate(&self, checksum: &str) -> bool {
        self.seen.lock().unwrap().contains(checksum)
    }

    async fn record(&self, checksum: &str) {
        self.seen.lock().unwrap().insert(checksum.to_string());
    }
}

/// Logs `FileMetadata` into the workspace's `FileMetadataRepository`
/// (§6 `FileMetadataLogger`). Failure here is already non-fatal to
/// ingestion per §4.4; this adapter just surfaces the repository's error
/// as the `std::io::Error` the trait expects.
pub struct RepoBackedMetadataLogger {
    repo: Arc<dyn FileMetadataRepository>,
}

impl RepoBackedMetadataLogger {
    pub fn new(repo: Arc<dyn FileMetadataRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl FileMetadataLogger for RepoBackedMetadataLogger {
    async fn log_file_metadata(&self, metadata: &FileMetadata) -> Result<(), std::io::Error> {
        self.repo
            .insert(metadata.clone())
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }
}

pub fn read_stored_bytes(path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
    std::fs::read(path)
}
