//! In-memory reference collaborators, the ingestion-crate equivalent of
//! `compliance_db::memory`'s reference repositories. Used by this crate's
//! own tests and available to downstream crates under the
//! `test-support` feature.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use compliance_core::model::{DownloadableFile, Format};

use crate::collaborators::{BrowserAutomation, BrowserError, DownloadStorage, DownloadTracker, DownloadedFile, FileMetadataLogger};

/// A browser stub that serves one fixed candidate list and one fixed
/// download payload, for deterministic tests.
pub struct FixedBrowser {
    pub fail_launch: bool,
    candidates: Vec<DownloadableFile>,
    payloads: std::collections::HashMap<String, Vec<u8>>,
    pub closed: Arc<AtomicBool>,
}

impl FixedBrowser {
    pub fn empty() -> Self {
        Self {
            fail_launch: false,
            candidates: Vec::new(),
            payloads: std::collections::HashMap::new(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_file(url: &str, file_name: &str, format: Format, bytes: Vec<u8>) -> Self {
        let mut browser = Self::empty();
        browser.candidates.push(DownloadableFile {
            url: url.to_string(),
            file_name: file_name.to_string(),
            format,
        });
        browser.payloads.insert(url.to_string(), bytes);
        browser
    }
}

#[async_trait]
impl BrowserAutomation for FixedBrowser {
    async fn launch(&mut self) -> Result<(), BrowserError> {
        if self.fail_launch {
            Err(BrowserError::LaunchFailed("stub configured to fail".to_string()))
        } else {
            Ok(())
        }
    }

    async fn navigate(&mut self, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn identify_downloadable_files(
        &mut self,
        _patterns: &[String],
    ) -> Result<Vec<DownloadableFile>, BrowserError> {
        Ok(self.candidates.clone())
    }

    async fn download(&mut self, url: &str) -> Result<DownloadedFile, BrowserError> {
        let bytes = self
            .payloads
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::DownloadFailed(format!("no stub payload for {url}")))?;
        let file_name = self
            .candidates
            .iter()
            .find(|c| c.url == url)
            .map(|c| c.file_name.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let format = self
            .candidates
            .iter()
            .find(|c| c.url == url)
            .map(|c| c.format)
            .unwrap_or(Format::Unknown);
        Ok(DownloadedFile { bytes, file_name, format })
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl FixedBrowser {
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

#[derive(Default)]
pub struct InMemoryStorage {
    saved: Mutex<Vec<(String, Format, Vec<u8>)>>,
}

#[async_trait]
impl DownloadStorage for InMemoryStorage {
    async fn save(&self, bytes: &[u8], file_name: &str, format: Format) -> Result<String, std::io::Error> {
        let mut saved = self.saved.lock().unwrap();
        let path = format!("memory://{}/{}", saved.len(), file_name);
        saved.push((file_name.to_string(), format, bytes.to_vec()));
        Ok(path)
    }
}

#[derive(Default)]
pub struct InMemoryTracker {
    seen: Mutex<HashSet<String>>,
}

#[async_trait]
impl DownloadTracker for InMemoryTracker {
    async fn is_duplicate(&self, checksum: &str) -> bool {
        self.seen.lock().unwrap().contains(checksum)
    }

    async fn record(&self, checksum: &str) {
        self.seen.lock().unwrap().insert(checksum.to_string());
    }
}

pub struct NoopMetadataLogger;

#[async_trait]
impl FileMetadataLogger for NoopMetadataLogger {
    async fn log_file_metadata(&self, _metadata: &compliance_core::model::FileMetadata) -> Result<(), std::io::Error> {
        Ok(())
    }
}
