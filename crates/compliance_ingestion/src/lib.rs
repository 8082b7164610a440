//! Ingestion stage (C4, §4.4): browse a regulator site, download new
//! documents, dedupe by checksum, store them, and log their metadata.

pub mod collaborators;
pub mod ingest;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use collaborators::{BrowserAutomation, BrowserError, DownloadStorage, DownloadTracker, DownloadedFile, FileMetadataLogger};
pub use ingest::{ingest, IngestionContext};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use compliance_core::cancel::StageContext;
    use compliance_core::model::Format;
    use compliance_db::InMemoryAuditRepository;
    use compliance_events::EventBus;

    use super::testing::{FixedBrowser, InMemoryStorage, InMemoryTracker, NoopMetadataLogger};
    use super::*;

    fn context(browser: FixedBrowser) -> IngestionContext {
        IngestionContext {
            browser: tokio::sync::Mutex::new(Box::new(browser)),
            storage: Arc::new(InMemoryStorage::default()),
            tracker: Arc::new(InMemoryTracker::default()),
            metadata_logger: Arc::new(NoopMetadataLogger),
            audit: Arc::new(InMemoryAuditRepository::default()),
            events: EventBus::new(),
        }
    }

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let ctx = context(FixedBrowser::empty());
        let stage_ctx = StageContext::new_stage();
        let outcome = ingest(&ctx, &stage_ctx, "ftp://example.gov", &["*.pdf".to_string()]).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn rejects_blank_patterns() {
        let ctx = context(FixedBrowser::empty());
        let stage_ctx = StageContext::new_stage();
        let outcome = ingest(&ctx, &stage_ctx, "https://example.gov", &["  ".to_string()]).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn downloads_and_stores_a_new_file() {
        let browser = FixedBrowser::with_file(
            "https://example.gov/a.pdf",
            "a.pdf",
            Format::Pdf,
            b"hello world".to_vec(),
        );
        let ctx = context(browser);
        let stage_ctx = StageContext::new_stage();
        let outcome = ingest(&ctx, &stage_ctx, "https://example.gov", &["*.pdf".to_string()]).await;
        match outcome {
            compliance_core::outcome::Outcome::Success(files) => {
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].checksum.len(), 64);
            }
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn skips_a_duplicate_checksum_without_error() {
        let browser = FixedBrowser::with_file(
            "https://example.gov/a.pdf",
            "a.pdf",
            Format::Pdf,
            b"hello world".to_vec(),
        );
        let ctx = context(browser);
        ctx.tracker.record(&compliance_security::sha256_hex(b"hello world")).await;
        let stage_ctx = StageContext::new_stage();
        let outcome = ingest(&ctx, &stage_ctx, "https://example.gov", &["*.pdf".to_string()]).await;
        match outcome {
            compliance_core::outcome::Outcome::Success(files) => assert!(files.is_empty()),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn browser_closes_even_on_launch_failure() {
        let mut browser = FixedBrowser::empty();
        browser.fail_launch = true;
        let closed = browser.closed_flag();
        let ctx = context(browser);
        let stage_ctx = StageContext::new_stage();
        let outcome = ingest(&ctx, &stage_ctx, "https://example.gov", &["*.pdf".to_string()]).await;
        assert!(outcome.is_failure());
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }
}
