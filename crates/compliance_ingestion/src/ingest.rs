//! The Ingestion stage algorithm (§4.4, C4): browse, download, dedupe,
//! store, log metadata.

use std::sync::Arc;

use tracing::{info, warn};

use compliance_core::cancel::StageContext;
use compliance_core::model::{AuditActionType, AuditRecord, FileMetadata, Stage};
use compliance_core::outcome::Outcome;
use compliance_db::AuditRepository;
use compliance_events::{EventBus, PipelineEvent};
use compliance_ids::FileId;
use compliance_security::sha256_hex;

use crate::collaborators::{BrowserAutomation, DownloadStorage, DownloadTracker, FileMetadataLogger};

/// Everything `ingest` needs beyond the URL/patterns it is called with.
/// Shared with `Arc` so one set of collaborators can serve many ingestion
/// runs concurrently.
pub struct IngestionContext {
    pub browser: tokio::sync::Mutex<Box<dyn BrowserAutomation>>,
    pub storage: Arc<dyn DownloadStorage>,
    pub tracker: Arc<dyn DownloadTracker>,
    pub metadata_logger: Arc<dyn FileMetadataLogger>,
    pub audit: Arc<dyn AuditRepository>,
    pub events: EventBus,
}

/// Ingest documents from `website_url`, keeping only files whose name
/// matches one of `file_patterns` and whose checksum has not been seen
/// before. Returns the list of newly-stored [`FileMetadata`], which may be
/// shorter than the candidate list (duplicates and per-file failures are
/// skipped, not fatal to the batch, per §4.4).
pub async fn ingest(
    ctx: &IngestionContext,
    stage_ctx: &StageContext,
    website_url: &str,
    file_patterns: &[String],
) -> Outcome<Vec<FileMetadata>> {
    if let Err(reason) = validate_inputs(website_url, file_patterns) {
        return Outcome::failure(reason);
    }

    let correlation_id = stage_ctx.correlation_id.clone();
    let mut browser = ctx.browser.lock().await;

    let launch_result = browser.launch().await;
    audit(
        &ctx.audit,
        correlation_id.clone(),
        "launch_browser",
        launch_result.is_ok(),
        launch_result.as_ref().err().map(|e| e.to_string()),
    )
    .await;
    if let Err(e) = launch_result {
        browser.close().await;
        return Outcome::failure(format!("browser launch failed: {e}"));
    }

    if stage_ctx.cancellation.is_cancelled() {
        browser.close().await;
        return Outcome::Cancelled;
    }

    let navigate_result = browser.navigate(website_url).await;
    audit(
        &ctx.audit,
        correlation_id.clone(),
        "navigate",
        navigate_result.is_ok(),
        navigate_result.as_ref().err().map(|e| e.to_string()),
    )
    .await;
    if let Err(e) = navigate_result {
        browser.close().await;
        return Outcome::failure(format!("navigation to {website_url} failed: {e}"));
    }

    if stage_ctx.cancellation.is_cancelled() {
        browser.close().await;
        return Outcome::Cancelled;
    }

    let candidates = match browser.identify_downloadable_files(file_patterns).await {
        Ok(files) => files,
        Err(e) => {
            audit(&ctx.audit, correlation_id.clone(), "identify_downloadable_files", false, Some(e.to_string())).await;
            browser.close().await;
            return Outcome::failure(format!("could not enumerate downloadable files: {e}"));
        }
    };
    audit(&ctx.audit, correlation_id.clone(), "identify_downloadable_files", true, None).await;

    let total = candidates.len();
    let mut stored = Vec::with_capacity(total);

    for (index, candidate) in candidates.into_iter().enumerate() {
        if stage_ctx.cancellation.is_cancelled() {
            browser.close().await;
            return compliance_core::outcome::partial_cancelled(
                stored,
                index,
                total,
                "ingestion cancelled",
            );
        }

        if let Some(metadata) = ingest_one(ctx, &correlation_id, &mut **browser, &candidate.url).await {
            stored.push(metadata);
        }
    }

    browser.close().await;
    Outcome::Success(stored)
}

async fn ingest_one(
    ctx: &IngestionContext,
    correlation_id: &compliance_ids::CorrelationId,
    browser: &mut dyn BrowserAutomation,
    url: &str,
) -> Option<FileMetadata> {
    let downloaded = match browser.download(url).await {
        Ok(file) => file,
        Err(e) => {
            audit(&ctx.audit, correlation_id.clone(), "download_file", false, Some(e.to_string())).await;
            warn!(url, error = %e, "per-file download failure, continuing batch");
            return None;
        }
    };

    let checksum = sha256_hex(&downloaded.bytes);
    audit(&ctx.audit, correlation_id.clone(), "compute_checksum", true, None).await;

    if ctx.tracker.is_duplicate(&checksum).await {
        audit_with_details(
            &ctx.audit,
            correlation_id.clone(),
            true,
            &serde_json::json!({ "checksum": checksum, "skipped": true, "step": "is_duplicate" }),
        )
        .await;
        info!(checksum, "skipping duplicate download");
        return None;
    }

    let storage_path = match ctx.storage.save(&downloaded.bytes, &downloaded.file_name, downloaded.format).await {
        Ok(path) => path,
        Err(e) => {
            audit(&ctx.audit, correlation_id.clone(), "save_file", false, Some(e.to_string())).await;
            warn!(url, error = %e, "per-file save failure, continuing batch");
            return None;
        }
    };
    audit(&ctx.audit, correlation_id.clone(), "save_file", true, None).await;
    ctx.tracker.record(&checksum).await;

    let metadata = FileMetadata {
        file_id: FileId::new(),
        file_name: downloaded.file_name,
        file_path: storage_path,
        source_url: url.to_string(),
        download_timestamp: chrono::Utc::now(),
        checksum: checksum.clone(),
        file_size_bytes: downloaded.bytes.len() as u64,
        format: downloaded.format,
    };

    if let Err(e) = ctx.metadata_logger.log_file_metadata(&metadata).await {
        warn!(file_id = %metadata.file_id, error = %e, "non-fatal: file metadata logging failed");
        audit(&ctx.audit, correlation_id.clone(), "log_file_metadata", false, Some(e.to_string())).await;
    } else {
        audit(&ctx.audit, correlation_id.clone(), "log_file_metadata", true, None).await;
    }

    ctx.events.publish(PipelineEvent::DocumentDownloaded {
        file_id: metadata.file_id.clone(),
        correlation_id: correlation_id.clone(),
        source_url: metadata.source_url.clone(),
        format: metadata.format,
        at: metadata.download_timestamp,
    });

    Some(metadata)
}

fn validate_inputs(website_url: &str, file_patterns: &[String]) -> Result<(), String> {
    let is_http = website_url.starts_with("http://") || website_url.starts_with("https://");
    if !is_http {
        return Err(format!("websiteUrl must be http/https, got {website_url}"));
    }
    if file_patterns.is_empty() || file_patterns.iter().any(|p| p.trim().is_empty()) {
        return Err("filePatterns must be non-empty and contain no blank entries".to_string());
    }
    Ok(())
}

async fn audit(
    audit_repo: &Arc<dyn AuditRepository>,
    correlation_id: compliance_ids::CorrelationId,
    step: &str,
    success: bool,
    error_message: Option<String>,
) {
    let mut record = AuditRecord::with_details(
        correlation_id,
        AuditActionType::Download,
        Stage::Ingestion,
        success,
        &serde_json::json!({ "step": step }),
    );
    record.error_message = error_message;
    if let Err(e) = audit_repo.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}

async fn audit_with_details(
    audit_repo: &Arc<dyn AuditRepository>,
    correlation_id: compliance_ids::CorrelationId,
    success: bool,
    details: &impl serde::Serialize,
) {
    let record = AuditRecord::with_details(
        correlation_id,
        AuditActionType::Download,
        Stage::Ingestion,
        success,
        details,
    );
    if let Err(e) = audit_repo.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}
