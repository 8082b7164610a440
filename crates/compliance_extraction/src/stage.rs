//! The Extraction stage state machine (§4.5, C5):
//! `Identified -> Extracted -> Classified -> Named -> Moved`. Each
//! transition is audited; a transition failure is terminal for the file
//! (extraction does not retry format parsing — retries, if any, happen
//! outside this stage).

use std::sync::Arc;

use tracing::warn;

use compliance_core::cancel::StageContext;
use compliance_core::model::{AuditActionType, AuditRecord, ClassificationResult, ExtractedMetadata, FileMetadata, Format, Stage};
use compliance_core::outcome::Outcome;
use compliance_db::AuditRepository;
use compliance_events::{EventBus, PipelineEvent};

use crate::classify::Classifier;
use crate::extractors::FormatDispatchExtractor;
use crate::filer::FileMover;
use crate::identify::identify_format;
use crate::safe_name::safe_name;

pub struct ExtractionOutput {
    pub extracted: ExtractedMetadata,
    pub classification: ClassificationResult,
    pub safe_name: String,
    pub target_path: String,
}

pub struct ExtractionContext {
    pub dispatcher: FormatDispatchExtractor,
    pub classifier: Box<dyn Classifier>,
    pub mover: Arc<dyn FileMover>,
    pub audit: Arc<dyn AuditRepository>,
    pub events: EventBus,
}

/// Run a file through the full Identify -> Extract -> Classify -> SafeName
/// -> Move pipeline.
pub async fn run_extraction(
    ctx: &ExtractionContext,
    stage_ctx: &StageContext,
    file: &FileMetadata,
    bytes: &[u8],
    expediente_hint: Option<&str>,
) -> Outcome<ExtractionOutput> {
    let correlation_id = stage_ctx.correlation_id.clone();

    let format = identify_format(bytes, &file.file_name);
    let identified = format != Format::Unknown;
    audit(
        &ctx.audit,
        correlation_id.clone(),
        AuditActionType::Extraction,
        identified,
        &serde_json::json!({ "transition": "identified", "format": format }),
    )
    .await;
    if !identified {
        return Outcome::failure(format!("unrecognized format for {}", file.file_name));
    }

    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let extracted = match ctx.dispatcher.extract(format, bytes).await {
        Ok(extracted) => extracted,
        Err(e) => {
            audit(
                &ctx.audit,
                correlation_id.clone(),
                AuditActionType::Extraction,
                false,
                &serde_json::json!({ "transition": "extracted", "error": e.to_string() }),
            )
            .await;
            return Outcome::failure(format!("extraction failed for {}: {e}", file.file_name));
        }
    };
    audit(
        &ctx.audit,
        correlation_id.clone(),
        AuditActionType::Extraction,
        true,
        &serde_json::json!({ "transition": "extracted" }),
    )
    .await;

    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let classification = ctx.classifier.classify(&extracted);
    // Invariant I3: all six scores logged regardless of confidence.
    audit(
        &ctx.audit,
        correlation_id.clone(),
        AuditActionType::Classification,
        true,
        &serde_json::json!({
            "transition": "classified",
            "level1": classification.level1,
            "level2": classification.level2,
            "confidence": classification.confidence,
            "scores": classification.scores.as_pairs(),
        }),
    )
    .await;
    ctx.events.publish(PipelineEvent::DocumentClassified {
        file_id: file.file_id.clone(),
        correlation_id: correlation_id.clone(),
        level1: classification.level1,
        confidence: classification.confidence,
    });

    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let derived_name = safe_name(&file.file_name, &classification, expediente_hint);
    audit(
        &ctx.audit,
        correlation_id.clone(),
        AuditActionType::Extraction,
        true,
        &serde_json::json!({ "transition": "named", "safe_name": derived_name }),
    )
    .await;

    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let target_path = match ctx.mover.move_file(&file.file_path, classification.level1, &derived_name).await {
        Ok(path) => path,
        Err(e) => {
            audit(
                &ctx.audit,
                correlation_id.clone(),
                AuditActionType::Move,
                false,
                &serde_json::json!({ "transition": "moved", "error": e.to_string() }),
            )
            .await;
            return Outcome::failure(format!("move failed for {}: {e}", file.file_name));
        }
    };
    audit(
        &ctx.audit,
        correlation_id,
        AuditActionType::Move,
        true,
        &serde_json::json!({ "transition": "moved", "target_path": target_path }),
    )
    .await;

    Outcome::Success(ExtractionOutput {
        extracted,
        classification,
        safe_name: derived_name,
        target_path,
    })
}

async fn audit(
    audit_repo: &Arc<dyn AuditRepository>,
    correlation_id: compliance_ids::CorrelationId,
    action_type: AuditActionType,
    success: bool,
    details: &impl serde::Serialize,
) {
    let record = AuditRecord::with_details(correlation_id, action_type, Stage::Extraction, success, details);
    if let Err(e) = audit_repo.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}
