//! Sub-flow C (§4.7): identify review cases from a file's metadata and
//! classification, queue them, and process reviewer decisions.

use std::sync::Arc;

use tracing::warn;

use compliance_core::cancel::StageContext;
use compliance_core::model::{
    AuditActionType, AuditRecord, ClassificationResult, ReviewCase, ReviewDecision, ReviewStatus, Stage,
    UnifiedMetadataRecord,
};
use compliance_db::{AuditRepository, ReviewCaseRepository};
use compliance_ids::{CaseId, FileId};

/// A review case is opened when classification confidence falls below the
/// configured threshold, or the record fails export validation (§4.7
/// sub-flow C: "Confidence below a configured threshold" is the named
/// example; record invalidity is the other natural trigger since both
/// demand a human decision before the pipeline can proceed).
pub fn identify_review_cases(
    record: &UnifiedMetadataRecord,
    classification: Option<&ClassificationResult>,
    confidence_threshold: u8,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if let Some(classification) = classification {
        if classification.confidence < confidence_threshold {
            reasons.push(format!(
                "classification confidence {} below threshold {}",
                classification.confidence, confidence_threshold
            ));
        }
    }

    if !record.validation.is_valid() {
        reasons.push(format!("record invalid: missing {:?}", record.validation.missing));
    }

    if !record.matched_fields.conflicting_fields.is_empty() {
        reasons.push(format!(
            "unresolved field conflicts: {:?}",
            record.matched_fields.conflicting_fields
        ));
    }

    reasons
}

/// Open and persist one [`ReviewCase`] per reason returned by
/// [`identify_review_cases`], auditing each under `ActionType::Review`.
pub async fn queue_review_cases(
    review_repo: &Arc<dyn ReviewCaseRepository>,
    audit: &Arc<dyn AuditRepository>,
    stage_ctx: &StageContext,
    file_id: &FileId,
    reasons: &[String],
) -> Vec<ReviewCase> {
    let mut opened = Vec::with_capacity(reasons.len());
    for reason in reasons {
        let case = ReviewCase {
            case_id: CaseId::new(),
            file_id: file_id.clone(),
            reason: reason.clone(),
            status: ReviewStatus::Open,
        };
        if let Err(e) = review_repo.insert(case.clone()).await {
            warn!(error = %e, "failed to persist review case");
            continue;
        }
        write_audit(
            audit,
            stage_ctx.correlation_id.clone(),
            Some(file_id.clone()),
            true,
            &serde_json::json!({ "case_id": case.case_id, "reason": reason }),
        )
        .await;
        opened.push(case);
    }
    opened
}

/// Apply a reviewer's decision to an open case, updating its status and
/// auditing the transition (§4.7: `ProcessReviewDecision` is audited under
/// `ActionType::Review`).
pub async fn process_review_decision(
    review_repo: &Arc<dyn ReviewCaseRepository>,
    audit: &Arc<dyn AuditRepository>,
    stage_ctx: &StageContext,
    decision: &ReviewDecision,
) -> Result<(), compliance_db::DbError> {
    let new_status = if decision.decision_type.eq_ignore_ascii_case("cancel") {
        ReviewStatus::Cancelled
    } else {
        ReviewStatus::Resolved
    };

    review_repo.update_status(&decision.case_id, new_status).await?;

    write_audit(
        audit,
        stage_ctx.correlation_id.clone(),
        Some(decision.file_id.clone()),
        true,
        &serde_json::json!({
            "case_id": decision.case_id,
            "decision_id": decision.decision_id,
            "decision_type": decision.decision_type,
            "reviewer_id": decision.reviewer_id,
        }),
    )
    .await;
    Ok(())
}

async fn write_audit(
    audit: &Arc<dyn AuditRepository>,
    correlation_id: compliance_ids::CorrelationId,
    file_id: Option<FileId>,
    success: bool,
    details: &impl serde::Serialize,
) {
    let mut record = AuditRecord::with_details(correlation_id, AuditActionType::Review, Stage::DecisionLogic, success, details);
    record.file_id = file_id;
    if let Err(e) = audit.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::model::{ClassificationLabel, ScoreBoard};
    use compliance_db::{InMemoryAuditRepository, InMemoryReviewCaseRepository};

    fn low_confidence_classification() -> ClassificationResult {
        ClassificationResult {
            level1: ClassificationLabel::Aseguramiento,
            level2: None,
            confidence: 40,
            scores: ScoreBoard {
                aseguramiento: 0.4,
                desembargo: 0.0,
                documentacion: 0.0,
                informacion: 0.0,
                transferencia: 0.0,
                operaciones_ilicitas: 0.0,
            },
        }
    }

    #[test]
    fn low_confidence_triggers_a_review_reason() {
        let record = UnifiedMetadataRecord::default();
        let reasons = identify_review_cases(&record, Some(&low_confidence_classification()), 60);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("confidence"));
    }

    #[test]
    fn above_threshold_and_valid_record_has_no_reasons() {
        let mut record = UnifiedMetadataRecord::default();
        record.expediente.numero_expediente = Some("A/AS1-2025-001".to_string());
        record.expediente.numero_oficio = Some("OF-1".to_string());
        record.expediente.subdivision = compliance_core::model::LegalSubdivisionKind::Fiscal;
        record.expediente.fecha_recepcion = Some(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        record.revalidate();
        let classification = ClassificationResult {
            confidence: 95,
            ..low_confidence_classification()
        };
        let reasons = identify_review_cases(&record, Some(&classification), 60);
        assert!(reasons.is_empty());
    }

    #[tokio::test]
    async fn queue_review_cases_persists_and_audits_each_reason() {
        let review_repo: Arc<dyn ReviewCaseRepository> = Arc::new(InMemoryReviewCaseRepository::default());
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let file_id = FileId::new();

        let cases = queue_review_cases(
            &review_repo,
            &audit,
            &stage_ctx,
            &file_id,
            &["low confidence".to_string(), "field conflict".to_string()],
        )
        .await;
        assert_eq!(cases.len(), 2);

        let persisted = review_repo.list(&|_| true).await.unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[tokio::test]
    async fn process_review_decision_updates_status() {
        let review_repo: Arc<dyn ReviewCaseRepository> = Arc::new(InMemoryReviewCaseRepository::default());
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let file_id = FileId::new();

        let cases = queue_review_cases(&review_repo, &audit, &stage_ctx, &file_id, &["reason".to_string()]).await;
        let case = &cases[0];

        let decision = ReviewDecision {
            decision_id: compliance_ids::DecisionId::new(),
            case_id: case.case_id.clone(),
            file_id: file_id.clone(),
            decision_type: "approve".to_string(),
            review_reason: case.reason.clone(),
            reviewer_id: "analyst-1".to_string(),
        };
        process_review_decision(&review_repo, &audit, &stage_ctx, &decision).await.unwrap();

        let updated = review_repo.get_by_id(&case.case_id).await.unwrap().unwrap();
        assert_eq!(updated.status, ReviewStatus::Resolved);
    }
}
