//! Sub-flow B (§4.7): detect legal instruments in a document's text, then
//! classify them into concrete [`ComplianceAction`]s. Detection is
//! non-blocking — a detector failure does not stop classification from
//! running.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use compliance_core::cancel::StageContext;
use compliance_core::model::{AuditActionType, AuditRecord, ComplianceAction, Expediente, Stage};
use compliance_core::outcome::Outcome;
use compliance_db::AuditRepository;

#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("directive classification failed: {0}")]
    ClassificationFailed(String),
}

/// External legal-directive classifier collaborator (§6
/// `LegalDirectiveClassifier`).
#[async_trait]
pub trait LegalDirectiveClassifier: Send + Sync {
    /// Non-blocking instrument detection; a `Failure` here is logged and
    /// does not stop classification.
    async fn detect_instruments(&self, text: &str) -> Result<Vec<String>, DirectiveError>;

    async fn classify_directives(
        &self,
        text: &str,
        expediente: Option<&Expediente>,
    ) -> Result<Vec<ComplianceAction>, DirectiveError>;
}

/// Sub-flow B: detect instruments (best-effort), classify directives, and
/// write one audit record carrying a JSON summary of the produced actions.
pub async fn classify_legal_directives(
    classifier: &dyn LegalDirectiveClassifier,
    audit: &Arc<dyn AuditRepository>,
    stage_ctx: &StageContext,
    text: &str,
    expediente: Option<&Expediente>,
) -> Outcome<Vec<ComplianceAction>> {
    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let instruments = match classifier.detect_instruments(text).await {
        Ok(instruments) => instruments,
        Err(e) => {
            warn!(error = %e, "instrument detection failed, continuing to classification");
            Vec::new()
        }
    };

    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let actions = match classifier.classify_directives(text, expediente).await {
        Ok(actions) => actions,
        Err(e) => {
            write_audit(
                audit,
                stage_ctx.correlation_id.clone(),
                false,
                &serde_json::json!({ "instruments": instruments, "error": e.to_string() }),
            )
            .await;
            return Outcome::failure(format!("directive classification failed: {e}"));
        }
    };

    write_audit(
        audit,
        stage_ctx.correlation_id.clone(),
        true,
        &serde_json::json!({
            "instruments": instruments,
            "actions": actions.iter().map(|a| serde_json::json!({
                "action_type": a.action_type,
                "confidence": a.confidence,
                "account_number": a.account_number,
            })).collect::<Vec<_>>(),
        }),
    )
    .await;

    Outcome::Success(actions)
}

async fn write_audit(
    audit: &Arc<dyn AuditRepository>,
    correlation_id: compliance_ids::CorrelationId,
    success: bool,
    details: &impl serde::Serialize,
) {
    let record = AuditRecord::with_details(correlation_id, AuditActionType::Classification, Stage::DecisionLogic, success, details);
    if let Err(e) = audit.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}
