//! `ExportSignedPdfWithSummarization` (§4.8): optionally attach a
//! requirement summary, render a PDF, and digitally sign it. The
//! summarizer is a collaborator (the summarization model itself is out
//! of scope, as OCR is for Extraction in [`compliance_extraction`]); the
//! signer is [`compliance_security::ByteSigner`], which this crate
//! already depends on.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use thiserror::Error;
use tracing::warn;

use compliance_core::cancel::StageContext;
use compliance_core::model::{AuditActionType, AuditRecord, Stage, UnifiedMetadataRecord};
use compliance_core::outcome::Outcome;
use compliance_db::AuditRepository;
use compliance_security::ByteSigner;

use crate::validation::revalidated;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarization request cancelled")]
    Cancelled,
    #[error("summarization failed: {0}")]
    Failed(String),
}

/// Produces `record.RequirementSummary` from the original PDF bytes
/// (§4.8 step 1). A `Cancelled` result propagates as `Outcome::Cancelled`;
/// a `Failed` result is logged and the export proceeds without a summary.
#[async_trait]
pub trait PdfSummarizer: Send + Sync {
    async fn summarize(&self, original_pdf: &[u8]) -> Result<String, SummarizerError>;
}

fn render_pdf(record: &UnifiedMetadataRecord) -> Result<Vec<u8>, String> {
    let (doc, page1, layer1) = PdfDocument::new(
        "registration-export",
        Mm(210.0),
        Mm(297.0),
        "contents",
    );
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| e.to_string())?;

    let mut y = 280.0;
    let mut line = |layer: &printpdf::PdfLayerReference, text: &str, y: f64| {
        layer.use_text(text, 11.0, Mm(20.0), Mm(y), &font);
    };

    line(&layer, &format!("Expediente: {}", record.expediente.numero_expediente.as_deref().unwrap_or("")), y);
    y -= 8.0;
    line(&layer, &format!("Oficio: {}", record.expediente.numero_oficio.as_deref().unwrap_or("")), y);
    y -= 8.0;
    line(&layer, &format!("Subdivision: {:?}", record.expediente.subdivision), y);
    y -= 8.0;
    if let Some(summary) = &record.requirement_summary {
        line(&layer, &format!("Resumen: {summary}"), y);
        y -= 8.0;
    }
    for action in &record.compliance_actions {
        line(&layer, &format!("Accion: {:?} ({}%)", action.action_type, action.confidence), y);
        y -= 6.0;
    }

    let mut bytes = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut bytes);
        doc.save(&mut writer).map_err(|e| e.to_string())?;
    }
    Ok(bytes)
}

/// Validate completeness, optionally attach a summary, render and sign
/// the PDF, then write it to `out`. Audits with a `HasSummary` boolean
/// (§4.8 step 2).
pub async fn export_signed_pdf_with_summarization(
    audit: &Arc<dyn AuditRepository>,
    stage_ctx: &StageContext,
    record: &UnifiedMetadataRecord,
    original_pdf: Option<&[u8]>,
    summarizer: Option<&dyn PdfSummarizer>,
    signer: &dyn ByteSigner,
    out: &mut impl Write,
) -> Outcome<()> {
    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let mut validated = match revalidated(record) {
        Ok(validated) => validated,
        Err(missing) => {
            write_audit(audit, stage_ctx, false, false, &serde_json::json!({ "operation": "export_signed_pdf", "missing": missing })).await;
            return Outcome::failure(format!("record not exportable, missing: {missing:?}"));
        }
    };

    let mut has_summary = false;
    if let (Some(pdf_bytes), Some(summarizer)) = (original_pdf, summarizer) {
        if !pdf_bytes.is_empty() {
            match summarizer.summarize(pdf_bytes).await {
                Ok(summary) => {
                    validated.requirement_summary = Some(summary);
                    has_summary = true;
                }
                Err(SummarizerError::Cancelled) => return Outcome::Cancelled,
                Err(SummarizerError::Failed(e)) => {
                    warn!(error = %e, "requirement summarization failed, continuing without a summary");
                }
            }
        }
    }

    let pdf_bytes = match render_pdf(&validated) {
        Ok(bytes) => bytes,
        Err(e) => {
            write_audit(audit, stage_ctx, false, has_summary, &serde_json::json!({ "operation": "export_signed_pdf", "error": e })).await;
            return Outcome::failure(format!("pdf generation failed: {e}"));
        }
    };

    let signature = signer.sign(&pdf_bytes);
    let mut signed = pdf_bytes;
    signed.extend_from_slice(b"\n%%SIGNATURE:");
    signed.extend_from_slice(hex::encode(signature).as_bytes());

    if let Err(e) = out.write_all(&signed) {
        write_audit(audit, stage_ctx, false, has_summary, &serde_json::json!({ "operation": "export_signed_pdf", "error": e.to_string() })).await;
        return Outcome::failure(format!("stream write failed: {e}"));
    }

    write_audit(
        audit,
        stage_ctx,
        true,
        has_summary,
        &serde_json::json!({ "operation": "export_signed_pdf", "bytes_written": signed.len() }),
    )
    .await;
    Outcome::Success(())
}

async fn write_audit(
    audit: &Arc<dyn AuditRepository>,
    stage_ctx: &StageContext,
    success: bool,
    has_summary: bool,
    details: &serde_json::Value,
) {
    let mut payload = details.clone();
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("hasSummary".to_string(), serde_json::Value::Bool(has_summary));
    }
    let record = AuditRecord::with_details(stage_ctx.correlation_id.clone(), AuditActionType::Export, Stage::Export, success, &payload);
    if let Err(e) = audit.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::model::LegalSubdivisionKind;
    use compliance_db::InMemoryAuditRepository;
    use compliance_security::Ed25519Signer;

    fn complete_record() -> UnifiedMetadataRecord {
        let mut record = UnifiedMetadataRecord::default();
        record.expediente.numero_expediente = Some("A/AS1-2025-001".to_string());
        record.expediente.numero_oficio = Some("OF-001".to_string());
        record.expediente.subdivision = LegalSubdivisionKind::Fiscal;
        record.expediente.fecha_recepcion = Some(chrono::NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        record
    }

    struct StubSummarizer(&'static str);
    #[async_trait]
    impl PdfSummarizer for StubSummarizer {
        async fn summarize(&self, _original_pdf: &[u8]) -> Result<String, SummarizerError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingSummarizer;
    #[async_trait]
    impl PdfSummarizer for FailingSummarizer {
        async fn summarize(&self, _original_pdf: &[u8]) -> Result<String, SummarizerError> {
            Err(SummarizerError::Failed("model unavailable".to_string()))
        }
    }

    struct CancellingSummarizer;
    #[async_trait]
    impl PdfSummarizer for CancellingSummarizer {
        async fn summarize(&self, _original_pdf: &[u8]) -> Result<String, SummarizerError> {
            Err(SummarizerError::Cancelled)
        }
    }

    #[tokio::test]
    async fn writes_a_signed_pdf_with_a_summary_on_success() {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let signer = Ed25519Signer::from_bytes(&[3u8; 32]);
        let summarizer = StubSummarizer("three withdrawals over the reporting window");
        let mut buf = Vec::new();
        let outcome = export_signed_pdf_with_summarization(
            &audit,
            &stage_ctx,
            &complete_record(),
            Some(b"%PDF-1.4 original"),
            Some(&summarizer),
            &signer,
            &mut buf,
        )
        .await;
        assert!(outcome.is_success());
        assert!(buf.windows(12).any(|w| w == b"%%SIGNATURE:"));
    }

    #[tokio::test]
    async fn summarizer_failure_still_produces_a_signed_pdf() {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let signer = Ed25519Signer::from_bytes(&[5u8; 32]);
        let mut buf = Vec::new();
        let outcome = export_signed_pdf_with_summarization(
            &audit,
            &stage_ctx,
            &complete_record(),
            Some(b"%PDF-1.4 original"),
            Some(&FailingSummarizer),
            &signer,
            &mut buf,
        )
        .await;
        assert!(outcome.is_success());
        assert!(!buf.is_empty());
    }

    #[tokio::test]
    async fn summarizer_cancellation_propagates() {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let signer = Ed25519Signer::from_bytes(&[9u8; 32]);
        let mut buf = Vec::new();
        let outcome = export_signed_pdf_with_summarization(
            &audit,
            &stage_ctx,
            &complete_record(),
            Some(b"%PDF-1.4 original"),
            Some(&CancellingSummarizer),
            &signer,
            &mut buf,
        )
        .await;
        assert!(outcome.is_cancelled());
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn blank_numero_oficio_fails_before_any_write() {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let signer = Ed25519Signer::from_bytes(&[1u8; 32]);
        let mut record = complete_record();
        record.expediente.numero_oficio = None;
        let mut buf = Vec::new();
        let outcome =
            export_signed_pdf_with_summarization(&audit, &stage_ctx, &record, None, None, &signer, &mut buf).await;
        assert!(outcome.is_failure());
        assert!(buf.is_empty());
    }
}
