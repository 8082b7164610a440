//! `GenerateExcelLayout` (§4.8): a tabular registration layout, one sheet
//! of expediente header fields plus one row per persona/compliance
//! action. Defining the exact regulator layout is a Non-goal (§1); this
//! crate owns only the shape reasonable to hand a back-office clerk.

use std::io::Write;
use std::sync::Arc;

use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::warn;

use compliance_core::cancel::StageContext;
use compliance_core::model::{AuditActionType, AuditRecord, Stage, UnifiedMetadataRecord};
use compliance_core::outcome::Outcome;
use compliance_db::AuditRepository;

use crate::validation::revalidated;

fn build_workbook(record: &UnifiedMetadataRecord) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    let header = workbook.add_worksheet().set_name("Expediente")?;
    header.write_string(0, 0, "NumeroExpediente")?;
    header.write_string(0, 1, record.expediente.numero_expediente.as_deref().unwrap_or(""))?;
    header.write_string(1, 0, "NumeroOficio")?;
    header.write_string(1, 1, record.expediente.numero_oficio.as_deref().unwrap_or(""))?;
    header.write_string(2, 0, "Subdivision")?;
    header.write_string(2, 1, format!("{:?}", record.expediente.subdivision))?;
    header.write_string(3, 0, "FechaRecepcion")?;
    if let Some(fecha) = record.expediente.fecha_recepcion {
        header.write_string(3, 1, fecha.to_string())?;
    }
    header.write_string(4, 0, "FechaEstimadaConclusion")?;
    if let Some(fecha) = record.expediente.fecha_estimada_conclusion {
        header.write_string(4, 1, fecha.to_string())?;
    }

    let personas = workbook.add_worksheet().set_name("Personas")?;
    let persona_columns = ["Nombre", "Paterno", "Materno", "RFC", "PersonaTipo"];
    for (col, title) in persona_columns.iter().enumerate() {
        personas.write_string(0, col as u16, *title)?;
    }
    for (row, persona) in record.personas.iter().enumerate() {
        let row = row as u32 + 1;
        personas.write_string(row, 0, &persona.nombre)?;
        personas.write_string(row, 1, persona.paterno.as_deref().unwrap_or(""))?;
        personas.write_string(row, 2, persona.materno.as_deref().unwrap_or(""))?;
        personas.write_string(row, 3, persona.rfc.as_deref().unwrap_or(""))?;
        personas.write_string(row, 4, format!("{:?}", persona.persona_tipo))?;
    }

    let actions = workbook.add_worksheet().set_name("Acciones")?;
    let action_columns = ["ActionType", "Confidence", "AccountNumber", "ExpedienteOrigen", "OficioOrigen"];
    for (col, title) in action_columns.iter().enumerate() {
        actions.write_string(0, col as u16, *title)?;
    }
    for (row, action) in record.compliance_actions.iter().enumerate() {
        let row = row as u32 + 1;
        actions.write_string(row, 0, format!("{:?}", action.action_type))?;
        actions.write_number(row, 1, action.confidence as f64)?;
        actions.write_string(row, 2, action.account_number.as_deref().unwrap_or(""))?;
        actions.write_string(row, 3, action.expediente_origen.as_deref().unwrap_or(""))?;
        actions.write_string(row, 4, action.oficio_origen.as_deref().unwrap_or(""))?;
    }

    workbook.save_to_buffer()
}

/// Validate completeness, render the three-sheet layout, and write it to
/// `out`. Returns `Failure` (without touching `out`) when the record is
/// not yet exportable (§4.8).
pub async fn generate_excel_layout(
    audit: &Arc<dyn AuditRepository>,
    stage_ctx: &StageContext,
    record: &UnifiedMetadataRecord,
    out: &mut impl Write,
) -> Outcome<()> {
    if stage_ctx.cancellation.is_cancelled() {
        return Outcome::Cancelled;
    }

    let validated = match revalidated(record) {
        Ok(validated) => validated,
        Err(missing) => {
            write_audit(audit, stage_ctx, false, &serde_json::json!({ "operation": "generate_excel_layout", "missing": missing })).await;
            return Outcome::failure(format!("record not exportable, missing: {missing:?}"));
        }
    };

    let bytes = match build_workbook(&validated) {
        Ok(bytes) => bytes,
        Err(e) => {
            write_audit(audit, stage_ctx, false, &serde_json::json!({ "operation": "generate_excel_layout", "error": e.to_string() })).await;
            return Outcome::failure(format!("workbook generation failed: {e}"));
        }
    };

    if let Err(e) = out.write_all(&bytes) {
        write_audit(audit, stage_ctx, false, &serde_json::json!({ "operation": "generate_excel_layout", "error": e.to_string() })).await;
        return Outcome::failure(format!("stream write failed: {e}"));
    }

    write_audit(audit, stage_ctx, true, &serde_json::json!({ "operation": "generate_excel_layout", "bytes_written": bytes.len() })).await;
    Outcome::Success(())
}

async fn write_audit(audit: &Arc<dyn AuditRepository>, stage_ctx: &StageContext, success: bool, details: &impl serde::Serialize) {
    let record = AuditRecord::with_details(stage_ctx.correlation_id.clone(), AuditActionType::Export, Stage::Export, success, details);
    if let Err(e) = audit.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_core::model::LegalSubdivisionKind;
    use compliance_db::InMemoryAuditRepository;

    fn complete_record() -> UnifiedMetadataRecord {
        let mut record = UnifiedMetadataRecord::default();
        record.expediente.numero_expediente = Some("A/AS1-2025-001".to_string());
        record.expediente.numero_oficio = Some("OF-001".to_string());
        record.expediente.subdivision = LegalSubdivisionKind::Fiscal;
        record.expediente.fecha_recepcion = Some(chrono::NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        record
    }

    #[tokio::test]
    async fn writes_a_workbook_for_a_complete_record() {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let mut buf = Vec::new();
        let outcome = generate_excel_layout(&audit, &stage_ctx, &complete_record(), &mut buf).await;
        assert!(outcome.is_success());
        // xlsx is a zip container; a real workbook starts with the zip magic.
        assert_eq!(&buf[0..2], b"PK");
    }

    #[tokio::test]
    async fn blank_numero_oficio_fails_before_any_write() {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        let mut record = complete_record();
        record.expediente.numero_oficio = None;
        let mut buf = Vec::new();
        let outcome = generate_excel_layout(&audit, &stage_ctx, &record, &mut buf).await;
        assert!(outcome.is_failure());
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn already_cancelled_short_circuits() {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::default());
        let stage_ctx = StageContext::new_stage();
        stage_ctx.cancellation.cancel();
        let mut buf = Vec::new();
        let outcome = generate_excel_layout(&audit, &stage_ctx, &complete_record(), &mut buf).await;
        assert!(outcome.is_cancelled());
    }
}
