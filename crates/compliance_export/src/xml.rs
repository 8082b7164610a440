//! `ExportRegulatorXml` (§4.8, realizing the `ResponseExporter.exportXml`
//! contract of §6): serialize a validated [`UnifiedMetadataRecord`] into
//! the regulator response schema and stream it out. The exact schema is
//! this crate's own design choice (defining regulator schemas is a
//! Non-goal); what's fixed is the completeness gate and the audit trail.

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use compliance_core::cancel::StageContext;
use compliance_core::model::{
    AuditActionType, AuditRecord, ComplianceActionType, PersonaTipo, Stage, UnifiedMetadataRecord,
};
use compliance_db::AuditRepository;
use compliance_core::outcome::Outcome;

use crate::validation::revalidated;

#[derive(Debug, Serialize)]
#[serde(rename = "RespuestaRegulatoria")]
struct RegulatorResponseXml {
    numero_expediente: String,
    numero_oficio: String,
    subdivision: String,
    fecha_recepcion: NaiveDate,
    fecha_estimada_conclusion: Option<NaiveDate>,
    fundamento_legal: Option<String>,
    persona: Vec<PersonaXml>,
    accion: Vec<AccionXml>,
}

#[derive(Debug, Serialize)]
struct PersonaXml {
    nombre: String,
    paterno: Option<String>,
    materno: Option<String>,
    rfc: Option<String>,
    persona_tipo: PersonaTipo,
}

#[derive(Debug, Serialize)]
struct AccionXml {
    action_type: ComplianceActionType,
    confidence: u8,
    account_number: Option<String>,
    expediente_origen: Option<String>,
    oficio_origen: Option<String>,
}

fn to_xml_dto(record: &UnifiedMetadataRecord) -> RegulatorResponseXml {
    RegulatorResponseXml {
        numero_expediente: record.expediente.numero_expediente.clone().unwrap_or_default(),
        numero_oficio: record.expediente.numero_oficio.clone().unwrap_or_default(),
        subdivision: format!("{:?}", record.expediente.subdivision),
        fecha_recepcion: record.expediente.fecha_recepcion.unwrap_or_default(),
        fecha_estimada_conclusion: record.expediente.fecha_estimada_conclusion,
        fundamento_legal: record.expediente.fundamento_legal.clone(),
        persona: record
            .personas
            .iter()
            .map(|p| PersonaXml {
                nombre: p.nombre.clone(),
                paterno: p.paterno.clone(),
                materno: p.materno.clone(),
                rfc: p.rfc.clone(),
                persona_tipo: p.persona_tipo,
            })
            .collect(),
        accion: record
            .compliance_actions
            .iter()
            .map(|a| AccionXml {
                action_type: a.action_type,
                confidence: a.confidence,
                account_number: a.account_number.clone(),
                expediente_origen: a.expediente_origen.clone(),
                oficio_origen: a.oficio_origen.clone(),
            })
            .collect(),
    }
}

/// Validate completeness, serialize to the regulator XML schema, and
/// write it to `out`. Returns `Failure` (without touching `out`) before
/// any write when the record is not yet exportable (§4.8, S6).
pub async fn export_regulator_xml(
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
            write_audit(audit, stage_ctx, false, &serde_json::json!({ "operation": "export_xml", "missing": missing })).await;
            return Outcome::failure(format!("record not exportable, missing: {missing:?}"));
        }
    };

    let dto = to_xml_dto(&validated);
    let xml = match quick_xml::se::to_string(&dto) {
        Ok(xml) => xml,
        Err(e) => {
            write_audit(audit, stage_ctx, false, &serde_json::json!({ "operation": "export_xml", "error": e.to_string() })).await;
            return Outcome::failure(format!("xml serialization failed: {e}"));
        }
    };

    if let Err(e) = out.write_all(xml.as_bytes()) {
        write_audit(audit, stage_ctx, false, &serde_json::json!({ "operation": "export_xml", "error": e.to_string() })).await;
        return Outcome::failure(format!("stream write failed: {e}"));
    }

    write_audit(audit, stage_ctx, true, &serde_json::json!({ "operation": "export_xml", "bytes_written": xml.len() })).await;
    Outcome::Success(())
}

async fn write_audit(audit: &Arc<dyn AuditRepository>, stage_ctx: &StageContext, success: bool, details: &impl serde::Serialize) {
    let record = AuditRecord::with_details(stage_ctx.correlation_id.clone(), AuditActionType::Export, Stage::Export, success, details);
    if let Err(e) = audit.append(record).await {
        warn!(error = %e, "failed to append audit record");
    }
}
