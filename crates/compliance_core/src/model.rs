//! The shared domain model (spec §3). Every stage crate operates on these
//! types; none of them know how a stage produces or consumes them.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use compliance_ids::{CaseId, CorrelationId, DecisionId, FileId, ParteId};

/// Detected container/document format. Detection is content-based
/// (magic bytes win over extension, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Xml,
    Docx,
    Pdf,
    Zip,
    Unknown,
}

/// Opaque, content-addressed file identity created by Ingestion (I1: the
/// Checksum is the dedupe key). Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: FileId,
    pub file_name: String,
    pub file_path: String,
    pub source_url: String,
    pub download_timestamp: DateTime<Utc>,
    pub checksum: String,
    pub file_size_bytes: u64,
    pub format: Format,
}

/// A file found on a remote site, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadableFile {
    pub url: String,
    pub file_name: String,
    pub format: Format,
}

/// Where one field observation originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Xml,
    Pdf,
    Docx,
    Unknown,
}

/// Format-neutral field bag produced by one extractor (§4.5 Extract step).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub raw_text: String,
    pub source_type: Option<SourceType>,
    /// Field name -> (value, confidence in [0,1]).
    pub fields: HashMap<String, (String, f64)>,
}

/// The fixed label set classification scores over (§4.5, invariant I3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    Aseguramiento,
    Desembargo,
    Documentacion,
    Informacion,
    Transferencia,
    OperacionesIlicitas,
}

impl ClassificationLabel {
    /// Fixed tie-break ordering, per §4.5 "ties broken by the fixed label
    /// ordering above".
    pub const ORDER: [ClassificationLabel; 6] = [
        ClassificationLabel::Aseguramiento,
        ClassificationLabel::Desembargo,
        ClassificationLabel::Documentacion,
        ClassificationLabel::Informacion,
        ClassificationLabel::Transferencia,
        ClassificationLabel::OperacionesIlicitas,
    ];
}

/// All six classification scores, always populated (invariant I3: scores
/// are logged even at low confidence; each score is >= 0 but the set is
/// not normalized to sum to 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub aseguramiento: f64,
    pub desembargo: f64,
    pub documentacion: f64,
    pub informacion: f64,
    pub transferencia: f64,
    pub operaciones_ilicitas: f64,
}

impl ScoreBoard {
    pub fn get(&self, label: ClassificationLabel) -> f64 {
        match label {
            ClassificationLabel::Aseguramiento => self.aseguramiento,
            ClassificationLabel::Desembargo => self.desembargo,
            ClassificationLabel::Documentacion => self.documentacion,
            ClassificationLabel::Informacion => self.informacion,
            ClassificationLabel::Transferencia => self.transferencia,
            ClassificationLabel::OperacionesIlicitas => self.operaciones_ilicitas,
        }
    }

    /// The highest-scoring label, ties broken by [`ClassificationLabel::ORDER`].
    pub fn top_label(&self) -> ClassificationLabel {
        ClassificationLabel::ORDER
            .into_iter()
            .max_by(|a, b| {
                self.get(*a)
                    .partial_cmp(&self.get(*b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("ORDER is non-empty")
    }

    /// All six (label, score) pairs in fixed order, for audit logging.
    pub fn as_pairs(&self) -> [(ClassificationLabel, f64); 6] {
        ClassificationLabel::ORDER.map(|l| (l, self.get(l)))
    }
}

/// Output of the file classifier (§4.5 Classify step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub level1: ClassificationLabel,
    pub level2: Option<String>,
    /// Integer 0-100, distinct from [`FieldValue::confidence`]'s 0-1
    /// fraction convention.
    pub confidence: u8,
    pub scores: ScoreBoard,
}

/// Semantic field tuple extracted from a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub expediente: Option<String>,
    pub causa: Option<String>,
    pub accion_solicitada: Option<String>,
    pub additional_fields: HashMap<String, String>,
}

/// One observed value for a field from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: String,
    /// Fraction in `[0,1]` — distinct from [`ClassificationResult::confidence`]'s
    /// 0-100 percent convention.
    pub confidence: f64,
    pub source_type: SourceType,
    pub origin: FieldOrigin,
}

/// Provenance tag for a field observation, beyond its source format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOrigin {
    Extractor(String),
    Derived,
    Manual,
}

/// Per-field reconciliation across sources (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub matched_value: String,
    /// `count(mode) / count(observations)`, in `[0,1]`.
    pub agreement_level: f64,
    pub has_conflict: bool,
    pub contributing_sources: Vec<SourceType>,
}

/// Aggregate output of field matching over all defined fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedFields {
    pub fields: HashMap<String, FieldMatch>,
    pub missing_fields: Vec<String>,
    pub conflicting_fields: Vec<String>,
    pub overall_agreement: f64,
}

/// Regulatory category bucket. `Unknown` is the required sentinel (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalSubdivisionKind {
    Civil,
    Mercantil,
    Penal,
    Fiscal,
    Administrativa,
    Unknown,
}

impl Default for LegalSubdivisionKind {
    fn default() -> Self {
        LegalSubdivisionKind::Unknown
    }
}

/// Legal/regulatory case identifier and its bibliographic fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expediente {
    pub numero_expediente: Option<String>,
    pub numero_oficio: Option<String>,
    pub subdivision: LegalSubdivisionKind,
    pub area_descripcion: Option<String>,
    pub fecha_recepcion: Option<NaiveDate>,
    pub fecha_estimada_conclusion: Option<NaiveDate>,
    pub fundamento_legal: Option<String>,
    pub medio_envio: Option<String>,
}

impl Default for Expediente {
    fn default() -> Self {
        Self {
            numero_expediente: None,
            numero_oficio: None,
            subdivision: LegalSubdivisionKind::Unknown,
            area_descripcion: None,
            fecha_recepcion: None,
            fecha_estimada_conclusion: None,
            fundamento_legal: None,
            medio_envio: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaTipo {
    Fisica,
    Moral,
}

/// A party on the case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub parte_id: ParteId,
    pub nombre: String,
    pub paterno: Option<String>,
    pub materno: Option<String>,
    pub rfc: Option<String>,
    pub rfc_variants: HashSet<String>,
    pub persona_tipo: PersonaTipo,
    pub caracter: Option<String>,
    pub relacion: Option<String>,
    pub domicilio: Option<String>,
    pub complementarios: HashMap<String, String>,
    pub validation: ValidationState,
}

impl Persona {
    /// Name-triplet equality used as the dedup fallback when neither side
    /// has an RFC (Open Question (b)): case-insensitive, whitespace-trimmed.
    pub fn name_triplet_key(&self) -> (String, String, String) {
        let norm = |s: &Option<String>| {
            s.as_deref()
                .unwrap_or("")
                .trim()
                .to_lowercase()
        };
        (
            self.nombre.trim().to_lowercase(),
            norm(&self.paterno),
            norm(&self.materno),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceActionType {
    Block,
    Unblock,
    Transfer,
    Document,
    Information,
    Unknown,
}

/// Account sub-record referenced by a compliance action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cuenta {
    pub numero: Option<String>,
    pub institucion: Option<String>,
}

/// A concrete operational directive derived from legal text (§4.7 sub-flow B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAction {
    pub action_type: ComplianceActionType,
    /// Integer 0-100 percent, same convention as [`ClassificationResult::confidence`].
    pub confidence: u8,
    pub account_number: Option<String>,
    pub amount: Option<Decimal>,
    pub expediente_origen: Option<String>,
    pub oficio_origen: Option<String>,
    pub cuenta: Option<Cuenta>,
}

impl ComplianceAction {
    /// Required account evidence check used by validation aggregation
    /// (§4.6): Block/Unblock/Transfer actions need an account number or a
    /// `Cuenta.numero`.
    pub fn has_account_evidence(&self) -> bool {
        self.account_number.is_some()
            || self.cuenta.as_ref().is_some_and(|c| c.numero.is_some())
    }

    pub fn requires_account_evidence(&self) -> bool {
        matches!(
            self.action_type,
            ComplianceActionType::Block | ComplianceActionType::Unblock | ComplianceActionType::Transfer
        )
    }
}

/// Aggregated validation outcome carried on [`UnifiedMetadataRecord`] and on
/// each [`Persona`] (§3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationState {
    pub missing: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationState {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }

    /// Record `name` as missing unless `cond` holds.
    pub fn require(&mut self, cond: bool, name: &str) {
        if !cond {
            self.missing.push(name.to_string());
        }
    }

    pub fn warn(&mut self, name: &str) {
        self.warnings.push(name.to_string());
    }

    pub fn warn_if(&mut self, cond: bool, name: &str) {
        if cond {
            self.warn(name);
        }
    }
}

/// The assembled artifact passed to Export (§3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedMetadataRecord {
    pub expediente: Expediente,
    pub extracted_fields: ExtractedFields,
    pub classification: Option<ClassificationResult>,
    pub matched_fields: MatchedFields,
    pub additional_fields: HashMap<String, String>,
    pub additional_field_conflicts: Vec<String>,
    pub personas: Vec<Persona>,
    pub compliance_actions: Vec<ComplianceAction>,
    pub requirement_summary: Option<String>,
    pub validation: ValidationState,
}

impl UnifiedMetadataRecord {
    /// Recompute `self.validation` from the record's current content, per
    /// §4.6 validation aggregation and §4.8 "Validation is recomputed
    /// before every export". Required: NumeroExpediente, NumeroOficio,
    /// Subdivision != Unknown, FechaRecepcion, and (for
    /// Block/Unblock/Transfer actions) account evidence.
    pub fn revalidate(&mut self) {
        let mut validation = ValidationState::default();

        validation.require(self.expediente.numero_expediente.is_some(), "NumeroExpediente");
        validation.require(self.expediente.numero_oficio.is_some(), "NumeroOficio");
        validation.require(
            self.expediente.subdivision != LegalSubdivisionKind::Unknown,
            "Subdivision",
        );
        validation.require(self.expediente.fecha_recepcion.is_some(), "FechaRecepcion");

        for (idx, action) in self.compliance_actions.iter().enumerate() {
            if action.requires_account_evidence() {
                validation.require(
                    action.has_account_evidence(),
                    &format!("ComplianceAction[{idx}].AccountNumber"),
                );
            }
        }

        validation.warn_if(
            self.expediente.fecha_estimada_conclusion.is_none(),
            "FechaEstimadaConclusion missing",
        );
        validation.warn_if(
            self.personas.iter().any(|p| !p.validation.is_valid()),
            "one or more personas failed validation",
        );
        validation.warn_if(
            !self.additional_field_conflicts.is_empty(),
            "additional field conflicts present",
        );

        self.validation = validation;
    }
}

/// Escalation ladder for an SLA-tracked file (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    None,
    EarlyWarning,
    Critical,
    Breached,
}

/// SLA state for one file, recomputed from `IntakeDate` + `DaysPlazo` at
/// query time (the store is non-canonical; recomputation is canonical, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SLAStatus {
    pub file_id: FileId,
    pub intake_date: NaiveDate,
    pub deadline: NaiveDate,
    pub remaining_business_days: i64,
    pub escalation_level: EscalationLevel,
    pub is_at_risk: bool,
    pub is_breached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditActionType {
    Download,
    Extraction,
    Classification,
    Move,
    Review,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingestion,
    Extraction,
    DecisionLogic,
    Export,
}

/// One structured audit entry (§3, invariant I2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: compliance_ids::AuditId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: CorrelationId,
    pub file_id: Option<FileId>,
    pub action_type: AuditActionType,
    pub stage: Stage,
    pub user_id: Option<String>,
    pub success: bool,
    /// Serialized JSON payload; kept as a `String` to match the wire/storage
    /// contract in §6 rather than an in-memory `serde_json::Value`.
    pub action_details: String,
    pub error_message: Option<String>,
}

impl AuditRecord {
    pub fn with_details(
        correlation_id: CorrelationId,
        action_type: AuditActionType,
        stage: Stage,
        success: bool,
        details: &impl Serialize,
    ) -> Self {
        Self {
            audit_id: compliance_ids::AuditId::new(),
            timestamp: Utc::now(),
            correlation_id,
            file_id: None,
            action_type,
            stage,
            user_id: None,
            success,
            action_details: serde_json::to_string(details).unwrap_or_else(|_| "{}".to_string()),
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Open,
    Resolved,
    Cancelled,
}

/// A human-in-the-loop task queued when confidence or validation demands
/// a decision (§4.7 sub-flow C).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCase {
    pub case_id: CaseId,
    pub file_id: FileId,
    pub reason: String,
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub decision_id: DecisionId,
    pub case_id: CaseId,
    pub file_id: FileId,
    pub decision_type: String,
    pub review_reason: String,
    pub reviewer_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_board_breaks_ties_by_fixed_order() {
        let scores = ScoreBoard {
            aseguramiento: 0.5,
            desembargo: 0.5,
            documentacion: 0.1,
            informacion: 0.1,
            transferencia: 0.1,
            operaciones_ilicitas: 0.1,
        };
        // Aseguramiento precedes Desembargo in ORDER, so it wins the tie.
        assert_eq!(scores.top_label(), ClassificationLabel::Aseguramiento);
    }

    #[test]
    fn score_board_as_pairs_always_has_six_entries() {
        let scores = ScoreBoard {
            aseguramiento: 0.0,
            desembargo: 0.0,
            documentacion: 0.0,
            informacion: 0.0,
            transferencia: 0.0,
            operaciones_ilicitas: 0.0,
        };
        assert_eq!(scores.as_pairs().len(), 6);
    }

    #[test]
    fn validation_state_is_valid_iff_missing_is_empty() {
        let mut state = ValidationState::default();
        assert!(state.is_valid());
        state.require(false, "NumeroOficio");
        assert!(!state.is_valid());
        assert_eq!(state.missing, vec!["NumeroOficio".to_string()]);
    }

    #[test]
    fn unified_record_revalidate_flags_missing_oficio() {
        let mut record = UnifiedMetadataRecord::default();
        record.expediente.numero_expediente = Some("A/AS1-2025-001".to_string());
        record.expediente.subdivision = LegalSubdivisionKind::Fiscal;
        record.expediente.fecha_recepcion = Some(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        record.revalidate();
        assert!(!record.validation.is_valid());
        assert!(record.validation.missing.contains(&"NumeroOficio".to_string()));
    }

    #[test]
    fn compliance_action_requires_evidence_only_for_money_movement() {
        let info = ComplianceAction {
            action_type: ComplianceActionType::Information,
            confidence: 90,
            account_number: None,
            amount: None,
            expediente_origen: None,
            oficio_origen: None,
            cuenta: None,
        };
        assert!(!info.requires_account_evidence());

        let block = ComplianceAction {
            action_type: ComplianceActionType::Block,
            ..info
        };
        assert!(block.requires_account_evidence());
        assert!(!block.has_account_evidence());
    }

    #[test]
    fn persona_name_triplet_key_normalizes_case_and_whitespace() {
        let persona = Persona {
            parte_id: ParteId::new(),
            nombre: " Juan ".to_string(),
            paterno: Some("PEREZ".to_string()),
            materno: None,
            rfc: None,
            rfc_variants: HashSet::new(),
            persona_tipo: PersonaTipo::Fisica,
            caracter: None,
            relacion: None,
            domicilio: None,
            complementarios: HashMap::new(),
            validation: ValidationState::default(),
        };
        assert_eq!(
            persona.name_triplet_key(),
            ("juan".to_string(), "perez".to_string(), String::new())
        );
    }
}
