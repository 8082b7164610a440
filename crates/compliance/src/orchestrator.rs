//! Wires Ingestion (C4) -> Extraction/Field Matching (C5/C6) -> Decision
//! Logic (C7) -> Export (C8) into one end-to-end run over a local
//! directory. Files sharing a name stem (e.g. `oficio-001.xml` and
//! `oficio-001.pdf`) are treated as multiple sources describing the same
//! document, so Field Matching has more than one observation to reconcile
//! (§4.6, S2) — a CLI/demo grouping convention, not something the spec
//! itself names.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{info, warn};

use compliance_core::cancel::StageContext;
use compliance_core::model::{
    ExtractedFields, FieldOrigin, FieldValue, LegalSubdivisionKind, Persona, PersonaTipo, UnifiedMetadataRecord,
};
use compliance_core::outcome::Outcome;
use compliance_db::{AuditRepository, FileMetadataRepository, ReviewCaseRepository};
use compliance_decision::{process_decision_logic, LegalDirectiveClassifier, PersonIdentityResolver};
use compliance_events::EventBus;
use compliance_extraction::{
    classify::Classifier, extractors::FormatDispatchExtractor, field_matching::match_fields, filer::FileMover,
    run_extraction, ExtractionContext, KeywordRuleClassifier,
};
use compliance_ids::ParteId;
use compliance_ingestion::{ingest, BrowserAutomation, DownloadStorage, DownloadTracker, FileMetadataLogger, IngestionContext};
use compliance_security::ByteSigner;

use crate::adapters::decision::{KeywordDirectiveClassifier, NormalizingIdentityResolver};
use crate::adapters::export::ExtractiveSummarizer;
use crate::adapters::extraction::{DemoPdfPipeline, LocalFileMover, RegexXmlExtractor, ZipDocxExtractor};
use crate::adapters::ingestion::{read_stored_bytes, InMemoryChecksumTracker, LocalDirectoryBrowser, LocalFileStorage, RepoBackedMetadataLogger};

const KNOWN_CORE_FIELDS: &[&str] = &[
    "NumeroExpediente",
    "NumeroOficio",
    "Subdivision",
    "AreaDescripcion",
    "FechaRecepcion",
    "FechaPublicacion",
    "DiasPlazo",
    "FundamentoLegal",
    "MedioEnvio",
    "Causa",
    "AccionSolicitada",
];

/// Result of one document bundle making it through Extraction, Field
/// Matching, and Decision Logic.
#[derive(Debug, Clone)]
pub struct BundleOutcome {
    pub stem: String,
    pub classification_label: Option<String>,
    pub classification_confidence: Option<u8>,
    pub is_valid: bool,
    pub review_cases_opened: usize,
    pub compliance_actions: usize,
    pub exported: Vec<String>,
}

/// Aggregate result of one `PipelineRuntime::run` call.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files_ingested: usize,
    pub bundles_processed: usize,
    pub bundles: Vec<BundleOutcome>,
}

/// Everything a full pipeline run needs: one set of collaborators per
/// stage plus the shared audit/review repositories and event bus.
pub struct PipelineRuntime {
    pub audit: Arc<dyn AuditRepository>,
    pub file_metadata_repo: Arc<dyn FileMetadataRepository>,
    pub review_repo: Arc<dyn ReviewCaseRepository>,
    pub events: EventBus,
    pub output_dir: PathBuf,
    pub signer: Arc<dyn ByteSigner>,
    pub review_confidence_threshold: u8,
}

impl PipelineRuntime {
    pub fn new(
        audit: Arc<dyn AuditRepository>,
        file_metadata_repo: Arc<dyn FileMetadataRepository>,
        review_repo: Arc<dyn ReviewCaseRepository>,
        output_dir: PathBuf,
        signer: Arc<dyn ByteSigner>,
    ) -> Self {
        Self {
            audit,
            file_metadata_repo,
            review_repo,
            events: EventBus::new(),
            output_dir,
            signer,
            review_confidence_threshold: 70,
        }
    }

    /// Ingest every file under `source_dir` matching `patterns`, then run
    /// each through Extraction/Field Matching/Decision Logic/Export.
    pub async fn run(&self, source_dir: &str, patterns: &[String]) -> anyhow::Result<RunSummary> {
        std::fs::create_dir_all(&self.output_dir)?;
        let stage_ctx = StageContext::new_stage();

        let ingestion_ctx = IngestionContext {
            browser: tokio::sync::Mutex::new(Box::new(LocalDirectoryBrowser::new()) as Box<dyn BrowserAutomation>),
            storage: Arc::new(LocalFileStorage::new(self.output_dir.clone())) as Arc<dyn DownloadStorage>,
            tracker: Arc::new(InMemoryChecksumTracker::new()) as Arc<dyn DownloadTracker>,
            metadata_logger: Arc::new(RepoBackedMetadataLogger::new(Arc::clone(&self.file_metadata_repo))) as Arc<dyn FileMetadataLogger>,
            audit: Arc::clone(&self.audit),
            events: self.events.clone(),
        };

        let site_url = format!("https://local{source_dir}");
        let ingested = match ingest(&ingestion_ctx, &stage_ctx, &site_url, patterns).await {
            Outcome::Success(files) => files,
            Outcome::Warned(w) => {
                warn!(warnings = ?w.warnings, "ingestion completed partially");
                w.value
            }
            Outcome::Cancelled => anyhow::bail!("ingestion was cancelled"),
            Outcome::Failure(e) => anyhow::bail!("ingestion failed: {e}"),
        };
        info!(count = ingested.len(), "ingestion complete");

        let extraction_ctx = ExtractionContext {
            dispatcher: FormatDispatchExtractor {
                xml: Box::new(RegexXmlExtractor),
                docx: Box::new(ZipDocxExtractor),
                pdf: Box::new(DemoPdfPipeline),
            },
            classifier: Box::new(KeywordRuleClassifier::default()) as Box<dyn Classifier>,
            mover: Arc::new(LocalFileMover::new(self.output_dir.clone())) as Arc<dyn FileMover>,
            audit: Arc::clone(&self.audit),
            events: self.events.clone(),
        };

        let mut by_stem: HashMap<String, Vec<(compliance_core::model::FileMetadata, compliance_extraction::ExtractionOutput)>> = HashMap::new();
        for file in &ingested {
            let bytes = match read_stored_bytes(&file.file_path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(file = %file.file_name, error = %e, "failed to read stored bytes, skipping");
                    continue;
                }
            };
            let outcome = run_extraction(&extraction_ctx, &stage_ctx, file, &bytes, None).await;
            let output = match outcome {
                Outcome::Success(output) => output,
                Outcome::Warned(w) => w.value,
                Outcome::Cancelled => {
                    warn!(file = %file.file_name, "extraction cancelled, skipping");
                    continue;
                }
                Outcome::Failure(e) => {
                    warn!(file = %file.file_name, error = %e.to_string(), "extraction failed, skipping");
                    continue;
                }
            };
            let stem = stem_of(&file.file_name);
            by_stem.entry(stem).or_default().push((file.clone(), output));
        }

        let identity_resolver = NormalizingIdentityResolver;
        let directive_classifier = KeywordDirectiveClassifier;
        let summarizer = ExtractiveSummarizer;

        let mut bundles = Vec::new();
        for (stem, sources) in by_stem {
            let bundle = self
                .process_bundle(
                    &stage_ctx,
                    &stem,
                    sources,
                    &identity_resolver,
                    &directive_classifier,
                    &summarizer,
                )
                .await;
            bundles.push(bundle);
        }
        bundles.sort_by(|a, b| a.stem.cmp(&b.stem));

        Ok(RunSummary {
            files_ingested: ingested.len(),
            bundles_processed: bundles.len(),
            bundles,
        })
    }

    async fn process_bundle(
        &self,
        stage_ctx: &StageContext,
        stem: &str,
        sources: Vec<(compliance_core::model::FileMetadata, compliance_extraction::ExtractionOutput)>,
        identity_resolver: &dyn PersonIdentityResolver,
        directive_classifier: &dyn LegalDirectiveClassifier,
        summarizer: &ExtractiveSummarizer,
    ) -> BundleOutcome {
        let mut observations: HashMap<String, Vec<FieldValue>> = HashMap::new();
        let mut raw_text = String::new();
        let mut best_classification = None;
        for (_, output) in &sources {
            let source_type = output.extracted.source_type.unwrap_or(compliance_core::model::SourceType::Unknown);
            for (name, (value, confidence)) in &output.extracted.fields {
                observations.entry(name.clone()).or_default().push(FieldValue {
                    name: name.clone(),
                    value: value.clone(),
                    confidence: *confidence,
                    source_type,
                    origin: FieldOrigin::Extractor("demo".to_string()),
                });
            }
            raw_text.push_str(&output.extracted.raw_text);
            raw_text.push('\n');
            best_classification = match best_classification.take() {
                Some(existing) if existing_is_better(&existing, &output.classification) => Some(existing),
                _ => Some(output.classification.clone()),
            };
        }

        let matched = match_fields(&observations);
        let mut record = build_record(&matched, best_classification.clone());

        let personas = extract_personas(&observations);
        let decision_outcome = process_decision_logic(
            identity_resolver,
            directive_classifier,
            &self.audit,
            stage_ctx,
            &personas,
            &raw_text,
            Some(&record.expediente),
        )
        .await;

        let (personas, actions, warnings) = match decision_outcome {
            Outcome::Success(result) => (result.personas, result.actions, Vec::new()),
            Outcome::Warned(w) => (w.value.personas, w.value.actions, w.warnings),
            Outcome::Cancelled => {
                warn!(stem, "decision logic cancelled");
                (Vec::new(), Vec::new(), vec!["decision logic cancelled".to_string()])
            }
            Outcome::Failure(e) => {
                warn!(stem, error = %e.to_string(), "decision logic failed");
                (Vec::new(), Vec::new(), vec![format!("decision logic failed: {e}")])
            }
        };
        if !warnings.is_empty() {
            info!(stem, ?warnings, "decision logic completed with warnings");
        }

        record.personas = personas;
        record.compliance_actions = actions;
        record.revalidate();

        let reasons = compliance_decision::identify_review_cases(&record, best_classification.as_ref(), self.review_confidence_threshold);
        let review_cases = if reasons.is_empty() {
            Vec::new()
        } else {
            let synthetic_file_id = sources[0].0.file_id.clone();
            compliance_decision::queue_review_cases(&self.review_repo, &self.audit, stage_ctx, &synthetic_file_id, &reasons).await
        };

        let exported = self.export_bundle(stage_ctx, stem, &record, summarizer).await;

        BundleOutcome {
            stem: stem.to_string(),
            classification_label: best_classification.as_ref().map(|c| format!("{:?}", c.level1)),
            classification_confidence: best_classification.as_ref().map(|c| c.confidence),
            is_valid: record.validation.is_valid(),
            review_cases_opened: review_cases.len(),
            compliance_actions: record.compliance_actions.len(),
            exported,
        }
    }

    async fn export_bundle(
        &self,
        stage_ctx: &StageContext,
        stem: &str,
        record: &UnifiedMetadataRecord,
        summarizer: &ExtractiveSummarizer,
    ) -> Vec<String> {
        let export_dir = self.output_dir.join("export");
        if let Err(e) = std::fs::create_dir_all(&export_dir) {
            warn!(error = %e, "failed to create export directory");
            return Vec::new();
        }

        let mut written = Vec::new();

        let xml_path = export_dir.join(format!("{stem}.xml"));
        if let Ok(mut file) = std::fs::File::create(&xml_path) {
            if matches!(
                compliance_export::export_regulator_xml(&self.audit, stage_ctx, record, &mut file).await,
                Outcome::Success(())
            ) {
                written.push(xml_path.to_string_lossy().into_owned());
            }
        }

        let excel_path = export_dir.join(format!("{stem}.xlsx"));
        if let Ok(mut file) = std::fs::File::create(&excel_path) {
            if matches!(
                compliance_export::generate_excel_layout(&self.audit, stage_ctx, record, &mut file).await,
                Outcome::Success(())
            ) {
                written.push(excel_path.to_string_lossy().into_owned());
            }
        }

        let pdf_path = export_dir.join(format!("{stem}.pdf"));
        if let Ok(mut file) = std::fs::File::create(&pdf_path) {
            if matches!(
                compliance_export::export_signed_pdf_with_summarization(
                    &self.audit,
                    stage_ctx,
                    record,
                    None,
                    Some(summarizer as &dyn compliance_export::PdfSummarizer),
                    self.signer.as_ref(),
                    &mut file,
                )
                .await,
                Outcome::Success(())
            ) {
                written.push(pdf_path.to_string_lossy().into_owned());
            }
        }

        written
    }
}

fn existing_is_better(existing: &compliance_core::model::ClassificationResult, candidate: &compliance_core::model::ClassificationResult) -> bool {
    existing.confidence >= candidate.confidence
}

fn stem_of(file_name: &str) -> String {
    file_name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file_name).to_string()
}

fn parse_subdivision(value: &str) -> LegalSubdivisionKind {
    match value.trim().to_lowercase().as_str() {
        "civil" => LegalSubdivisionKind::Civil,
        "mercantil" => LegalSubdivisionKind::Mercantil,
        "penal" => LegalSubdivisionKind::Penal,
        "fiscal" => LegalSubdivisionKind::Fiscal,
        "administrativa" => LegalSubdivisionKind::Administrativa,
        _ => LegalSubdivisionKind::Unknown,
    }
}

fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn build_record(
    matched: &compliance_core::model::MatchedFields,
    classification: Option<compliance_core::model::ClassificationResult>,
) -> UnifiedMetadataRecord {
    let field = |name: &str| matched.fields.get(name).map(|m| m.matched_value.clone());

    let mut additional_fields = HashMap::new();
    for (name, value) in matched.fields.iter() {
        if !KNOWN_CORE_FIELDS.contains(&name.as_str()) {
            additional_fields.insert(name.clone(), value.matched_value.clone());
        }
    }
    let additional_field_conflicts: Vec<String> = matched
        .conflicting_fields
        .iter()
        .filter(|name| !KNOWN_CORE_FIELDS.contains(&name.as_str()))
        .cloned()
        .collect();

    let fecha_recepcion = field("FechaRecepcion")
        .and_then(|v| parse_naive_date(&v))
        .or_else(|| compliance_extraction::field_matching::derive_fecha_recepcion(None, &additional_fields));
    let fecha_estimada_conclusion =
        compliance_extraction::field_matching::derive_fecha_estimada_conclusion(fecha_recepcion, &additional_fields, &[]);

    let mut record = UnifiedMetadataRecord {
        expediente: compliance_core::model::Expediente {
            numero_expediente: field("NumeroExpediente"),
            numero_oficio: field("NumeroOficio"),
            subdivision: field("Subdivision").map(|v| parse_subdivision(&v)).unwrap_or_default(),
            area_descripcion: field("AreaDescripcion"),
            fecha_recepcion,
            fecha_estimada_conclusion,
            fundamento_legal: field("FundamentoLegal"),
            medio_envio: field("MedioEnvio"),
        },
        extracted_fields: ExtractedFields {
            expediente: field("NumeroExpediente"),
            causa: field("Causa"),
            accion_solicitada: field("AccionSolicitada"),
            additional_fields: additional_fields.clone(),
        },
        classification,
        matched_fields: matched.clone(),
        additional_fields,
        additional_field_conflicts,
        personas: Vec::new(),
        compliance_actions: Vec::new(),
        requirement_summary: None,
        validation: Default::default(),
    };
    record.revalidate();
    record
}

/// Scans the merged field observations for the `Persona{N}Nombre`/
/// `Persona{N}Rfc` convention this CLI's demo fixtures use; Extraction
/// itself names no persona-producing collaborator (§4.5), so this
/// convention lives here rather than in `compliance_extraction`.
fn extract_personas(observations: &HashMap<String, Vec<FieldValue>>) -> Vec<Persona> {
    let name_re = Regex::new(r"^Persona(\d+)Nombre$").expect("valid regex");
    let mut personas = Vec::new();
    for (field_name, values) in observations {
        let Some(cap) = name_re.captures(field_name) else { continue };
        let index = &cap[1];
        let rfc_key = format!("Persona{index}Rfc");
        let nombre = values.first().map(|v| v.value.clone()).unwrap_or_default();
        let rfc = observations.get(&rfc_key).and_then(|v| v.first()).map(|v| v.value.clone());
        let mut rfc_variants = std::collections::HashSet::new();
        if let Some(rfc) = &rfc {
            rfc_variants.insert(rfc.clone());
        }
        personas.push(Persona {
            parte_id: ParteId::new(),
            nombre,
            paterno: None,
            materno: None,
            rfc,
            rfc_variants,
            persona_tipo: PersonaTipo::Fisica,
            caracter: None,
            relacion: None,
            domicilio: None,
            complementarios: HashMap::new(),
            validation: Default::default(),
        });
    }
    personas
}
