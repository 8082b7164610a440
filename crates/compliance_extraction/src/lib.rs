//! Extraction stage (C5, §4.5) and Field Matching (C6, §4.6): identify a
//! document's format, extract its fields, classify it, derive a safe
//! filename, file it, and reconcile field observations across sources.

pub mod classify;
pub mod extractors;
pub mod field_matching;
pub mod filer;
pub mod identify;
pub mod stage;

pub use classify::{Classifier, KeywordRuleClassifier};
pub use extractors::{DocxExtractor, ExtractError, FormatDispatchExtractor, PdfOcrPipeline, XmlExtractor};
pub use field_matching::{derive_fecha_estimada_conclusion, derive_fecha_recepcion, match_field, match_fields};
pub use filer::FileMover;
pub use identify::identify_format;
pub use stage::{run_extraction, ExtractionContext, ExtractionOutput};
