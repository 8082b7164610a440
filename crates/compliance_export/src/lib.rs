//! Export stage (C8, §4.8): validate completeness, then emit the
//! regulator XML, the registration Excel layout, and a signed PDF with
//! an optional requirement summary. All three operations share the same
//! gate: re-validate, fail before touching the output stream if the
//! record isn't exportable yet, audit every call.

pub mod excel;
pub mod pdf;
pub mod validation;
pub mod xml;

pub use excel::generate_excel_layout;
pub use pdf::{export_signed_pdf_with_summarization, PdfSummarizer, SummarizerError};
pub use validation::revalidated;
pub use xml::export_regulator_xml;
