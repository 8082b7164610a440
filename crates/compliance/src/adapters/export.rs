//! Reference `compliance_export` collaborator (§6 summarizer seam). The
//! summarization model itself is out of scope (§1), same as OCR for
//! Extraction; this produces a short extractive summary so
//! `ExportSignedPdfWithSummarization`'s attach-then-sign path has
//! something real to exercise.

use async_trait::async_trait;
use compliance_export::{PdfSummarizer, SummarizerError};

const MAX_SUMMARY_CHARS: usize = 280;

pub struct ExtractiveSummarizer;

#[async_trait]
impl PdfSummarizer for ExtractiveSummarizer {
    async fn summarize(&self, original_pdf: &[u8]) -> Result<String, SummarizerError> {
        let raw = String::from_utf8_lossy(original_pdf);
        let paren_re = regex::Regex::new(r"\(([^()]*)\)").map_err(|e| SummarizerError::Failed(e.to_string()))?;
        let tokens: String = paren_re.captures_iter(&raw).map(|c| c[1].to_string()).collect::<Vec<_>>().join(" ");
        let trimmed = tokens.trim();
        if trimmed.is_empty() {
            return Err(SummarizerError::Failed("no extractable text in original PDF".to_string()));
        }
        let summary: String = trimmed.chars().take(MAX_SUMMARY_CHARS).collect();
        Ok(summary)
    }
}
