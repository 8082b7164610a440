//! Extract step (§4.5): format-specific collaborator interfaces. PDF
//! extraction is an OCR pipeline (preprocess, binarize, OCR, field-extract,
//! per §5/§6); the concrete image/OCR engines are out of scope, so this
//! crate defines the seam rather than an implementation.

use async_trait::async_trait;
use compliance_core::model::{ExtractedMetadata, Format};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported format: {0:?}")]
    UnsupportedFormat(Format),
    #[error("extraction failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait XmlExtractor: Send + Sync {
    async fn extract_xml(&self, bytes: &[u8]) -> Result<ExtractedMetadata, ExtractError>;
}

#[async_trait]
pub trait DocxExtractor: Send + Sync {
    async fn extract_docx(&self, bytes: &[u8]) -> Result<ExtractedMetadata, ExtractError>;
}

/// The four OCR sub-steps are owned by one collaborator rather than four,
/// since none of the intermediate artifacts (preprocessed image, binarized
/// image, raw OCR text) cross the Extraction stage boundary.
#[async_trait]
pub trait PdfOcrPipeline: Send + Sync {
    async fn preprocess(&self, bytes: &[u8]) -> Result<Vec<u8>, ExtractError>;
    async fn binarize(&self, image: &[u8]) -> Result<Vec<u8>, ExtractError>;
    async fn ocr(&self, image: &[u8]) -> Result<String, ExtractError>;
    async fn extract_fields(&self, raw_text: &str) -> Result<ExtractedMetadata, ExtractError>;
}

/// Dispatches to the right collaborator by [`Format`] (§4.5 Extract step).
/// Unsupported formats are a `Failure`, not a silent skip.
pub struct FormatDispatchExtractor {
    pub xml: Box<dyn XmlExtractor>,
    pub docx: Box<dyn DocxExtractor>,
    pub pdf: Box<dyn PdfOcrPipeline>,
}

impl FormatDispatchExtractor {
    pub async fn extract(&self, format: Format, bytes: &[u8]) -> Result<ExtractedMetadata, ExtractError> {
        match format {
            Format::Xml => self.xml.extract_xml(bytes).await,
            Format::Docx => self.docx.extract_docx(bytes).await,
            Format::Pdf => {
                let preprocessed = self.pdf.preprocess(bytes).await?;
                let binarized = self.pdf.binarize(&preprocessed).await?;
                let raw_text = self.pdf.ocr(&binarized).await?;
                self.pdf.extract_fields(&raw_text).await
            }
            Format::Zip | Format::Unknown => Err(ExtractError::UnsupportedFormat(format)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubXml;
    #[async_trait]
    impl XmlExtractor for StubXml {
        async fn extract_xml(&self, _bytes: &[u8]) -> Result<ExtractedMetadata, ExtractError> {
            let mut fields = HashMap::new();
            fields.insert("NumeroExpediente".to_string(), ("A/AS1-2025-001".to_string(), 0.95));
            Ok(ExtractedMetadata {
                raw_text: "<doc/>".to_string(),
                source_type: Some(compliance_core::model::SourceType::Xml),
                fields,
            })
        }
    }

    struct StubDocx;
    #[async_trait]
    impl DocxExtractor for StubDocx {
        async fn extract_docx(&self, _bytes: &[u8]) -> Result<ExtractedMetadata, ExtractError> {
            Ok(ExtractedMetadata::default())
        }
    }

    struct StubPdf;
    #[async_trait]
    impl PdfOcrPipeline for StubPdf {
        async fn preprocess(&self, bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
            Ok(bytes.to_vec())
        }
        async fn binarize(&self, image: &[u8]) -> Result<Vec<u8>, ExtractError> {
            Ok(image.to_vec())
        }
        async fn ocr(&self, _image: &[u8]) -> Result<String, ExtractError> {
            Ok("ocr text".to_string())
        }
        async fn extract_fields(&self, raw_text: &str) -> Result<ExtractedMetadata, ExtractError> {
            Ok(ExtractedMetadata {
                raw_text: raw_text.to_string(),
                source_type: Some(compliance_core::model::SourceType::Pdf),
                fields: HashMap::new(),
            })
        }
    }

    fn dispatcher() -> FormatDispatchExtractor {
        FormatDispatchExtractor {
            xml: Box::new(StubXml),
            docx: Box::new(StubDocx),
            pdf: Box::new(StubPdf),
        }
    }

    #[tokio::test]
    async fn dispatches_xml_to_the_xml_extractor() {
        let result = dispatcher().extract(Format::Xml, b"<doc/>").await.unwrap();
        assert!(result.fields.contains_key("NumeroExpediente"));
    }

    #[tokio::test]
    async fn pdf_runs_the_full_ocr_chain() {
        let result = dispatcher().extract(Format::Pdf, b"%PDF-1.7").await.unwrap();
        assert_eq!(result.raw_text, "ocr text");
    }

    #[tokio::test]
    async fn zip_is_unsupported() {
        let err = dispatcher().extract(Format::Zip, b"PK\x03\x04").await.unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(Format::Zip)));
    }
}
