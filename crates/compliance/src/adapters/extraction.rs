//! Reference `compliance_extraction` collaborators (§6). XML fields come
//! from a real `quick-xml` parse; DOCX fields come from a real `zip` read
//! of `word/document.xml` followed by the same `Key: value` line parser
//! the PDF path uses on its OCR'd text. The OCR engine itself is out of
//! scope (§1); `DemoPdfPipeline` treats each sub-step as a pass-through and
//! pulls plain text out of parenthesized PDF content-stream tokens —
//! good enough to exercise the pipeline, not a real renderer.

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use async_trait::async_trait;
use compliance_core::model::{ClassificationLabel, ExtractedMetadata};
use compliance_extraction::{DocxExtractor, ExtractError, FileMover, PdfOcrPipeline, XmlExtractor};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use regex::Regex;

/// `Key: value` line parser shared by the DOCX and PDF demo extractors,
/// since both ultimately hand this module plain text rather than markup.
fn parse_key_value_lines(text: &str) -> HashMap<String, (String, f64)> {
    let line_re = Regex::new(r"(?m)^\s*([A-Za-z][A-Za-z0-9_]*)\s*:\s*(.+?)\s*$").expect("valid regex");
    let mut fields = HashMap::new();
    for cap in line_re.captures_iter(text) {
        let key = cap[1].to_string();
        let value = cap[2].trim().to_string();
        fields.entry(key).or_insert((value, 0.7));
    }
    fields
}

fn xml_local_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name)
        .rsplit(':')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parses `<Tag>value</Tag>` leaf elements into the field bag; nested
/// container elements are skipped rather than flattened, since §4.6 only
/// names flat field observations per source.
pub struct RegexXmlExtractor;

#[async_trait]
impl XmlExtractor for RegexXmlExtractor {
    async fn extract_xml(&self, bytes: &[u8]) -> Result<ExtractedMetadata, ExtractError> {
        let text = String::from_utf8_lossy(bytes).into_owned();
        let mut reader = Reader::from_str(&text);

        let mut fields = HashMap::new();
        let mut stack: Vec<String> = Vec::new();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => stack.push(xml_local_name(e.name().as_ref())),
                Ok(Event::Empty(_)) => {}
                Ok(Event::Text(e)) => {
                    if let Some(tag) = stack.last() {
                        let value = e.unescape().map(|c| c.into_owned()).unwrap_or_default();
                        if !value.trim().is_empty() {
                            fields.entry(tag.clone()).or_insert((value.trim().to_string(), 0.95));
                        }
                    }
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ExtractError::Failed(format!("xml parse error: {e}"))),
                _ => {}
            }
            buf.clear();
        }

        if fields.is_empty() {
            return Err(ExtractError::Failed("no field-like elements found in XML".to_string()));
        }

        Ok(ExtractedMetadata {
            raw_text: text,
            source_type: Some(compliance_core::model::SourceType::Xml),
            fields,
        })
    }
}

/// Opens the zip container, strips markup from `word/document.xml` down to
/// its text runs, and applies the shared `Key: value` parser to the result.
pub struct ZipDocxExtractor;

fn strip_tags(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut in_tag = false;
    for c in xml.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push('\n');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[async_trait]
impl DocxExtractor for ZipDocxExtractor {
    async fn extract_docx(&self, bytes: &[u8]) -> Result<ExtractedMetadata, ExtractError> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor).map_err(|e| ExtractError::Failed(format!("not a valid docx zip: {e}")))?;
        let mut document_xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Failed(format!("missing word/document.xml: {e}")))?
            .read_to_string(&mut document_xml)
            .map_err(|e| ExtractError::Failed(format!("document.xml is not valid UTF-8: {e}")))?;

        let plain_text = strip_tags(&document_xml);
        let fields = parse_key_value_lines(&plain_text);

        Ok(ExtractedMetadata {
            raw_text: plain_text,
            source_type: Some(compliance_core::model::SourceType::Docx),
            fields,
        })
    }
}

fn scan_pdf_text_tokens(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    let paren_re = Regex::new(r"\(([^()]*)\)").expect("valid regex");
    paren_re
        .captures_iter(&raw)
        .map(|c| c[1].to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Demo OCR pipeline: every pre-OCR step is a pass-through, and "OCR"
/// itself is a parenthesized-token scan good enough for the PDFs this
/// workspace's own `compliance_export::pdf` emits (§4.8's rendered lines
/// are literal `use_text` calls, which `printpdf` encodes as parenthesized
/// content-stream strings).
pub struct DemoPdfPipeline;

#[async_trait]
impl PdfOcrPipeline for DemoPdfPipeline {
    async fn preprocess(&self, bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
        Ok(bytes.to_vec())
    }

    async fn binarize(&self, image: &[u8]) -> Result<Vec<u8>, ExtractError> {
        Ok(image.to_vec())
    }

    async fn ocr(&self, image: &[u8]) -> Result<String, ExtractError> {
        let text = scan_pdf_text_tokens(image);
        if text.trim().is_empty() {
            return Err(ExtractError::Failed("no extractable text tokens in PDF".to_string()));
        }
        Ok(text)
    }

    async fn extract_fields(&self, raw_text: &str) -> Result<ExtractedMetadata, ExtractError> {
        let fields = parse_key_value_lines(raw_text);
        Ok(ExtractedMetadata {
            raw_text: raw_text.to_string(),
            source_type: Some(compliance_core::model::SourceType::Pdf),
            fields,
        })
    }
}

/// Relocates the stored file under `<root>/<label>/<safe_name>`.
pub struct LocalFileMover {
    root: PathBuf,
}

impl LocalFileMover {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileMover for LocalFileMover {
    async fn move_file(&self, current_path: &str, label: ClassificationLabel, safe_name: &str) -> Result<String, std::io::Error> {
        let dir = self.root.join(format!("{label:?}").to_lowercase());
        std::fs::create_dir_all(&dir)?;
        let target = dir.join(safe_name);
        std::fs::rename(current_path, &target).or_else(|_| {
            // Cross-device rename can fail; fall back to copy + remove.
            std::fs::copy(current_path, &target)?;
            std::fs::remove_file(current_path)
        })?;
        Ok(target.to_string_lossy().into_owned())
    }
}
