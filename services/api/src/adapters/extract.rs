//! services/api/src/adapters/extract.rs
//!
//! Plain-text extraction for uploaded documents. Implements the
//! `TextExtractionService` port with `lopdf` for PDF and `zip` + `quick-xml`
//! for DOCX.

use std::io::{Cursor, Read};

use docchat_core::ports::{PortError, PortResult, TextExtractionService};
use lopdf::Document as PdfDocument;
use quick_xml::{events::Event, Reader};
use tracing::warn;

const DOCX_BODY_PART: &str = "word/document.xml";

//=========================================================================================
// PDF
//=========================================================================================

/// Walks a loaded PDF page by page, yielding each page's text. Pages whose
/// text cannot be decoded are skipped. Consumed once; not restartable.
pub struct PdfTextFragments<'a> {
    document: &'a PdfDocument,
    pages: std::vec::IntoIter<u32>,
}

impl<'a> PdfTextFragments<'a> {
    pub fn new(document: &'a PdfDocument) -> Self {
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        Self {
            document,
            pages: pages.into_iter(),
        }
    }
}

impl Iterator for PdfTextFragments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        for page in self.pages.by_ref() {
            match self.document.extract_text(&[page]) {
                Ok(text) => return Some(text),
                Err(e) => warn!("Skipping PDF page {}: {}", page, e),
            }
        }
        None
    }
}

//=========================================================================================
// DOCX
//=========================================================================================

/// Collects the run text of a WordprocessingML body, one line per paragraph.
fn docx_body_text(xml: &str) -> PortResult<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_run_text => {
                let run = e
                    .unescape()
                    .map_err(|e| PortError::Unexpected(format!("Malformed DOCX text: {}", e)))?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "Malformed DOCX XML at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    Ok(text.trim_end().to_string())
}

//=========================================================================================
// `TextExtractionService` Trait Implementation
//=========================================================================================

#[derive(Clone, Default)]
pub struct DocumentTextExtractor;

impl TextExtractionService for DocumentTextExtractor {
    fn extract_pdf(&self, data: &[u8]) -> PortResult<String> {
        let document = PdfDocument::load_mem(data)
            .map_err(|e| PortError::Unexpected(format!("Failed to load PDF document: {}", e)))?;
        let fragments: Vec<String> = PdfTextFragments::new(&document).collect();
        Ok(fragments.join("\n"))
    }

    fn extract_docx(&self, data: &[u8]) -> PortResult<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| PortError::Unexpected(format!("Not a DOCX archive: {}", e)))?;
        let mut xml = String::new();
        archive
            .by_name(DOCX_BODY_PART)
            .map_err(|e| PortError::Unexpected(format!("DOCX has no document body: {}", e)))?
            .read_to_string(&mut xml)
            .map_err(|e| PortError::Unexpected(format!("Failed to read DOCX body: {}", e)))?;
        docx_body_text(&xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file(DOCX_BODY_PART, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Rust &amp; ownership</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Borrow </w:t></w:r><w:r><w:t>checker</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let text = DocumentTextExtractor
            .extract_docx(&docx_with_body(body))
            .unwrap();
        assert_eq!(text, "Rust & ownership\nBorrow checker");
    }

    #[test]
    fn archive_without_body_fails() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"<x/>").unwrap();
            writer.finish().unwrap();
        }
        assert!(DocumentTextExtractor
            .extract_docx(&buffer.into_inner())
            .is_err());
    }

    #[test]
    fn non_archive_and_non_pdf_bytes_fail() {
        assert!(DocumentTextExtractor.extract_docx(b"plain text").is_err());
        assert!(DocumentTextExtractor.extract_pdf(b"plain text").is_err());
    }
}
