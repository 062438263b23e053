//! Text extraction for PDF, DOCX and CSV files.

use docroute_core::{AppError, AppResult};
use quick_xml::events::Event;
use std::io::Read;

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extract text from a PDF, one entry per page.
///
/// Pages are separated by form feeds in the extracted text. Blank pages
/// are kept as empty strings so page numbers stay aligned.
pub fn extract_pdf_pages(bytes: &[u8]) -> AppResult<Vec<String>> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::Ingest(format!("PDF extraction failed: {}", e)))?;

    Ok(split_pages(&text))
}

fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\x0c').map(|p| p.trim().to_string()).collect();
    // trailing form feed after the last page
    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    pages
}

/// Extract the body text of a DOCX file.
///
/// Runs are concatenated; paragraphs and explicit breaks become newlines.
pub fn extract_docx_text(bytes: &[u8]) -> AppResult<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| AppError::Ingest(format!("DOCX is not a valid archive: {}", e)))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| AppError::Ingest("word/document.xml not found".to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| AppError::Ingest(format!("Failed to read word/document.xml: {}", e)))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(AppError::Ingest(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    extract_w_t_elements(&xml)
}

fn extract_w_t_elements(xml: &[u8]) -> AppResult<String> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| AppError::Ingest(format!("Malformed DOCX text: {}", e)))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::Ingest(format!("Malformed DOCX XML: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim().to_string())
}

/// Parse CSV data into one text block per data row.
///
/// Each block holds `header: value` lines in column order. Rows with no
/// non-empty cell are skipped; the returned row numbers are 0-based data
/// row indices.
pub fn parse_csv_rows(bytes: &[u8]) -> AppResult<Vec<(usize, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::Ingest(format!("Failed to read CSV header: {}", e)))?
        .clone();

    let mut rows = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| AppError::Ingest(format!("Malformed CSV row {}: {}", row, e)))?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        let content = record
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let header = headers.get(i).unwrap_or("");
                format!("{}: {}", header, value)
            })
            .collect::<Vec<_>>()
            .join("\n");

        rows.push((row, content));
    }

    Ok(rows)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Build a minimal DOCX archive containing the given document XML body.
    pub(crate) fn docx_bytes(body: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_split_pages() {
        let pages = split_pages("Page one\x0cPage two\x0c");
        assert_eq!(pages, vec!["Page one".to_string(), "Page two".to_string()]);

        assert_eq!(split_pages("single"), vec!["single".to_string()]);
    }

    #[test]
    fn test_invalid_pdf_is_ingest_error() {
        let err = extract_pdf_pages(b"not a pdf").unwrap_err();
        assert!(matches!(err, AppError::Ingest(_)));
    }

    #[test]
    fn test_extract_docx_paragraphs() {
        let bytes = docx_bytes(
            r#"<w:p><w:r><w:t xml:space="preserve">Lando Norris </w:t></w:r><w:r><w:t>won</w:t></w:r></w:p><w:p><w:r><w:t>Marina Bay &amp; night race</w:t></w:r></w:p>"#,
        );

        let text = extract_docx_text(&bytes).unwrap();
        assert_eq!(text, "Lando Norris won\nMarina Bay & night race");
    }

    #[test]
    fn test_docx_without_document_xml() {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx_text(&bytes).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn test_invalid_zip_for_docx() {
        assert!(extract_docx_text(b"not a zip").is_err());
    }

    #[test]
    fn test_parse_csv_rows() {
        let data = b"quarter,region,revenue\nQ3,EMEA,1200\n,,\nQ4, APAC ,900\n";
        let rows = parse_csv_rows(data).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (0, "quarter: Q3\nregion: EMEA\nrevenue: 1200".to_string()));
        assert_eq!(rows[1].0, 2);
        assert!(rows[1].1.contains("region: APAC"));
    }

    #[test]
    fn test_parse_csv_header_only() {
        assert!(parse_csv_rows(b"a,b,c\n").unwrap().is_empty());
    }
}
