//! Multi-format document loader
//!
//! Extracts flat text from the formats the index accepts: PDF, DOCX, PPTX,
//! HTML, CSV, plain text, and Markdown. Binary formatting is stripped here;
//! segmentation and chunking downstream only ever see text.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Text extracted from one source file
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Detected file type
    pub file_type: FileType,
    /// Extracted text
    pub text: String,
    /// Content hash, logged for change tracking
    pub content_hash: String,
    /// Base file name
    pub file_name: String,
}

/// Extension-dispatched text extraction
pub struct DocumentLoader;

impl DocumentLoader {
    /// Load a file and extract its text. Unknown extensions and unreadable
    /// files fail with a file-scoped error; batch callers catch it and move
    /// on to the next file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedDocument> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let file_type = FileType::from_extension(&extension);
        if !file_type.is_supported() {
            return Err(Error::UnsupportedFileType(extension));
        }

        let data = std::fs::read(path)?;
        let text = match file_type {
            FileType::Pdf => Self::extract_pdf(&file_name, &data)?,
            FileType::Docx => Self::extract_docx(&file_name, &data)?,
            FileType::Pptx => Self::extract_pptx(&file_name, &data)?,
            FileType::Html => Self::extract_html(&data),
            FileType::Csv => Self::extract_csv(&data),
            FileType::Markdown => Self::extract_markdown(&data),
            FileType::Txt => String::from_utf8_lossy(&data).to_string(),
            FileType::Unknown => unreachable!("rejected above"),
        };

        let text = normalize(&text);
        if text.is_empty() {
            return Err(Error::file_parse(&file_name, "no text content extracted"));
        }

        Ok(LoadedDocument {
            file_type,
            content_hash: hash_content(&text),
            text,
            file_name,
        })
    }

    fn extract_pdf(file_name: &str, data: &[u8]) -> Result<String> {
        pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(file_name, e.to_string()))
    }

    fn extract_docx(file_name: &str, data: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::file_parse(file_name, e.to_string()))?;

        let mut text = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
                for child in paragraph.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }
        Ok(text)
    }

    /// Slides live in `ppt/slides/slideN.xml` inside the archive; text runs
    /// are the `<a:t>` elements.
    fn extract_pptx(file_name: &str, data: &[u8]) -> Result<String> {
        use std::io::Read;

        let cursor = std::io::Cursor::new(data);
        let mut archive = zip::ZipArchive::new(cursor)
            .map_err(|e| Error::file_parse(file_name, e.to_string()))?;

        let mut slide_names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .map(|s| s.to_string())
            .collect();
        slide_names.sort_by_key(|name| {
            name.trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(0)
        });

        let mut text = String::new();
        for slide_name in slide_names {
            if let Ok(mut file) = archive.by_name(&slide_name) {
                let mut xml = String::new();
                if file.read_to_string(&mut xml).is_ok() {
                    let slide_text = Self::extract_pptx_slide_text(&xml);
                    if !slide_text.is_empty() {
                        text.push_str(&slide_text);
                        text.push('\n');
                    }
                }
            }
        }
        Ok(text)
    }

    fn extract_pptx_slide_text(xml: &str) -> String {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_str(xml);
        let mut lines = Vec::new();
        let mut in_text = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
                Ok(Event::Text(e)) if in_text => {
                    if let Ok(t) = e.unescape() {
                        let t = t.trim();
                        if !t.is_empty() {
                            lines.push(t.to_string());
                        }
                    }
                }
                Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }

        lines.join("\n")
    }

    fn extract_html(data: &[u8]) -> String {
        let html = String::from_utf8_lossy(data);
        let document = scraper::Html::parse_document(&html);
        let body_selector = scraper::Selector::parse("body").expect("static selector");

        let mut text = String::new();
        if let Some(body) = document.select(&body_selector).next() {
            for fragment in body.text() {
                let trimmed = fragment.trim();
                if !trimmed.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(trimmed);
                }
            }
        }
        text
    }

    fn extract_csv(data: &[u8]) -> String {
        let mut reader = csv::Reader::from_reader(data);
        let mut text = String::new();

        if let Ok(headers) = reader.headers() {
            text.push_str(&headers.iter().collect::<Vec<_>>().join(" | "));
            text.push('\n');
        }
        for record in reader.records().flatten() {
            text.push_str(&record.iter().collect::<Vec<_>>().join(" | "));
            text.push('\n');
        }
        text
    }

    /// Markdown is flattened to its text content so heading markers and
    /// link syntax never end up embedded.
    fn extract_markdown(data: &[u8]) -> String {
        use pulldown_cmark::{Event, Parser, TagEnd};

        let raw = String::from_utf8_lossy(data);
        let mut text = String::new();
        for event in Parser::new(&raw) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                Event::End(TagEnd::Paragraph) => text.push_str("\n\n"),
                Event::End(TagEnd::Heading(_)) | Event::End(TagEnd::Item) => {
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                _ => {}
            }
        }
        text
    }
}

/// Collapse whitespace-only lines and strip trailing blanks, keeping the
/// blank-line structure the paragraph segmenter relies on.
fn normalize(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn hash_content(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.exe");
        std::fs::write(&path, b"junk").unwrap();

        match DocumentLoader::load(&path) {
            Err(Error::UnsupportedFileType(ext)) => assert_eq!(ext, "exe"),
            other => panic!("expected UnsupportedFileType, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "제1조 목적\n본문 내용\n").unwrap();

        let doc = DocumentLoader::load(&path).unwrap();
        assert_eq!(doc.file_type, FileType::Txt);
        assert_eq!(doc.text, "제1조 목적\n본문 내용");
        assert_eq!(doc.file_name, "notes.txt");
    }

    #[test]
    fn test_empty_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "   \n  \n").unwrap();

        assert!(matches!(
            DocumentLoader::load(&path),
            Err(Error::FileParse { .. })
        ));
    }

    #[test]
    fn test_markdown_markers_are_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# 제목\n\n본문 *강조* 텍스트\n").unwrap();

        let doc = DocumentLoader::load(&path).unwrap();
        assert!(doc.text.contains("제목"));
        assert!(doc.text.contains("강조"));
        assert!(!doc.text.contains('#'));
        assert!(!doc.text.contains('*'));
    }

    #[test]
    fn test_html_body_text_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(
            &path,
            "<html><head><title>skip</title></head><body><h1>제1조</h1><p>본문</p></body></html>",
        )
        .unwrap();

        let doc = DocumentLoader::load(&path).unwrap();
        assert!(doc.text.contains("제1조"));
        assert!(doc.text.contains("본문"));
        assert!(!doc.text.contains("skip"));
    }

    #[test]
    fn test_csv_rows_become_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "이름,부서").unwrap();
        writeln!(file, "김철수,개발팀").unwrap();
        drop(file);

        let doc = DocumentLoader::load(&path).unwrap();
        assert!(doc.text.contains("이름 | 부서"));
        assert!(doc.text.contains("김철수 | 개발팀"));
    }
}
