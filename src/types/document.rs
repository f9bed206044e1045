//! Chunk types persisted in the vector index

use serde::{Deserialize, Serialize};

/// Supported file types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// HTML document
    Html,
    /// CSV file
    Csv,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "pptx" => Self::Pptx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            "html" | "htm" => Self::Html,
            "csv" => Self::Csv,
            _ => Self::Unknown,
        }
    }

    /// Check if the loader can extract text from this type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
            Self::Csv => "CSV",
            Self::Unknown => "Unknown",
        }
    }
}

/// Stable chunk identity, derived from the source path and the chunk's
/// ordinal within the document. Re-ingesting an unchanged file at the same
/// path reproduces the same ids, which is what makes upserts idempotent.
/// Content edits at a fixed path are NOT reflected in the id; such files
/// must be deleted from the index and re-ingested.
pub fn chunk_id(source_path: &str, chunk_index: u32) -> String {
    format!("{}-{}", source_path, chunk_index)
}

/// Payload metadata stored alongside every chunk, used for scoped search
/// filters and for reconstructing the id space on re-ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Absolute path of the source document
    pub source_path: String,
    /// Ordinal of this chunk within the source document (0-based)
    pub chunk_index: u32,
    /// Title of the enclosing section (or a synthetic fallback label)
    pub title: String,
    /// Owning department, if the document is department-scoped
    pub department_id: Option<i64>,
    /// Whether the document is visible to every department
    pub common_doc: bool,
    /// Original file name, for source attributions
    pub file_name: String,
}

impl ChunkMetadata {
    /// Rebuild the stable chunk id from this metadata
    pub fn chunk_id(&self) -> String {
        chunk_id(&self.source_path, self.chunk_index)
    }
}

/// One embedded chunk, the unit stored and searched in the vector index.
/// Immutable once written; destroyed only by a filtered delete on
/// `source_path` plus department/common scoping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Stable id derived from `(source_path, chunk_index)`
    pub id: String,
    /// Chunk body, prefixed with a rendered reference to its section title
    pub text: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Scoping and provenance metadata
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    /// Build an unembedded chunk from a section body slice. The stored text
    /// carries the section title so retrieved passages stay attributable.
    pub fn new(
        source_path: &str,
        chunk_index: u32,
        title: &str,
        body: &str,
        department_id: Option<i64>,
        common_doc: bool,
        file_name: &str,
    ) -> Self {
        Self {
            id: chunk_id(source_path, chunk_index),
            text: format!("[{}]\n{}", title, body),
            vector: Vec::new(),
            metadata: ChunkMetadata {
                source_path: source_path.to_string(),
                chunk_index,
                title: title.to_string(),
                department_id,
                common_doc,
                file_name: file_name.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_stable() {
        assert_eq!(chunk_id("/data/rules.pdf", 0), "/data/rules.pdf-0");
        assert_eq!(chunk_id("/data/rules.pdf", 0), chunk_id("/data/rules.pdf", 0));
    }

    #[test]
    fn test_chunk_text_carries_title() {
        let chunk = DocumentChunk::new(
            "/data/rules.pdf",
            3,
            "제12조 근태관리",
            "지각 3회는 결근 1회로 간주한다.",
            Some(7),
            false,
            "rules.pdf",
        );
        assert_eq!(chunk.id, "/data/rules.pdf-3");
        assert!(chunk.text.starts_with("[제12조 근태관리]\n"));
        assert_eq!(chunk.metadata.chunk_id(), chunk.id);
    }

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("htm"), FileType::Html);
        assert!(!FileType::from_extension("exe").is_supported());
    }
}
