//! Document ingestion pipeline: load → segment → chunk → dedup → upsert

mod chunker;
mod loader;
mod segmenter;
mod upsert;

pub use chunker::TextChunker;
pub use loader::{DocumentLoader, LoadedDocument};
pub use segmenter::{Section, SectionSegmenter, Segmentation, SegmentStrategy};
pub use upsert::{DeleteScope, IngestReport, Ingestor};
