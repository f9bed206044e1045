//! Text chunking with separator priority and overlap
//!
//! Splits section bodies to an embedding-friendly size by trying the most
//! semantic separator first: paragraph breaks, then line breaks, then
//! sentence-ending periods, then spaces, then raw character cuts. Pieces are
//! merged back greedily up to the size budget, carrying a tail of the
//! previous chunk into the next for continuity. All sizes are measured in
//! characters, not bytes.

use std::collections::VecDeque;

use crate::config::ChunkingConfig;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            overlap: config.chunk_overlap,
        }
    }

    /// Split `text` into chunks of at most `chunk_size` chars. Empty input
    /// yields an empty sequence; no produced chunk is ever empty.
    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces = self.decompose(text, &SEPARATORS);
        self.merge(pieces)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Break text into pieces no longer than the size budget, preferring
    /// the earliest separator that actually occurs. Separators stay
    /// attached to the preceding piece so no content is dropped.
    fn decompose(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        match separators.split_first() {
            Some((sep, rest)) => {
                if !text.contains(sep) {
                    return self.decompose(text, rest);
                }
                let mut pieces = Vec::new();
                for segment in text.split_inclusive(sep) {
                    if char_len(segment) <= self.chunk_size {
                        pieces.push(segment.to_string());
                    } else {
                        pieces.extend(self.decompose(segment, rest));
                    }
                }
                pieces
            }
            // Out of separators: cut at character boundaries.
            None => {
                let chars: Vec<char> = text.chars().collect();
                chars
                    .chunks(self.chunk_size)
                    .map(|w| w.iter().collect())
                    .collect()
            }
        }
    }

    /// Greedily merge pieces into chunks within the size budget. When a
    /// chunk is flushed, trailing pieces up to the overlap budget are kept
    /// as the start of the next chunk.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&piece);

            if total + len > self.chunk_size && !window.is_empty() {
                chunks.push(window.iter().map(|(p, _)| p.as_str()).collect::<String>());

                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    let (_, popped) = window.pop_front().expect("window is non-empty");
                    total -= popped;
                }
            }

            total += len;
            window.push_back((piece, len));
        }

        if !window.is_empty() {
            chunks.push(window.iter().map(|(p, _)| p.as_str()).collect::<String>());
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
