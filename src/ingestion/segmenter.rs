//! Section segmentation with a fallback chain of heuristics
//!
//! Documents are heterogeneous (policy text, slide exports, plain notes), so
//! no single heading pattern covers them. Segmentation degrades through
//! three stages instead of failing: structural heading patterns, then long
//! blank-line paragraphs, then fixed-length windows. The chosen stage is
//! reported so degraded ingestion stays observable.

use regex::Regex;

use crate::config::SegmentationConfig;

/// A titled span of the source document
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Section heading, or a synthetic fallback label
    pub title: String,
    /// Section body text
    pub body: String,
}

/// Which fallback stage produced the sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStrategy {
    /// A structural heading pattern matched; carries the pattern's priority
    /// index
    Pattern(usize),
    /// Blank-line paragraph split
    Paragraphs,
    /// Terminal fixed-length windows
    FixedWindows,
}

/// Segmentation result
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Ordered sections, never empty
    pub sections: Vec<Section>,
    /// The stage that produced them
    pub strategy: SegmentStrategy,
}

impl Segmentation {
    /// True when the structural patterns all failed and a fallback ran
    pub fn is_degraded(&self) -> bool {
        !matches!(self.strategy, SegmentStrategy::Pattern(_))
    }
}

/// Splits flat document text into titled sections
pub struct SectionSegmenter {
    patterns: Vec<Regex>,
    config: SegmentationConfig,
}

impl SectionSegmenter {
    /// Build the segmenter with the structural heading patterns, in priority
    /// order: numbered article headers (제N조), numbered headings, bracketed
    /// headings, spelled-out article headers.
    pub fn new(config: SegmentationConfig) -> Self {
        let patterns = [
            r"(제\s*\d+\s*조\s*[^\n]*)",
            r"(?m)^\s*\d+\.\s*[^\n]+",
            r"(?m)^\s*\[\s*.+?\s*\]",
            r"(?m)^\s*제?\w+\s*조\s+[^\n]+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("segmenter pattern must compile"))
        .collect();

        Self { patterns, config }
    }

    /// Split `text` into titled sections. Never fails, never returns an
    /// empty sequence; the terminal fixed-window stage always succeeds.
    pub fn segment(&self, text: &str) -> Segmentation {
        for (index, pattern) in self.patterns.iter().enumerate() {
            if let Some(sections) = self.try_pattern(text, pattern) {
                tracing::info!(
                    pattern = index,
                    sections = sections.len(),
                    "section pattern matched"
                );
                return Segmentation {
                    sections,
                    strategy: SegmentStrategy::Pattern(index),
                };
            }
            tracing::debug!(pattern = index, "section pattern failed");
        }

        if let Some(sections) = self.try_paragraphs(text) {
            tracing::warn!(
                sections = sections.len(),
                "no heading pattern matched, using paragraph split"
            );
            return Segmentation {
                sections,
                strategy: SegmentStrategy::Paragraphs,
            };
        }

        let sections = self.fixed_windows(text);
        tracing::warn!(
            sections = sections.len(),
            "paragraph split failed, using fixed-length windows"
        );
        Segmentation {
            sections,
            strategy: SegmentStrategy::FixedWindows,
        }
    }

    /// A pattern succeeds only with at least `min_pattern_matches` hits.
    /// Sections run from one match start to the next; the last one extends
    /// to end of text.
    fn try_pattern(&self, text: &str, pattern: &Regex) -> Option<Vec<Section>> {
        let matches: Vec<_> = pattern.find_iter(text).collect();
        if matches.len() < self.config.min_pattern_matches {
            return None;
        }

        let mut sections = Vec::with_capacity(matches.len());
        for (i, m) in matches.iter().enumerate() {
            let end = matches
                .get(i + 1)
                .map(|next| next.start())
                .unwrap_or(text.len());
            let title = m.as_str().trim().to_string();
            let body = text[m.end()..end].trim().to_string();
            sections.push(Section { title, body });
        }
        Some(sections)
    }

    /// Blank-line paragraphs longer than the configured floor, labeled
    /// "문단 N"; succeeds with at least `min_pattern_matches` of them.
    fn try_paragraphs(&self, text: &str) -> Option<Vec<Section>> {
        let paragraphs: Vec<&str> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| p.chars().count() > self.config.min_paragraph_len)
            .collect();

        if paragraphs.len() < self.config.min_pattern_matches {
            return None;
        }

        Some(
            paragraphs
                .iter()
                .enumerate()
                .map(|(i, p)| Section {
                    title: format!("문단 {}", i + 1),
                    body: p.to_string(),
                })
                .collect(),
        )
    }

    /// Terminal fallback: fixed windows of `fallback_chunk_size` chars,
    /// labeled "청크 N". Always yields at least one section.
    fn fixed_windows(&self, text: &str) -> Vec<Section> {
        let chars: Vec<char> = text.chars().collect();
        let window = self.config.fallback_chunk_size.max(1);

        if chars.is_empty() {
            return vec![Section {
                title: "청크 1".to_string(),
                body: String::new(),
            }];
        }

        chars
            .chunks(window)
            .enumerate()
            .map(|(i, w)| Section {
                title: format!("청크 {}", i + 1),
                body: w.iter().collect(),
            })
            .collect()
    }
}
