//! Parsers for the agent's free-text classifier outputs
//!
//! The models are prompted for single tokens but are not trusted to comply;
//! these functions pin the exact substring rules in one place instead of
//! leaving them inline in the control flow.

/// Whether a question needs retrieved reference material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalDecision {
    /// Search internal documents before answering
    UseRag,
    /// Answer directly from conversation alone
    SkipRag,
}

/// Map the decide-transition output onto a decision. Any output containing
/// "use" (case-insensitive) means retrieval; everything else, garbage
/// included, falls open to direct answering.
pub fn parse_retrieval_decision(output: &str) -> RetrievalDecision {
    if output.to_lowercase().contains("use") {
        RetrievalDecision::UseRag
    } else {
        RetrievalDecision::SkipRag
    }
}

/// The judge's verdict on the current answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The answer stands; terminate the loop
    Sufficient,
    /// Rewrite the question and retry
    Insufficient,
}

/// A reflection is sufficient when it contains any configured marker.
pub fn parse_verdict(reflection: &str, sufficient_markers: &[String]) -> Verdict {
    if sufficient_markers.iter().any(|m| reflection.contains(m.as_str())) {
        Verdict::Sufficient
    } else {
        Verdict::Insufficient
    }
}
