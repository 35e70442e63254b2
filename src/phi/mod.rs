//! PHI-style motif search: PROSITE-like pattern parsing and matching.
//!
//! An independent subsystem next to the k-mer index; it shares only the
//! sequence-loading layer with the word finder.

mod pattern;
mod scan;

pub use pattern::{
    PatternClass, PhiAlphabet, PhiError, PhiPattern, PHI_MAX_PATTERN_LENGTH, PHI_MAX_VARIANTS,
    PHI_MULTI_WORD_LIMIT, PHI_ONE_WORD_LIMIT,
};
pub use scan::{find_matches, find_pattern_hits, PhiHits};
