//! Pure text-processing stages: normalization, fact extraction and the
//! deterministic fallback formatter. Nothing here performs I/O.

pub mod extractor;
pub mod normalizer;
pub mod simple_formatter;

pub use extractor::extract;
pub use normalizer::{normalize, render_sections};
