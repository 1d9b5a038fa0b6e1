//! Pure analysis passes over an accumulated result set.
//!
//! # Submodules
//!
//! - [`duplicates`]: Groups records by exact title and reports repeated titles
//! - [`dates`]: Publication date range and per-day counts
//!
//! Neither pass performs I/O or fails; an empty input yields an empty result.

pub mod dates;
pub mod duplicates;
