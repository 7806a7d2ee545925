//! Positional utilities for sequence models.
//!
//! [`PositionalValues`] produces `(1, seq_len, embed_d)` encodings and
//! [`IncludePositional`] merges them into a `(batch, len, dim)` sequence,
//! either by addition or by concatenation.

pub mod errors;
pub mod inclusion;
pub mod values;

pub use errors::PositionalError;
pub use inclusion::{IncludePositional, InclusionConfig, InclusionMode};
pub use values::{
    encoding_cache_counters, encoding_cache_len, reset_encoding_cache_stats, sinusoidal_encoding,
    PositionalValues, SinusoidalConfig,
};
