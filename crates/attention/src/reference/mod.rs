//! Portable scalar implementation used to validate the tensor pipeline.
//!
//! This path favours clarity over performance and serves as the baseline for
//! tests and the correctness bench.

pub mod naive;

pub use naive::naive_attention;
