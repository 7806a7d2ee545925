//! Core types shared across attention stages.
//!
//! Tensors follow the `[batch, ..., len, dim]` convention: scoring reads the
//! trailing two axes of the target and source, selection normalises along a
//! configurable axis (the last by default) and apply multiplies the weights
//! against the value sequence. Leading axes broadcast.

pub mod config;
pub mod errors;

pub use config::{AdditiveConfig, ApplyConfig, AttentionConfig, ScoringConfig, SelectionConfig};
pub use errors::AttentionError;
