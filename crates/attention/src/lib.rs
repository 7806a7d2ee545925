//! Composable attention building blocks.
//!
//! Attention is assembled from three stages:
//!
//! 1. a [`ScoringFunction`] comparing a target (the query) with a source (the
//!    key): dot-product, scaled dot-product or learned additive scores;
//! 2. a [`SelectionFunction`] turning scores into weights (softmax along a
//!    configurable axis);
//! 3. a [`SelectionApply`] applying the weights to the values (matmul).
//!
//! [`SelectAndApply`] bundles stages 2 and 3 and [`Attention`] wires the whole
//! pipeline together. Builders refuse to produce a pipeline with a missing
//! stage, so an incomplete composition is reported as
//! [`AttentionError::MissingComponent`] before any tensor is touched.
//!
//! Masking and multi-head splitting are out of scope; leading tensor axes
//! broadcast, so per-head tensors `[batch, heads, len, dim]` work unchanged.

pub mod composition;
pub mod core;
mod ops;
pub mod reference;
pub mod scoring;
pub mod selection;

pub use composition::{Attention, AttentionBuilder};
pub use crate::core::{
    AdditiveConfig, ApplyConfig, AttentionConfig, AttentionError, ScoringConfig, SelectionConfig,
};
pub use scoring::{AdditiveScore, ScoringFunction};
pub use selection::{SelectAndApply, SelectAndApplyBuilder, SelectionApply, SelectionFunction};
