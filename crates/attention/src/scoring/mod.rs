//! Compatibility (scoring) functions.
//!
//! A scoring function compares a *target* tensor `[batch, tq, d]` against a
//! *source* tensor `[batch, ts, d]` and returns raw scores `[batch, tq, ts]`.
//! Inside [`Attention`](crate::Attention) the query is the target and the key
//! is the source.

pub mod additive;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use layers::checks;

pub use additive::AdditiveScore;

use crate::core::{AdditiveConfig, AttentionError};
use crate::ops::{batched_matmul, last_dim};

/// Closed set of scoring strategies.
#[derive(Debug, Clone)]
pub enum ScoringFunction {
    /// Luong dot-product scores, `target · sourceᵀ`.
    DotProduct,
    /// Dot-product scores divided by `sqrt(source_dim)` (Vaswani et al.).
    ScaledDotProduct,
    /// Learned additive scores. See [`AdditiveScore`] for the caveat on input roles.
    Additive(AdditiveScore),
}

impl ScoringFunction {
    /// Builds the additive variant, declaring its parameters under `vb`.
    pub fn additive(config: AdditiveConfig, vb: VarBuilder) -> Result<Self, AttentionError> {
        Ok(ScoringFunction::Additive(AdditiveScore::new(config, vb)?))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoringFunction::DotProduct => "dot_product",
            ScoringFunction::ScaledDotProduct => "scaled_dot_product",
            ScoringFunction::Additive(_) => "additive",
        }
    }

    /// Scores every target position against every source position.
    pub fn score(&self, target: &Tensor, source: &Tensor) -> Result<Tensor, AttentionError> {
        match self {
            ScoringFunction::DotProduct => dot_product(target, source),
            ScoringFunction::ScaledDotProduct => scaled_dot_product(target, source),
            ScoringFunction::Additive(additive) => additive.score(target, source),
        }
    }
}

/// `target · sourceᵀ`, transposing the trailing two axes of `source`.
pub fn dot_product(target: &Tensor, source: &Tensor) -> Result<Tensor, AttentionError> {
    validate_pair(target, source)?;
    let source_t = source.t()?;
    Ok(batched_matmul(target, &source_t)?)
}

/// Dot-product scores divided elementwise by `sqrt(source.dims()[-1])`.
pub fn scaled_dot_product(target: &Tensor, source: &Tensor) -> Result<Tensor, AttentionError> {
    let scores = dot_product(target, source)?;
    let n = last_dim(source) as f64;
    Ok(scores.affine(1.0 / n.sqrt(), 0.0)?)
}

fn validate_pair(target: &Tensor, source: &Tensor) -> Result<(), AttentionError> {
    checks::expect_min_rank("scoring.target", target, 2).map_err(AttentionError::shape)?;
    checks::expect_min_rank("scoring.source", source, 2).map_err(AttentionError::shape)?;
    checks::expect_same_device("scoring", target, source).map_err(AttentionError::shape)?;
    checks::expect_float("scoring.target", target).map_err(AttentionError::shape)?;
    if last_dim(target) != last_dim(source) {
        return Err(AttentionError::InvalidShape {
            context: format!(
                "scoring: target {:?} and source {:?} must share the feature dim",
                target.dims(),
                source.dims()
            ),
        });
    }
    Ok(())
}
