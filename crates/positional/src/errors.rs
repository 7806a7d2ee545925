//! Error types emitted by positional encoding and inclusion.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionalError {
    /// The supplied tensors do not follow the `(batch, len, dim)` contract.
    #[error("invalid tensor shape for {context}")]
    InvalidShape { context: String },
    /// Length matching needs at least as many positions as sequence steps.
    #[error("positional len ({positional}) is shorter than sequence len ({sequence})")]
    PositionalTooShort { sequence: usize, positional: usize },
    /// Dimension matching can only slice the positional feature axis down.
    #[error("cannot match dim, positional d ({positional}) is smaller than sequence d ({sequence})")]
    DimensionTooSmall { sequence: usize, positional: usize },
    /// Lengths still disagree once the configured matching has been applied.
    #[error("sequence len (shape[1]) {sequence} != positional len (shape[1]) {positional}")]
    LengthMismatch { sequence: usize, positional: usize },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

impl PositionalError {
    pub(crate) fn shape(err: candle_core::Error) -> Self {
        PositionalError::InvalidShape {
            context: err.to_string(),
        }
    }
}
