//! Error types emitted by the attention stages.

use thiserror::Error;

/// Attention-specific error category.
#[derive(Debug, Error)]
pub enum AttentionError {
    /// A required stage was never supplied to a builder.
    #[error("must specify a `{component}` function")]
    MissingComponent { component: &'static str },
    /// A constructor argument is missing or has the wrong type.
    #[error("invalid construction argument: {0}")]
    Construction(String),
    /// The supplied tensor shapes do not align with the documented contract.
    #[error("invalid tensor shape for {context}")]
    InvalidShape { context: String },
    /// A backend failure propagated to the caller.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}

impl AttentionError {
    /// Wraps a failed precondition check as a shape error.
    pub(crate) fn shape(err: candle_core::Error) -> Self {
        AttentionError::InvalidShape {
            context: err.to_string(),
        }
    }

    /// Whether the error stems from configuration rather than input data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AttentionError::MissingComponent { .. } | AttentionError::Construction(_)
        )
    }
}
