//! Merging positional values into a sequence.
//!
//! Both inputs are rank 3: the sequence is `(batch, len, dim)` and the
//! positional values are `(1 | batch, len', dim')`. Optional matching slices
//! the positional tensor down to the sequence's length and/or feature size
//! before the merge. Slicing only ever shrinks the positional values.

use candle_core::Tensor;
use layers::{checks, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::PositionalError;

/// How positional values are merged with the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InclusionMode {
    /// Elementwise sum.
    Additive,
    /// Concatenation along `axis`.
    Concatenation {
        #[serde(default)]
        axis: Axis,
    },
}

impl InclusionMode {
    pub fn name(&self) -> String {
        match self {
            InclusionMode::Additive => "additive".to_owned(),
            InclusionMode::Concatenation { axis } => format!("concatenation(axis={axis})"),
        }
    }
}

/// Serialisable description of an [`IncludePositional`]. Unset match flags
/// take the defaults of the chosen mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionConfig {
    pub mode: InclusionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_len: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_d: Option<bool>,
}

impl Default for InclusionConfig {
    fn default() -> Self {
        Self {
            mode: InclusionMode::Additive,
            match_len: None,
            match_d: None,
        }
    }
}

impl InclusionConfig {
    pub fn from_json(raw: &str) -> Result<Self, PositionalError> {
        serde_json::from_str(raw).map_err(|err| PositionalError::InvalidConfig(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludePositional {
    mode: InclusionMode,
    match_len: bool,
    match_d: bool,
}

impl Default for IncludePositional {
    fn default() -> Self {
        Self::additive()
    }
}

impl IncludePositional {
    /// Elementwise sum, matching both length and feature dim.
    pub fn additive() -> Self {
        Self {
            mode: InclusionMode::Additive,
            match_len: true,
            match_d: true,
        }
    }

    /// Concatenation along the last axis, matching length only.
    pub fn concatenation() -> Self {
        Self {
            mode: InclusionMode::Concatenation { axis: Axis::LAST },
            match_len: true,
            match_d: false,
        }
    }

    pub fn from_config(config: &InclusionConfig) -> Self {
        let base = match config.mode {
            InclusionMode::Additive => Self::additive(),
            InclusionMode::Concatenation { axis } => Self::concatenation().with_axis(axis),
        };
        Self {
            match_len: config.match_len.unwrap_or(base.match_len),
            match_d: config.match_d.unwrap_or(base.match_d),
            ..base
        }
    }

    pub fn with_match_len(mut self, match_len: bool) -> Self {
        self.match_len = match_len;
        self
    }

    pub fn with_match_d(mut self, match_d: bool) -> Self {
        self.match_d = match_d;
        self
    }

    /// Sets the concatenation axis. Has no effect on additive inclusion.
    pub fn with_axis(mut self, axis: impl Into<Axis>) -> Self {
        if let InclusionMode::Concatenation { .. } = self.mode {
            self.mode = InclusionMode::Concatenation { axis: axis.into() };
        }
        self
    }

    pub fn mode(&self) -> InclusionMode {
        self.mode
    }

    pub fn match_len(&self) -> bool {
        self.match_len
    }

    pub fn match_d(&self) -> bool {
        self.match_d
    }

    pub fn include(
        &self,
        sequence: &Tensor,
        positional: &Tensor,
    ) -> Result<Tensor, PositionalError> {
        checks::expect_rank("sequence", sequence, 3).map_err(PositionalError::shape)?;
        checks::expect_rank("positional", positional, 3).map_err(PositionalError::shape)?;
        checks::expect_same_device("positional", sequence, positional)
            .map_err(PositionalError::shape)?;

        let (batch, seq_len, seq_d) = sequence.dims3()?;
        let mut positional = positional.clone();

        if self.match_len {
            let pos_len = positional.dim(1)?;
            if pos_len < seq_len {
                return Err(PositionalError::PositionalTooShort {
                    sequence: seq_len,
                    positional: pos_len,
                });
            }
            positional = positional.narrow(1, 0, seq_len)?;
        }

        if self.match_d {
            let pos_d = positional.dim(2)?;
            if pos_d < seq_d {
                return Err(PositionalError::DimensionTooSmall {
                    sequence: seq_d,
                    positional: pos_d,
                });
            }
            positional = positional.narrow(2, 0, seq_d)?;
        }

        let (pos_batch, pos_len, pos_d) = positional.dims3()?;
        if pos_len != seq_len {
            return Err(PositionalError::LengthMismatch {
                sequence: seq_len,
                positional: pos_len,
            });
        }
        let positional = positional.to_dtype(sequence.dtype())?;

        let merged = match self.mode {
            InclusionMode::Additive => {
                expect_batch(batch, pos_batch)?;
                if pos_d != seq_d {
                    return Err(PositionalError::InvalidShape {
                        context: format!(
                            "additive inclusion needs equal feature dims, got sequence {seq_d} and positional {pos_d}"
                        ),
                    });
                }
                sequence.broadcast_add(&positional)?
            }
            InclusionMode::Concatenation { axis } => {
                let dim = axis.resolve(3).map_err(PositionalError::shape)?;
                // along the batch axis the positional rows are appended as-is
                let positional = if dim != 0 && pos_batch != batch {
                    expect_batch(batch, pos_batch)?;
                    positional
                        .broadcast_as((batch, pos_len, pos_d))?
                        .contiguous()?
                } else {
                    positional
                };
                Tensor::cat(&[sequence, &positional], dim)?
            }
        };
        Ok(merged)
    }
}

fn expect_batch(batch: usize, pos_batch: usize) -> Result<(), PositionalError> {
    if pos_batch != 1 && pos_batch != batch {
        return Err(PositionalError::InvalidShape {
            context: format!(
                "positional batch {pos_batch} must be 1 or match sequence batch {batch}"
            ),
        });
    }
    Ok(())
}
