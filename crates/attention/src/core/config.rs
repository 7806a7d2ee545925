//! Configuration shared by all attention compositions.
//!
//! Every struct derives `serde` so a composition can be described in JSON,
//! e.g. `{"scoring": {"kind": "scaled_dot_product"}, "selection": {"kind": "softmax", "axis": -1}}`.
//! Missing sections fall back to the scaled dot-product / softmax / matmul
//! pipeline.

use layers::{Axis, KernelInit};
use serde::{Deserialize, Serialize};

use super::AttentionError;

/// Which compatibility function scores targets against sources.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringConfig {
    DotProduct,
    #[default]
    ScaledDotProduct,
    Additive(AdditiveConfig),
}

/// Normalisation applied to raw scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionConfig {
    Softmax {
        #[serde(default)]
        axis: Axis,
    },
}

impl Default for SelectionConfig {
    fn default() -> Self {
        SelectionConfig::Softmax { axis: Axis::LAST }
    }
}

/// How normalised weights are applied to the value sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ApplyConfig {
    #[default]
    #[serde(rename = "matmul")]
    MatMul,
}

/// Full description of an attention pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttentionConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub apply: ApplyConfig,
}

impl AttentionConfig {
    /// Parses a JSON description, reporting malformed input as a construction error.
    pub fn from_json(json: &str) -> Result<Self, AttentionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| AttentionError::Construction(format!("invalid attention config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AttentionError> {
        if let ScoringConfig::Additive(additive) = &self.scoring {
            additive.validate()?;
        }
        Ok(())
    }
}

/// Parameters of the additive (Bahdanau-style) scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveConfig {
    /// Width of the shared hidden space both inputs are projected into.
    #[serde(default)]
    pub units: Option<usize>,
    /// Feature dimension of the target (query) tensor.
    pub target_dim: usize,
    /// Feature dimension of the source (key) tensor.
    pub source_dim: usize,
    /// Initialiser for the projections and the scoring vector. Keras names such
    /// as `"glorot_uniform"` are accepted.
    #[serde(default, deserialize_with = "layers::init::deserialize_kernel_init")]
    pub kernel_init: KernelInit,
}

impl AdditiveConfig {
    pub fn new(units: usize, target_dim: usize, source_dim: usize) -> Self {
        Self {
            units: Some(units),
            target_dim,
            source_dim,
            kernel_init: KernelInit::default(),
        }
    }

    pub fn with_kernel_init(mut self, kernel_init: KernelInit) -> Self {
        self.kernel_init = kernel_init;
        self
    }

    /// Parses a JSON description; a non-integer `units` is a construction error.
    pub fn from_json(json: &str) -> Result<Self, AttentionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| AttentionError::Construction(format!("invalid additive config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration and returns the resolved `units`.
    pub fn validate(&self) -> Result<usize, AttentionError> {
        let units = match self.units {
            None => {
                return Err(AttentionError::Construction(
                    "please specify `units`, the depth of the scoring mechanism".into(),
                ))
            }
            Some(0) => {
                return Err(AttentionError::Construction(
                    "`units` must be greater than zero".into(),
                ))
            }
            Some(units) => units,
        };
        if self.target_dim == 0 || self.source_dim == 0 {
            return Err(AttentionError::Construction(format!(
                "additive scoring needs non-zero feature dims, got target_dim={} source_dim={}",
                self.target_dim, self.source_dim
            )));
        }
        Ok(units)
    }
}
