//! Dense projections whose parameters are declared through a `VarBuilder`.
//!
//! Inputs are shaped `(..., input_dim)` and outputs `(..., units)`. Leading
//! axes are treated as batch axes. Weights are stored `(units, input_dim)` as
//! `candle_nn::Linear` expects; when the builder is backed by a `VarMap` they
//! show up in `VarMap::all_vars` under `<prefix>.weight` (and `<prefix>.bias`).

use candle_core::{Error, Result, Tensor};
use candle_nn::{Init, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

use crate::{checks, init::KernelInit};

/// Configuration for a dense projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseConfig {
    /// Incoming feature dimension.
    pub input_dim: usize,
    /// Output feature dimension.
    pub units: usize,
    /// Whether a learnable bias vector is applied.
    #[serde(default)]
    pub bias: bool,
    /// Initialisation policy for the kernel.
    #[serde(default, deserialize_with = "crate::init::deserialize_kernel_init")]
    pub init: KernelInit,
}

impl DenseConfig {
    /// Bias-free projection from `input_dim` to `units` with Glorot uniform weights.
    pub fn new(input_dim: usize, units: usize) -> Self {
        Self {
            input_dim,
            units,
            bias: false,
            init: KernelInit::default(),
        }
    }

    pub fn with_init(mut self, init: KernelInit) -> Self {
        self.init = init;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(Error::Msg("dense input_dim must be greater than zero".into()));
        }
        if self.units == 0 {
            return Err(Error::Msg("dense units must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Affine projection backed by `candle_nn::Linear`.
#[derive(Debug, Clone)]
pub struct Dense {
    config: DenseConfig,
    inner: Linear,
}

impl Dense {
    /// Declares (or fetches) the parameters under `vb` and builds the projection.
    pub fn new(config: DenseConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let weight = vb.get_with_hints(
            (config.units, config.input_dim),
            "weight",
            config.init.to_init(config.input_dim, config.units),
        )?;
        let bias = if config.bias {
            Some(vb.get_with_hints(config.units, "bias", Init::Const(0.0))?)
        } else {
            None
        };
        Ok(Self {
            config,
            inner: Linear::new(weight, bias),
        })
    }

    pub fn config(&self) -> &DenseConfig {
        &self.config
    }

    pub fn weight(&self) -> &Tensor {
        self.inner.weight()
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.inner.bias()
    }

    /// Projects the trailing axis of `hidden` to `units`.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_min_rank("dense.input", hidden, 2)?;
        checks::expect_last_dim("dense.input", hidden, self.config.input_dim)?;
        self.inner.forward(hidden)
    }
}
