//! Additive (Bahdanau-style) scoring with learned projections.
//!
//! Scores are `sum(v * tanh(W2·target + W1·source), axis = -1)`:
//!
//! * target `[batch, tq, target_dim]`, source `[batch, ts, source_dim]`: the
//!   projected source gains an axis at position 1 and is broadcast across the
//!   target's sequence axis, giving scores `[batch, tq, ts]`;
//! * target `[batch, ts, target_dim]`, source `[batch, source_dim]` (one
//!   state per batch entry): the projected source gains an axis at position 1
//!   and is broadcast across the target's sequence axis, giving `[batch, ts]`.
//!
//! The assignment of `W2` to the target and `W1` to the source follows the
//! formulation this module was written against and has not been checked
//! against the original paper; the roles may be swapped. The variant is kept
//! as-is and announces this once per process when constructed.
//!
//! Parameters (`w1.weight`, `w2.weight`, `attention_vals`) are declared
//! through the injected [`VarBuilder`]. When it is backed by a `VarMap` they
//! are trainable `Var`s; updating them is the job of an external optimiser.

use std::sync::Once;

use candle_core::{Tensor, D};
use candle_nn::VarBuilder;
use layers::{checks, Dense, DenseConfig};

use crate::core::{AdditiveConfig, AttentionError};

static ROLE_NOTICE: Once = Once::new();

/// Learned additive scorer owning its projection parameters.
#[derive(Debug, Clone)]
pub struct AdditiveScore {
    config: AdditiveConfig,
    units: usize,
    w1: Dense,
    w2: Dense,
    attention_vals: Tensor,
}

impl AdditiveScore {
    /// Validates `config` and declares the parameters under `vb`.
    pub fn new(config: AdditiveConfig, vb: VarBuilder) -> Result<Self, AttentionError> {
        let units = config.validate()?;
        ROLE_NOTICE.call_once(|| {
            log::warn!(
                "additive scoring: target/source projection roles are unverified against the published formulation"
            );
        });

        let w1 = Dense::new(
            DenseConfig::new(config.source_dim, units).with_init(config.kernel_init.clone()),
            vb.pp("w1"),
        )?;
        let w2 = Dense::new(
            DenseConfig::new(config.target_dim, units).with_init(config.kernel_init.clone()),
            vb.pp("w2"),
        )?;
        let attention_vals = vb.get_with_hints(
            units,
            "attention_vals",
            config.kernel_init.to_init(units, units),
        )?;

        Ok(Self {
            config,
            units,
            w1,
            w2,
            attention_vals,
        })
    }

    pub fn config(&self) -> &AdditiveConfig {
        &self.config
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Source projection.
    pub fn w1(&self) -> &Dense {
        &self.w1
    }

    /// Target projection.
    pub fn w2(&self) -> &Dense {
        &self.w2
    }

    /// Learned scoring vector, shaped `[units]`.
    pub fn attention_vals(&self) -> &Tensor {
        &self.attention_vals
    }

    pub fn score(&self, target: &Tensor, source: &Tensor) -> Result<Tensor, AttentionError> {
        self.validate_inputs(target, source)?;

        let target = self.w2.forward(target)?;
        let source = self.w1.forward(source)?;

        let (target, source) = if source.rank() == 3 {
            // [b, tq, 1, u] + [b, 1, ts, u]
            (target.unsqueeze(2)?, source.unsqueeze(1)?)
        } else {
            // [b, ts, u] + [b, 1, u]
            (target, source.unsqueeze(1)?)
        };

        let additive = target.broadcast_add(&source)?.tanh()?;
        let weighted = additive.broadcast_mul(&self.attention_vals)?;
        Ok(weighted.sum(D::Minus1)?)
    }

    fn validate_inputs(&self, target: &Tensor, source: &Tensor) -> Result<(), AttentionError> {
        checks::expect_rank("additive.target", target, 3).map_err(AttentionError::shape)?;
        checks::expect_last_dim("additive.source", source, self.config.source_dim)
            .map_err(AttentionError::shape)?;
        checks::expect_last_dim("additive.target", target, self.config.target_dim)
            .map_err(AttentionError::shape)?;
        checks::expect_same_device("additive", target, source).map_err(AttentionError::shape)?;
        if !matches!(source.rank(), 2 | 3) {
            return Err(AttentionError::InvalidShape {
                context: format!(
                    "additive.source: expected [batch, len, dim] or [batch, dim], got {:?}",
                    source.dims()
                ),
            });
        }
        if target.dims()[0] != source.dims()[0] {
            return Err(AttentionError::InvalidShape {
                context: format!(
                    "additive: batch mismatch between target {:?} and source {:?}",
                    target.dims(),
                    source.dims()
                ),
            });
        }
        Ok(())
    }
}
