//! The full `compatibility → selection → apply` pipeline.

use std::sync::OnceLock;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use layers::Axis;

use crate::core::{ApplyConfig, AttentionConfig, AttentionError, ScoringConfig};
use crate::scoring::ScoringFunction;
use crate::selection::{SelectAndApply, SelectionApply, SelectionFunction};

/// Attention assembled from a scoring function and a select-and-apply stage.
///
/// `attend(q, k, v)` scores the query (target) against the key (source) and
/// hands the scores to the select-and-apply stage together with the values.
/// There is no masking and no head splitting; leading axes simply broadcast.
#[derive(Debug, Clone)]
pub struct Attention {
    compatibility: ScoringFunction,
    select_and_apply: SelectAndApply,
    first_call: OnceLock<()>,
}

impl Attention {
    pub fn builder() -> AttentionBuilder {
        AttentionBuilder::default()
    }

    /// Scaled dot-product scores, softmax along `axis`, matmul with the values.
    pub fn scaled_dot_softmax_matmul(axis: impl Into<Axis>) -> Self {
        Self::from_parts(
            ScoringFunction::ScaledDotProduct,
            SelectAndApply::softmax_matmul(axis),
        )
    }

    /// Unscaled dot-product scores, softmax along `axis`, matmul with the values.
    pub fn dot_softmax_matmul(axis: impl Into<Axis>) -> Self {
        Self::from_parts(
            ScoringFunction::DotProduct,
            SelectAndApply::softmax_matmul(axis),
        )
    }

    /// Builds the pipeline described by `config`.
    ///
    /// Additive scoring declares parameters and therefore needs `vb`; they are
    /// placed under the `additive` prefix.
    pub fn from_config(
        config: &AttentionConfig,
        vb: Option<VarBuilder>,
    ) -> Result<Self, AttentionError> {
        config.validate()?;
        let compatibility = match &config.scoring {
            ScoringConfig::DotProduct => ScoringFunction::DotProduct,
            ScoringConfig::ScaledDotProduct => ScoringFunction::ScaledDotProduct,
            ScoringConfig::Additive(additive) => {
                let vb = vb.ok_or_else(|| {
                    AttentionError::Construction(
                        "additive scoring requires a VarBuilder to declare its parameters".into(),
                    )
                })?;
                ScoringFunction::additive(additive.clone(), vb.pp("additive"))?
            }
        };
        let apply = match config.apply {
            ApplyConfig::MatMul => SelectionApply::MatMul,
        };
        let select_and_apply = SelectAndApply::builder()
            .selection(SelectionFunction::from_config(&config.selection))
            .apply(apply)
            .build()?;
        Ok(Self::from_parts(compatibility, select_and_apply))
    }

    fn from_parts(compatibility: ScoringFunction, select_and_apply: SelectAndApply) -> Self {
        Self {
            compatibility,
            select_and_apply,
            first_call: OnceLock::new(),
        }
    }

    pub fn compatibility(&self) -> &ScoringFunction {
        &self.compatibility
    }

    pub fn select_and_apply(&self) -> &SelectAndApply {
        &self.select_and_apply
    }

    /// One-line summary of the pipeline, e.g. `scaled_dot_product -> softmax(axis=-1) -> matmul`.
    pub fn describe(&self) -> String {
        format!(
            "{} -> {} -> {}",
            self.compatibility.name(),
            self.select_and_apply.selection().name(),
            self.select_and_apply.apply().name()
        )
    }

    pub fn attend(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
    ) -> Result<Tensor, AttentionError> {
        let (output, _) = self.attend_with_weights(query, key, value)?;
        Ok(output)
    }

    /// Runs the pipeline and also returns the normalised weights.
    pub fn attend_with_weights(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
    ) -> Result<(Tensor, Tensor), AttentionError> {
        if self.first_call.set(()).is_ok() {
            log::info!(
                "attention init pipeline={} query={:?} key={:?} value={:?}",
                self.describe(),
                query.dims(),
                key.dims(),
                value.dims()
            );
        }

        let scores = self.compatibility.score(query, key)?;
        self.select_and_apply.compose_with_weights(&scores, value)
    }
}

/// Collects the two stages of an [`Attention`].
#[derive(Debug, Clone, Default)]
pub struct AttentionBuilder {
    compatibility: Option<ScoringFunction>,
    select_and_apply: Option<SelectAndApply>,
}

impl AttentionBuilder {
    pub fn compatibility(mut self, compatibility: ScoringFunction) -> Self {
        self.compatibility = Some(compatibility);
        self
    }

    pub fn select_and_apply(mut self, select_and_apply: SelectAndApply) -> Self {
        self.select_and_apply = Some(select_and_apply);
        self
    }

    pub fn build(self) -> Result<Attention, AttentionError> {
        let compatibility = self.compatibility.ok_or(AttentionError::MissingComponent {
            component: "compatibility",
        })?;
        let select_and_apply = self
            .select_and_apply
            .ok_or(AttentionError::MissingComponent {
                component: "select_and_apply",
            })?;
        Ok(Attention::from_parts(compatibility, select_and_apply))
    }
}
