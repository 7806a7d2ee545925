//! Selection (normalisation) and apply stages, and their composition.
//!
//! [`SelectionFunction`] turns raw scores into weights, [`SelectionApply`]
//! applies those weights to a value sequence, and [`SelectAndApply`] runs
//! the two back to back. Both stages are required: the builder refuses to
//! produce a [`SelectAndApply`] with either one missing.

use candle_core::Tensor;
use candle_nn::ops::{softmax, softmax_last_dim};
use layers::{checks, Axis};

use crate::core::{AttentionError, SelectionConfig};
use crate::ops::{batched_matmul, last_dim};

/// Normalises a score tensor into weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionFunction {
    /// Softmax along `axis`; weights sum to one along that axis.
    Softmax { axis: Axis },
}

impl SelectionFunction {
    pub fn softmax(axis: impl Into<Axis>) -> Self {
        SelectionFunction::Softmax { axis: axis.into() }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        match *config {
            SelectionConfig::Softmax { axis } => SelectionFunction::Softmax { axis },
        }
    }

    pub fn name(&self) -> String {
        match self {
            SelectionFunction::Softmax { axis } => format!("softmax(axis={axis})"),
        }
    }

    pub fn normalize(&self, scores: &Tensor) -> Result<Tensor, AttentionError> {
        checks::expect_float("selection.scores", scores).map_err(AttentionError::shape)?;
        match self {
            SelectionFunction::Softmax { axis } => {
                let rank = scores.rank();
                let dim = axis.resolve(rank).map_err(AttentionError::shape)?;
                let scores = scores.contiguous()?;
                let weights = if axis.is_last(rank) {
                    softmax_last_dim(&scores)?
                } else {
                    softmax(&scores, dim)?
                };
                Ok(weights)
            }
        }
    }
}

impl Default for SelectionFunction {
    fn default() -> Self {
        SelectionFunction::Softmax { axis: Axis::LAST }
    }
}

/// Applies normalised weights to a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionApply {
    /// `weights · sequence` over the trailing two axes.
    #[default]
    MatMul,
}

impl SelectionApply {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionApply::MatMul => "matmul",
        }
    }

    pub fn apply(&self, weights: &Tensor, sequence: &Tensor) -> Result<Tensor, AttentionError> {
        match self {
            SelectionApply::MatMul => {
                checks::expect_min_rank("apply.weights", weights, 2)
                    .map_err(AttentionError::shape)?;
                checks::expect_min_rank("apply.sequence", sequence, 2)
                    .map_err(AttentionError::shape)?;
                let seq_len = sequence.dims()[sequence.rank() - 2];
                if last_dim(weights) != seq_len {
                    return Err(AttentionError::InvalidShape {
                        context: format!(
                            "apply: weights {:?} cannot be applied to sequence {:?}",
                            weights.dims(),
                            sequence.dims()
                        ),
                    });
                }
                Ok(batched_matmul(weights, sequence)?)
            }
        }
    }
}

/// Selection followed by apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectAndApply {
    selection: SelectionFunction,
    apply: SelectionApply,
}

impl SelectAndApply {
    pub fn builder() -> SelectAndApplyBuilder {
        SelectAndApplyBuilder::default()
    }

    /// Softmax along `axis` followed by a matmul against the values.
    pub fn softmax_matmul(axis: impl Into<Axis>) -> Self {
        Self {
            selection: SelectionFunction::softmax(axis),
            apply: SelectionApply::MatMul,
        }
    }

    pub fn selection(&self) -> &SelectionFunction {
        &self.selection
    }

    pub fn apply(&self) -> &SelectionApply {
        &self.apply
    }

    /// Normalises `scores` and applies the weights to `sequence`.
    pub fn compose(&self, scores: &Tensor, sequence: &Tensor) -> Result<Tensor, AttentionError> {
        let weights = self.selection.normalize(scores)?;
        self.apply.apply(&weights, sequence)
    }

    /// Like [`compose`](Self::compose) but also returns the weights.
    pub fn compose_with_weights(
        &self,
        scores: &Tensor,
        sequence: &Tensor,
    ) -> Result<(Tensor, Tensor), AttentionError> {
        let weights = self.selection.normalize(scores)?;
        let output = self.apply.apply(&weights, sequence)?;
        Ok((output, weights))
    }
}

/// Collects the two stages of a [`SelectAndApply`].
#[derive(Debug, Clone, Default)]
pub struct SelectAndApplyBuilder {
    selection: Option<SelectionFunction>,
    apply: Option<SelectionApply>,
}

impl SelectAndApplyBuilder {
    pub fn selection(mut self, selection: SelectionFunction) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn apply(mut self, apply: SelectionApply) -> Self {
        self.apply = Some(apply);
        self
    }

    pub fn build(self) -> Result<SelectAndApply, AttentionError> {
        let selection = self.selection.ok_or(AttentionError::MissingComponent {
            component: "selection",
        })?;
        let apply = self.apply.ok_or(AttentionError::MissingComponent {
            component: "apply",
        })?;
        Ok(SelectAndApply { selection, apply })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device, D};

    fn assert_sums_to_one(weights: &Tensor, dim: usize) -> candle_core::Result<()> {
        let sums = weights.sum(dim)?.flatten_all()?.to_vec1::<f32>()?;
        for sum in sums {
            assert!((sum - 1.0).abs() < 1e-5, "sum {sum} along axis {dim}");
        }
        Ok(())
    }

    #[test]
    fn softmax_sums_to_one_along_every_axis() -> candle_core::Result<()> {
        let device = Device::Cpu;
        let scores = Tensor::randn(0f32, 3.0, (2, 3, 4), &device)?;
        for (axis, dim) in [(-1isize, 2usize), (2, 2), (-2, 1), (0, 0), (1, 1)] {
            let weights = SelectionFunction::softmax(axis).normalize(&scores).unwrap();
            assert_eq!(weights.dims(), scores.dims());
            assert_sums_to_one(&weights, dim)?;
        }
        Ok(())
    }

    #[test]
    fn softmax_handles_non_contiguous_scores() -> candle_core::Result<()> {
        let device = Device::Cpu;
        let scores = Tensor::randn(0f32, 1.0, (2, 4, 3), &device)?.transpose(1, 2)?;
        let weights = SelectionFunction::default().normalize(&scores).unwrap();
        assert_sums_to_one(&weights, 2)
    }

    #[test]
    fn out_of_range_axis_is_a_shape_error() -> candle_core::Result<()> {
        let scores = Tensor::zeros((2, 3), DType::F32, &Device::Cpu)?;
        let err = SelectionFunction::softmax(2).normalize(&scores).unwrap_err();
        assert!(matches!(err, AttentionError::InvalidShape { .. }));
        Ok(())
    }

    #[test]
    fn matmul_applies_weights_to_values() -> candle_core::Result<()> {
        let device = Device::Cpu;
        let weights = Tensor::from_vec(vec![1f32, 0., 0.5, 0.5], (1, 2, 2), &device)?;
        let values = Tensor::from_vec(vec![2f32, 4., 6., 8.], (1, 2, 2), &device)?;
        let out = SelectionApply::MatMul.apply(&weights, &values).unwrap();
        assert_eq!(out.to_vec3::<f32>()?, vec![vec![vec![2., 4.], vec![4., 6.]]]);

        let short = Tensor::zeros((1, 3, 2), DType::F32, &device)?;
        let err = SelectionApply::MatMul.apply(&weights, &short).unwrap_err();
        assert!(matches!(err, AttentionError::InvalidShape { .. }));
        Ok(())
    }

    #[test]
    fn compose_is_normalize_then_apply() -> candle_core::Result<()> {
        let device = Device::Cpu;
        let scores = Tensor::randn(0f32, 1.0, (2, 3, 5), &device)?;
        let values = Tensor::randn(0f32, 1.0, (2, 5, 4), &device)?;
        let stage = SelectAndApply::softmax_matmul(-1);

        let (out, weights) = stage.compose_with_weights(&scores, &values).unwrap();
        let manual = softmax(&scores, D::Minus1)?.matmul(&values)?;
        let diff = out.sub(&manual)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert!(diff < 1e-5);
        assert_eq!(out.dims(), &[2, 3, 4]);
        assert_sums_to_one(&weights, 2)
    }

    #[test]
    fn builder_reports_missing_stages() {
        let err = SelectAndApply::builder()
            .apply(SelectionApply::MatMul)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            AttentionError::MissingComponent {
                component: "selection"
            }
        ));

        let err = SelectAndApply::builder()
            .selection(SelectionFunction::default())
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "must specify a `apply` function");

        let built = SelectAndApply::builder()
            .selection(SelectionFunction::softmax(-1))
            .apply(SelectionApply::MatMul)
            .build()
            .unwrap();
        assert_eq!(built, SelectAndApply::softmax_matmul(-1));
    }
}
