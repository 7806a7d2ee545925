//! Small tensor helpers used by several stages.

use candle_core::{Result, Tensor};

/// Batched matmul over the trailing two axes, broadcasting leading axes only
/// when they differ.
pub(crate) fn batched_matmul(lhs: &Tensor, rhs: &Tensor) -> Result<Tensor> {
    let (l_dims, r_dims) = (lhs.dims(), rhs.dims());
    let same_batch = l_dims.len() == r_dims.len()
        && l_dims[..l_dims.len() - 2] == r_dims[..r_dims.len() - 2];
    if same_batch {
        lhs.matmul(rhs)
    } else {
        lhs.broadcast_matmul(rhs)
    }
}

/// Size of the trailing axis.
pub(crate) fn last_dim(tensor: &Tensor) -> usize {
    tensor.dims().last().copied().unwrap_or(1)
}
