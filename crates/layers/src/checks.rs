//! Lightweight validation helpers shared across the attention crates.
//!
//! Every helper takes a `label` naming the tensor under test so failures read
//! like `attention.query: expected rank >= 2, got [4]`. They return
//! `candle_core::Result<()>` so call sites can propagate errors without panicking.

use candle_core::{DType, Error, Result, Tensor};

/// Ensures a tensor has exactly `rank` dimensions.
pub fn expect_rank(label: &str, tensor: &Tensor, rank: usize) -> Result<()> {
    if tensor.rank() == rank {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{label}: expected rank {rank}, got {:?}",
            tensor.dims()
        )))
    }
}

/// Ensures a tensor has at least `min_rank` dimensions.
pub fn expect_min_rank(label: &str, tensor: &Tensor, min_rank: usize) -> Result<()> {
    if tensor.rank() >= min_rank {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{label}: expected rank >= {min_rank}, got {:?}",
            tensor.dims()
        )))
    }
}

/// Ensures the trailing (feature) dimension equals `expected`.
pub fn expect_last_dim(label: &str, tensor: &Tensor, expected: usize) -> Result<()> {
    match tensor.dims().last() {
        Some(&last) if last == expected => Ok(()),
        _ => Err(Error::Msg(format!(
            "{label}: expected trailing dim {expected}, got {:?}",
            tensor.dims()
        ))),
    }
}

/// Checks the tensor dtype is one of the allowed values.
pub fn expect_dtype_in(label: &str, tensor: &Tensor, allowed: &[DType]) -> Result<()> {
    let dtype = tensor.dtype();
    if allowed.contains(&dtype) {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{label}: expected dtype in {allowed:?}, got {dtype:?}"
        )))
    }
}

/// Checks the tensor holds floating point values.
pub fn expect_float(label: &str, tensor: &Tensor) -> Result<()> {
    expect_dtype_in(
        label,
        tensor,
        &[DType::F16, DType::BF16, DType::F32, DType::F64],
    )
}

/// Checks two tensors live on the same device.
pub fn expect_same_device(label: &str, lhs: &Tensor, rhs: &Tensor) -> Result<()> {
    if lhs.device().same_device(rhs.device()) {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{label}: tensors must reside on the same device ({:?} vs {:?})",
            lhs.device().location(),
            rhs.device().location()
        )))
    }
}
