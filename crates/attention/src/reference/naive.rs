//! Scalar reference attention.
//!
//! Loops over every batch entry, query and key in `f32` with a max-shifted
//! softmax. Intended as ground truth for the tensor pipeline, not for speed.

use candle_core::{bail, DType, Result, Tensor};

/// Dot-product (optionally scaled) attention over `[batch, len, dim]` tensors.
///
/// `q` is `[batch, q_len, dim]`, `k` is `[batch, k_len, dim]` and `v` is
/// `[batch, k_len, v_dim]`; the result is `[batch, q_len, v_dim]` in `f32`.
pub fn naive_attention(q: &Tensor, k: &Tensor, v: &Tensor, scaled: bool) -> Result<Tensor> {
    let (batch, q_len, dim) = q.dims3()?;
    let (kb, k_len, kd) = k.dims3()?;
    let (vb, vk, v_dim) = v.dims3()?;
    if kb != batch || kd != dim {
        bail!("k shape mismatch: expected [{batch}, ?, {dim}] got [{kb}, {k_len}, {kd}]");
    }
    if vb != batch || vk != k_len {
        bail!("v shape mismatch: expected [{batch}, {k_len}, ?] got [{vb}, {vk}, {v_dim}]");
    }

    let q_vec = q.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    let k_vec = k.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    let v_vec = v.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    let scale = if scaled {
        1.0 / (dim as f32).sqrt()
    } else {
        1.0
    };

    let mut output = vec![0f32; batch * q_len * v_dim];
    let mut row = vec![0f32; k_len];
    for b in 0..batch {
        for qi in 0..q_len {
            let mut max_val = f32::NEG_INFINITY;
            for (ki, slot) in row.iter_mut().enumerate() {
                let mut dot = 0f32;
                for d in 0..dim {
                    dot += q_vec[(b * q_len + qi) * dim + d] * k_vec[(b * k_len + ki) * dim + d];
                }
                *slot = dot * scale;
                max_val = max_val.max(*slot);
            }
            let mut denom = 0f32;
            for val in row.iter_mut() {
                *val = (*val - max_val).exp();
                denom += *val;
            }
            for d in 0..v_dim {
                let mut acc = 0f32;
                for (ki, weight) in row.iter().enumerate() {
                    acc += weight / denom * v_vec[(b * k_len + ki) * v_dim + d];
                }
                output[(b * q_len + qi) * v_dim + d] = acc;
            }
        }
    }

    Tensor::from_vec(output, (batch, q_len, v_dim), q.device())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn uniform_keys_average_the_values() -> Result<()> {
        let device = Device::Cpu;
        let q = Tensor::ones((1, 2, 3), DType::F32, &device)?;
        let k = Tensor::ones((1, 4, 3), DType::F32, &device)?;
        let v = Tensor::from_vec(vec![1f32, 2., 3., 4.], (1, 4, 1), &device)?;
        let out = naive_attention(&q, &k, &v, true)?;
        assert_eq!(out.dims(), &[1, 2, 1]);
        for value in out.flatten_all()?.to_vec1::<f32>()? {
            assert!((value - 2.5).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn rejects_mismatched_batches() -> Result<()> {
        let device = Device::Cpu;
        let q = Tensor::zeros((1, 2, 3), DType::F32, &device)?;
        let k = Tensor::zeros((2, 2, 3), DType::F32, &device)?;
        let v = Tensor::zeros((1, 2, 3), DType::F32, &device)?;
        assert!(naive_attention(&q, &k, &v, false).is_err());
        Ok(())
    }
}
