//! Correctness harness comparing the tensor pipelines with the scalar reference.
//! Run with: `cargo bench -p attention --bench correctness`

#[path = "common/mod.rs"]
mod util;

use std::error::Error;

use attention::reference::naive_attention;
use attention::Attention;
use candle_core::{DType, Device, Tensor};
use util::{format_markdown_table, update_results};

const ABS_TOL: f32 = 1e-4;

fn main() {
    if let Err(err) = run() {
        eprintln!("correctness harness failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let device = Device::Cpu;
    let seq_lens = [8usize, 64, 256];
    let dims = [16usize, 64];

    let mut rows = Vec::new();
    for &seq_len in &seq_lens {
        for &dim in &dims {
            let (q, k, v) = build_inputs(&device, 2, seq_len, dim)?;
            for (label, attention, scaled) in [
                ("dot", Attention::dot_softmax_matmul(-1), false),
                ("scaled_dot", Attention::scaled_dot_softmax_matmul(-1), true),
            ] {
                let out = attention.attend(&q, &k, &v)?;
                let expected = naive_attention(&q, &k, &v, scaled)?;
                let max_abs = out
                    .to_dtype(DType::F32)?
                    .sub(&expected)?
                    .abs()?
                    .max_all()?
                    .to_vec0::<f32>()?;
                if max_abs > ABS_TOL {
                    return Err(format!(
                        "tolerance breach for {label} seq_len={seq_len} dim={dim}: abs={max_abs:.3e}"
                    )
                    .into());
                }
                rows.push(vec![
                    label.to_string(),
                    format!("(2,{seq_len},{dim})"),
                    format!("{max_abs:.2e}"),
                ]);
            }
        }
    }

    let table = format_markdown_table(&["scoring", "shape", "max abs"], &rows);
    println!("\nCorrectness summary:\n{table}");
    update_results("Correctness", &table)?;
    Ok(())
}

fn build_inputs(
    device: &Device,
    batch: usize,
    seq_len: usize,
    dim: usize,
) -> Result<(Tensor, Tensor, Tensor), Box<dyn Error>> {
    let shape = (batch, seq_len, dim);
    let q = Tensor::rand(0.0f32, 1.0, shape, device)?;
    let k = Tensor::rand(0.0f32, 1.0, shape, device)?;
    let v = Tensor::rand(0.0f32, 1.0, shape, device)?;
    Ok((q, k, v))
}
