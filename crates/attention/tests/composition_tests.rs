use anyhow::Result;
use attention::{
    AdditiveConfig, Attention, AttentionConfig, AttentionError, ScoringFunction, SelectAndApply,
    SelectionApply, SelectionFunction,
};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{ops::softmax, VarBuilder, VarMap};
use static_assertions::assert_impl_all;

assert_impl_all!(Attention: Send, Sync);
assert_impl_all!(ScoringFunction: Send, Sync);
assert_impl_all!(SelectAndApply: Send, Sync);
assert_impl_all!(AttentionError: Send, Sync);

fn qkv(device: &Device) -> Result<(Tensor, Tensor, Tensor)> {
    let data: Vec<f32> = (0..24).map(|i| ((i as f32) * 0.37).sin()).collect();
    let q = Tensor::from_vec(data.clone(), (2, 3, 4), device)?;
    let k = Tensor::from_vec(data.iter().rev().copied().collect::<Vec<_>>(), (2, 3, 4), device)?;
    let v = Tensor::from_vec(data.iter().map(|x| x * 2.0).collect::<Vec<_>>(), (2, 3, 4), device)?;
    Ok((q, k, v))
}

#[test]
fn batch_two_length_three_dim_four_example() -> Result<()> {
    let device = Device::Cpu;
    let (q, k, v) = qkv(&device)?;
    let attention = Attention::scaled_dot_softmax_matmul(-1);

    let (output, weights) = attention.attend_with_weights(&q, &k, &v)?;
    assert_eq!(output.dims(), &[2, 3, 4]);
    assert_eq!(weights.dims(), &[2, 3, 3]);
    for sum in weights.sum(D::Minus1)?.flatten_all()?.to_vec1::<f32>()? {
        assert!((sum - 1.0).abs() < 1e-5);
    }

    let manual_scores = (q.matmul(&k.t()?)? / 2.0)?;
    let manual = softmax(&manual_scores, D::Minus1)?.matmul(&v)?;
    let diff = output.sub(&manual)?.abs()?.max_all()?.to_vec0::<f32>()?;
    assert!(diff < 1e-5);
    Ok(())
}

#[test]
fn hand_assembled_pipeline_equals_preset() -> Result<()> {
    let device = Device::Cpu;
    let (q, k, v) = qkv(&device)?;
    let stage = SelectAndApply::builder()
        .selection(SelectionFunction::softmax(-1))
        .apply(SelectionApply::MatMul)
        .build()?;
    let assembled = Attention::builder()
        .compatibility(ScoringFunction::ScaledDotProduct)
        .select_and_apply(stage)
        .build()?;

    let lhs = assembled.attend(&q, &k, &v)?;
    let rhs = Attention::scaled_dot_softmax_matmul(-1).attend(&q, &k, &v)?;
    assert_eq!(lhs.flatten_all()?.to_vec1::<f32>()?, rhs.flatten_all()?.to_vec1::<f32>()?);
    Ok(())
}

#[test]
fn incomplete_pipelines_are_configuration_errors() {
    let err = Attention::builder().build().unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, AttentionError::MissingComponent { .. }));

    let err = SelectAndApply::builder().build().unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn softmax_over_query_axis_normalises_columns() -> Result<()> {
    let device = Device::Cpu;
    let (q, k, v) = qkv(&device)?;
    let attention = Attention::scaled_dot_softmax_matmul(-2);
    let (_, weights) = attention.attend_with_weights(&q, &k, &v)?;
    for sum in weights.sum(1)?.flatten_all()?.to_vec1::<f32>()? {
        assert!((sum - 1.0).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn per_head_tensors_broadcast_through_the_pipeline() -> Result<()> {
    let device = Device::Cpu;
    let q = Tensor::randn(0f32, 1.0, (2, 4, 5, 8), &device)?;
    let k = Tensor::randn(0f32, 1.0, (2, 4, 7, 8), &device)?;
    let v = Tensor::randn(0f32, 1.0, (2, 4, 7, 3), &device)?;
    let output = Attention::scaled_dot_softmax_matmul(-1).attend(&q, &k, &v)?;
    assert_eq!(output.dims(), &[2, 4, 5, 3]);
    Ok(())
}

#[test]
fn additive_pipeline_from_json_registers_trainable_parameters() -> Result<()> {
    let device = Device::Cpu;
    let config = AttentionConfig::from_json(
        r#"{
            "scoring": {"kind": "additive", "units": 10, "target_dim": 4, "source_dim": 4,
                        "kernel_init": "xavier_normal"},
            "selection": {"kind": "softmax"}
        }"#,
    )?;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let attention = Attention::from_config(&config, Some(vb))?;
    assert_eq!(attention.describe(), "additive -> softmax(axis=-1) -> matmul");
    assert_eq!(varmap.all_vars().len(), 3);

    let (q, k, v) = qkv(&device)?;
    let output = attention.attend(&q, &k, &v)?;
    assert_eq!(output.dims(), &[2, 3, 4]);
    Ok(())
}

#[test]
fn additive_scorer_requires_units() {
    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let mut config = AdditiveConfig::new(4, 4, 4);
    config.units = None;
    let err = ScoringFunction::additive(config, vb).unwrap_err();
    assert!(matches!(err, AttentionError::Construction(_)));
}

#[test]
fn mismatched_value_length_is_a_shape_error() -> Result<()> {
    let device = Device::Cpu;
    let (q, k, _) = qkv(&device)?;
    let v = Tensor::zeros((2, 5, 4), DType::F32, &device)?;
    let err = Attention::dot_softmax_matmul(-1).attend(&q, &k, &v).unwrap_err();
    assert!(matches!(err, AttentionError::InvalidShape { .. }));
    Ok(())
}
