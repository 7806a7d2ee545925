//! Kernel initialisation policies for learned projections.
//!
//! The policies follow the common transformer recipes (Glorot, Kaiming,
//! scaled variants) and translate into [`candle_nn::Init`] hints once the
//! parameter fans are known, so parameters can be declared through a
//! `VarBuilder` and stay visible to an optimiser.

use std::str::FromStr;

use candle_nn::Init;
use serde::{Deserialize, Deserializer, Serialize};

use crate::LayerError;

/// Supported weight initialisation policies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelInit {
    /// Xavier/Glorot uniform initialisation.
    #[default]
    XavierUniform,
    /// Xavier/Glorot normal initialisation.
    XavierNormal,
    /// Kaiming/He uniform initialisation.
    KaimingUniform { negative_slope: f64 },
    /// Kaiming/He normal initialisation.
    KaimingNormal { negative_slope: f64 },
    /// All zeros.
    Zeros,
    /// Scales another policy.
    Scaled { base: Box<KernelInit>, scale: f64 },
}

impl KernelInit {
    /// Convenience helper to scale an existing policy.
    pub fn scaled(base: KernelInit, scale: f64) -> Self {
        Self::Scaled {
            base: Box::new(base),
            scale,
        }
    }

    /// Resolves the policy into a sampling hint for a parameter with the given fans.
    ///
    /// Dense kernels shaped `(out, in)` use `fan_in = in`, `fan_out = out`;
    /// a rank-1 parameter of length `n` uses `fan_in = fan_out = n`.
    pub fn to_init(&self, fan_in: usize, fan_out: usize) -> Init {
        let (fan_in, fan_out) = (fan_in.max(1) as f64, fan_out.max(1) as f64);
        match self {
            KernelInit::XavierUniform => {
                let bound = (6.0f64 / (fan_in + fan_out)).sqrt();
                Init::Uniform {
                    lo: -bound,
                    up: bound,
                }
            }
            KernelInit::XavierNormal => Init::Randn {
                mean: 0.0,
                stdev: (2.0f64 / (fan_in + fan_out)).sqrt(),
            },
            KernelInit::KaimingUniform { negative_slope } => {
                let gain = kaiming_gain(*negative_slope);
                let bound = 3.0f64.sqrt() * gain / fan_in.sqrt();
                Init::Uniform {
                    lo: -bound,
                    up: bound,
                }
            }
            KernelInit::KaimingNormal { negative_slope } => Init::Randn {
                mean: 0.0,
                stdev: kaiming_gain(*negative_slope) / fan_in.sqrt(),
            },
            KernelInit::Zeros => Init::Const(0.0),
            KernelInit::Scaled { base, scale } => {
                scale_init(base.to_init(fan_in as usize, fan_out as usize), *scale)
            }
        }
    }
}

fn kaiming_gain(negative_slope: f64) -> f64 {
    (2.0f64 / (1.0 + negative_slope.powi(2))).sqrt()
}

fn scale_init(init: Init, scale: f64) -> Init {
    match init {
        Init::Const(value) => Init::Const(value * scale),
        Init::Randn { mean, stdev } => Init::Randn {
            mean: mean * scale,
            stdev: stdev * scale.abs(),
        },
        Init::Uniform { lo, up } => {
            let (a, b) = (lo * scale, up * scale);
            Init::Uniform {
                lo: a.min(b),
                up: a.max(b),
            }
        }
        other => other,
    }
}

impl FromStr for KernelInit {
    type Err = LayerError;

    /// Accepts the Keras-style names (`glorot_uniform`, `he_normal`, ...) and
    /// their Xavier/Kaiming spellings.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "glorot_uniform" | "xavier_uniform" => Ok(Self::XavierUniform),
            "glorot_normal" | "xavier_normal" => Ok(Self::XavierNormal),
            "he_uniform" | "kaiming_uniform" => Ok(Self::KaimingUniform {
                negative_slope: 0.0,
            }),
            "he_normal" | "kaiming_normal" => Ok(Self::KaimingNormal {
                negative_slope: 0.0,
            }),
            "zeros" => Ok(Self::Zeros),
            _ => Err(LayerError::UnknownInitializer(name.to_string())),
        }
    }
}

/// Field deserializer accepting either a Keras-style name (`"glorot_uniform"`,
/// `"he_normal"`, ...) or the structured form, e.g.
/// `{"kaiming_uniform": {"negative_slope": 0.1}}`.
pub fn deserialize_kernel_init<'de, D>(deserializer: D) -> Result<KernelInit, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Name(String),
        Policy(KernelInit),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
        Repr::Policy(init) => Ok(init),
    }
}
