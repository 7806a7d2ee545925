//! Positional value generation.
//!
//! [`PositionalValues::generate`] returns an `f32` tensor shaped
//! `(1, seq_len, embed_d)`; the leading axis lets it broadcast over a batch.
//! The sinusoidal variant follows Vaswani et al.:
//!
//! ```text
//! angle(p, i) = p / base^(2 * (i / 2) / embed_d)
//! PE(p, 2k)   = sin(angle(p, 2k))
//! PE(p, 2k+1) = cos(angle(p, 2k+1))
//! ```
//!
//! Tables are cached per `(seq_len, embed_d, base, device)` in a bounded,
//! thread-safe LRU so repeated calls with the same geometry reuse storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use candle_core::{Device, DeviceLocation, Tensor};
use serde::{Deserialize, Serialize};

use crate::errors::PositionalError;

const ENCODING_CACHE_CAPACITY: usize = 16;

static ENCODING_CACHE_HITS: AtomicUsize = AtomicUsize::new(0);
static ENCODING_CACHE_MISSES: AtomicUsize = AtomicUsize::new(0);

/// Return the current `(hits, misses)` counters for the shared encoding cache.
pub fn encoding_cache_counters() -> (usize, usize) {
    (
        ENCODING_CACHE_HITS.load(Ordering::Relaxed),
        ENCODING_CACHE_MISSES.load(Ordering::Relaxed),
    )
}

/// Reset the shared encoding cache counters.
pub fn reset_encoding_cache_stats() {
    ENCODING_CACHE_HITS.store(0, Ordering::Relaxed);
    ENCODING_CACHE_MISSES.store(0, Ordering::Relaxed);
}

/// Number of tables currently held by the shared cache.
pub fn encoding_cache_len() -> usize {
    lock_cache().entries.len()
}

struct EncodingCache {
    capacity: usize,
    order: Vec<String>,
    entries: HashMap<String, Tensor>,
}

impl EncodingCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: Vec::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    fn get(&mut self, key: &str) -> Option<Tensor> {
        let table = self.entries.get(key)?.clone();
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let recent = self.order.remove(pos);
            self.order.push(recent);
        }
        Some(table)
    }

    fn insert(&mut self, key: String, table: Tensor) {
        if self.entries.insert(key.clone(), table).is_some() {
            return;
        }
        if self.entries.len() > self.capacity && !self.order.is_empty() {
            let oldest = self.order.remove(0);
            self.entries.remove(&oldest);
        }
        self.order.push(key);
    }
}

fn lock_cache() -> MutexGuard<'static, EncodingCache> {
    static CACHE: OnceLock<Mutex<EncodingCache>> = OnceLock::new();
    CACHE
        .get_or_init(|| Mutex::new(EncodingCache::new(ENCODING_CACHE_CAPACITY)))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn cache_key(seq_len: usize, embed_d: usize, base: f64, device: &Device) -> String {
    let device_id = match device.location() {
        DeviceLocation::Cpu => "cpu".to_owned(),
        DeviceLocation::Cuda { gpu_id } => format!("cuda{gpu_id}"),
        DeviceLocation::Metal { gpu_id } => format!("metal{gpu_id}"),
    };
    format!(
        "seq={seq_len};d={embed_d};base={:016x};dev={device_id}",
        base.to_bits()
    )
}

/// Parameters of the sinusoidal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SinusoidalConfig {
    /// Wavelength base (10k in the original transformer).
    #[serde(default = "default_base")]
    pub base: f64,
}

fn default_base() -> f64 {
    10_000.0
}

impl Default for SinusoidalConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
        }
    }
}

impl SinusoidalConfig {
    pub fn validate(&self) -> Result<(), PositionalError> {
        if !self.base.is_finite() || self.base <= 0.0 {
            return Err(PositionalError::InvalidConfig(format!(
                "sinusoidal base must be positive and finite, got {}",
                self.base
            )));
        }
        Ok(())
    }
}

/// Closed set of positional value generators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionalValues {
    /// Absolute sinusoidal encodings.
    Sinusoidal(SinusoidalConfig),
}

impl Default for PositionalValues {
    fn default() -> Self {
        PositionalValues::Sinusoidal(SinusoidalConfig::default())
    }
}

impl PositionalValues {
    pub fn sinusoidal() -> Self {
        Self::default()
    }

    /// Positional values shaped `(1, seq_len, embed_d)`.
    pub fn generate(
        &self,
        seq_len: usize,
        embed_d: usize,
        device: &Device,
    ) -> Result<Tensor, PositionalError> {
        match self {
            PositionalValues::Sinusoidal(config) => {
                sinusoidal_encoding(seq_len, embed_d, config, device)
            }
        }
    }
}

/// Retrieve (or build and cache) the sinusoidal table for the given geometry.
pub fn sinusoidal_encoding(
    seq_len: usize,
    embed_d: usize,
    config: &SinusoidalConfig,
    device: &Device,
) -> Result<Tensor, PositionalError> {
    config.validate()?;
    if seq_len == 0 || embed_d == 0 {
        return Err(PositionalError::InvalidShape {
            context: format!(
                "sinusoidal encoding needs non-zero seq_len and embed_d, got ({seq_len}, {embed_d})"
            ),
        });
    }

    let key = cache_key(seq_len, embed_d, config.base, device);
    if let Some(table) = lock_cache().get(&key) {
        ENCODING_CACHE_HITS.fetch_add(1, Ordering::Relaxed);
        log::debug!("positional encoding cache hit: {key}");
        return Ok(table);
    }
    ENCODING_CACHE_MISSES.fetch_add(1, Ordering::Relaxed);
    log::debug!("positional encoding cache miss: {key}");

    let data = sinusoidal_table(seq_len, embed_d, config.base);
    let table = Tensor::from_vec(data, (1, seq_len, embed_d), device)?;
    lock_cache().insert(key, table.clone());
    Ok(table)
}

fn sinusoidal_table(seq_len: usize, embed_d: usize, base: f64) -> Vec<f32> {
    let rates: Vec<f64> = (0..embed_d)
        .map(|i| {
            let exponent = (2 * (i / 2)) as f64 / embed_d as f64;
            base.powf(-exponent)
        })
        .collect();

    let mut data = Vec::with_capacity(seq_len * embed_d);
    for pos in 0..seq_len {
        let pos = pos as f64;
        for (i, rate) in rates.iter().enumerate() {
            let angle = pos * rate;
            let value = if i % 2 == 0 { angle.sin() } else { angle.cos() };
            data.push(value as f32);
        }
    }
    data
}
