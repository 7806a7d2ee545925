//! Building blocks shared by the attention and positional crates.
//!
//! The crate hosts the small pieces every stage leans on: labelled shape and
//! dtype checks, signed axis resolution, kernel initialisers mirroring the
//! usual Glorot/Kaiming recipes, and a dense projection whose parameters are
//! declared through a [`candle_nn::VarBuilder`] so they stay trainable.

pub mod axis;
pub mod checks;
pub mod dense;
pub mod init;

use thiserror::Error;

pub use axis::Axis;
pub use dense::{Dense, DenseConfig};
pub use init::KernelInit;

/// Errors raised while interpreting layer configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayerError {
    /// The initializer name is not one of the recognised aliases.
    #[error("unknown kernel initializer `{0}`")]
    UnknownInitializer(String),
}
