//! Signed axis indices resolved against a tensor rank.

use std::fmt;

use candle_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Axis index that may count from the back (`-1` is the last axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Axis(pub isize);

impl Axis {
    /// The trailing axis.
    pub const LAST: Axis = Axis(-1);

    /// Resolves the axis to a concrete dimension index for a tensor of `rank`.
    pub fn resolve(self, rank: usize) -> Result<usize> {
        let rank_i = rank as isize;
        let resolved = if self.0 < 0 { rank_i + self.0 } else { self.0 };
        if (0..rank_i).contains(&resolved) {
            Ok(resolved as usize)
        } else {
            Err(Error::Msg(format!(
                "axis {} is out of range for a tensor of rank {rank}",
                self.0
            )))
        }
    }

    /// Whether the axis addresses the trailing dimension for `rank`.
    pub fn is_last(self, rank: usize) -> bool {
        matches!(self.resolve(rank), Ok(dim) if dim + 1 == rank)
    }
}

impl Default for Axis {
    fn default() -> Self {
        Self::LAST
    }
}

impl From<isize> for Axis {
    fn from(value: isize) -> Self {
        Self(value)
    }
}

impl From<i32> for Axis {
    fn from(value: i32) -> Self {
        Self(value as isize)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
