//! Decoder configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DecoderError, Result};

/// Torus dimensions for a [`crate::decoder::Decoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Number of cell rows R.
    pub rows: usize,
    /// Number of cell columns C. The torus carries 2·R·C qubits.
    pub cols: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { rows: 3, cols: 3 }
    }
}

impl DecoderConfig {
    pub fn square(n: usize) -> Self {
        Self { rows: n, cols: n }
    }

    pub fn num_qubits(&self) -> usize {
        2 * self.rows * self.cols
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(DecoderError::InvalidConfig(format!(
                "rows and cols must be positive, got {}x{}",
                self.rows, self.cols
            )));
        }
        Ok(())
    }
}
