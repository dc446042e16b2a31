//! Syndrome outcomes for one stabilizer type.
//!
//! A round of star (or plaquette) measurements reports one bit per cell, in
//! row-major cell order. A set bit marks a defect: an odd number of Z (or X)
//! errors touch that cell.

use crate::cell::CellKind;
use crate::error::{DecoderError, Result};
use crate::lattice::ToricLattice;

/// Measured outcomes of every cell of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syndrome {
    kind: CellKind,
    outcomes: Vec<bool>,
}

impl Syndrome {
    /// Wrap an outcome vector; its length must equal the lattice's cell count.
    pub fn from_outcomes(kind: CellKind, outcomes: Vec<bool>, lattice: &ToricLattice) -> Result<Self> {
        if outcomes.len() != lattice.num_cells() {
            return Err(DecoderError::SyndromeLength {
                expected: lattice.num_cells(),
                got: outcomes.len(),
            });
        }
        Ok(Self { kind, outcomes })
    }

    /// Parse a backend measurement string such as `"000010001"`.
    ///
    /// Backends print classical registers most-significant bit first, so the
    /// last character is the outcome of cell 0.
    pub fn from_bitstring(kind: CellKind, bits: &str, lattice: &ToricLattice) -> Result<Self> {
        let outcomes = bits
            .chars()
            .rev()
            .map(|ch| match ch {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(DecoderError::InvalidOutcome(other)),
            })
            .collect::<Result<Vec<bool>>>()?;
        Self::from_outcomes(kind, outcomes, lattice)
    }

    /// Syndrome with the given cells marked and every other cell clear.
    pub fn from_marked(kind: CellKind, marked: &[usize], lattice: &ToricLattice) -> Result<Self> {
        let mut outcomes = vec![false; lattice.num_cells()];
        for &flat in marked {
            lattice.cell(kind, flat)?;
            outcomes[flat] = true;
        }
        Ok(Self { kind, outcomes })
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn outcomes(&self) -> &[bool] {
        &self.outcomes
    }

    /// Flat indices of the marked cells, ascending.
    pub fn marked(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, &set)| set.then_some(i))
            .collect()
    }

    /// Number of defects. Always even for outcomes produced by Pauli errors on
    /// a torus.
    pub fn num_defects(&self) -> usize {
        self.outcomes.iter().filter(|&&s| s).count()
    }

    pub fn is_clean(&self) -> bool {
        !self.outcomes.iter().any(|&s| s)
    }
}
