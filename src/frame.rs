//! In-memory Pauli frame: the error state of every qubit on the torus.
//!
//! **Star** stabilizers are X-type and flip under Z errors on their four edges.
//! **Plaquette** stabilizers are Z-type and flip under X errors. A Y error
//! is an X and a Z on the same edge.
//!
//! After a correction clears both syndromes, the residual frame is a set of
//! closed loops. A loop is a logical error exactly when it winds around the
//! torus, which is detected by its parity along the conjugate logical
//! operator.

use log::{trace, warn};

use crate::cell::{CellKind, Pauli};
use crate::decoder::{Correction, CorrectionSink};
use crate::error::{DecoderError, Result};
use crate::lattice::ToricLattice;
use crate::logical::LogicalQubit;

/// Logical damage found on one encoded qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalFlip {
    pub qubit: LogicalQubit,
    /// Residual X loop acts as the logical X.
    pub x: bool,
    /// Residual Z loop acts as the logical Z.
    pub z: bool,
}

impl LogicalFlip {
    pub fn any(&self) -> bool {
        self.x || self.z
    }
}

/// X and Z error frames over the `2·R·C` edges of a lattice.
#[derive(Debug, Clone)]
pub struct PauliFrame<'a> {
    lattice: &'a ToricLattice,
    x_errors: Vec<bool>,
    z_errors: Vec<bool>,
}

impl<'a> PauliFrame<'a> {
    /// Error-free frame.
    pub fn new(lattice: &'a ToricLattice) -> Self {
        let n = lattice.num_edges();
        Self {
            lattice,
            x_errors: vec![false; n],
            z_errors: vec![false; n],
        }
    }

    pub fn lattice(&self) -> &'a ToricLattice {
        self.lattice
    }

    fn check_edge(&self, edge: usize) -> Result<()> {
        if edge >= self.x_errors.len() {
            return Err(DecoderError::EdgeOutOfRange {
                index: edge,
                num_edges: self.x_errors.len(),
            });
        }
        Ok(())
    }

    /// Toggle an X error on `edge`.
    pub fn apply_x(&mut self, edge: usize) -> Result<()> {
        self.check_edge(edge)?;
        self.x_errors[edge] ^= true;
        Ok(())
    }

    /// Toggle a Z error on `edge`.
    pub fn apply_z(&mut self, edge: usize) -> Result<()> {
        self.check_edge(edge)?;
        self.z_errors[edge] ^= true;
        Ok(())
    }

    /// Toggle a Y error (X and Z) on `edge`.
    pub fn apply_y(&mut self, edge: usize) -> Result<()> {
        self.check_edge(edge)?;
        self.x_errors[edge] ^= true;
        self.z_errors[edge] ^= true;
        Ok(())
    }

    pub fn apply(&mut self, pauli: Pauli, edge: usize) -> Result<()> {
        match pauli {
            Pauli::X => self.apply_x(edge),
            Pauli::Z => self.apply_z(edge),
        }
    }

    pub fn clear(&mut self) {
        self.x_errors.iter_mut().for_each(|e| *e = false);
        self.z_errors.iter_mut().for_each(|e| *e = false);
    }

    pub fn x_errors(&self) -> &[bool] {
        &self.x_errors
    }

    pub fn z_errors(&self) -> &[bool] {
        &self.z_errors
    }

    /// Number of edges carrying any error.
    pub fn weight(&self) -> usize {
        self.x_errors
            .iter()
            .zip(&self.z_errors)
            .filter(|(&x, &z)| x || z)
            .count()
    }

    pub fn is_identity(&self) -> bool {
        self.weight() == 0
    }

    /// Frame a stabilizer of `kind` is sensitive to.
    fn frame_for(&self, kind: CellKind) -> &[bool] {
        match kind.correction_pauli() {
            Pauli::X => &self.x_errors,
            Pauli::Z => &self.z_errors,
        }
    }

    fn parity(frame: &[bool], support: &[usize]) -> bool {
        support.iter().filter(|&&e| frame[e]).count() % 2 == 1
    }

    /// Stabilizer outcomes of every cell of `kind`, row-major.
    pub fn syndrome_outcomes(&self, kind: CellKind) -> Vec<bool> {
        let frame = self.frame_for(kind);
        self.lattice
            .cells_lin(kind)
            .iter()
            .map(|&cell| Self::parity(frame, &self.lattice.cell_edges_unchecked(cell)))
            .collect()
    }

    /// Residual X loop anticommutes with Z̄ of `qubit`.
    pub fn has_logical_x_error(&self, qubit: LogicalQubit) -> bool {
        Self::parity(&self.x_errors, &self.lattice.logical_z(qubit))
    }

    /// Residual Z loop anticommutes with X̄ of `qubit`.
    pub fn has_logical_z_error(&self, qubit: LogicalQubit) -> bool {
        Self::parity(&self.z_errors, &self.lattice.logical_x(qubit))
    }

    /// Logical damage on both encoded qubits. Only meaningful once both
    /// syndromes are clean.
    pub fn logical_flips(&self) -> [LogicalFlip; 2] {
        LogicalQubit::ALL.map(|qubit| LogicalFlip {
            qubit,
            x: self.has_logical_x_error(qubit),
            z: self.has_logical_z_error(qubit),
        })
    }

    pub fn has_any_logical_error(&self) -> bool {
        self.logical_flips().iter().any(LogicalFlip::any)
    }
}

impl CorrectionSink for PauliFrame<'_> {
    fn measure(&mut self, kind: CellKind) -> Vec<bool> {
        self.syndrome_outcomes(kind)
    }

    /// Edges outside this frame, from a correction decoded on a larger
    /// lattice, are skipped and logged.
    fn apply_correction(&mut self, correction: &Correction) {
        let pauli = correction.pauli();
        let frame = match pauli {
            Pauli::X => &mut self.x_errors,
            Pauli::Z => &mut self.z_errors,
        };
        let num_edges = frame.len();
        let mut skipped = 0;
        for edge in correction.edges() {
            match frame.get_mut(edge) {
                Some(bit) => *bit ^= true,
                None => {
                    warn!("{:?} correction edge {} outside {} edges", pauli, edge, num_edges);
                    skipped += 1;
                }
            }
        }
        trace!(
            "applied {} {:?} gates, skipped {}",
            correction.weight() - skipped,
            pauli,
            skipped
        );
    }
}
