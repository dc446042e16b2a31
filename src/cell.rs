//! Plaquettes, stars and the toroidal distance between them.
//!
//! The toric code has two interlaced cell complexes on the same R×C grid of
//! edges:
//! - **plaquettes** (faces) carry the Z-type stabilizers; X errors on their
//!   boundary flip them,
//! - **stars** (vertices) carry the X-type stabilizers; Z errors on their
//!   incident edges flip them.
//!
//! Both are addressed by `(row, col)` with `0 ≤ row < R`, `0 ≤ col < C`, and a
//! flat row-major index `row * C + col` that matches the order in which
//! syndrome outcomes are reported.

use serde::{Deserialize, Serialize};

/// Which of the two dual cell complexes a cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Plaquette,
    Star,
}

/// Single-qubit Pauli applied along a correction chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    X,
    Z,
}

impl CellKind {
    /// Pauli that moves (and annihilates) defects of this kind.
    ///
    /// Star defects come from Z errors and are undone with Z chains; plaquette
    /// defects come from X errors and are undone with X chains.
    pub fn correction_pauli(self) -> Pauli {
        match self {
            CellKind::Star => Pauli::Z,
            CellKind::Plaquette => Pauli::X,
        }
    }
}

/// Position of an edge inside a cell's incident-edge tuple.
///
/// Every cell lists its four edges as `[top, left, bottom, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top = 0,
    Left = 1,
    Bottom = 2,
    Right = 3,
}

/// A plaquette or star on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(kind: CellKind, row: usize, col: usize) -> Self {
        Self { kind, row, col }
    }

    pub fn plaquette(row: usize, col: usize) -> Self {
        Self::new(CellKind::Plaquette, row, col)
    }

    pub fn star(row: usize, col: usize) -> Self {
        Self::new(CellKind::Star, row, col)
    }

    /// Row-major index of this cell, i.e. its position in `plaquettes_lin` /
    /// `stars_lin` and in the syndrome outcome vector.
    pub fn flat(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }

    /// Toroidal Manhattan distance to `other` on a `rows`×`cols` torus.
    ///
    /// The cell kind is not compared; distances between a star and a
    /// plaquette are meaningless but well-defined.
    pub fn dist(&self, other: &Cell, rows: usize, cols: usize) -> usize {
        toroidal_distance((self.row, self.col), (other.row, other.col), rows, cols)
    }

    /// The neighbouring cell one step along the row (`dr`) or column (`dc`)
    /// axis, wrapping around the torus.
    pub(crate) fn shifted(&self, dr: isize, dc: isize, rows: usize, cols: usize) -> Cell {
        Cell {
            kind: self.kind,
            row: wrap(self.row as isize + dr, rows),
            col: wrap(self.col as isize + dc, cols),
        }
    }
}

/// Floor modulo: the result is always in `[0, period)`, also for negative
/// `value`.
pub(crate) fn wrap(value: isize, period: usize) -> usize {
    value.rem_euclid(period as isize) as usize
}

/// Shortest signed offset along one periodic axis.
///
/// A raw offset beyond half the period is folded back through the seam. When
/// the period is even and the offset is exactly half of it, both ways round are
/// equally long and the offset is left as is.
fn fold(delta: isize, period: usize) -> isize {
    let period = period as isize;
    if 2 * delta > period {
        delta - period
    } else if 2 * delta < -period {
        delta + period
    } else {
        delta
    }
}

/// Toroidal Manhattan distance between grid positions `a` and `b`.
///
/// Rows wrap with period `rows`, columns with period `cols`. Symmetric, zero on
/// the diagonal, and never larger than `rows / 2 + cols / 2`.
pub fn toroidal_distance(a: (usize, usize), b: (usize, usize), rows: usize, cols: usize) -> usize {
    let vert = fold(a.0 as isize - b.0 as isize, rows);
    let hor = fold(a.1 as isize - b.1 as isize, cols);
    vert.unsigned_abs() + hor.unsigned_abs()
}
