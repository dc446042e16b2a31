//! Logical operators of the two encoded qubits.
//!
//! Logical operators are non-contractible strings around the torus. They
//! commute with every star and plaquette but cannot be written as a product
//! of them:
//!
//! | qubit  | X̄ support                  | Z̄ support                  |
//! |--------|-----------------------------|-----------------------------|
//! | First  | h(r, 0) for every row r     | h(0, c) for every column c  |
//! | Second | v(0, c) for every column c  | v(r, 0) for every row r     |
//!
//! X̄ and Z̄ of the same qubit overlap on exactly one edge, so they
//! anticommute; operators of different qubits share no edge.

use crate::lattice::{EdgeDir, ToricLattice};

/// One of the two logical qubits stored on the torus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalQubit {
    First,
    Second,
}

impl LogicalQubit {
    pub const ALL: [LogicalQubit; 2] = [LogicalQubit::First, LogicalQubit::Second];
}

impl ToricLattice {
    /// Edges carrying the logical X of `qubit`.
    pub fn logical_x(&self, qubit: LogicalQubit) -> Vec<usize> {
        match qubit {
            LogicalQubit::First => self.column_string(0, EdgeDir::Horizontal),
            LogicalQubit::Second => self.row_string(0, EdgeDir::Vertical),
        }
    }

    /// Edges carrying the logical Z of `qubit`; measuring its parity reads the
    /// qubit out.
    pub fn logical_z(&self, qubit: LogicalQubit) -> Vec<usize> {
        match qubit {
            LogicalQubit::First => self.row_string(0, EdgeDir::Horizontal),
            LogicalQubit::Second => self.column_string(0, EdgeDir::Vertical),
        }
    }

    fn row_string(&self, row: isize, dir: EdgeDir) -> Vec<usize> {
        (0..self.cols() as isize)
            .map(|c| self.flat_index(row, c, dir))
            .collect()
    }

    fn column_string(&self, col: isize, dir: EdgeDir) -> Vec<usize> {
        (0..self.rows() as isize)
            .map(|r| self.flat_index(r, col, dir))
            .collect()
    }
}
