//! Error type shared by every decoder stage.

use thiserror::Error;

use crate::cell::CellKind;

/// Misuse of the decoder. Every variant is a precondition violation: the
/// pipeline is deterministic, so none of these are worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    #[error("lattice dimensions must be positive, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("cell ({row}, {col}) lies outside the {rows}x{cols} lattice")]
    CellOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("edge index {index} out of range for {num_edges} edges")]
    EdgeOutOfRange { index: usize, num_edges: usize },

    #[error("unknown edge orientation tag {0:?} (expected 'h' or 'v')")]
    UnknownOrientation(char),

    #[error("expected {expected} edge handles, got {got}")]
    HandleCountMismatch { expected: usize, got: usize },

    #[error("defect {0} listed more than once")]
    DuplicateDefect(usize),

    #[error("perfect matching needs an even number of defects, got {0}")]
    OddDefectCount(usize),

    #[error("matching edge ({u}, {v}) must join two distinct vertices below {n}, at most once")]
    InvalidMatchingEdge { u: usize, v: usize, n: usize },

    #[error("defect {0} left unmatched")]
    Unmatched(usize),

    #[error("cannot connect a {0:?} to a {1:?}")]
    KindMismatch(CellKind, CellKind),

    #[error("syndrome has {got} outcomes, lattice has {expected} cells")]
    SyndromeLength { expected: usize, got: usize },

    #[error("measurement outcome {0:?} is not '0' or '1'")]
    InvalidOutcome(char),

    #[error("invalid decoder config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DecoderError>;
