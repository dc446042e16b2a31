//! # toric-code-decoder
//!
//! Lattice geometry and minimum-weight perfect matching decoder for Kitaev's
//! toric code on an R×C torus.
//!
//! Qubits live on the 2RC edges. Each round measures the stars and the
//! plaquettes; marked cells (defects) are paired by a minimum-weight perfect
//! matching under the toroidal Manhattan distance, and each pair is joined by
//! a shortest chain of Z (stars) or X (plaquettes) corrections.
//!
//! ## Pipeline
//!
//! - [`lattice::ToricLattice`]: edge indexing, cell incidence, handle population
//! - [`defect_graph::DefectGraph`]: complete weighted graph over the defects
//! - [`matching::min_weight_perfect_matching`]: blossom-based matching
//! - [`path`]: walk between matched cells, one edge per step
//! - [`decoder::Decoder`]: the whole round, against any [`decoder::CorrectionSink`]
//! - [`frame::PauliFrame`]: in-memory error frame for simulation and testing

pub mod cell;
pub mod config;
pub mod decoder;
pub mod defect_graph;
pub mod error;
pub mod frame;
pub mod lattice;
pub mod logical;
pub mod matching;
pub mod path;
pub mod syndrome;

pub mod prelude {
    pub use crate::cell::*;
    pub use crate::config::*;
    pub use crate::decoder::*;
    pub use crate::defect_graph::*;
    pub use crate::error::*;
    pub use crate::frame::*;
    pub use crate::lattice::*;
    pub use crate::logical::*;
    pub use crate::matching::*;
    pub use crate::path::*;
    pub use crate::syndrome::*;
}
