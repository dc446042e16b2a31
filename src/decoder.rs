//! Full decoding pipeline: syndrome → defect graph → matching → chains.
//!
//! A [`Decoder`] owns the lattice and is immutable once built, so one decoder
//! can serve many rounds (and many threads) at once. Every round builds its
//! own graph, matching and chains from scratch.

use log::{debug, info};

use crate::cell::{CellKind, Pauli};
use crate::config::DecoderConfig;
use crate::defect_graph::DefectGraph;
use crate::error::{DecoderError, Result};
use crate::lattice::ToricLattice;
use crate::matching::{min_weight_perfect_matching, Matching};
use crate::path::Path;
use crate::syndrome::Syndrome;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Something that holds qubits: it can be measured and it can be corrected.
///
/// [`crate::frame::PauliFrame`] is the in-memory implementation; a hardware
/// backend would append measurement and gate instructions instead.
pub trait CorrectionSink {
    /// Outcome of every cell of `kind`, in row-major cell order.
    fn measure(&mut self, kind: CellKind) -> Vec<bool>;

    /// Apply `correction.pauli()` on every edge of the correction.
    fn apply_correction(&mut self, correction: &Correction);
}

/// Recovery operator for one syndrome: one chain per matched defect pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    kind: CellKind,
    pairs: Vec<(usize, usize)>,
    paths: Vec<Path>,
}

impl Correction {
    fn empty(kind: CellKind) -> Self {
        Self {
            kind,
            pairs: Vec::new(),
            paths: Vec::new(),
        }
    }

    /// Kind of the defects this correction removes.
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn pauli(&self) -> Pauli {
        self.kind.correction_pauli()
    }

    /// Matched defect pairs, by flat cell index.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Chains in matching order; `paths()[i]` joins `pairs()[i]`.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Every edge of every chain, in order. An edge may repeat when two
    /// chains cross it; applying the Pauli twice cancels.
    pub fn edges(&self) -> impl Iterator<Item = usize> + '_ {
        self.paths.iter().flat_map(|p| p.iter().copied())
    }

    /// Total chain length, equal to the matching weight.
    pub fn weight(&self) -> usize {
        self.paths.iter().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(|p| p.is_empty())
    }

    /// Translate every chain into the caller's qubit handles. `handles` is
    /// indexed by edge flat index.
    pub fn resolve_handles<H: Clone>(&self, handles: &[H]) -> Result<Vec<Vec<H>>> {
        self.paths
            .iter()
            .map(|path| {
                path.iter()
                    .map(|&e| {
                        handles.get(e).cloned().ok_or(DecoderError::EdgeOutOfRange {
                            index: e,
                            num_edges: handles.len(),
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

/// Corrections applied during one [`Decoder::decode_round`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub star: Correction,
    pub plaquette: Correction,
}

impl RoundReport {
    pub fn weight(&self) -> usize {
        self.star.weight() + self.plaquette.weight()
    }
}

/// Minimum-weight matching decoder over a fixed torus.
#[derive(Debug, Clone)]
pub struct Decoder {
    lattice: ToricLattice,
}

impl Decoder {
    pub fn new(lattice: ToricLattice) -> Self {
        Self { lattice }
    }

    pub fn from_config(config: &DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(ToricLattice::new(config.rows, config.cols)?))
    }

    pub fn lattice(&self) -> &ToricLattice {
        &self.lattice
    }

    /// Build the defect graph of a syndrome.
    pub fn defect_graph(&self, syndrome: &Syndrome) -> Result<DefectGraph> {
        self.check_length(syndrome.outcomes().len())?;
        self.lattice.defect_graph(syndrome.kind(), &syndrome.marked())
    }

    /// Pair up the defects of a syndrome.
    pub fn matching(&self, syndrome: &Syndrome) -> Result<Matching> {
        min_weight_perfect_matching(&self.defect_graph(syndrome)?)
    }

    /// Correction chains for one syndrome. A clean syndrome gives an empty
    /// correction.
    pub fn decode(&self, syndrome: &Syndrome) -> Result<Correction> {
        let kind = syndrome.kind();
        if syndrome.is_clean() {
            self.check_length(syndrome.outcomes().len())?;
            debug!("{:?} syndrome clean, nothing to correct", kind);
            return Ok(Correction::empty(kind));
        }

        let matching = self.matching(syndrome)?;
        let paths = matching
            .pairs()
            .iter()
            .map(|&(a, b)| {
                self.lattice
                    .path(self.lattice.cell(kind, a)?, self.lattice.cell(kind, b)?)
            })
            .collect::<Result<Vec<Path>>>()?;

        let correction = Correction {
            kind,
            pairs: matching.pairs().to_vec(),
            paths,
        };
        debug!(
            "{:?} correction: {} chains, {} {:?} gates",
            kind,
            correction.pairs.len(),
            correction.weight(),
            correction.pauli()
        );
        Ok(correction)
    }

    /// Decode a raw outcome vector in row-major cell order.
    pub fn decode_outcomes(&self, kind: CellKind, outcomes: &[bool]) -> Result<Correction> {
        self.decode(&Syndrome::from_outcomes(kind, outcomes.to_vec(), &self.lattice)?)
    }

    /// One error-correction round against `sink`.
    ///
    /// Stars are measured and corrected first, then plaquettes. Each phase
    /// measures after the previous phase's correction has been applied.
    pub fn decode_round<S: CorrectionSink + ?Sized>(&self, sink: &mut S) -> Result<RoundReport> {
        let star = self.run_phase(sink, CellKind::Star)?;
        let plaquette = self.run_phase(sink, CellKind::Plaquette)?;
        info!(
            "round done: {} Z and {} X corrections",
            star.weight(),
            plaquette.weight()
        );
        Ok(RoundReport { star, plaquette })
    }

    fn run_phase<S: CorrectionSink + ?Sized>(&self, sink: &mut S, kind: CellKind) -> Result<Correction> {
        let outcomes = sink.measure(kind);
        let correction = self.decode_outcomes(kind, &outcomes)?;
        if !correction.is_empty() {
            sink.apply_correction(&correction);
        }
        Ok(correction)
    }

    /// Decode independent syndromes, in parallel when the `parallel` feature
    /// is enabled. Results keep the input order.
    #[cfg(feature = "parallel")]
    pub fn decode_batch(&self, syndromes: &[Syndrome]) -> Vec<Result<Correction>> {
        syndromes.par_iter().map(|s| self.decode(s)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    pub fn decode_batch(&self, syndromes: &[Syndrome]) -> Vec<Result<Correction>> {
        syndromes.iter().map(|s| self.decode(s)).collect()
    }

    fn check_length(&self, got: usize) -> Result<()> {
        if got != self.lattice.num_cells() {
            return Err(DecoderError::SyndromeLength {
                expected: self.lattice.num_cells(),
                got,
            });
        }
        Ok(())
    }
}
