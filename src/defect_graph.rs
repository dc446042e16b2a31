//! Complete weighted graph over the defects of one cell kind.

use log::debug;

use crate::cell::{Cell, CellKind};
use crate::error::{DecoderError, Result};
use crate::lattice::ToricLattice;

/// Weighted edge between two defects, stored as positions into
/// [`DefectGraph::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefectEdge {
    pub u: usize,
    pub v: usize,
    pub weight: usize,
}

/// Every pair of marked cells joined by an edge weighted with their toroidal
/// distance. Built fresh for each decoding round.
#[derive(Debug, Clone)]
pub struct DefectGraph {
    kind: CellKind,
    nodes: Vec<usize>,
    cells: Vec<Cell>,
    edges: Vec<DefectEdge>,
}

impl DefectGraph {
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// Flat indices of the marked cells, in the order they were given.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn edges(&self) -> &[DefectEdge] {
        &self.edges
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Weight between two marked cells given by flat index, if both are nodes.
    pub fn weight(&self, a: usize, b: usize) -> Option<usize> {
        let pa = self.nodes.iter().position(|&n| n == a)?;
        let pb = self.nodes.iter().position(|&n| n == b)?;
        if pa == pb {
            return Some(0);
        }
        let (u, v) = if pa < pb { (pa, pb) } else { (pb, pa) };
        self.edges
            .iter()
            .find(|e| e.u == u && e.v == v)
            .map(|e| e.weight)
    }
}

impl ToricLattice {
    /// Build the defect graph for the marked cells of `kind`.
    ///
    /// `marked` holds flat row-major cell indices. Zero defects give an empty
    /// graph and two give a single edge. An odd count still builds; the
    /// matcher is where that is rejected.
    pub fn defect_graph(&self, kind: CellKind, marked: &[usize]) -> Result<DefectGraph> {
        let mut seen = vec![false; self.num_cells()];
        let mut cells = Vec::with_capacity(marked.len());
        for &flat in marked {
            let cell = self.cell(kind, flat)?;
            if std::mem::replace(&mut seen[flat], true) {
                return Err(DecoderError::DuplicateDefect(flat));
            }
            cells.push(cell);
        }

        let n = cells.len();
        let mut edges = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for u in 0..n {
            for v in (u + 1)..n {
                edges.push(DefectEdge {
                    u,
                    v,
                    weight: self.distance(&cells[u], &cells[v]),
                });
            }
        }

        debug!("{:?} defect graph: {} nodes, {} edges", kind, n, edges.len());
        Ok(DefectGraph {
            kind,
            nodes: marked.to_vec(),
            cells,
            edges,
        })
    }

    pub fn marked_plaquettes_graph(&self, marked: &[usize]) -> Result<DefectGraph> {
        self.defect_graph(CellKind::Plaquette, marked)
    }

    pub fn marked_stars_graph(&self, marked: &[usize]) -> Result<DefectGraph> {
        self.defect_graph(CellKind::Star, marked)
    }
}
