//! Recovery chains between matched defects.
//!
//! A chain is built by walking from one cell to the other one axis at a time.
//! Each step moves to the neighbouring cell that is not further from the
//! target (forward wins ties) and emits the edge shared with it:
//! - row step forward crosses the `bottom` edge, backward the `top` edge,
//! - column step forward crosses the `right` edge, backward the `left` edge.
//!
//! Plaquette chains align the row first, star chains the column first. Every
//! step shortens the toroidal distance by exactly one, so the chain length is
//! the distance between the two cells and its boundary is exactly those two
//! cells.

use smallvec::SmallVec;

use crate::cell::{Cell, CellKind, Side};
use crate::error::{DecoderError, Result};
use crate::lattice::ToricLattice;

/// Edge flat indices of one recovery chain, in walking order.
pub type Path = SmallVec<[usize; 8]>;

/// Phase of a [`PathWalk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    RowAligning,
    ColumnAligning,
    Done,
}

/// One step of a walk: the edge crossed and the cell reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub edge: usize,
    pub to: Cell,
}

/// Iterator over the steps from one cell to another of the same kind.
#[derive(Debug, Clone)]
pub struct PathWalk<'a> {
    lattice: &'a ToricLattice,
    current: Cell,
    target: Cell,
    state: WalkState,
}

impl<'a> PathWalk<'a> {
    fn new(lattice: &'a ToricLattice, from: Cell, to: Cell) -> Self {
        let state = match from.kind {
            CellKind::Plaquette => WalkState::RowAligning,
            CellKind::Star => WalkState::ColumnAligning,
        };
        let mut walk = Self {
            lattice,
            current: from,
            target: to,
            state,
        };
        walk.settle();
        walk
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn current(&self) -> Cell {
        self.current
    }

    fn phase_after(&self, state: WalkState) -> WalkState {
        match (self.current.kind, state) {
            (CellKind::Plaquette, WalkState::RowAligning) => WalkState::ColumnAligning,
            (CellKind::Star, WalkState::ColumnAligning) => WalkState::RowAligning,
            _ => WalkState::Done,
        }
    }

    /// Leave every phase whose axis is already aligned.
    fn settle(&mut self) {
        loop {
            let aligned = match self.state {
                WalkState::RowAligning => self.current.row == self.target.row,
                WalkState::ColumnAligning => self.current.col == self.target.col,
                WalkState::Done => return,
            };
            if !aligned {
                return;
            }
            self.state = self.phase_after(self.state);
        }
    }
}

impl Iterator for PathWalk<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        let (dr, dc, forward, backward) = match self.state {
            WalkState::RowAligning => (1, 0, Side::Bottom, Side::Top),
            WalkState::ColumnAligning => (0, 1, Side::Right, Side::Left),
            WalkState::Done => return None,
        };
        let (rows, cols) = (self.lattice.rows(), self.lattice.cols());
        let fwd = self.current.shifted(dr, dc, rows, cols);
        let back = self.current.shifted(-dr, -dc, rows, cols);
        let edges = self.lattice.cell_edges_unchecked(self.current);

        let step = if self.target.dist(&fwd, rows, cols) <= self.target.dist(&back, rows, cols) {
            Step {
                edge: edges[forward as usize],
                to: fwd,
            }
        } else {
            Step {
                edge: edges[backward as usize],
                to: back,
            }
        };
        self.current = step.to;
        self.settle();
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.lattice.distance(&self.current, &self.target);
        (remaining, Some(remaining))
    }
}

impl ToricLattice {
    fn check_walk_cell(&self, cell: Cell) -> Result<()> {
        self.cell_indices(cell).map(|_| ())
    }

    /// Step-by-step walk from `from` to `to`. Both cells must be of the same
    /// kind and inside the lattice.
    pub fn walk(&self, from: Cell, to: Cell) -> Result<PathWalk<'_>> {
        if from.kind != to.kind {
            return Err(DecoderError::KindMismatch(from.kind, to.kind));
        }
        self.check_walk_cell(from)?;
        self.check_walk_cell(to)?;
        Ok(PathWalk::new(self, from, to))
    }

    /// Edge indices of the recovery chain from `from` to `to`; empty when the
    /// two cells coincide.
    pub fn path(&self, from: Cell, to: Cell) -> Result<Path> {
        Ok(self.walk(from, to)?.map(|step| step.edge).collect())
    }

    /// Chain between two plaquettes given by flat index.
    pub fn plaquette_path(&self, from: usize, to: usize) -> Result<Path> {
        self.path(
            self.cell(CellKind::Plaquette, from)?,
            self.cell(CellKind::Plaquette, to)?,
        )
    }

    /// Chain between two stars given by flat index.
    pub fn star_path(&self, from: usize, to: usize) -> Result<Path> {
        self.path(self.cell(CellKind::Star, from)?, self.cell(CellKind::Star, to)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(rows: usize, cols: usize) -> ToricLattice {
        ToricLattice::new(rows, cols).unwrap()
    }

    /// Cells of `kind` touched an odd number of times by `path`.
    fn boundary(lat: &ToricLattice, kind: CellKind, path: &[usize]) -> Vec<Cell> {
        lat.cells_lin(kind)
            .iter()
            .copied()
            .filter(|&cell| {
                let edges = lat.cell_indices(cell).unwrap();
                path.iter().filter(|e| edges.contains(e)).count() % 2 == 1
            })
            .collect()
    }

    #[test]
    fn test_star_path_three_by_three() {
        let lat = lattice(3, 3);
        let path = lat.star_path(0, 4).unwrap();
        assert_eq!(path.as_slice(), &[6, 10]);
    }

    #[test]
    fn test_star_walk_columns_first() {
        let lat = lattice(3, 3);
        let steps: Vec<Step> = lat.walk(Cell::star(0, 0), Cell::star(1, 1)).unwrap().collect();
        assert_eq!(steps[0].to, Cell::star(0, 1));
        assert_eq!(steps[1].to, Cell::star(1, 1));
    }

    #[test]
    fn test_plaquette_walk_rows_first() {
        let lat = lattice(3, 3);
        let steps: Vec<Step> = lat
            .walk(Cell::plaquette(0, 0), Cell::plaquette(1, 1))
            .unwrap()
            .collect();
        assert_eq!(steps[0].to, Cell::plaquette(1, 0));
        assert_eq!(steps[1].to, Cell::plaquette(1, 1));
        assert_eq!(steps.iter().map(|s| s.edge).collect::<Vec<_>>(), vec![6, 10]);
    }

    #[test]
    fn test_tie_goes_forward() {
        // half-way round a 4-row torus: both directions are two steps
        let lat = lattice(4, 4);
        let path = lat.path(Cell::plaquette(0, 0), Cell::plaquette(2, 0)).unwrap();
        assert_eq!(path.as_slice(), &[8, 16]);
    }

    #[test]
    fn test_backward_through_seam() {
        let lat = lattice(5, 5);
        let path = lat.path(Cell::plaquette(0, 0), Cell::plaquette(4, 0)).unwrap();
        // top edge of (0,0) is shared with the bottom of (4,0)
        assert_eq!(path.as_slice(), &[0]);
        let path = lat.path(Cell::star(0, 0), Cell::star(0, 4)).unwrap();
        // left arm of star (0,0) is h(1,4)
        assert_eq!(path.as_slice(), &[14]);
    }

    #[test]
    fn test_same_cell_empty_path() {
        let lat = lattice(3, 3);
        let mut walk = lat.walk(Cell::star(2, 1), Cell::star(2, 1)).unwrap();
        assert_eq!(walk.state(), WalkState::Done);
        assert!(walk.next().is_none());
        assert!(lat.plaquette_path(5, 5).unwrap().is_empty());
    }

    #[test]
    fn test_kind_mismatch_and_range() {
        let lat = lattice(3, 3);
        assert_eq!(
            lat.path(Cell::star(0, 0), Cell::plaquette(0, 1)).unwrap_err(),
            DecoderError::KindMismatch(CellKind::Star, CellKind::Plaquette)
        );
        assert!(lat.path(Cell::star(0, 0), Cell::star(3, 0)).is_err());
        assert!(lat.star_path(0, 9).is_err());
    }

    #[test]
    fn test_walk_length_and_endpoint_exhaustive() {
        for (rows, cols) in [(2, 2), (3, 3), (4, 5), (5, 4), (6, 6)] {
            let lat = lattice(rows, cols);
            for kind in [CellKind::Plaquette, CellKind::Star] {
                for &a in lat.cells_lin(kind) {
                    for &b in lat.cells_lin(kind) {
                        let walk = lat.walk(a, b).unwrap();
                        assert_eq!(walk.size_hint(), (lat.distance(&a, &b), Some(lat.distance(&a, &b))));
                        let steps: Vec<Step> = walk.collect();
                        assert_eq!(steps.len(), lat.distance(&a, &b), "{:?} -> {:?}", a, b);
                        let end = steps.last().map(|s| s.to).unwrap_or(a);
                        assert_eq!(end, b);
                    }
                }
            }
        }
    }

    #[test]
    fn test_chain_boundary_is_endpoints() {
        for (rows, cols) in [(2, 3), (3, 3), (4, 4), (5, 3)] {
            let lat = lattice(rows, cols);
            for kind in [CellKind::Plaquette, CellKind::Star] {
                for &a in lat.cells_lin(kind) {
                    for &b in lat.cells_lin(kind) {
                        let path = lat.path(a, b).unwrap();
                        let mut expected = if a == b { vec![] } else { vec![a, b] };
                        expected.sort_by_key(|c| c.flat(cols));
                        assert_eq!(boundary(&lat, kind, &path), expected, "{:?} -> {:?}", a, b);
                    }
                }
            }
        }
    }

    #[test]
    fn test_steps_share_edge_with_both_cells() {
        let lat = lattice(4, 6);
        for kind in [CellKind::Plaquette, CellKind::Star] {
            let a = lat.cells_lin(kind)[0];
            let b = lat.cells_lin(kind)[lat.num_cells() - 1];
            let mut at = a;
            for step in lat.walk(a, b).unwrap() {
                assert!(lat.cell_indices(at).unwrap().contains(&step.edge));
                assert!(lat.cell_indices(step.to).unwrap().contains(&step.edge));
                at = step.to;
            }
        }
    }
}
