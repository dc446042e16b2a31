//! Toric lattice geometry: edge addressing and the two cell complexes.
//!
//! The toric code lives on an R×C square lattice with periodic boundary
//! conditions (T²). Qubits sit on **edges**. There are 2RC edges total, laid out
//! row by row: row `r` holds its C horizontal edges followed by its C vertical
//! edges. For the 3×3 lattice:
//!
//! ```text
//!  ·──h0──·──h1──·──h2──·
//!  v0     v1     v2     v0
//!  ·──h3──·──h4──·──h5──·      h_k = 2·r·C + c
//!  v3     v4     v5     v3     v_k = 2·r·C + c + C
//!  ·──h6──·──h7──·──h8──·
//!  v6     v7     v8     v6
//!  ·──h0──·──h1──·──h2──·
//! ```
//!
//! (the labels `h3`, `v3` are positional; the flat index of `h3` is 6 and of
//! `v3` is 9.)

use log::trace;

use crate::cell::{wrap, Cell, CellKind};
use crate::error::{DecoderError, Result};

/// Direction of an edge on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDir {
    Horizontal,
    Vertical,
}

impl EdgeDir {
    /// Parse the single-character orientation tag used in coordinate lists.
    pub fn from_tag(tag: char) -> Result<Self> {
        match tag {
            'h' | 'H' => Ok(EdgeDir::Horizontal),
            'v' | 'V' => Ok(EdgeDir::Vertical),
            other => Err(DecoderError::UnknownOrientation(other)),
        }
    }

    pub fn tag(self) -> char {
        match self {
            EdgeDir::Horizontal => 'h',
            EdgeDir::Vertical => 'v',
        }
    }
}

/// An edge on the toric lattice, identified by direction and grid position.
///
/// Coordinates are signed and may lie outside the grid; they are reduced
/// modulo the lattice dimensions when the edge is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub dir: EdgeDir,
    pub row: isize,
    pub col: isize,
}

impl Edge {
    pub fn horizontal(row: isize, col: isize) -> Self {
        Self { dir: EdgeDir::Horizontal, row, col }
    }

    pub fn vertical(row: isize, col: isize) -> Self {
        Self { dir: EdgeDir::Vertical, row, col }
    }
}

/// The R×C toric lattice with its plaquette and star grids.
///
/// Immutable once built; share it freely between decoding rounds.
#[derive(Debug, Clone)]
pub struct ToricLattice {
    rows: usize,
    cols: usize,
    plaquettes: Vec<Vec<Cell>>,
    stars: Vec<Vec<Cell>>,
    plaquettes_lin: Vec<Cell>,
    stars_lin: Vec<Cell>,
}

impl ToricLattice {
    /// Build an R×C lattice. Both dimensions must be at least 1.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(DecoderError::InvalidDimensions { rows, cols });
        }

        let grid = |kind: CellKind| -> Vec<Vec<Cell>> {
            (0..rows)
                .map(|r| (0..cols).map(|c| Cell::new(kind, r, c)).collect())
                .collect()
        };
        let plaquettes = grid(CellKind::Plaquette);
        let stars = grid(CellKind::Star);
        let plaquettes_lin = plaquettes.iter().flatten().copied().collect();
        let stars_lin = stars.iter().flatten().copied().collect();

        Ok(Self {
            rows,
            cols,
            plaquettes,
            stars,
            plaquettes_lin,
            stars_lin,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of edges (qubits).
    pub fn num_edges(&self) -> usize {
        2 * self.rows * self.cols
    }

    /// Number of cells of either kind.
    pub fn num_cells(&self) -> usize {
        self.rows * self.cols
    }

    /// Flat index of the edge at `(row, col, dir)`, wrapping both coordinates.
    pub fn flat_index(&self, row: isize, col: isize, dir: EdgeDir) -> usize {
        let r = wrap(row, self.rows);
        let c = wrap(col, self.cols);
        match dir {
            EdgeDir::Horizontal => 2 * r * self.cols + c,
            EdgeDir::Vertical => 2 * r * self.cols + c + self.cols,
        }
    }

    /// Convert an Edge to a linear index.
    pub fn edge_index(&self, edge: Edge) -> usize {
        self.flat_index(edge.row, edge.col, edge.dir)
    }

    /// Convert a linear index back to an Edge with in-range coordinates.
    pub fn index_to_edge(&self, idx: usize) -> Result<Edge> {
        if idx >= self.num_edges() {
            return Err(DecoderError::EdgeOutOfRange {
                index: idx,
                num_edges: self.num_edges(),
            });
        }
        let row = (idx / (2 * self.cols)) as isize;
        let rest = idx % (2 * self.cols);
        Ok(if rest < self.cols {
            Edge::horizontal(row, rest as isize)
        } else {
            Edge::vertical(row, (rest - self.cols) as isize)
        })
    }

    /// Flat indices of `edges`, in input order.
    pub fn flat_indices_bulk(&self, edges: &[Edge]) -> Vec<usize> {
        edges.iter().map(|&e| self.edge_index(e)).collect()
    }

    /// Flat indices of `(row, col, tag)` triples, where `tag` is `'h'` or `'v'`.
    ///
    /// Fails on the first unrecognised tag rather than skipping it, so the
    /// output always lines up one-to-one with the input.
    pub fn flat_indices_tagged(&self, coords: &[(isize, isize, char)]) -> Result<Vec<usize>> {
        coords
            .iter()
            .map(|&(row, col, tag)| Ok(self.flat_index(row, col, EdgeDir::from_tag(tag)?)))
            .collect()
    }

    fn check_cell(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(DecoderError::CellOutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    /// The 4 edges bounding plaquette (r, c), as `[top, left, bottom, right]`:
    /// - top horizontal: (r, c)
    /// - left vertical: (r, c)
    /// - bottom horizontal: (r+1, c)
    /// - right vertical: (r, c+1)
    ///
    /// On the 3×3 lattice plaquette (0, 1) is `[1, 4, 7, 5]`.
    pub fn plaquette_indices(&self, row: usize, col: usize) -> Result<[usize; 4]> {
        self.check_cell(row, col)?;
        Ok(self.plaquette_edges_unchecked(row, col))
    }

    /// The 4 edges of star (r, c), as `[top, left, bottom, right]`:
    /// - top vertical: (r, c)
    /// - left horizontal: (r+1, c-1)
    /// - bottom vertical: (r+1, c)
    /// - right horizontal: (r+1, c)
    ///
    /// Star (r, c) sits on the vertex below vertical edge (r, c), so its
    /// horizontal arms live on row r+1. On the 3×3 lattice star (0, 1) is
    /// `[4, 6, 10, 7]`.
    pub fn star_indices(&self, row: usize, col: usize) -> Result<[usize; 4]> {
        self.check_cell(row, col)?;
        Ok(self.star_edges_unchecked(row, col))
    }

    /// Incident edges of any cell, `[top, left, bottom, right]`.
    pub fn cell_indices(&self, cell: Cell) -> Result<[usize; 4]> {
        match cell.kind {
            CellKind::Plaquette => self.plaquette_indices(cell.row, cell.col),
            CellKind::Star => self.star_indices(cell.row, cell.col),
        }
    }

    pub(crate) fn cell_edges_unchecked(&self, cell: Cell) -> [usize; 4] {
        match cell.kind {
            CellKind::Plaquette => self.plaquette_edges_unchecked(cell.row, cell.col),
            CellKind::Star => self.star_edges_unchecked(cell.row, cell.col),
        }
    }

    fn plaquette_edges_unchecked(&self, row: usize, col: usize) -> [usize; 4] {
        let (r, c) = (row as isize, col as isize);
        [
            self.flat_index(r, c, EdgeDir::Horizontal),     // top
            self.flat_index(r, c, EdgeDir::Vertical),       // left
            self.flat_index(r + 1, c, EdgeDir::Horizontal), // bottom
            self.flat_index(r, c + 1, EdgeDir::Vertical),   // right
        ]
    }

    fn star_edges_unchecked(&self, row: usize, col: usize) -> [usize; 4] {
        let (r, c) = (row as isize, col as isize);
        [
            self.flat_index(r, c, EdgeDir::Vertical),           // top
            self.flat_index(r + 1, c - 1, EdgeDir::Horizontal), // left
            self.flat_index(r + 1, c, EdgeDir::Vertical),       // bottom
            self.flat_index(r + 1, c, EdgeDir::Horizontal),     // right
        ]
    }

    pub fn plaquettes(&self) -> &[Vec<Cell>] {
        &self.plaquettes
    }

    pub fn stars(&self) -> &[Vec<Cell>] {
        &self.stars
    }

    /// Plaquettes in row-major order; position `i` is syndrome outcome `i`.
    pub fn plaquettes_lin(&self) -> &[Cell] {
        &self.plaquettes_lin
    }

    /// Stars in row-major order; position `i` is syndrome outcome `i`.
    pub fn stars_lin(&self) -> &[Cell] {
        &self.stars_lin
    }

    pub fn cells_lin(&self, kind: CellKind) -> &[Cell] {
        match kind {
            CellKind::Plaquette => &self.plaquettes_lin,
            CellKind::Star => &self.stars_lin,
        }
    }

    /// Look up a cell by its flat row-major index.
    pub fn cell(&self, kind: CellKind, flat: usize) -> Result<Cell> {
        self.cells_lin(kind)
            .get(flat)
            .copied()
            .ok_or(DecoderError::CellOutOfRange {
                row: flat / self.cols,
                col: flat % self.cols,
                rows: self.rows,
                cols: self.cols,
            })
    }

    /// Toroidal Manhattan distance between two cells of this lattice.
    pub fn distance(&self, a: &Cell, b: &Cell) -> usize {
        a.dist(b, self.rows, self.cols)
    }

    /// Bind every cell of `kind` to the collaborator's edge handles.
    ///
    /// `handles` must list exactly one handle per edge, in flat-index order.
    /// The lattice never owns the handles; it only clones the ones each cell
    /// touches into the returned table.
    pub fn populate<H: Clone>(&self, kind: CellKind, handles: &[H]) -> Result<CellHandles<H>> {
        if handles.len() != self.num_edges() {
            return Err(DecoderError::HandleCountMismatch {
                expected: self.num_edges(),
                got: handles.len(),
            });
        }
        let cells = self
            .cells_lin(kind)
            .iter()
            .map(|&cell| self.cell_edges_unchecked(cell).map(|idx| handles[idx].clone()))
            .collect();
        trace!("populated {} {:?} cells", self.num_cells(), kind);
        Ok(CellHandles {
            kind,
            cols: self.cols,
            cells,
        })
    }

    pub fn populate_plaquettes<H: Clone>(&self, handles: &[H]) -> Result<CellHandles<H>> {
        self.populate(CellKind::Plaquette, handles)
    }

    pub fn populate_stars<H: Clone>(&self, handles: &[H]) -> Result<CellHandles<H>> {
        self.populate(CellKind::Star, handles)
    }
}

/// Per-cell edge handles of one cell kind, in `[top, left, bottom, right]`
/// order, stored row-major.
#[derive(Debug, Clone)]
pub struct CellHandles<H> {
    kind: CellKind,
    cols: usize,
    cells: Vec<[H; 4]>,
}

impl<H> CellHandles<H> {
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&[H; 4]> {
        if col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    pub fn by_flat(&self, flat: usize) -> Option<&[H; 4]> {
        self.cells.get(flat)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[H; 4]> {
        self.cells.iter()
    }
}
