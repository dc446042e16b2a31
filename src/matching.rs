//! Minimum-weight perfect matching of defects.
//!
//! Edmonds' blossom algorithm in its primal-dual form (maximum weight, optionally
//! maximum cardinality, O(n³)). Minimum-weight perfect matching reduces to it
//! by inverting the weights: with `w' = max_w + 1 - w`, every maximum-cardinality
//! matching on a complete graph with an even node count is perfect, and among
//! those the largest `Σw'` is the smallest `Σw`.
//!
//! All arithmetic is on integers. Dual variables are stored doubled, so the
//! slack of an edge is `u_i + u_j - 2w` and stays even between two S-vertices.

use std::collections::HashSet;

use log::{debug, trace};

use crate::cell::CellKind;
use crate::defect_graph::DefectGraph;
use crate::error::{DecoderError, Result};

const NONE: usize = usize::MAX;

/// Pairs of matched defects (flat cell indices, lower index first), sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matching {
    kind: CellKind,
    pairs: Vec<(usize, usize)>,
    weight: usize,
}

impl Matching {
    pub fn empty(kind: CellKind) -> Self {
        Self {
            kind,
            pairs: Vec::new(),
            weight: 0,
        }
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Sum of the toroidal distances of all matched pairs.
    pub fn weight(&self) -> usize {
        self.weight
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.pairs.contains(&key)
    }
}

/// Minimum-weight perfect matching over all defects of `graph`.
///
/// An odd number of defects cannot be perfectly matched and is reported as
/// [`DecoderError::OddDefectCount`]. No defects give an empty matching.
///
/// Among equal-weight optima the lowest defect (by flat index) is paired with
/// its lowest possible partner, then the lowest defect still unpaired, and so
/// on. The result depends only on the set of defects, never on input order.
pub fn min_weight_perfect_matching(graph: &DefectGraph) -> Result<Matching> {
    let n = graph.num_nodes();
    if n % 2 == 1 {
        return Err(DecoderError::OddDefectCount(n));
    }
    if n == 0 {
        return Ok(Matching::empty(graph.kind()));
    }

    // rank r is the r-th smallest flat index
    let nodes = graph.nodes();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| nodes[i]);
    let mut rank = vec![0; n];
    for (new, &old) in order.iter().enumerate() {
        rank[old] = new;
    }
    let mut dist = vec![vec![0; n]; n];
    for e in graph.edges() {
        let (a, b) = (rank[e.u], rank[e.v]);
        dist[a][b] = e.weight;
        dist[b][a] = e.weight;
    }

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut current = PerfectSolution::solve(&dist, &remaining);
    let mut pairs = Vec::with_capacity(n / 2);
    let mut weight = 0;

    while let Some(&i) = remaining.first() {
        let partner = current.mate[i].ok_or(DecoderError::Unmatched(nodes[order[i]]))?;
        // only tight edges can appear in an optimal matching
        let candidates: Vec<usize> = remaining[1..]
            .iter()
            .copied()
            .take_while(|&j| j < partner)
            .filter(|&j| current.tight[i][j])
            .collect();
        for j in candidates {
            let rest: Vec<usize> = remaining.iter().copied().filter(|&v| v != i && v != j).collect();
            let mut pinned = PerfectSolution::solve(&dist, &rest);
            if pinned.weight + dist[i][j] == current.weight {
                trace!("tie at rank {}: partner {} preferred over {}", i, j, partner);
                pinned.mate[i] = Some(j);
                pinned.mate[j] = Some(i);
                pinned.weight += dist[i][j];
                current = pinned;
                break;
            }
        }

        let j = current.mate[i].ok_or(DecoderError::Unmatched(nodes[order[i]]))?;
        pairs.push((nodes[order[i]], nodes[order[j]]));
        weight += dist[i][j];
        current.weight -= dist[i][j];
        remaining.retain(|&v| v != i && v != j);
    }

    debug!(
        "{:?} matching: {} pairs, total weight {}",
        graph.kind(),
        pairs.len(),
        weight
    );
    Ok(Matching {
        kind: graph.kind(),
        pairs,
        weight,
    })
}

/// Optimal perfect matching of a subset of ranked defects, with the edges
/// that are tight under the final dual solution. Indices are global ranks.
struct PerfectSolution {
    mate: Vec<Option<usize>>,
    tight: Vec<Vec<bool>>,
    weight: usize,
}

impl PerfectSolution {
    fn solve(dist: &[Vec<usize>], subset: &[usize]) -> Self {
        let n = dist.len();
        let mut solution = Self {
            mate: vec![None; n],
            tight: vec![vec![false; n]; n],
            weight: 0,
        };
        let m = subset.len();
        if m == 0 {
            return solution;
        }

        let max_w = subset
            .iter()
            .flat_map(|&a| subset.iter().map(move |&b| dist[a][b]))
            .max()
            .unwrap_or(0) as i64;
        let inverted = |a: usize, b: usize| max_w + 1 - dist[subset[a]][subset[b]] as i64;
        let mut edges = Vec::with_capacity(m * (m - 1) / 2);
        for a in 0..m {
            for b in (a + 1)..m {
                edges.push((a, b, inverted(a, b)));
            }
        }

        let mut solver = Blossom::new(m, &edges);
        solver.solve(true);
        for a in 0..m {
            for b in (a + 1)..m {
                let t = solver.is_tight(a, b, inverted(a, b));
                solution.tight[subset[a]][subset[b]] = t;
                solution.tight[subset[b]][subset[a]] = t;
            }
            if let Some(b) = solver.mate_of(a) {
                solution.mate[subset[a]] = Some(subset[b]);
                if a < b {
                    solution.weight += dist[subset[a]][subset[b]];
                }
            }
        }
        solution
    }
}

/// Maximum-weight matching on a general graph with `n` vertices.
///
/// `edges` holds `(u, v, weight)`; each edge must join two distinct vertices
/// below `n` and appear once. With `max_cardinality` set, only
/// maximum-cardinality matchings are considered. Returns the mate of every
/// vertex.
pub fn max_weight_matching(
    n: usize,
    edges: &[(usize, usize, i64)],
    max_cardinality: bool,
) -> Result<Vec<Option<usize>>> {
    let mut seen = HashSet::with_capacity(edges.len());
    for &(u, v, _) in edges {
        if u == v || u >= n || v >= n || !seen.insert((u.min(v), u.max(v))) {
            return Err(DecoderError::InvalidMatchingEdge { u, v, n });
        }
    }
    if n == 0 || edges.is_empty() {
        return Ok(vec![None; n]);
    }
    let mut solver = Blossom::new(n, edges);
    solver.solve(max_cardinality);
    Ok((0..n).map(|v| solver.mate_of(v)).collect())
}

/// Cyclic indexing: a negative `j` counts back from the end of the list.
fn at(list: &[usize], j: isize) -> usize {
    list[j.rem_euclid(list.len() as isize) as usize]
}

/// Working state of the primal-dual blossom algorithm.
///
/// Vertices are `0..n`, non-trivial blossoms `n..2n`. Edge `k` has endpoints
/// `2k` and `2k + 1`; `endpoint[p]` is the vertex at endpoint `p` and `p ^ 1`
/// is the opposite end. `mate[v]` is the remote endpoint of the matched edge at
/// `v`. Labels: 0 free, 1 S (outer), 2 T (inner), 5 S while being scanned.
struct Blossom<'a> {
    n: usize,
    edges: &'a [(usize, usize, i64)],
    endpoint: Vec<usize>,
    neighbend: Vec<Vec<usize>>,
    mate: Vec<usize>,
    label: Vec<i8>,
    labelend: Vec<usize>,
    inblossom: Vec<usize>,
    blossomparent: Vec<usize>,
    blossomchilds: Vec<Vec<usize>>,
    blossombase: Vec<usize>,
    blossomendps: Vec<Vec<usize>>,
    bestedge: Vec<usize>,
    blossombestedges: Vec<Option<Vec<usize>>>,
    unusedblossoms: Vec<usize>,
    dualvar: Vec<i64>,
    allowedge: Vec<bool>,
    queue: Vec<usize>,
}

impl<'a> Blossom<'a> {
    fn new(n: usize, edges: &'a [(usize, usize, i64)]) -> Self {
        let max_weight = edges.iter().map(|e| e.2).max().unwrap_or(0).max(0);
        let endpoint = (0..2 * edges.len())
            .map(|p| {
                let (i, j, _) = edges[p / 2];
                if p % 2 == 0 {
                    i
                } else {
                    j
                }
            })
            .collect();
        let mut neighbend = vec![Vec::new(); n];
        for (k, &(i, j, _)) in edges.iter().enumerate() {
            neighbend[i].push(2 * k + 1);
            neighbend[j].push(2 * k);
        }
        let mut blossombase: Vec<usize> = (0..n).collect();
        blossombase.extend(std::iter::repeat(NONE).take(n));
        let mut dualvar = vec![max_weight; n];
        dualvar.extend(std::iter::repeat(0).take(n));

        Self {
            n,
            edges,
            endpoint,
            neighbend,
            mate: vec![NONE; n],
            label: vec![0; 2 * n],
            labelend: vec![NONE; 2 * n],
            inblossom: (0..n).collect(),
            blossomparent: vec![NONE; 2 * n],
            blossomchilds: vec![Vec::new(); 2 * n],
            blossombase,
            blossomendps: vec![Vec::new(); 2 * n],
            bestedge: vec![NONE; 2 * n],
            blossombestedges: vec![None; 2 * n],
            unusedblossoms: (n..2 * n).collect(),
            dualvar,
            allowedge: vec![false; edges.len()],
            queue: Vec::new(),
        }
    }

    fn mate_of(&self, v: usize) -> Option<usize> {
        match self.mate[v] {
            NONE => None,
            p => Some(self.endpoint[p]),
        }
    }

    /// Whether edge `(i, j)` of weight `w` has zero slack once blossom duals
    /// are included. Only meaningful after `solve`.
    fn is_tight(&self, i: usize, j: usize, w: i64) -> bool {
        let ancestors = |v: usize| {
            let mut out = Vec::new();
            let mut b = self.blossomparent[v];
            while b != NONE {
                out.push(b);
                b = self.blossomparent[b];
            }
            out
        };
        let outer_j = ancestors(j);
        let shared: i64 = ancestors(i)
            .into_iter()
            .filter(|b| outer_j.contains(b))
            .map(|b| 2 * self.dualvar[b])
            .sum();
        self.dualvar[i] + self.dualvar[j] - 2 * w + shared == 0
    }

    fn slack(&self, k: usize) -> i64 {
        let (i, j, w) = self.edges[k];
        self.dualvar[i] + self.dualvar[j] - 2 * w
    }

    fn leaves(&self, b: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_leaves(b, &mut out);
        out
    }

    fn collect_leaves(&self, b: usize, out: &mut Vec<usize>) {
        if b < self.n {
            out.push(b);
        } else {
            for &t in &self.blossomchilds[b] {
                self.collect_leaves(t, out);
            }
        }
    }

    fn endps_at(&self, b: usize, j: isize) -> usize {
        at(&self.blossomendps[b], j)
    }

    /// Label the top-level blossom containing `w` with `t`, reached through
    /// endpoint `p`. A T-blossom immediately labels its mate S.
    fn assign_label(&mut self, w: usize, t: i8, p: usize) {
        let b = self.inblossom[w];
        self.label[w] = t;
        self.label[b] = t;
        self.labelend[w] = p;
        self.labelend[b] = p;
        self.bestedge[w] = NONE;
        self.bestedge[b] = NONE;
        if t == 1 {
            let leaves = self.leaves(b);
            self.queue.extend(leaves);
        } else if t == 2 {
            let base = self.blossombase[b];
            let m = self.mate[base];
            let next = self.endpoint[m];
            self.assign_label(next, 1, m ^ 1);
        }
    }

    /// Trace back from `v` and `w` to find either a new blossom (returns its
    /// base) or an augmenting path (returns `NONE`).
    fn scan_blossom(&mut self, mut v: usize, mut w: usize) -> usize {
        let mut path = Vec::new();
        let mut base = NONE;
        while v != NONE || w != NONE {
            let mut b = self.inblossom[v];
            if self.label[b] & 4 != 0 {
                base = self.blossombase[b];
                break;
            }
            path.push(b);
            self.label[b] = 5;
            if self.labelend[b] == NONE {
                v = NONE;
            } else {
                v = self.endpoint[self.labelend[b]];
                b = self.inblossom[v];
                v = self.endpoint[self.labelend[b]];
            }
            if w != NONE {
                std::mem::swap(&mut v, &mut w);
            }
        }
        for b in path {
            self.label[b] = 1;
        }
        base
    }

    /// Contract the odd cycle closed by edge `k` into a new S-blossom with
    /// the given base.
    fn add_blossom(&mut self, base: usize, k: usize) {
        let (mut v, mut w, _) = self.edges[k];
        let bb = self.inblossom[base];
        let mut bv = self.inblossom[v];
        let mut bw = self.inblossom[w];
        let b = self
            .unusedblossoms
            .pop()
            .expect("at most n/2 nested blossoms exist at any time");
        self.blossombase[b] = base;
        self.blossomparent[b] = NONE;
        self.blossomparent[bb] = b;

        let mut path = Vec::new();
        let mut endps = Vec::new();
        while bv != bb {
            self.blossomparent[bv] = b;
            path.push(bv);
            endps.push(self.labelend[bv]);
            v = self.endpoint[self.labelend[bv]];
            bv = self.inblossom[v];
        }
        path.push(bb);
        path.reverse();
        endps.reverse();
        endps.push(2 * k);
        while bw != bb {
            self.blossomparent[bw] = b;
            path.push(bw);
            endps.push(self.labelend[bw] ^ 1);
            w = self.endpoint[self.labelend[bw]];
            bw = self.inblossom[w];
        }
        self.blossomchilds[b] = path.clone();
        self.blossomendps[b] = endps;

        self.label[b] = 1;
        self.labelend[b] = self.labelend[bb];
        self.dualvar[b] = 0;
        for leaf in self.leaves(b) {
            if self.label[self.inblossom[leaf]] == 2 {
                // former T-vertices become S and must be scanned
                self.queue.push(leaf);
            }
            self.inblossom[leaf] = b;
        }

        // least-slack edges from the new blossom to each neighbouring S-blossom
        let mut bestedgeto = vec![NONE; 2 * self.n];
        for &bv in &path {
            let nblists: Vec<Vec<usize>> = match self.blossombestedges[bv].take() {
                Some(list) => vec![list],
                None => self
                    .leaves(bv)
                    .iter()
                    .map(|&leaf| self.neighbend[leaf].iter().map(|&p| p / 2).collect())
                    .collect(),
            };
            for nblist in nblists {
                for k in nblist {
                    let (i, j, _) = self.edges[k];
                    let j = if self.inblossom[j] == b { i } else { j };
                    let bj = self.inblossom[j];
                    if bj != b
                        && self.label[bj] == 1
                        && (bestedgeto[bj] == NONE || self.slack(k) < self.slack(bestedgeto[bj]))
                    {
                        bestedgeto[bj] = k;
                    }
                }
            }
            self.bestedge[bv] = NONE;
        }
        let best: Vec<usize> = bestedgeto.into_iter().filter(|&k| k != NONE).collect();
        self.bestedge[b] = NONE;
        for &k in &best {
            if self.bestedge[b] == NONE || self.slack(k) < self.slack(self.bestedge[b]) {
                self.bestedge[b] = k;
            }
        }
        self.blossombestedges[b] = Some(best);
        trace!("blossom {} formed with base {}", b, base);
    }

    /// Dissolve blossom `b` into its children. Mid-stage, a T-blossom's
    /// children are relabelled so the alternating tree stays consistent.
    fn expand_blossom(&mut self, b: usize, endstage: bool) {
        let childs = self.blossomchilds[b].clone();
        for &s in &childs {
            self.blossomparent[s] = NONE;
            if s < self.n {
                self.inblossom[s] = s;
            } else if endstage && self.dualvar[s] == 0 {
                self.expand_blossom(s, endstage);
            } else {
                for leaf in self.leaves(s) {
                    self.inblossom[leaf] = s;
                }
            }
        }

        if !endstage && self.label[b] == 2 {
            let entrychild = self.inblossom[self.endpoint[self.labelend[b] ^ 1]];
            let len = childs.len() as isize;
            let mut j = childs
                .iter()
                .position(|&c| c == entrychild)
                .expect("entry child belongs to the blossom") as isize;
            let (jstep, endptrick): (isize, usize) = if j & 1 != 0 {
                j -= len;
                (1, 0)
            } else {
                (-1, 1)
            };
            let trick = endptrick as isize;

            // walk from the entry child to the base, relabelling as we go
            let mut p = self.labelend[b];
            while j != 0 {
                let q = self.endpoint[p ^ 1];
                self.label[q] = 0;
                let e = self.endps_at(b, j - trick);
                let r = self.endpoint[e ^ endptrick ^ 1];
                self.label[r] = 0;
                self.assign_label(q, 2, p);
                self.allowedge[e / 2] = true;
                j += jstep;
                p = self.endps_at(b, j - trick) ^ endptrick;
                self.allowedge[p / 2] = true;
                j += jstep;
            }

            let bv = at(&childs, j);
            let q = self.endpoint[p ^ 1];
            self.label[q] = 2;
            self.label[bv] = 2;
            self.labelend[q] = p;
            self.labelend[bv] = p;
            self.bestedge[bv] = NONE;
            j += jstep;

            // children on the other side of the cycle that were reached by a
            // T-edge keep their label
            while at(&childs, j) != entrychild {
                let bv = at(&childs, j);
                if self.label[bv] == 1 {
                    j += jstep;
                    continue;
                }
                let labelled = self.leaves(bv).into_iter().find(|&v| self.label[v] != 0);
                if let Some(v) = labelled {
                    self.label[v] = 0;
                    let m = self.mate[self.blossombase[bv]];
                    let mv = self.endpoint[m];
                    self.label[mv] = 0;
                    let le = self.labelend[v];
                    self.assign_label(v, 2, le);
                }
                j += jstep;
            }
        }

        self.label[b] = -1;
        self.labelend[b] = NONE;
        self.blossomchilds[b].clear();
        self.blossomendps[b].clear();
        self.blossombase[b] = NONE;
        self.blossombestedges[b] = None;
        self.bestedge[b] = NONE;
        self.unusedblossoms.push(b);
    }

    /// Swap matched and unmatched edges along the even path inside blossom
    /// `b` from vertex `v` to the base, then rotate `v` to become the base.
    fn augment_blossom(&mut self, b: usize, v: usize) {
        let mut t = v;
        while self.blossomparent[t] != b {
            t = self.blossomparent[t];
        }
        if t >= self.n {
            self.augment_blossom(t, v);
        }

        let childs = self.blossomchilds[b].clone();
        let len = childs.len() as isize;
        let i = childs
            .iter()
            .position(|&c| c == t)
            .expect("sub-blossom belongs to its parent");
        let mut j = i as isize;
        let (jstep, endptrick): (isize, usize) = if j & 1 != 0 {
            j -= len;
            (1, 0)
        } else {
            (-1, 1)
        };
        let trick = endptrick as isize;

        while j != 0 {
            j += jstep;
            let t = at(&childs, j);
            let p = self.endps_at(b, j - trick) ^ endptrick;
            if t >= self.n {
                let ep = self.endpoint[p];
                self.augment_blossom(t, ep);
            }
            j += jstep;
            let t = at(&childs, j);
            if t >= self.n {
                let ep = self.endpoint[p ^ 1];
                self.augment_blossom(t, ep);
            }
            let (a, c) = (self.endpoint[p], self.endpoint[p ^ 1]);
            self.mate[a] = p ^ 1;
            self.mate[c] = p;
        }

        self.blossomchilds[b].rotate_left(i);
        self.blossomendps[b].rotate_left(i);
        self.blossombase[b] = self.blossombase[self.blossomchilds[b][0]];
    }

    /// Flip the augmenting path through edge `k` between two S-vertices.
    fn augment_matching(&mut self, k: usize) {
        let (v, w, _) = self.edges[k];
        for (start, first) in [(v, 2 * k + 1), (w, 2 * k)] {
            let (mut s, mut p) = (start, first);
            loop {
                let bs = self.inblossom[s];
                if bs >= self.n {
                    self.augment_blossom(bs, s);
                }
                self.mate[s] = p;
                if self.labelend[bs] == NONE {
                    // reached a single free vertex: root of the tree
                    break;
                }
                let t = self.endpoint[self.labelend[bs]];
                let bt = self.inblossom[t];
                s = self.endpoint[self.labelend[bt]];
                let j = self.endpoint[self.labelend[bt] ^ 1];
                if bt >= self.n {
                    self.augment_blossom(bt, j);
                }
                self.mate[j] = self.labelend[bt];
                p = self.labelend[bt] ^ 1;
            }
        }
    }

    fn solve(&mut self, max_cardinality: bool) {
        let n = self.n;
        // each stage either augments the matching by one edge or ends the search
        for _ in 0..n {
            self.label.fill(0);
            self.bestedge.fill(NONE);
            for b in n..2 * n {
                self.blossombestedges[b] = None;
            }
            self.allowedge.fill(false);
            self.queue.clear();

            for v in 0..n {
                if self.mate[v] == NONE && self.label[self.inblossom[v]] == 0 {
                    self.assign_label(v, 1, NONE);
                }
            }

            let mut augmented = false;
            loop {
                while !augmented {
                    let Some(v) = self.queue.pop() else { break };
                    for idx in 0..self.neighbend[v].len() {
                        let p = self.neighbend[v][idx];
                        let k = p / 2;
                        let w = self.endpoint[p];
                        if self.inblossom[v] == self.inblossom[w] {
                            continue;
                        }
                        let mut kslack = 0;
                        if !self.allowedge[k] {
                            kslack = self.slack(k);
                            if kslack <= 0 {
                                self.allowedge[k] = true;
                            }
                        }
                        if self.allowedge[k] {
                            if self.label[self.inblossom[w]] == 0 {
                                self.assign_label(w, 2, p ^ 1);
                            } else if self.label[self.inblossom[w]] == 1 {
                                let base = self.scan_blossom(v, w);
                                if base != NONE {
                                    self.add_blossom(base, k);
                                } else {
                                    self.augment_matching(k);
                                    augmented = true;
                                    break;
                                }
                            } else if self.label[w] == 0 {
                                // w is inside a T-blossom but not yet reached
                                self.label[w] = 2;
                                self.labelend[w] = p ^ 1;
                            }
                        } else if self.label[self.inblossom[w]] == 1 {
                            let b = self.inblossom[v];
                            if self.bestedge[b] == NONE || kslack < self.slack(self.bestedge[b]) {
                                self.bestedge[b] = k;
                            }
                        } else if self.label[w] == 0 {
                            if self.bestedge[w] == NONE || kslack < self.slack(self.bestedge[w]) {
                                self.bestedge[w] = k;
                            }
                        }
                    }
                }
                if augmented {
                    break;
                }

                // no augmenting path with the current duals: pick the
                // smallest dual adjustment that makes progress
                let mut deltatype = -1;
                let mut delta = 0i64;
                let mut deltaedge = NONE;
                let mut deltablossom = NONE;

                if !max_cardinality {
                    deltatype = 1;
                    delta = self.dualvar[..n].iter().copied().min().unwrap_or(0);
                }
                for v in 0..n {
                    if self.label[self.inblossom[v]] == 0 && self.bestedge[v] != NONE {
                        let d = self.slack(self.bestedge[v]);
                        if deltatype == -1 || d < delta {
                            delta = d;
                            deltatype = 2;
                            deltaedge = self.bestedge[v];
                        }
                    }
                }
                for b in 0..2 * n {
                    if self.blossomparent[b] == NONE
                        && self.label[b] == 1
                        && self.bestedge[b] != NONE
                    {
                        let kslack = self.slack(self.bestedge[b]);
                        debug_assert!(kslack % 2 == 0, "S-S slack must be even");
                        let d = kslack / 2;
                        if deltatype == -1 || d < delta {
                            delta = d;
                            deltatype = 3;
                            deltaedge = self.bestedge[b];
                        }
                    }
                }
                for b in n..2 * n {
                    if self.blossombase[b] != NONE
                        && self.blossomparent[b] == NONE
                        && self.label[b] == 2
                        && (deltatype == -1 || self.dualvar[b] < delta)
                    {
                        delta = self.dualvar[b];
                        deltatype = 4;
                        deltablossom = b;
                    }
                }
                if deltatype == -1 {
                    // maximum cardinality reached; finish with a vertex-dual step
                    deltatype = 1;
                    delta = self.dualvar[..n].iter().copied().min().unwrap_or(0).max(0);
                }

                for v in 0..n {
                    match self.label[self.inblossom[v]] {
                        1 => self.dualvar[v] -= delta,
                        2 => self.dualvar[v] += delta,
                        _ => {}
                    }
                }
                for b in n..2 * n {
                    if self.blossombase[b] != NONE && self.blossomparent[b] == NONE {
                        match self.label[b] {
                            1 => self.dualvar[b] += delta,
                            2 => self.dualvar[b] -= delta,
                            _ => {}
                        }
                    }
                }

                match deltatype {
                    1 => break,
                    2 => {
                        self.allowedge[deltaedge] = true;
                        let (i, j, _) = self.edges[deltaedge];
                        let i = if self.label[self.inblossom[i]] == 0 { j } else { i };
                        self.queue.push(i);
                    }
                    3 => {
                        self.allowedge[deltaedge] = true;
                        let (i, _, _) = self.edges[deltaedge];
                        self.queue.push(i);
                    }
                    _ => self.expand_blossom(deltablossom, false),
                }
            }

            if !augmented {
                break;
            }

            // blossoms whose dual dropped to zero are no longer useful
            for b in n..2 * n {
                if self.blossomparent[b] == NONE
                    && self.blossombase[b] != NONE
                    && self.label[b] == 1
                    && self.dualvar[b] == 0
                {
                    self.expand_blossom(b, true);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::ToricLattice;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Exhaustive best matching: maximises (cardinality, weight) when
    /// `max_cardinality`, weight alone otherwise.
    fn brute_force_best(n: usize, edges: &[(usize, usize, i64)], max_cardinality: bool) -> (usize, i64) {
        fn go(
            v: usize,
            n: usize,
            adj: &[Vec<(usize, i64)>],
            used: &mut Vec<bool>,
            max_cardinality: bool,
        ) -> (usize, i64) {
            if v == n {
                return (0, 0);
            }
            if used[v] {
                return go(v + 1, n, adj, used, max_cardinality);
            }
            let better = |a: (usize, i64), b: (usize, i64)| {
                if max_cardinality {
                    a > b
                } else {
                    a.1 > b.1
                }
            };
            let mut best = go(v + 1, n, adj, used, max_cardinality);
            used[v] = true;
            for &(u, w) in &adj[v] {
                if !used[u] {
                    used[u] = true;
                    let (c, s) = go(v + 1, n, adj, used, max_cardinality);
                    let cand = (c + 1, s + w);
                    if better(cand, best) {
                        best = cand;
                    }
                    used[u] = false;
                }
            }
            used[v] = false;
            best
        }
        let mut adj = vec![Vec::new(); n];
        for &(i, j, w) in edges {
            adj[i].push((j, w));
            adj[j].push((i, w));
        }
        go(0, n, &adj, &mut vec![false; n], max_cardinality)
    }

    fn score(edges: &[(usize, usize, i64)], mate: &[Option<usize>]) -> (usize, i64) {
        let mut count = 0;
        let mut total = 0;
        for (v, m) in mate.iter().enumerate() {
            if let Some(u) = *m {
                assert_eq!(mate[u], Some(v), "mate relation must be symmetric");
                if v < u {
                    let w = edges
                        .iter()
                        .find(|e| (e.0 == v && e.1 == u) || (e.0 == u && e.1 == v))
                        .expect("matched pair must be an edge")
                        .2;
                    count += 1;
                    total += w;
                }
            }
        }
        (count, total)
    }

    fn check_against_brute_force(n: usize, edges: &[(usize, usize, i64)]) {
        for max_cardinality in [false, true] {
            let mate = max_weight_matching(n, edges, max_cardinality).unwrap();
            let got = score(edges, &mate);
            let want = brute_force_best(n, edges, max_cardinality);
            if max_cardinality {
                assert_eq!(got, want, "edges {:?}", edges);
            } else {
                assert_eq!(got.1, want.1, "edges {:?}", edges);
            }
        }
    }

    #[test]
    fn test_empty_and_single_edge() {
        assert!(max_weight_matching(0, &[], false).unwrap().is_empty());
        assert_eq!(max_weight_matching(3, &[], true).unwrap(), vec![None; 3]);
        assert_eq!(max_weight_matching(2, &[(0, 1, 1)], false).unwrap(), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_path_prefers_heavier_middle() {
        // 0 is isolated; 1-2-3 path, middle edge wins
        let mate = max_weight_matching(4, &[(1, 2, 10), (2, 3, 11)], false).unwrap();
        assert_eq!(mate, vec![None, None, Some(3), Some(2)]);
    }

    #[test]
    fn test_max_cardinality_overrides_weight() {
        let edges = [(1, 2, 2), (1, 3, -2), (2, 3, 1), (2, 4, -1), (3, 4, -6)];
        let mate = max_weight_matching(5, &edges, false).unwrap();
        assert_eq!(mate, vec![None, Some(2), Some(1), None, None]);
        let mate = max_weight_matching(5, &edges, true).unwrap();
        assert_eq!(mate, vec![None, Some(3), Some(4), Some(1), Some(2)]);
    }

    #[test]
    fn test_s_blossom() {
        let edges = [(1, 2, 8), (1, 3, 9), (2, 3, 10), (3, 4, 7)];
        let mate = max_weight_matching(5, &edges, false).unwrap();
        assert_eq!(mate, vec![None, Some(2), Some(1), Some(4), Some(3)]);
    }

    #[test]
    fn test_blossom_stress_graphs() {
        let cases: Vec<(usize, Vec<(usize, usize, i64)>)> = vec![
            (7, vec![(1, 2, 8), (1, 3, 9), (2, 3, 10), (3, 4, 7), (1, 6, 5), (4, 5, 6)]),
            (7, vec![(1, 2, 9), (1, 3, 8), (2, 3, 10), (1, 4, 5), (4, 5, 4), (1, 6, 3)]),
            (7, vec![(1, 2, 9), (1, 3, 9), (2, 3, 10), (2, 4, 8), (3, 5, 8), (4, 5, 10), (5, 6, 6)]),
            (
                9,
                vec![
                    (1, 2, 10), (1, 7, 10), (2, 3, 12), (3, 4, 20), (3, 5, 20),
                    (4, 5, 25), (5, 6, 10), (6, 7, 10), (7, 8, 8),
                ],
            ),
            (
                9,
                vec![
                    (1, 2, 8), (1, 3, 8), (2, 3, 10), (2, 4, 12), (3, 5, 12),
                    (4, 5, 14), (4, 6, 12), (5, 7, 12), (6, 7, 14), (7, 8, 12),
                ],
            ),
            (
                9,
                vec![
                    (1, 2, 23), (1, 5, 22), (1, 6, 15), (2, 3, 25),
                    (3, 4, 22), (4, 5, 25), (4, 8, 14), (5, 7, 13),
                ],
            ),
            (
                11,
                vec![
                    (1, 2, 45), (1, 5, 45), (2, 3, 50), (3, 4, 45), (4, 5, 50),
                    (1, 6, 30), (3, 9, 35), (4, 8, 35), (5, 7, 26), (9, 10, 5),
                ],
            ),
            (
                13,
                vec![
                    (1, 2, 45), (1, 7, 45), (2, 3, 50), (3, 4, 45), (4, 5, 95),
                    (4, 6, 94), (5, 6, 94), (6, 7, 50), (1, 8, 30), (3, 11, 35),
                    (5, 9, 36), (7, 10, 26), (11, 12, 5),
                ],
            ),
            (
                11,
                vec![
                    (1, 2, 40), (1, 3, 40), (2, 3, 60), (2, 4, 55), (3, 5, 55),
                    (4, 5, 50), (1, 8, 15), (5, 7, 30), (7, 6, 10), (8, 10, 10),
                    (4, 9, 30),
                ],
            ),
        ];
        for (n, edges) in &cases {
            check_against_brute_force(*n, edges);
        }
    }

    #[test]
    fn test_random_graphs_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..300 {
            let n = rng.gen_range(2..=10);
            let mut edges = Vec::new();
            for i in 0..n {
                for j in (i + 1)..n {
                    if rng.gen_bool(0.6) {
                        edges.push((i, j, rng.gen_range(0..20)));
                    }
                }
            }
            check_against_brute_force(n, &edges);
        }
    }

    /// Minimum total weight over all perfect matchings of `graph`.
    fn brute_force_min_perfect(graph: &DefectGraph) -> usize {
        fn go(rest: &[usize], graph: &DefectGraph) -> usize {
            match rest {
                [] => 0,
                [first, tail @ ..] => (0..tail.len())
                    .map(|i| {
                        let mut remaining = tail.to_vec();
                        let partner = remaining.remove(i);
                        graph.weight(*first, partner).unwrap() + go(&remaining, graph)
                    })
                    .min()
                    .unwrap(),
            }
        }
        go(graph.nodes(), graph)
    }

    /// Optimal perfect matching that pairs the lowest defect with its lowest
    /// possible partner, then the next lowest, and so on.
    fn brute_force_lowest_first(graph: &DefectGraph) -> Vec<(usize, usize)> {
        fn go(
            rest: &[usize],
            graph: &DefectGraph,
            best: &mut Option<(usize, Vec<(usize, usize)>)>,
            acc: &mut Vec<(usize, usize)>,
            w: usize,
        ) {
            match rest {
                [] => {
                    // enumeration order is lowest-first, so keep the first optimum
                    if best.as_ref().map_or(true, |(bw, _)| w < *bw) {
                        *best = Some((w, acc.clone()));
                    }
                }
                [first, tail @ ..] => {
                    for i in 0..tail.len() {
                        let mut remaining = tail.to_vec();
                        let partner = remaining.remove(i);
                        acc.push((*first, partner));
                        go(&remaining, graph, best, acc, w + graph.weight(*first, partner).unwrap());
                        acc.pop();
                    }
                }
            }
        }
        let mut sorted = graph.nodes().to_vec();
        sorted.sort_unstable();
        let mut best = None;
        go(&sorted, graph, &mut best, &mut Vec::new(), 0);
        best.unwrap().1
    }

    #[test]
    fn test_invalid_edges_rejected() {
        assert_eq!(
            max_weight_matching(3, &[(1, 1, 4)], false),
            Err(DecoderError::InvalidMatchingEdge { u: 1, v: 1, n: 3 })
        );
        assert_eq!(
            max_weight_matching(3, &[(0, 3, 4)], true),
            Err(DecoderError::InvalidMatchingEdge { u: 0, v: 3, n: 3 })
        );
        assert_eq!(
            max_weight_matching(3, &[(0, 2, 4), (2, 0, 1)], true),
            Err(DecoderError::InvalidMatchingEdge { u: 2, v: 0, n: 3 })
        );
    }

    #[test]
    fn test_ties_pair_lowest_defect_with_lowest_partner() {
        let lat = ToricLattice::new(4, 4).unwrap();
        // (0,1)+(2,3) and (0,3)+(1,2) both weigh 2 along row 0
        let g = lat.marked_stars_graph(&[3, 2, 1, 0]).unwrap();
        let m = min_weight_perfect_matching(&g).unwrap();
        assert_eq!(m.pairs(), &[(0, 1), (2, 3)]);
        assert_eq!(m.weight(), 2);
        // (0,1)+(4,5) and (0,4)+(1,5) both weigh 2 on a 2x2 block
        let g = lat.marked_plaquettes_graph(&[0, 1, 4, 5]).unwrap();
        let m = min_weight_perfect_matching(&g).unwrap();
        assert_eq!(m.pairs(), &[(0, 1), (4, 5)]);
        assert_eq!(m.weight(), 2);
    }

    #[test]
    fn test_odd_defect_count_rejected() {
        let lat = ToricLattice::new(3, 3).unwrap();
        let g = lat.marked_stars_graph(&[0, 1, 2]).unwrap();
        assert_eq!(
            min_weight_perfect_matching(&g),
            Err(DecoderError::OddDefectCount(3))
        );
    }

    #[test]
    fn test_no_defects_empty_matching() {
        let lat = ToricLattice::new(3, 3).unwrap();
        let g = lat.marked_plaquettes_graph(&[]).unwrap();
        let m = min_weight_perfect_matching(&g).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.weight(), 0);
        assert_eq!(m.kind(), CellKind::Plaquette);
    }

    #[test]
    fn test_two_defects_matched_together() {
        let lat = ToricLattice::new(3, 3).unwrap();
        let g = lat.marked_stars_graph(&[4, 0]).unwrap();
        let m = min_weight_perfect_matching(&g).unwrap();
        assert_eq!(m.pairs(), &[(0, 4)]);
        assert_eq!(m.weight(), 2);
        assert!(m.contains(4, 0));
    }

    #[test]
    fn test_four_defects_on_three_by_three() {
        // (0,0) (0,1) (2,0) (2,2); (2,0)-(2,2) are neighbours through the
        // column seam
        let lat = ToricLattice::new(3, 3).unwrap();
        let g = lat.marked_plaquettes_graph(&[0, 1, 6, 8]).unwrap();
        let m = min_weight_perfect_matching(&g).unwrap();
        assert_eq!(m.weight(), brute_force_min_perfect(&g));
        assert_eq!(m.weight(), 2);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_not_greedy() {
        // closest-pair-first takes (3,4) and is left with (0,7): 1 + 7 = 8.
        // the optimum is (0,3) + (4,7) = 6
        let lat = ToricLattice::new(1, 20).unwrap();
        let g = lat.marked_stars_graph(&[0, 3, 4, 7]).unwrap();
        let m = min_weight_perfect_matching(&g).unwrap();
        assert_eq!(m.weight(), brute_force_min_perfect(&g));
        assert_eq!(m.pairs(), &[(0, 3), (4, 7)]);
    }

    #[test]
    fn test_random_defects_optimal() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let rows = rng.gen_range(2..=6);
            let cols = rng.gen_range(2..=6);
            let lat = ToricLattice::new(rows, cols).unwrap();
            let mut cells: Vec<usize> = (0..lat.num_cells()).collect();
            let count = 2 * rng.gen_range(1..=4usize).min(lat.num_cells() / 2);
            let mut marked = Vec::with_capacity(count);
            for _ in 0..count {
                let i = rng.gen_range(0..cells.len());
                marked.push(cells.swap_remove(i));
            }
            let g = lat.marked_stars_graph(&marked).unwrap();
            let m = min_weight_perfect_matching(&g).unwrap();
            assert_eq!(m.len() * 2, count);
            assert_eq!(m.weight(), brute_force_min_perfect(&g), "marked {:?}", marked);
            assert_eq!(m.pairs(), brute_force_lowest_first(&g).as_slice(), "marked {:?}", marked);
            let mut covered: Vec<usize> = m.pairs().iter().flat_map(|&(a, b)| [a, b]).collect();
            covered.sort_unstable();
            marked.sort_unstable();
            assert_eq!(covered, marked);
        }
    }

    #[test]
    fn test_deterministic_regardless_of_input_order() {
        let lat = ToricLattice::new(4, 4).unwrap();
        let a = lat.marked_stars_graph(&[0, 2, 8, 10]).unwrap();
        let b = lat.marked_stars_graph(&[10, 8, 2, 0]).unwrap();
        assert_eq!(
            min_weight_perfect_matching(&a).unwrap(),
            min_weight_perfect_matching(&b).unwrap()
        );
    }
}
