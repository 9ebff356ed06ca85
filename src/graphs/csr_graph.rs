/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{CsrView, GraphError};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// An owned compressed sparse-row representation of the transpose of a graph.
///
/// It stores the degree-cumulative function (DCF) of the transpose, that is,
/// a sequence of offsets indicating the start of the predecessors of each
/// node, the flat array of predecessors, and the outdegree of each node in
/// the original graph. Predecessor lists built by this structure are sorted.
///
/// # Examples
///
/// ```
/// use barrierfree_pagerank::graphs::{CsrGraph, CsrView};
///
/// // 0 → 1, 0 → 2, 1 → 2, 2 → 0
/// let g = CsrGraph::from_arcs(3, [(0, 1), (0, 2), (1, 2), (2, 0)]);
/// assert_eq!(g.num_nodes(), 3);
/// assert_eq!(g.predecessors(2), &[0, 1]);
/// assert_eq!(g.outdegree(0), 2);
/// ```
pub struct CsrGraph {
    dcf: Box<[usize]>,
    sources: Box<[usize]>,
    outdegrees: Box<[usize]>,
}

impl core::default::Default for CsrGraph {
    fn default() -> Self {
        Self {
            dcf: vec![0].into(),
            sources: vec![].into(),
            outdegrees: vec![].into(),
        }
    }
}

impl CsrGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with `num_nodes` nodes from a list of arcs of the
    /// **original** graph, given as (source, target) pairs.
    ///
    /// Duplicate arcs are kept, and they contribute to the outdegree.
    ///
    /// # Panics
    ///
    /// Panics if an endpoint is not smaller than `num_nodes`.
    pub fn from_arcs(num_nodes: usize, arcs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let arcs: Vec<(usize, usize)> = arcs.into_iter().collect();
        let mut dcf = vec![0; num_nodes + 1];
        let mut outdegrees = vec![0; num_nodes];

        for &(src, dst) in &arcs {
            assert!(
                src < num_nodes && dst < num_nodes,
                "Arc ({src}, {dst}) is out of range (the graph has {num_nodes} nodes)"
            );
            dcf[dst + 1] += 1;
            outdegrees[src] += 1;
        }
        for i in 0..num_nodes {
            dcf[i + 1] += dcf[i];
        }

        let mut cursor = dcf[..num_nodes].to_vec();
        let mut sources = vec![0; arcs.len()];
        for &(src, dst) in &arcs {
            sources[cursor[dst]] = src;
            cursor[dst] += 1;
        }
        for v in 0..num_nodes {
            sources[dcf[v]..dcf[v + 1]].sort_unstable();
        }

        Self {
            dcf: dcf.into(),
            sources: sources.into(),
            outdegrees: outdegrees.into(),
        }
    }

    /// Creates a new CSR graph from the given degree-cumulative function,
    /// sources, and outdegrees, checking their consistency.
    pub fn try_from_parts(
        dcf: Box<[usize]>,
        sources: Box<[usize]>,
        outdegrees: Box<[usize]>,
    ) -> Result<Self, GraphError> {
        let num_nodes = outdegrees.len();
        if dcf.len() != num_nodes + 1 {
            return Err(GraphError::OffsetsLength {
                expected: num_nodes + 1,
                got: dcf.len(),
            });
        }
        if dcf[0] != 0 {
            return Err(GraphError::Offsets { node: 0 });
        }
        for v in 0..num_nodes {
            if dcf[v] > dcf[v + 1] {
                return Err(GraphError::Offsets { node: v });
            }
        }
        if dcf[num_nodes] != sources.len() {
            return Err(GraphError::Offsets { node: num_nodes });
        }

        let mut expected = vec![0; num_nodes];
        for &u in sources.iter() {
            if u >= num_nodes {
                return Err(GraphError::NodeOutOfRange { node: u, num_nodes });
            }
            expected[u] += 1;
        }
        for (node, (&expected, &got)) in expected.iter().zip(outdegrees.iter()).enumerate() {
            if expected != got {
                return Err(GraphError::Outdegree {
                    node,
                    expected,
                    got,
                });
            }
        }

        // SAFETY: we just checked all the invariants.
        Ok(unsafe { Self::from_parts(dcf, sources, outdegrees) })
    }

    /// Creates a new CSR graph from the given degree-cumulative function,
    /// sources, and outdegrees.
    ///
    /// # Safety
    /// The degree-cumulative function must be monotone and coherent with the
    /// sources, and the sources must be valid nodes. As for any [`CsrView`],
    /// the outdegrees need not be coherent with the sources.
    pub unsafe fn from_parts(
        dcf: Box<[usize]>,
        sources: Box<[usize]>,
        outdegrees: Box<[usize]>,
    ) -> Self {
        Self {
            dcf,
            sources,
            outdegrees,
        }
    }

    /// Returns the outdegrees of the nodes.
    pub fn outdegrees(&self) -> &[usize] {
        &self.outdegrees
    }

    pub fn into_inner(self) -> (Box<[usize]>, Box<[usize]>, Box<[usize]>) {
        (self.dcf, self.sources, self.outdegrees)
    }

    /// Returns a copy of this graph in which every node has a self-loop.
    ///
    /// Nodes that already have a self-loop are left untouched. After this
    /// transformation there are no dead ends.
    pub fn with_self_loops(&self) -> Self {
        let num_nodes = self.num_nodes();
        let mut arcs = Vec::with_capacity(self.sources.len() + num_nodes);
        for v in 0..num_nodes {
            let preds = self.predecessors(v);
            arcs.extend(preds.iter().map(|&u| (u, v)));
            if !preds.contains(&v) {
                arcs.push((v, v));
            }
        }
        Self::from_arcs(num_nodes, arcs)
    }

    /// Returns a copy of this graph with nodes renumbered by a permutation.
    ///
    /// Node *v* of this graph becomes node `perm[v]`.
    ///
    /// # Panics
    ///
    /// Panics if `perm` has not length equal to the number of nodes.
    pub fn permute(&self, perm: &[usize]) -> Self {
        permute(self, perm)
    }
}

/// Returns a renumbered copy of any [`CsrView`].
///
/// Node *v* of `graph` becomes node `perm[v]` of the result, with outdegree
/// `graph.outdegree(v)`.
pub fn permute(graph: &impl CsrView, perm: &[usize]) -> CsrGraph {
    let num_nodes = graph.num_nodes();
    assert_eq!(
        perm.len(),
        num_nodes,
        "The permutation has length {}, but the graph has {num_nodes} nodes",
        perm.len()
    );
    let mut dcf = vec![0; num_nodes + 1];
    let mut outdegrees = vec![0; num_nodes];
    for v in 0..num_nodes {
        dcf[perm[v] + 1] = graph.predecessors(v).len();
        outdegrees[perm[v]] = graph.outdegree(v);
    }
    for i in 0..num_nodes {
        dcf[i + 1] += dcf[i];
    }
    let mut sources = vec![0; graph.sources().len()];
    for v in 0..num_nodes {
        let w = perm[v];
        let preds = &mut sources[dcf[w]..dcf[w + 1]];
        for (s, &u) in preds.iter_mut().zip(graph.predecessors(v)) {
            *s = perm[u];
        }
        preds.sort_unstable();
    }
    // SAFETY: we permuted consistently the DCF and the sources.
    unsafe { CsrGraph::from_parts(dcf.into(), sources.into(), outdegrees.into()) }
}

impl CsrView for CsrGraph {
    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.outdegrees.len()
    }

    #[inline(always)]
    fn offsets(&self) -> &[usize] {
        &self.dcf
    }

    #[inline(always)]
    fn sources(&self) -> &[usize] {
        &self.sources
    }

    #[inline(always)]
    fn outdegree(&self, node: usize) -> usize {
        self.outdegrees[node]
    }
}
