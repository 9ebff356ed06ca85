/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Compressed sparse-row views of graphs.
//!
//! The rank engines need to enumerate the _predecessors_ of a node, so what
//! they consume is the CSR representation of the **transpose** of the graph,
//! together with the outdegree of each node in the original graph (which is
//! used to compute contribution factors and to detect dead ends). The
//! [`CsrView`] trait exposes exactly this, and nothing more: any structure
//! providing a degree-cumulative function, a flat array of sources and
//! outdegrees can be ranked.
//!
//! [`CsrGraph`] is an owned implementation that can be built from a list of
//! arcs, and [`random`] and [`arcs`] provide ways to obtain one.

use thiserror::Error;

pub mod arcs;
pub mod random;

mod csr_graph;
pub use csr_graph::{permute, CsrGraph};

/// A compressed sparse-row view of the transpose of a graph.
///
/// Implementations must guarantee that [`offsets`](CsrView::offsets) has
/// length [`num_nodes`](CsrView::num_nodes) + 1, is non-decreasing, starts
/// from zero and ends at the length of [`sources`](CsrView::sources), and
/// that every source is smaller than the number of nodes.
///
/// [`outdegree`](CsrView::outdegree) is not required to match the number of
/// occurrences of a node in the sources: it is the outdegree in the original
/// graph, of which the view might expose only some arcs.
pub trait CsrView: Sync {
    /// Returns the number of nodes.
    fn num_nodes(&self) -> usize;

    /// Returns the degree-cumulative function of the transpose: the arcs
    /// entering node *v* are `sources()[offsets()[v]..offsets()[v + 1]]`.
    fn offsets(&self) -> &[usize];

    /// Returns the flat array of sources of the arcs.
    fn sources(&self) -> &[usize];

    /// Returns the outdegree of `node` in the original graph.
    fn outdegree(&self, node: usize) -> usize;

    /// Returns the number of arcs.
    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.sources().len() as u64
    }

    /// Returns the predecessors of `node`.
    #[inline(always)]
    fn predecessors(&self, node: usize) -> &[usize] {
        let offsets = self.offsets();
        &self.sources()[offsets[node]..offsets[node + 1]]
    }

    /// Returns true if `node` has no outgoing arcs.
    #[inline(always)]
    fn is_dead_end(&self, node: usize) -> bool {
        self.outdegree(node) == 0
    }
}

impl<G: CsrView + ?Sized> CsrView for &G {
    fn num_nodes(&self) -> usize {
        (**self).num_nodes()
    }

    fn offsets(&self) -> &[usize] {
        (**self).offsets()
    }

    fn sources(&self) -> &[usize] {
        (**self).sources()
    }

    fn outdegree(&self, node: usize) -> usize {
        (**self).outdegree(node)
    }
}

/// Errors that can occur while building or loading a graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The degree-cumulative function does not have length *n* + 1.
    #[error("The offsets have length {got}, expected {expected}")]
    OffsetsLength { expected: usize, got: usize },

    /// The degree-cumulative function is not a valid one.
    #[error("The offsets are not monotone or do not match the sources at node {node}")]
    Offsets { node: usize },

    /// An arc has an endpoint outside of the node range.
    #[error("Node {node} is out of range (the graph has {num_nodes} nodes)")]
    NodeOutOfRange { node: usize, num_nodes: usize },

    /// The outdegrees are not consistent with the sources.
    #[error("The outdegree of node {node} is {got}, but the sources imply {expected}")]
    Outdegree {
        node: usize,
        expected: usize,
        got: usize,
    },

    /// A line of an arc list could not be parsed.
    #[error("Line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
