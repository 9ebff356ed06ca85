/*
 * SPDX-FileCopyrightText: 2024 Matteo Dell'Acqua
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Strongly connected components.
//!
//! Ranking a graph component by component, in topological order, makes
//! upstream components converge before the components they feed into are
//! processed. This module computes the components of a [`CsrView`] using
//! Kosaraju's algorithm, numbering them in topological order, and provides the
//! renumbering of the nodes that makes components contiguous.
//!
//! # Examples
//! ```
//! use dsi_progress_logger::no_logging;
//! use barrierfree_pagerank::graphs::CsrGraph;
//! use barrierfree_pagerank::sccs::*;
//!
//! let graph = CsrGraph::from_arcs(4, [(0, 1), (1, 2), (2, 0), (1, 3)]);
//! let sccs = kosaraju(&graph, no_logging![]);
//!
//! assert_eq!(sccs.num_components(), 2);
//! assert_eq!(sccs.components(), &[0, 0, 0, 1]);
//! assert_eq!(sccs.compute_sizes(), vec![3, 1].into_boxed_slice());
//! ```

use crate::graphs::CsrView;
use dsi_progress_logger::ProgressLog;

/// Strongly connected components.
///
/// An instance of this structure stores the [index of the
/// component](Sccs::components) of each node. Components are numbered from 0 to
/// [`num_components`](Sccs::num_components).
pub struct Sccs {
    num_components: usize,
    components: Box<[usize]>,
}

impl Sccs {
    pub fn new(num_components: usize, components: Box<[usize]>) -> Self {
        Sccs {
            num_components,
            components,
        }
    }

    /// Returns the number of strongly connected components.
    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// Returns a slice containing, for each node, the index of the component
    /// it belongs to.
    #[inline(always)]
    pub fn components(&self) -> &[usize] {
        &self.components
    }

    /// Returns the sizes of all components.
    pub fn compute_sizes(&self) -> Box<[usize]> {
        let mut sizes = vec![0; self.num_components()];
        for &node_component in self.components() {
            sizes[node_component] += 1;
        }
        sizes.into_boxed_slice()
    }

    /// Returns a permutation of the nodes that makes components contiguous
    /// and sorted by component index.
    ///
    /// Node *v* is mapped to `perm[v]`; within a component the relative order
    /// of the nodes is preserved.
    pub fn order(&self) -> Box<[usize]> {
        // Counting sort on component indices
        let sizes = self.compute_sizes();
        let mut next = vec![0; self.num_components];
        let mut acc = 0;
        for (n, &s) in next.iter_mut().zip(sizes.iter()) {
            *n = acc;
            acc += s;
        }
        self.components
            .iter()
            .map(|&c| {
                let pos = next[c];
                next[c] += 1;
                pos
            })
            .collect()
    }
}

/// Returns the successor lists of the graph underlying a [`CsrView`] in CSR
/// form (offsets, targets).
///
/// Successors are counted on [`sources`](CsrView::sources), as the view is
/// not required to report outdegrees matching its arcs.
fn successors(graph: &impl CsrView) -> (Box<[usize]>, Box<[usize]>) {
    let num_nodes = graph.num_nodes();
    let mut offsets = vec![0; num_nodes + 1];
    for &u in graph.sources() {
        offsets[u + 1] += 1;
    }
    for v in 0..num_nodes {
        offsets[v + 1] += offsets[v];
    }
    let mut cursor = offsets[..num_nodes].to_vec();
    let mut targets = vec![0; graph.sources().len()];
    for v in 0..num_nodes {
        for &u in graph.predecessors(v) {
            targets[cursor[u]] = v;
            cursor[u] += 1;
        }
    }
    (offsets.into(), targets.into())
}

/// Computes the strongly connected components of the graph underlying a
/// [`CsrView`] using Kosaraju's algorithm.
///
/// Components are numbered in topological order: if there is an arc from a
/// node of component *i* to a node of component *j* ≠ *i*, then *i* < *j*.
///
/// Both visits are iterative, so deep graphs do not overflow the stack.
pub fn kosaraju(graph: &impl CsrView, pl: &mut impl ProgressLog) -> Sccs {
    let num_nodes = graph.num_nodes();
    pl.item_name("node");
    pl.expected_updates(Some(2 * num_nodes));
    pl.start("Computing strongly connected components...");

    let (offsets, targets) = successors(graph);

    // First visit, on the graph: nodes in order of completion
    let mut finished = Vec::with_capacity(num_nodes);
    let mut seen = vec![false; num_nodes];
    let mut stack: Vec<(usize, usize)> = vec![];
    for root in 0..num_nodes {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        pl.light_update();
        stack.push((root, offsets[root]));
        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            if *next < offsets[node + 1] {
                let succ = targets[*next];
                *next += 1;
                if !seen[succ] {
                    seen[succ] = true;
                    pl.light_update();
                    stack.push((succ, offsets[succ]));
                }
            } else {
                finished.push(node);
                stack.pop();
            }
        }
    }

    // Second visit, on the transpose, in reverse completion order
    const UNASSIGNED: usize = usize::MAX;
    let mut components = vec![UNASSIGNED; num_nodes].into_boxed_slice();
    let mut number_of_components = 0;
    let mut to_visit = vec![];
    for &root in finished.iter().rev() {
        if components[root] != UNASSIGNED {
            continue;
        }
        components[root] = number_of_components;
        to_visit.push(root);
        while let Some(node) = to_visit.pop() {
            pl.light_update();
            for &pred in graph.predecessors(node) {
                if components[pred] == UNASSIGNED {
                    components[pred] = number_of_components;
                    to_visit.push(pred);
                }
            }
        }
        number_of_components += 1;
    }

    pl.done();

    Sccs::new(number_of_components, components)
}
