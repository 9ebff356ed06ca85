/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Random graphs.

use super::CsrGraph;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Provides seeded random graphs with a given average outdegree.
///
/// Each node picks a number of successors uniformly at random in
/// [0 . . 2*d*], where *d* is the average outdegree, and then picks each
/// successor uniformly at random among all nodes (loops and duplicate arcs
/// are possible, and they are kept). Differently from the Erdös-Rényi model,
/// generation is linear in the number of arcs, so it is suitable for graphs
/// with hundreds of thousands of nodes.
///
/// The same seed always yields the same graph.
#[derive(Debug, Clone)]
pub struct UniformRandom {
    n: usize,
    avg_outdegree: usize,
    seed: u64,
}

impl UniformRandom {
    /// Creates a new random graph generator, given the number of nodes, the
    /// average outdegree, and a seed for the [pseudorandom number
    /// generator](SmallRng).
    pub fn new(n: usize, avg_outdegree: usize, seed: u64) -> Self {
        Self {
            n,
            avg_outdegree,
            seed,
        }
    }

    /// Returns the arcs of the graph.
    pub fn arcs(&self) -> Vec<(usize, usize)> {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut arcs = Vec::with_capacity(self.n * self.avg_outdegree);
        if self.n == 0 {
            return arcs;
        }
        for src in 0..self.n {
            let d = rng.random_range(0..=2 * self.avg_outdegree);
            for _ in 0..d {
                arcs.push((src, rng.random_range(0..self.n)));
            }
        }
        arcs
    }

    /// Builds the [CSR representation of the transpose](CsrGraph) of the
    /// graph.
    pub fn build(&self) -> CsrGraph {
        CsrGraph::from_arcs(self.n, self.arcs())
    }
}
