/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The pull kernel.
//!
//! The new rank of a node *v* is *c*₀ + ∑_(*u* → *v*) *r*(*u*) *f*(*u*), where
//! *f*(*u*) is the damping factor divided by the outdegree of *u* (zero for
//! dead ends) and *c*₀ is the teleport term, that is, (1 − α) / *n*, plus, if
//! the rank of dead ends is redistributed, α / *n* times the rank of dead
//! ends.

use crate::graphs::CsrView;
use kahan::KahanSum;
use sync_cell_slice::SyncCell;

pub(crate) struct Kernel<'a, G: CsrView> {
    graph: &'a G,
    dead_ends: Box<[usize]>,
    damping: f64,
    dead_end_aware: bool,
}

impl<'a, G: CsrView> Kernel<'a, G> {
    pub(crate) fn new(graph: &'a G, damping: f64, dead_end_aware: bool) -> Self {
        let dead_ends = if dead_end_aware {
            (0..graph.num_nodes())
                .filter(|&v| graph.is_dead_end(v))
                .collect()
        } else {
            Box::default()
        };
        log::debug!("{} dead ends", dead_ends.len());
        Self {
            graph,
            dead_ends,
            damping,
            dead_end_aware,
        }
    }

    /// Returns the teleport term given a way to read the current ranks.
    ///
    /// With no dead ends, the result is exactly (1 − α) / *n* also when dead
    /// ends are redistributed.
    pub(crate) fn teleport(&self, rank: impl Fn(usize) -> f64) -> f64 {
        let n = self.graph.num_nodes() as f64;
        let base = (1.0 - self.damping) / n;
        if !self.dead_end_aware {
            return base;
        }
        let mut dead_end_rank = KahanSum::<f64>::new();
        for &u in self.dead_ends.iter() {
            dead_end_rank += rank(u);
        }
        base + self.damping * dead_end_rank.sum() / n
    }

    /// Returns the new rank of `v` given the contributions *r*(*u*) *f*(*u*).
    #[inline(always)]
    pub(crate) fn from_contributions(&self, v: usize, teleport: f64, contrib: &[f64]) -> f64 {
        teleport
            + self
                .graph
                .predecessors(v)
                .iter()
                .map(|&u| contrib[u])
                .sum::<f64>()
    }

    /// Returns the new rank of `v` given the ranks and the factors.
    #[inline(always)]
    pub(crate) fn from_ranks(
        &self,
        v: usize,
        teleport: f64,
        rank: &[f64],
        factors: &[f64],
    ) -> f64 {
        teleport
            + self
                .graph
                .predecessors(v)
                .iter()
                .map(|&u| rank[u] * factors[u])
                .sum::<f64>()
    }

    /// Returns the new rank of `v` given a way to read the current rank of
    /// each predecessor, and the factors.
    #[inline(always)]
    pub(crate) fn from_rank_fn(
        &self,
        v: usize,
        teleport: f64,
        rank: impl Fn(usize) -> f64,
        factors: &[f64],
    ) -> f64 {
        teleport
            + self
                .graph
                .predecessors(v)
                .iter()
                .map(|&u| rank(u) * factors[u])
                .sum::<f64>()
    }

    /// Returns the new rank of `v` given shared ranks.
    ///
    /// # Safety
    ///
    /// Other threads may write the ranks of predecessors concurrently: these
    /// are benign data races, as each read sees either an old or a new value.
    #[inline(always)]
    pub(crate) unsafe fn from_shared_ranks(
        &self,
        v: usize,
        teleport: f64,
        rank: &[SyncCell<f64>],
        factors: &[f64],
    ) -> f64 {
        teleport
            + self
                .graph
                .predecessors(v)
                .iter()
                .map(|&u| rank[u].get() * factors[u])
                .sum::<f64>()
    }
}
