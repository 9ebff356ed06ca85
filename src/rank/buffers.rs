/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graphs::CsrView;
use crate::utils::RAYON_MIN_LEN;
use rayon::prelude::*;

/// The vectors of a rank computation.
///
/// `r` contains the ranks of the previous pass (or the live ranks, when
/// updating in place), `a` the ranks of the current pass, `c` the
/// contributions *r*(*u*) *f*(*u*), and `f` the factors α / *d*⁺(*u*), or zero
/// for dead ends. Vectors are swapped, never copied, between passes.
pub(crate) struct RankBuffers {
    pub(crate) a: Box<[f64]>,
    pub(crate) r: Box<[f64]>,
    pub(crate) c: Box<[f64]>,
    pub(crate) f: Box<[f64]>,
}

impl RankBuffers {
    /// Allocates the vectors, setting `r` and `a` to the initial ranks (or to
    /// the uniform distribution) and computing the factors.
    pub(crate) fn new(graph: &impl CsrView, damping: f64, initial: Option<&[f64]>) -> Self {
        let n = graph.num_nodes();
        let r: Box<[f64]> = match initial {
            Some(initial) => initial.into(),
            None => vec![1.0 / n as f64; n].into(),
        };
        let f = (0..n)
            .into_par_iter()
            .with_min_len(RAYON_MIN_LEN)
            .map(|u| match graph.outdegree(u) {
                0 => 0.0,
                d => damping / d as f64,
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            a: r.clone(),
            r,
            c: vec![0.0; n].into(),
            f,
        }
    }

    /// Swaps the previous and the current ranks.
    pub(crate) fn swap(&mut self) {
        std::mem::swap(&mut self.a, &mut self.r);
    }

    /// Sets `c` to *r*(*u*) *f*(*u*).
    pub(crate) fn update_contributions(&mut self) {
        let (r, f) = (&self.r, &self.f);
        self.c
            .par_iter_mut()
            .with_min_len(RAYON_MIN_LEN)
            .enumerate()
            .for_each(|(u, c)| *c = r[u] * f[u]);
    }

    /// Sets `c` to *r*(*u*) *f*(*u*) without parallelism.
    pub(crate) fn update_contributions_seq(&mut self) {
        for ((c, &r), &f) in self.c.iter_mut().zip(self.r.iter()).zip(self.f.iter()) {
            *c = r * f;
        }
    }
}
