/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::buffers::RankBuffers;
use super::kernel::Kernel;
use super::{Options, PageRankResult, UpdateOrder, Worker};
use crate::graphs::CsrView;
use dsi_progress_logger::ProgressLog;

/// Runs the iteration in the current thread.
///
/// This is the reference engine: with unordered updates it performs the
/// power method, with ordered updates a Gauss–Seidel iteration.
pub(crate) fn run<G: CsrView>(
    graph: &G,
    mut buffers: RankBuffers,
    options: &Options,
    pl: &mut impl ProgressLog,
) -> PageRankResult {
    let n = graph.num_nodes();
    let kernel = Kernel::new(graph, options.damping, options.dead_end_aware);
    let norm = options.tolerance_norm;
    let mut worker = Worker::new(0, options.seed, options.load_injector());
    let mut history = vec![];
    let mut error = f64::INFINITY;

    pl.item_name("iteration");
    pl.expected_updates(Some(options.max_iterations));
    pl.start(format!(
        "Computing ranks sequentially ({} updates)...",
        options.update
    ));

    while history.len() < options.max_iterations {
        let teleport = kernel.teleport(|u| buffers.r[u]);

        error = match options.update {
            UpdateOrder::Unordered => {
                buffers.update_contributions_seq();
                for v in 0..n {
                    worker.stall();
                    buffers.a[v] = kernel.from_contributions(v, teleport, &buffers.c);
                }
                let error = norm.distance(&buffers.a, &buffers.r);
                buffers.swap();
                error
            }
            UpdateOrder::Ordered => {
                let mut accum = norm.accum();
                for v in 0..n {
                    worker.stall();
                    let new_rank = kernel.from_ranks(v, teleport, &buffers.r, &buffers.f);
                    accum.add(buffers.r[v], new_rank);
                    buffers.r[v] = new_rank;
                }
                accum.value()
            }
        };

        history.push(error);
        log::debug!("Iteration {}: error = {}", history.len(), error);
        pl.update_and_display();

        if error < options.tolerance {
            break;
        }
    }

    pl.done();

    PageRankResult {
        ranks: buffers.r,
        iterations: history.len(),
        error,
        history,
        ..Default::default()
    }
}
