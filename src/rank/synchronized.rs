/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::buffers::RankBuffers;
use super::kernel::Kernel;
use super::{Options, PageRankResult, Scheduler, ThreadWork, UpdateOrder, Worker};
use crate::graphs::CsrView;
use crossbeam_utils::CachePadded;
use dsi_progress_logger::ProgressLog;
use rayon::ThreadPool;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;
use sync_cell_slice::SyncSlice;

/// Runs the iteration with all threads in lockstep.
///
/// Each pass is a broadcast on `pool`: threads claim chunks from a shared
/// cursor and, if helper stealing is enabled, steal from each other; the end
/// of the broadcast is the barrier after which the global error is computed.
/// With unordered updates the error is the distance between the new and the
/// old vector; with ordered updates it is accumulated while updating.
pub(crate) fn run<G: CsrView>(
    graph: &G,
    mut buffers: RankBuffers,
    options: &Options,
    pool: &ThreadPool,
    pl: &mut impl ProgressLog,
) -> PageRankResult {
    let n = graph.num_nodes();
    let num_threads = pool.current_num_threads();
    let kernel = Kernel::new(graph, options.damping, options.dead_end_aware);
    let norm = options.tolerance_norm;

    let works = (0..num_threads)
        .map(|_| CachePadded::new(ThreadWork::new(norm)))
        .collect::<Box<[_]>>();
    let workers = (0..num_threads)
        .map(|id| Mutex::new(Worker::new(id, options.seed, options.load_injector())))
        .collect::<Box<[_]>>();
    let chunk_size = options.granularity.node_granularity(n, graph.num_arcs());
    let scheduler = Scheduler::new(&works, chunk_size, options.steal_all);

    let mut history = vec![];
    let mut error = f64::INFINITY;

    pl.item_name("iteration");
    pl.expected_updates(Some(options.max_iterations));
    pl.start(format!(
        "Computing ranks ({} updates, granularity={chunk_size})...",
        options.update
    ));

    while history.len() < options.max_iterations {
        let teleport = kernel.teleport(|u| buffers.r[u]);
        for work in works.iter() {
            work.range.clear();
            work.reset_stolen();
        }
        let cursor = AtomicUsize::new(0);

        error = match options.update {
            UpdateOrder::Unordered => {
                pool.install(|| buffers.update_contributions());
                let a = buffers.a.as_sync_slice();
                let c = &buffers.c;
                pool.broadcast(|ctx| {
                    let mut worker = workers[ctx.index()].lock().unwrap();
                    scheduler.run_pass(
                        &mut worker,
                        &cursor,
                        n,
                        options.helper_stealing,
                        |worker, v| {
                            worker.stall();
                            // SAFETY: each node is handed out to exactly one
                            // thread, and c is read-only.
                            unsafe { a[v].set(kernel.from_contributions(v, teleport, c)) };
                        },
                    );
                });
                let error = pool.install(|| norm.par_distance(&buffers.a, &buffers.r));
                buffers.swap();
                error
            }
            UpdateOrder::Ordered => {
                let accum = Mutex::new(norm.accum());
                let r = buffers.r.as_sync_slice();
                let f = &buffers.f;
                pool.broadcast(|ctx| {
                    let mut worker = workers[ctx.index()].lock().unwrap();
                    let mut local_accum = norm.accum();
                    scheduler.run_pass(
                        &mut worker,
                        &cursor,
                        n,
                        options.helper_stealing,
                        |worker, v| {
                            worker.stall();
                            // SAFETY: each node is handed out to exactly one
                            // thread. Reads from other nodes' ranks are benign
                            // data races (Gauss–Seidel semantics).
                            unsafe {
                                let new_rank = kernel.from_shared_ranks(v, teleport, r, f);
                                local_accum.add(r[v].get(), new_rank);
                                r[v].set(new_rank);
                            }
                        },
                    );
                    accum.lock().unwrap().merge(local_accum);
                });
                accum.into_inner().unwrap().value()
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

    let steals = works.iter().map(|work| work.steals()).sum();
    log::debug!("{} steals", steals);

    PageRankResult {
        ranks: buffers.r,
        iterations: history.len(),
        error,
        steals,
        history,
        ..Default::default()
    }
}
