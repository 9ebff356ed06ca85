/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Barrier-free iteration.
//!
//! The node set is split into one contiguous _home range_ per thread. Each
//! thread loops over its own passes independently: at the start of each pass
//! it computes the teleport term and resets its unit to its home range, then
//! processes its nodes; if helper stealing is enabled, when it runs out of
//! nodes it steals from other threads. Stolen nodes are processed using the
//! pass and teleport term of the victim, and their error is merged into the
//! error of the victim, so that a stolen node is still updated exactly once
//! per pass of its owner.
//!
//! Before publishing the error of a pass, a thread waits until no thief is
//! registered on its unit. Thus, a thread never starts a new pass while its
//! nodes of the previous one are still being processed by other threads.
//!
//! # Stopping
//!
//! The error of a pass of a thread measures only the change of its home
//! range given the ranks it read from the other ranges, and becomes
//! meaningless as soon as those ranks change. For this reason, there is a
//! global _epoch_, which advances whenever a thread completes a pass with an
//! error not below the tolerance, and errors are published together with the
//! epoch at which their pass started. A thread stops when every thread has
//! published an error measured at the current epoch and the combination of
//! these errors is below the tolerance. A stopped thread waits until all
//! threads have stopped, but resumes its passes if the epoch moves in the
//! meantime. A thread reaching the maximum number of iterations stops for
//! good.
//!
//! # Rank vectors
//!
//! With unordered updates there are two vectors, and a pass *t* of a thread
//! reads its own nodes from vector *t* mod 2 and writes them to vector
//! (*t* + 1) mod 2. Since a home range is always updated during passes of its
//! owner, the newest complete ranks of a home range are in the vector given
//! by the parity of the number of passes completed by its owner: all reads
//! of other nodes go there. With ordered updates there is a single vector,
//! updated in place.

use super::buffers::RankBuffers;
use super::kernel::Kernel;
use super::scheduler::SINGLE_STEAL_DELAY;
use super::{NormAccum, Options, PageRankResult, Scheduler, ThreadWork, UpdateOrder, Worker};
use crate::graphs::CsrView;
use crossbeam_utils::{Backoff, CachePadded};
use dsi_progress_logger::ProgressLog;
use rayon::ThreadPool;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use sync_cell_slice::SyncSlice;

/// Returns the home ranges of `num_threads` threads over `num_nodes` nodes.
pub(crate) fn home_ranges(num_nodes: usize, num_threads: usize) -> Box<[Range<usize>]> {
    (0..num_threads)
        .map(|i| i * num_nodes / num_threads..(i + 1) * num_nodes / num_threads)
        .collect()
}

/// Returns the index of the [home range](home_ranges) containing `node`.
#[inline(always)]
pub(crate) fn home_owner(node: usize, num_nodes: usize, num_threads: usize) -> usize {
    ((node + 1) * num_threads - 1) / num_nodes
}

pub(crate) fn run<G: CsrView>(
    graph: &G,
    buffers: RankBuffers,
    options: &Options,
    pool: &ThreadPool,
    pl: &mut impl ProgressLog,
) -> PageRankResult {
    let n = graph.num_nodes();
    let num_threads = pool.current_num_threads();
    let kernel = Kernel::new(graph, options.damping, options.dead_end_aware);
    let norm = options.tolerance_norm;
    let one_vector = options.update == UpdateOrder::Ordered;

    let works = (0..num_threads)
        .map(|_| CachePadded::new(ThreadWork::new(norm)))
        .collect::<Box<[_]>>();
    let chunk_size = options.granularity.node_granularity(n, graph.num_arcs());
    let scheduler = Scheduler::new(&works, chunk_size, options.steal_all);
    let homes = home_ranges(n, num_threads);

    // Advances whenever a pass ends with an error not below the tolerance.
    let epoch = AtomicUsize::new(0);
    // Threads waiting for termination, or done for good.
    let stopped = AtomicUsize::new(0);

    let RankBuffers {
        a: mut second,
        r: mut first,
        f,
        ..
    } = buffers;

    pl.item_name("thread");
    pl.expected_updates(Some(num_threads));
    pl.start(format!(
        "Computing ranks without barriers ({} updates, {} threads)...",
        options.update, num_threads
    ));

    let passes = {
        let vectors = [first.as_sync_slice(), second.as_sync_slice()];
        let parity = |iteration: usize| {
            if one_vector {
                (0, 0)
            } else {
                (iteration % 2, (iteration + 1) % 2)
            }
        };
        // SAFETY: reading ranks that other threads might be writing is a
        // benign data race.
        let newest = |u: usize| unsafe {
            if one_vector {
                vectors[0][u].get()
            } else {
                let owner = home_owner(u, n, num_threads);
                vectors[works[owner].completed_passes() % 2][u].get()
            }
        };
        let update = |worker: &mut Worker,
                      v: usize,
                      iteration: usize,
                      teleport: f64,
                      accum: &mut NormAccum| {
            worker.stall();
            let (read, write) = parity(iteration);
            let new_rank = kernel.from_rank_fn(v, teleport, newest, &f);
            // SAFETY: v is owned by exactly one thread during the pass
            // `iteration` of its owner.
            unsafe {
                accum.add(vectors[read][v].get(), new_rank);
                vectors[write][v].set(new_rank);
            }
        };
        let converged = |current: usize| {
            let mut stale = false;
            let error = norm.combine(works.iter().map(|work| {
                let (error, measured_at) = work.publication();
                stale |= measured_at != current;
                error
            }));
            !stale && error < options.tolerance
        };
        // Returns true if all threads stopped, false if the epoch moved.
        let wait = |current: usize| {
            stopped.fetch_add(1, Ordering::SeqCst);
            let backoff = Backoff::new();
            loop {
                if stopped.load(Ordering::SeqCst) == num_threads {
                    return true;
                }
                if epoch.load(Ordering::SeqCst) != current {
                    stopped.fetch_sub(1, Ordering::SeqCst);
                    return false;
                }
                backoff.snooze();
            }
        };

        pool.broadcast(|ctx| {
            let id = ctx.index();
            let unit = &works[id];
            let mut worker = Worker::new(id, options.seed, options.load_injector());
            let mut iteration = 0;
            let mut done = false;

            while !done && iteration < options.max_iterations {
                let start_epoch = epoch.load(Ordering::SeqCst);
                let teleport = kernel.teleport(newest);
                let mut accum = norm.accum();
                unit.begin_pass(iteration, teleport, homes[id].clone());

                while let Some(range) = unit.range.try_acquire(1) {
                    update(&mut worker, range.start, iteration, teleport, &mut accum);
                }

                if options.helper_stealing {
                    while let Some(stolen) = scheduler.steal(&mut worker) {
                        let mut stolen_accum = norm.accum();
                        for v in stolen.range() {
                            update(
                                &mut worker,
                                v,
                                stolen.iteration(),
                                stolen.teleport(),
                                &mut stolen_accum,
                            );
                        }
                        let single = stolen.is_single();
                        stolen.finish(stolen_accum);
                        if single {
                            std::thread::sleep(SINGLE_STEAL_DELAY);
                        }
                    }
                }

                let backoff = Backoff::new();
                while unit.pending() != 0 {
                    backoff.snooze();
                }
                accum.merge(unit.take_stolen_error());
                let error = accum.value();
                if error >= options.tolerance || error.is_nan() {
                    epoch.fetch_add(1, Ordering::SeqCst);
                }
                iteration += 1;
                unit.publish(error, start_epoch, iteration);

                let current = epoch.load(Ordering::SeqCst);
                log::trace!(
                    "Thread {id}, iteration {iteration}: local error = {error}, epoch {start_epoch}/{current}"
                );
                if converged(current) {
                    done = wait(current);
                    if !done {
                        log::trace!("Thread {id} rejoins after {iteration} iterations");
                    }
                }
            }

            if !done {
                stopped.fetch_add(1, Ordering::SeqCst);
            }
            log::debug!("Thread {id} stopped after {iteration} iterations");
            iteration
        })
    };

    pl.update_with_count(num_threads);
    pl.done();

    let ranks = if one_vector {
        first
    } else {
        let mut ranks = vec![0.0; n].into_boxed_slice();
        for (home, &passes) in homes.iter().zip(passes.iter()) {
            let newest = if passes % 2 == 0 { &first } else { &second };
            ranks[home.clone()].copy_from_slice(&newest[home.clone()]);
        }
        ranks
    };

    let error = norm.combine(works.iter().map(|work| work.error()));
    let steals = works.iter().map(|work| work.steals()).sum();
    log::debug!("{} steals, final epoch {}", steals, epoch.into_inner());

    PageRankResult {
        ranks,
        iterations: passes.iter().copied().max().unwrap_or(0),
        error,
        steals,
        ..Default::default()
    }
}
