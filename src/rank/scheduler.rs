/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Work stealing.
//!
//! A [`Scheduler`] operates over the [work units](ThreadWork) of all threads.
//! A thread that has exhausted its own range looks for a _victim_ by a
//! pseudorandom walk over the units: the walk starts from a random unit and
//! proceeds by a random prime stride larger than the number of threads, so
//! it visits every unit exactly once. Both are chosen anew at each attempt,
//! so that a thread does not keep stealing from the same neighbor.
//!
//! From a victim with more than a quarter of a chunk left, the thief removes
//! a quarter of a chunk from the end of the range (or all of it, if the
//! scheduler steals everything). When less is left, the thief checks whether
//! the victim is stuck by reading the beginning of its range again after a
//! short sleep; if it did not move, the thief takes the last node only, and
//! sleeps briefly after processing it. Lost races are retried with a new
//! walk.
//!
//! Before inspecting a victim a thief registers on its unit, and it
//! unregisters when the [`Stolen`] handle is dropped: an owner must not start
//! a new pass, or publish its error, while thieves are registered (see
//! [`ThreadWork::pending`]).

use super::{NormAccum, ThreadWork, Worker};
use crate::utils::random_stride;
use crossbeam_utils::CachePadded;
use rand::Rng;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How long a thief waits before checking again whether a victim is stuck.
pub const PROBE_DELAY: Duration = Duration::from_micros(5);
/// How long a thief sleeps after processing a single node of a stuck victim.
pub const SINGLE_STEAL_DELAY: Duration = Duration::from_micros(10);

/// Nodes removed from a victim.
///
/// The handle keeps the thief registered on the victim until it is dropped.
#[derive(Debug)]
pub struct Stolen<'a> {
    victim: &'a ThreadWork,
    victim_id: usize,
    range: Range<usize>,
    iteration: usize,
    teleport: f64,
    single: bool,
}

impl Stolen<'_> {
    /// Returns the stolen nodes.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Returns the index of the victim.
    pub fn victim_id(&self) -> usize {
        self.victim_id
    }

    /// Returns the pass the victim was performing when the nodes were stolen.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Returns the teleport term of the pass of the victim.
    pub fn teleport(&self) -> f64 {
        self.teleport
    }

    /// Returns true if a single node was taken from a stuck victim.
    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Completes the steal, merging the error accumulated on the stolen nodes
    /// into the error of the victim.
    pub fn finish(self, accum: NormAccum) {
        self.victim.merge_stolen_error(accum);
    }
}

impl Drop for Stolen<'_> {
    fn drop(&mut self) {
        self.victim.unregister();
    }
}

/// Unregisters a thief from a victim it is inspecting unless defused.
struct Registration<'a>(Option<&'a ThreadWork>);

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Some(work) = self.0 {
            work.unregister();
        }
    }
}

/// A work-stealing scheduler.
#[derive(Debug)]
pub struct Scheduler<'a> {
    works: &'a [CachePadded<ThreadWork>],
    chunk_size: usize,
    steal_size: usize,
    steal_all: bool,
}

impl<'a> Scheduler<'a> {
    /// Creates a new scheduler over the given units.
    ///
    /// Chunks claimed from a shared cursor contain `chunk_size` nodes, and
    /// thieves remove a quarter of a chunk at a time, unless `steal_all` is
    /// true, in which case they remove the entire remaining range.
    pub fn new(works: &'a [CachePadded<ThreadWork>], chunk_size: usize, steal_all: bool) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            works,
            chunk_size,
            steal_size: (chunk_size / 4).max(1),
            steal_all,
        }
    }

    /// Returns the units of the scheduler.
    pub fn works(&self) -> &'a [CachePadded<ThreadWork>] {
        self.works
    }

    /// Returns the number of nodes in a chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Tries to steal nodes from some other unit on behalf of `thief`.
    ///
    /// Returns `None` if a full walk over the units found nothing to steal.
    pub fn steal(&self, thief: &mut Worker) -> Option<Stolen<'a>> {
        let works = self.works;
        let num_threads = works.len();
        'walk: loop {
            let start = thief.rng().random_range(0..num_threads);
            let stride = random_stride(num_threads, thief.rng());
            for i in 0..num_threads {
                let victim_id = (start + i * stride) % num_threads;
                if victim_id == thief.id() {
                    continue;
                }
                let victim: &'a ThreadWork = &works[victim_id];
                victim.register();
                let mut registration = Registration(Some(victim));

                let range = victim.range.get();
                if range.is_empty() {
                    continue;
                }
                let iteration = victim.iteration();
                let teleport = victim.teleport();

                let (new_end, single) = if self.steal_all {
                    (range.start, false)
                } else if range.len() > self.steal_size {
                    (range.end - self.steal_size, false)
                } else {
                    std::thread::sleep(PROBE_DELAY);
                    let again = victim.range.get();
                    if again.start != range.start || again.is_empty() {
                        // Making progress
                        continue;
                    }
                    (again.end - 1, true)
                };

                match victim.range.shrink_to(new_end) {
                    Some(range) => {
                        victim.mark_stolen();
                        registration.0 = None;
                        log::trace!(
                            "Thread {} stole {:?} from thread {}",
                            thief.id(),
                            range,
                            victim_id
                        );
                        return Some(Stolen {
                            victim,
                            victim_id,
                            range,
                            iteration,
                            teleport,
                            single,
                        });
                    }
                    None => continue 'walk,
                }
            }
            return None;
        }
    }

    /// Claims the next chunk from `cursor` into the unit of `id`, returning
    /// false if there are no more chunks.
    fn claim(&self, id: usize, cursor: &AtomicUsize, num_nodes: usize) -> bool {
        let start = cursor.fetch_add(self.chunk_size, Ordering::Relaxed);
        if start >= num_nodes {
            return false;
        }
        self.works[id]
            .range
            .reset(start..(start + self.chunk_size).min(num_nodes));
        true
    }

    /// Processes, on behalf of `worker`, nodes of a pass in which all threads
    /// claim chunks of `[0 . . num_nodes)` from a shared cursor.
    ///
    /// The units must be empty when the pass starts. Nodes are taken one at
    /// a time from the unit of the worker and passed to `process`. When the
    /// unit is empty, the worker claims a new chunk, unless it has been stolen
    /// from and `stealing` is true, in which case it steals before claiming.
    /// Stolen ranges are moved into the unit of the worker, where they can be
    /// stolen again. The method returns when the cursor is exhausted and no
    /// more nodes can be stolen, at which point every node has been
    /// processed by exactly one thread, or is being processed by some thread.
    pub fn run_pass(
        &self,
        worker: &mut Worker,
        cursor: &AtomicUsize,
        num_nodes: usize,
        stealing: bool,
        mut process: impl FnMut(&mut Worker, usize),
    ) {
        let id = worker.id();
        let unit = &self.works[id];
        loop {
            while let Some(range) = unit.range.try_acquire(1) {
                process(worker, range.start);
            }

            if !(stealing && unit.is_stolen()) && self.claim(id, cursor, num_nodes) {
                continue;
            }
            if !stealing {
                break;
            }

            match self.steal(worker) {
                Some(stolen) if stolen.is_single() => {
                    process(worker, stolen.range.start);
                    drop(stolen);
                    std::thread::sleep(SINGLE_STEAL_DELAY);
                }
                // The unit is empty, so the stolen nodes can be moved into it
                Some(stolen) => unit.range.reset(stolen.range()),
                None => {
                    if !self.claim(id, cursor, num_nodes) {
                        break;
                    }
                }
            }
        }
    }
}
