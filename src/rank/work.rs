/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Per-thread state.
//!
//! Each thread of a rank computation has a [`ThreadWork`], which is shared
//! with all other threads and contains the [range](RangeCell) of nodes the
//! thread currently owns, together with the information thieves need to
//! process stolen nodes and the error the thread published; and a
//! [`Worker`], which is private and contains the random number generator and
//! the [`LoadInjector`].

use super::{Norm, NormAccum, RangeCell};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Synthetic per-node delays.
///
/// Before a node is processed, the thread processing it
/// [stalls](LoadInjector::stall) with the given probability for the given
/// duration. Stalls never change numerical results: they just change
/// timing, and thus the pattern of steals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadInjector {
    probability: f64,
    duration: Duration,
}

impl LoadInjector {
    /// Creates a new load injector.
    ///
    /// # Panics
    ///
    /// Panics if `probability` is not in [0 . . 1].
    pub fn new(probability: f64, duration: Duration) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability),
            "The stall probability must be in [0 . . 1], got {probability}"
        );
        Self {
            probability,
            duration,
        }
    }

    /// Returns true if this injector never stalls.
    pub fn is_idle(&self) -> bool {
        self.probability == 0.0 || self.duration.is_zero()
    }

    /// Sleeps with the configured probability, returning whether it did.
    #[inline(always)]
    pub fn stall(&self, rng: &mut impl Rng) -> bool {
        if self.is_idle() || !rng.random_bool(self.probability) {
            return false;
        }
        std::thread::sleep(self.duration);
        true
    }
}

/// The private state of a thread.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    rng: SmallRng,
    injector: LoadInjector,
}

impl Worker {
    /// Creates a new worker.
    ///
    /// If `seed` is specified, the random number generator of the worker is
    /// seeded deterministically using `seed` and `id`.
    pub fn new(id: usize, seed: Option<u64>, injector: LoadInjector) -> Self {
        let rng = match seed {
            Some(seed) => {
                SmallRng::seed_from_u64(seed ^ (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
            }
            None => SmallRng::from_rng(&mut rand::rng()),
        };
        Self { id, rng, injector }
    }

    /// Returns the index of the thread.
    #[inline(always)]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the random number generator of the worker.
    #[inline(always)]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Stalls, possibly, before processing a node.
    #[inline(always)]
    pub fn stall(&mut self) -> bool {
        self.injector.stall(&mut self.rng)
    }
}

/// The shared state of a thread.
///
/// The teleport term is stored as a bit pattern in an atomic 64-bit integer.
/// Errors are published together with the _epoch_ at which the pass that
/// measured them started (see [`publish`](ThreadWork::publish)), and the pair
/// is read and written under a lock, so that it is always consistent.
#[derive(Debug)]
pub struct ThreadWork {
    /// The nodes owned by the thread that have not been processed yet.
    pub range: RangeCell,
    iteration: AtomicUsize,
    teleport: AtomicU64,
    completed: AtomicUsize,
    published: Mutex<(f64, usize)>,
    stolen: AtomicBool,
    pending: AtomicUsize,
    steals: AtomicUsize,
    stolen_error: Mutex<NormAccum>,
}

impl ThreadWork {
    /// The epoch of the initial publication, which matches no epoch.
    pub const NO_EPOCH: usize = usize::MAX;

    /// Creates a new work unit with an empty range, no completed passes, and
    /// an infinite error published at [`NO_EPOCH`](Self::NO_EPOCH).
    pub fn new(norm: Norm) -> Self {
        Self {
            range: RangeCell::default(),
            iteration: AtomicUsize::new(0),
            teleport: AtomicU64::new(0.0_f64.to_bits()),
            completed: AtomicUsize::new(0),
            published: Mutex::new((f64::INFINITY, Self::NO_EPOCH)),
            stolen: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            steals: AtomicUsize::new(0),
            stolen_error: Mutex::new(norm.accum()),
        }
    }

    /// Starts a new pass of the owner.
    ///
    /// The iteration and the teleport term are stored before the range, so a
    /// thief observing the new range observes the matching iteration and
    /// teleport term.
    pub fn begin_pass(&self, iteration: usize, teleport: f64, range: Range<usize>) {
        self.stolen.store(false, Ordering::SeqCst);
        self.iteration.store(iteration, Ordering::SeqCst);
        self.teleport.store(teleport.to_bits(), Ordering::SeqCst);
        self.range.reset(range);
    }

    /// Returns the pass the owner is performing.
    #[inline(always)]
    pub fn iteration(&self) -> usize {
        self.iteration.load(Ordering::SeqCst)
    }

    /// Returns the teleport term of the pass the owner is performing.
    #[inline(always)]
    pub fn teleport(&self) -> f64 {
        f64::from_bits(self.teleport.load(Ordering::SeqCst))
    }

    /// Returns the last error published by the owner.
    pub fn error(&self) -> f64 {
        self.published.lock().unwrap().0
    }

    /// Returns the last error published by the owner, together with the
    /// epoch at which the pass that measured it started.
    pub fn publication(&self) -> (f64, usize) {
        *self.published.lock().unwrap()
    }

    /// Returns the number of passes the owner has completed.
    ///
    /// With two rank vectors, the newest complete ranks of the nodes owned
    /// by this unit are in the vector given by the parity of this number.
    #[inline(always)]
    pub fn completed_passes(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Completes a pass of the owner, publishing its error and the epoch at
    /// which it started.
    ///
    /// This method must be called only when no thief is
    /// [registered](ThreadWork::pending), so that all nodes of the pass have
    /// been written.
    pub fn publish(&self, error: f64, epoch: usize, completed: usize) {
        self.completed.store(completed, Ordering::SeqCst);
        *self.published.lock().unwrap() = (error, epoch);
    }

    /// Returns whether some thief stole from this unit since the last
    /// [reset](ThreadWork::reset_stolen).
    #[inline(always)]
    pub fn is_stolen(&self) -> bool {
        self.stolen.load(Ordering::SeqCst)
    }

    /// Clears the flag set by thieves, before the owner claims new nodes.
    pub fn reset_stolen(&self) {
        self.stolen.store(false, Ordering::SeqCst);
    }

    /// Returns the number of successful steals from this unit.
    pub fn steals(&self) -> usize {
        self.steals.load(Ordering::Relaxed)
    }

    /// Returns the number of thieves currently registered on this unit.
    #[inline(always)]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Registers a thief, which can then inspect the range knowing that the
    /// owner will not start a new pass until the thief
    /// [unregisters](ThreadWork::unregister).
    #[inline(always)]
    pub(crate) fn register(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    #[inline(always)]
    pub(crate) fn unregister(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn mark_stolen(&self) {
        self.stolen.store(true, Ordering::SeqCst);
        self.steals.fetch_add(1, Ordering::Relaxed);
    }

    /// Merges the error of nodes processed by a thief.
    pub fn merge_stolen_error(&self, accum: NormAccum) {
        self.stolen_error.lock().unwrap().merge(accum);
    }

    /// Returns and resets the error of nodes processed by thieves.
    pub fn take_stolen_error(&self) -> NormAccum {
        let mut stolen_error = self.stolen_error.lock().unwrap();
        let norm = stolen_error.norm();
        std::mem::replace(&mut *stolen_error, norm.accum())
    }
}
