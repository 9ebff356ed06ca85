/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{LoadInjector, Norm};
use crate::utils::Granularity;
use std::time::Duration;
use thiserror::Error;

/// Selects how updates within a pass see each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateOrder {
    /// Jacobi iteration: new ranks are written to a separate vector, and all
    /// reads see the ranks of the previous pass. This is the default.
    #[default]
    Unordered,
    /// Gauss–Seidel-like iteration: ranks are updated in place, so a node may
    /// see ranks already updated in the current pass. It converges in fewer
    /// passes, but results depend on the schedule.
    Ordered,
}

impl std::fmt::Display for UpdateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOrder::Unordered => f.write_str("unordered"),
            UpdateOrder::Ordered => f.write_str("ordered"),
        }
    }
}

/// Selects the engine driving the iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Schedule {
    /// A single thread performs all passes.
    Sequential,
    /// All threads perform the same pass, and wait for each other before the
    /// global error is computed. This is the default.
    #[default]
    Synchronized,
    /// Each thread performs its own passes over its own nodes, and stops when
    /// the errors published by all threads are below the tolerance.
    BarrierFree,
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Sequential => f.write_str("sequential"),
            Schedule::Synchronized => f.write_str("synchronized"),
            Schedule::BarrierFree => f.write_str("barrier-free"),
        }
    }
}

/// Options of a rank computation.
///
/// All fields are public; the intended usage is with functional record
/// update syntax:
///
/// ```
/// use barrierfree_pagerank::rank::{Options, Schedule};
///
/// let options = Options {
///     schedule: Schedule::BarrierFree,
///     helper_stealing: true,
///     ..Default::default()
/// };
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    /// Number of times the computation is repeated; the reported time is the
    /// average.
    pub repeat: usize,
    /// The damping factor, in [0 . . 1).
    pub damping: f64,
    /// The norm used to measure the error.
    pub tolerance_norm: Norm,
    /// The computation stops when the error is below this value.
    pub tolerance: f64,
    /// The maximum number of passes.
    pub max_iterations: usize,
    /// Whether the rank of dead ends is redistributed uniformly.
    pub dead_end_aware: bool,
    pub update: UpdateOrder,
    pub schedule: Schedule,
    /// Whether threads that run out of work steal from others.
    pub helper_stealing: bool,
    /// Whether a thief takes the entire remaining range of its victim,
    /// rather than a quarter of a chunk.
    pub steal_all: bool,
    /// The probability of stalling before processing a node.
    pub sleep_probability: f64,
    /// The duration of a stall.
    pub sleep_duration: Duration,
    /// Whether nodes are renumbered so that strongly connected components are
    /// contiguous and in topological order.
    pub split_components: bool,
    /// The number of threads; `None` means the available parallelism. The
    /// number of threads is never larger than the number of nodes.
    pub num_threads: Option<usize>,
    /// The size of the chunks claimed by threads.
    pub granularity: Granularity,
    /// The seed of the random number generators; `None` means a random seed.
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            repeat: 1,
            damping: 0.85,
            tolerance_norm: Norm::L1,
            tolerance: 1E-6,
            max_iterations: 500,
            dead_end_aware: false,
            update: UpdateOrder::Unordered,
            schedule: Schedule::Synchronized,
            helper_stealing: false,
            steal_all: false,
            sleep_probability: 0.0,
            sleep_duration: Duration::ZERO,
            split_components: false,
            num_threads: None,
            granularity: Granularity::default(),
            seed: None,
        }
    }
}

/// Invalid [`Options`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("The damping factor must be in [0 . . 1), got {0}")]
    Damping(f64),
    #[error("The tolerance must be positive, got {0}")]
    Tolerance(f64),
    #[error("The sleep probability must be in [0 . . 1], got {0}")]
    SleepProbability(f64),
    #[error("The number of repetitions must be positive")]
    Repeat,
    #[error("The number of threads must be positive")]
    NumThreads,
}

impl Options {
    /// Checks that the options are consistent.
    pub fn validate(&self) -> Result<(), OptionsError> {
        // Note that 0.0..1.0 is [0.0..1.0) in mathematical notation
        if !(0.0..1.0).contains(&self.damping) {
            return Err(OptionsError::Damping(self.damping));
        }
        // NaN fails the comparison
        if !(self.tolerance > 0.0) {
            return Err(OptionsError::Tolerance(self.tolerance));
        }
        if !(0.0..=1.0).contains(&self.sleep_probability) {
            return Err(OptionsError::SleepProbability(self.sleep_probability));
        }
        if self.repeat == 0 {
            return Err(OptionsError::Repeat);
        }
        if self.num_threads == Some(0) {
            return Err(OptionsError::NumThreads);
        }
        Ok(())
    }

    /// Returns a load injector stalling as specified by these options.
    ///
    /// # Panics
    ///
    /// Panics if the sleep probability is not in [0 . . 1].
    pub fn load_injector(&self) -> LoadInjector {
        LoadInjector::new(self.sleep_probability, self.sleep_duration)
    }
}
