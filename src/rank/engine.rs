/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::buffers::RankBuffers;
use super::{barrier_free, sequential, synchronized};
use super::{OptionsError, RangeCell};
use super::{Options, Schedule};
use crate::graphs::{permute, CsrView};
use crate::sccs::kosaraju;
use dsi_progress_logger::{no_logging, ProgressLog};
use std::time::{Duration, Instant};
use thiserror::Error;

/// The result of a rank computation.
#[derive(Debug, Clone, Default)]
pub struct PageRankResult {
    /// The rank vector.
    pub ranks: Box<[f64]>,
    /// The number of passes; for the barrier-free engine, the maximum over
    /// all threads.
    pub iterations: usize,
    /// The average duration of a run.
    pub elapsed: Duration,
    /// The global error after the last pass.
    pub error: f64,
    /// The number of successful steals.
    pub steals: usize,
    /// The global error after each pass (empty for the barrier-free engine).
    pub history: Vec<f64>,
}

/// Errors of a rank computation.
#[derive(Error, Debug)]
pub enum PageRankError {
    #[error(transparent)]
    InvalidOptions(#[from] OptionsError),
    #[error("The initial rank vector has length {got}, but the graph has {expected} nodes")]
    InitialRanksLength { expected: usize, got: usize },
    #[error("The graph has {num_nodes} nodes, but at most {} are supported", RangeCell::MAX_NODES)]
    TooManyNodes { num_nodes: usize },
    #[error("Cannot build the thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Computes ranks.
///
/// This is a convenience wrapper around [`compute_with_logging`] that does
/// not log progress.
///
/// # Examples
///
/// ```
/// use barrierfree_pagerank::prelude::*;
///
/// // 0 → 1 → 2 → 3 → 0
/// let graph = CsrGraph::from_arcs(4, [(0, 1), (1, 2), (2, 3), (3, 0)]);
/// let options = Options {
///     schedule: Schedule::BarrierFree,
///     helper_stealing: true,
///     num_threads: Some(2),
///     tolerance: 1E-10,
///     ..Default::default()
/// };
/// let result = compute(&graph, None, &options)?;
/// for rank in result.ranks.iter() {
///     assert!((rank - 0.25).abs() < 1E-6);
/// }
/// # Ok::<(), PageRankError>(())
/// ```
pub fn compute(
    graph: &impl CsrView,
    initial: Option<&[f64]>,
    options: &Options,
) -> Result<PageRankResult, PageRankError> {
    compute_with_logging(graph, initial, options, no_logging![])
}

/// Computes ranks, logging progress.
///
/// `graph` is the CSR representation of the **transpose** of the graph, and
/// `initial`, if specified, the initial rank vector (the uniform
/// distribution otherwise).
///
/// `pl` is used to log passes (when the engine has a notion of global pass)
/// and the computation of strongly connected components. Its options will be
/// preserved, making thus possible to customize the logs.
///
/// A graph without nodes yields an empty rank vector after zero iterations.
/// Not reaching the tolerance within the maximum number of iterations is not
/// an error: the [result](PageRankResult::error) contains the error reached.
pub fn compute_with_logging(
    graph: &impl CsrView,
    initial: Option<&[f64]>,
    options: &Options,
    pl: &mut impl ProgressLog,
) -> Result<PageRankResult, PageRankError> {
    options.validate()?;
    let num_nodes = graph.num_nodes();
    if let Some(initial) = initial {
        if initial.len() != num_nodes {
            return Err(PageRankError::InitialRanksLength {
                expected: num_nodes,
                got: initial.len(),
            });
        }
    }
    if num_nodes > RangeCell::MAX_NODES {
        return Err(PageRankError::TooManyNodes { num_nodes });
    }
    if num_nodes == 0 {
        return Ok(PageRankResult::default());
    }

    let num_threads = match options.schedule {
        Schedule::Sequential => 1,
        _ => options.num_threads.unwrap_or_else(num_cpus::get),
    }
    .clamp(1, num_nodes);

    log::info!("Schedule: {}", options.schedule);
    log::info!("Updates: {}", options.update);
    log::info!("Damping: {}", options.damping);
    log::info!(
        "Stopping criterion: {} error < {} or {} iterations",
        options.tolerance_norm,
        options.tolerance,
        options.max_iterations
    );
    log::info!(
        "Dead ends: {}",
        if options.dead_end_aware {
            "redistributed"
        } else {
            "ignored"
        }
    );
    if options.schedule != Schedule::Sequential {
        log::info!(
            "Stealing: {}",
            match (options.helper_stealing, options.steal_all) {
                (false, _) => "disabled",
                (true, false) => "quarter chunk",
                (true, true) => "whole range",
            }
        );
    }
    if !options.load_injector().is_idle() {
        log::info!(
            "Load: p = {}, {:?}",
            options.sleep_probability,
            options.sleep_duration
        );
    }
    log::info!("Using {} threads", num_threads);

    if !options.split_components {
        return repeat(graph, initial, options, num_threads, pl);
    }

    let sccs = kosaraju(graph, pl);
    log::info!("{} strongly connected components", sccs.num_components());
    let perm = sccs.order();
    let permuted = permute(graph, &perm);
    let initial = initial.map(|initial| {
        let mut permuted = vec![0.0; num_nodes];
        for (v, &rank) in initial.iter().enumerate() {
            permuted[perm[v]] = rank;
        }
        permuted
    });

    let mut result = repeat(&permuted, initial.as_deref(), options, num_threads, pl)?;
    let ranks = perm.iter().map(|&p| result.ranks[p]).collect();
    result.ranks = ranks;
    Ok(result)
}

/// Runs the selected engine the required number of times, returning the
/// last result with the average elapsed time.
fn repeat(
    graph: &impl CsrView,
    initial: Option<&[f64]>,
    options: &Options,
    num_threads: usize,
    pl: &mut impl ProgressLog,
) -> Result<PageRankResult, PageRankError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()?;

    let mut total = Duration::ZERO;
    let mut result = PageRankResult::default();
    for run in 0..options.repeat {
        let buffers = pool.install(|| RankBuffers::new(graph, options.damping, initial));
        let start = Instant::now();
        result = match options.schedule {
            Schedule::Sequential => sequential::run(graph, buffers, options, pl),
            Schedule::Synchronized => synchronized::run(graph, buffers, options, &pool, pl),
            Schedule::BarrierFree => barrier_free::run(graph, buffers, options, &pool, pl),
        };
        let elapsed = start.elapsed();
        log::debug!("Run {}: {:?}", run + 1, elapsed);
        total += elapsed;
    }
    result.elapsed = mean_duration(total, options.repeat);

    log::info!(
        "Completed after {} iteration(s), error = {}, {} steal(s), {:?} per run",
        result.iterations,
        result.error,
        result.steals,
        result.elapsed
    );
    Ok(result)
}

/// Returns the mean duration of `runs` runs taking `total` overall, or zero
/// if there are no runs.
fn mean_duration(total: Duration, runs: usize) -> Duration {
    if runs == 0 {
        Duration::ZERO
    } else {
        total.div_f64(runs as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_duration() {
        assert_eq!(mean_duration(Duration::from_secs(3), 3), Duration::from_secs(1));
        assert_eq!(mean_duration(Duration::from_secs(3), 0), Duration::ZERO);
        // More runs than a u32 can count
        let runs = u32::MAX as usize + 1;
        let total = Duration::from_secs(runs as u64);
        assert_eq!(mean_duration(total, runs), Duration::from_secs(1));
    }
}
