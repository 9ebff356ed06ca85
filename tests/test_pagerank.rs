/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use barrierfree_pagerank::graphs::random::UniformRandom;
use barrierfree_pagerank::prelude::*;
use barrierfree_pagerank::rank::OptionsError;
use std::time::Duration;

fn logger_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// All combinations of schedules, update orders and stealing.
fn variants() -> Vec<(Schedule, UpdateOrder, bool)> {
    let mut variants = vec![];
    for schedule in [
        Schedule::Sequential,
        Schedule::Synchronized,
        Schedule::BarrierFree,
    ] {
        for update in [UpdateOrder::Unordered, UpdateOrder::Ordered] {
            for stealing in [false, true] {
                if schedule == Schedule::Sequential && stealing {
                    continue;
                }
                variants.push((schedule, update, stealing));
            }
        }
    }
    variants
}

fn reference(graph: &CsrGraph, dead_end_aware: bool) -> Result<PageRankResult> {
    Ok(compute(
        graph,
        None,
        &Options {
            schedule: Schedule::Sequential,
            tolerance: 1E-13,
            max_iterations: 1000,
            dead_end_aware,
            ..Default::default()
        },
    )?)
}

#[test]
fn test_all_engines_agree() -> Result<()> {
    logger_init();
    let graph = UniformRandom::new(2000, 8, 0).build();
    for dead_end_aware in [false, true] {
        let expected = reference(&graph, dead_end_aware)?;
        for (schedule, update, helper_stealing) in variants() {
            for num_threads in [1, 3, 8] {
                let result = compute(
                    &graph,
                    None,
                    &Options {
                        schedule,
                        update,
                        helper_stealing,
                        dead_end_aware,
                        num_threads: Some(num_threads),
                        granularity: Granularity::Nodes(64),
                        tolerance: 1E-12,
                        max_iterations: 1000,
                        seed: Some(0),
                        ..Default::default()
                    },
                )?;
                let distance = Norm::L1.distance(&result.ranks, &expected.ranks);
                assert!(
                    distance < 1E-9,
                    "{schedule}, {update}, stealing={helper_stealing}, {num_threads} threads: distance {distance}"
                );
                assert!(result.error < 1E-12);
                if !helper_stealing {
                    assert_eq!(result.steals, 0);
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_steal_all() -> Result<()> {
    let graph = UniformRandom::new(1000, 5, 1).build().with_self_loops();
    let expected = reference(&graph, false)?;
    for schedule in [Schedule::Synchronized, Schedule::BarrierFree] {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule,
                helper_stealing: true,
                steal_all: true,
                num_threads: Some(4),
                granularity: Granularity::Nodes(16),
                tolerance: 1E-12,
                ..Default::default()
            },
        )?;
        assert!(Norm::Linf.distance(&result.ranks, &expected.ranks) < 1E-10);
    }
    Ok(())
}

#[test]
fn test_ranks_sum_to_one() -> Result<()> {
    // Without dead ends the rank vector is a distribution
    let graph = UniformRandom::new(500, 4, 2).build().with_self_loops();
    for (schedule, update, helper_stealing) in variants() {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule,
                update,
                helper_stealing,
                num_threads: Some(4),
                tolerance: 1E-10,
                ..Default::default()
            },
        )?;
        let sum: f64 = result.ranks.iter().sum();
        assert!((sum - 1.0).abs() < 1E-8, "{schedule}, {update}: {sum}");
    }
    Ok(())
}

#[test]
fn test_dead_end_awareness_without_dead_ends() -> Result<()> {
    let graph = UniformRandom::new(300, 3, 3).build().with_self_loops();
    for schedule in [Schedule::Sequential, Schedule::Synchronized] {
        let options = Options {
            schedule,
            num_threads: Some(4),
            helper_stealing: true,
            ..Default::default()
        };
        let unaware = compute(&graph, None, &options)?;
        let aware = compute(
            &graph,
            None,
            &Options {
                dead_end_aware: true,
                ..options.clone()
            },
        )?;
        assert_eq!(unaware.ranks, aware.ranks);
        assert_eq!(unaware.iterations, aware.iterations);
    }
    Ok(())
}

#[test]
fn test_history() -> Result<()> {
    let graph = UniformRandom::new(1000, 6, 4).build();
    for schedule in [Schedule::Sequential, Schedule::Synchronized] {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule,
                num_threads: Some(4),
                tolerance: 1E-10,
                ..Default::default()
            },
        )?;
        assert_eq!(result.history.len(), result.iterations);
        assert_eq!(result.history.last().copied(), Some(result.error));
        for w in result.history.windows(2) {
            assert!(w[1] <= w[0], "{schedule}: {:?}", result.history);
        }
    }
    Ok(())
}

#[test]
fn test_cycle() -> Result<()> {
    // 0 → 1 → 2 → 3 → 0: the uniform distribution is a fixed point
    let graph = CsrGraph::from_arcs(4, [(0, 1), (1, 2), (2, 3), (3, 0)]);
    for (schedule, update, helper_stealing) in variants() {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule,
                update,
                helper_stealing,
                num_threads: Some(2),
                ..Default::default()
            },
        )?;
        if schedule == Schedule::BarrierFree {
            // A thread may pass again while waiting for the others
            assert!(result.iterations >= 1);
        } else {
            assert_eq!(result.iterations, 1, "{schedule}, {update}");
        }
        for &rank in result.ranks.iter() {
            assert!((rank - 0.25).abs() < 1E-12);
        }
    }
    Ok(())
}

#[test]
fn test_isolated_node() -> Result<()> {
    let graph = CsrGraph::from_arcs(1, []);
    for schedule in [
        Schedule::Sequential,
        Schedule::Synchronized,
        Schedule::BarrierFree,
    ] {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule,
                dead_end_aware: true,
                ..Default::default()
            },
        )?;
        assert_eq!(result.ranks.len(), 1);
        assert!((result.ranks[0] - 1.0).abs() < 1E-12);
        assert_eq!(result.iterations, 1);
    }
    Ok(())
}

#[test]
fn test_dead_ends_lose_rank() -> Result<()> {
    // 0 → 1, and 1 is a dead end
    let graph = CsrGraph::from_arcs(2, [(0, 1)]);
    let unaware = compute(
        &graph,
        None,
        &Options {
            tolerance: 1E-12,
            ..Default::default()
        },
    )?;
    assert!(unaware.ranks.iter().sum::<f64>() < 1.0);
    let aware = compute(
        &graph,
        None,
        &Options {
            tolerance: 1E-12,
            dead_end_aware: true,
            ..Default::default()
        },
    )?;
    assert!((aware.ranks.iter().sum::<f64>() - 1.0).abs() < 1E-10);
    assert!(aware.ranks[1] > aware.ranks[0]);
    Ok(())
}

#[test]
fn test_empty_graph() -> Result<()> {
    let graph = CsrGraph::new();
    for schedule in [
        Schedule::Sequential,
        Schedule::Synchronized,
        Schedule::BarrierFree,
    ] {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule,
                ..Default::default()
            },
        )?;
        assert!(result.ranks.is_empty());
        assert_eq!(result.iterations, 0);
    }
    Ok(())
}

#[test]
fn test_initial_ranks() -> Result<()> {
    let graph = UniformRandom::new(100, 3, 5).build().with_self_loops();
    let expected = reference(&graph, false)?;

    // Starting from the fixed point takes a single pass
    let result = compute(
        &graph,
        Some(&expected.ranks[..]),
        &Options {
            tolerance: 1E-10,
            ..Default::default()
        },
    )?;
    assert_eq!(result.iterations, 1);

    let err = compute(&graph, Some(&[0.5; 99][..]), &Options::default()).unwrap_err();
    assert!(matches!(
        err,
        PageRankError::InitialRanksLength {
            expected: 100,
            got: 99
        }
    ));
    Ok(())
}

#[test]
fn test_invalid_options() {
    let graph = CsrGraph::from_arcs(2, [(0, 1), (1, 0)]);
    let err = compute(
        &graph,
        None,
        &Options {
            damping: 1.5,
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PageRankError::InvalidOptions(OptionsError::Damping(_))
    ));
    let err = compute(
        &graph,
        None,
        &Options {
            tolerance: -1.0,
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PageRankError::InvalidOptions(OptionsError::Tolerance(_))
    ));
}

#[test]
fn test_max_iterations() -> Result<()> {
    let graph = UniformRandom::new(500, 4, 6).build();
    for schedule in [
        Schedule::Sequential,
        Schedule::Synchronized,
        Schedule::BarrierFree,
    ] {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule,
                num_threads: Some(3),
                tolerance: 1E-300,
                max_iterations: 7,
                ..Default::default()
            },
        )?;
        assert_eq!(result.iterations, 7);
        assert!(result.error > 0.0);
    }
    Ok(())
}

#[test]
fn test_split_components() -> Result<()> {
    let graph = UniformRandom::new(800, 2, 7).build();
    for dead_end_aware in [false, true] {
        let expected = reference(&graph, dead_end_aware)?;
        for schedule in [Schedule::Synchronized, Schedule::BarrierFree] {
            let result = compute(
                &graph,
                None,
                &Options {
                    schedule,
                    dead_end_aware,
                    split_components: true,
                    helper_stealing: true,
                    num_threads: Some(4),
                    tolerance: 1E-12,
                    ..Default::default()
                },
            )?;
            assert!(Norm::L1.distance(&result.ranks, &expected.ranks) < 1E-9);
        }
    }
    Ok(())
}

#[test]
fn test_barrier_free_more_threads_than_cores() -> Result<()> {
    logger_init();
    // Threads are descheduled for long stretches, so stale errors abound
    let graph = UniformRandom::new(3000, 6, 8).build();
    let expected = reference(&graph, true)?;
    let num_threads = 2 * num_cpus::get() + 3;
    for update in [UpdateOrder::Unordered, UpdateOrder::Ordered] {
        for helper_stealing in [false, true] {
            let result = compute(
                &graph,
                None,
                &Options {
                    schedule: Schedule::BarrierFree,
                    update,
                    helper_stealing,
                    dead_end_aware: true,
                    num_threads: Some(num_threads),
                    granularity: Granularity::Nodes(32),
                    tolerance: 1E-12,
                    max_iterations: 1000,
                    ..Default::default()
                },
            )?;
            let distance = Norm::L1.distance(&result.ranks, &expected.ranks);
            assert!(
                distance < 1E-9,
                "{update}, stealing={helper_stealing}: distance {distance}"
            );
            assert!(result.iterations < 1000);
            assert!(result.error < 1E-12);
        }
    }
    Ok(())
}

/// Returns a graph whose first half has no incoming arcs and points into
/// the second half, which is a random graph.
///
/// With two threads, the owner of the first half has a zero error from its
/// second pass on, while the ranks of the second half keep changing.
fn early_converging_graph(half: usize) -> CsrGraph {
    let mut arcs = vec![];
    for u in 0..half {
        arcs.push((u, half + u % half));
        arcs.push((u, half + (7 * u + 3) % half));
    }
    for v in 0..half {
        for k in 1..=4 {
            arcs.push((half + v, half + (31 * k * v + 17 * k) % half));
        }
    }
    CsrGraph::from_arcs(2 * half, arcs)
}

#[test]
fn test_barrier_free_early_converging_thread() -> Result<()> {
    logger_init();
    let graph = early_converging_graph(500);
    for dead_end_aware in [false, true] {
        let expected = reference(&graph, dead_end_aware)?;
        for update in [UpdateOrder::Unordered, UpdateOrder::Ordered] {
            for helper_stealing in [false, true] {
                let result = compute(
                    &graph,
                    None,
                    &Options {
                        schedule: Schedule::BarrierFree,
                        update,
                        helper_stealing,
                        dead_end_aware,
                        num_threads: Some(2),
                        granularity: Granularity::Nodes(16),
                        tolerance: 1E-12,
                        max_iterations: 1000,
                        ..Default::default()
                    },
                )?;
                let distance = Norm::L1.distance(&result.ranks, &expected.ranks);
                assert!(
                    distance < 1E-9,
                    "{update}, stealing={helper_stealing}, dead_end_aware={dead_end_aware}: distance {distance}"
                );
                assert!(result.iterations < 1000);
            }
        }
    }
    Ok(())
}

/// A view whose outdegrees do not match its arcs.
struct PartialView {
    offsets: Vec<usize>,
    sources: Vec<usize>,
    outdegrees: Vec<usize>,
}

impl CsrView for PartialView {
    fn num_nodes(&self) -> usize {
        self.outdegrees.len()
    }

    fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    fn sources(&self) -> &[usize] {
        &self.sources
    }

    fn outdegree(&self, node: usize) -> usize {
        self.outdegrees[node]
    }
}

#[test]
fn test_split_components_outdegrees_not_matching_arcs() -> Result<()> {
    // Arcs 1 → 0 and 0 → 1, but node 0 claims two outgoing arcs
    let view = PartialView {
        offsets: vec![0, 1, 2],
        sources: vec![1, 0],
        outdegrees: vec![2, 1],
    };
    for schedule in [Schedule::Sequential, Schedule::BarrierFree] {
        let options = Options {
            schedule,
            num_threads: Some(2),
            tolerance: 1E-13,
            ..Default::default()
        };
        let whole = compute(&view, None, &options)?;
        let split = compute(
            &view,
            None,
            &Options {
                split_components: true,
                ..options
            },
        )?;
        assert!(Norm::L1.distance(&whole.ranks, &split.ranks) < 1E-10);
        // Node 0 leaks half of its rank
        assert!(whole.ranks.iter().sum::<f64>() < 1.0);
    }
    Ok(())
}

#[test]
fn test_repeat() -> Result<()> {
    let graph = UniformRandom::new(200, 3, 8).build();
    let once = compute(&graph, None, &Options::default())?;
    let thrice = compute(
        &graph,
        None,
        &Options {
            repeat: 3,
            ..Default::default()
        },
    )?;
    assert_eq!(once.ranks, thrice.ranks);
    assert_eq!(once.iterations, thrice.iterations);
    Ok(())
}

#[test]
fn test_norms() -> Result<()> {
    let graph = UniformRandom::new(1000, 5, 9).build().with_self_loops();
    let expected = reference(&graph, false)?;
    for tolerance_norm in [Norm::L1, Norm::L2, Norm::Linf] {
        let result = compute(
            &graph,
            None,
            &Options {
                schedule: Schedule::BarrierFree,
                tolerance_norm,
                helper_stealing: true,
                num_threads: Some(4),
                tolerance: 1E-13,
                ..Default::default()
            },
        )?;
        assert!(result.error < 1E-13);
        assert!(Norm::L1.distance(&result.ranks, &expected.ranks) < 1E-8);
    }
    Ok(())
}

/// Runs the parallel engines with synthetic load, checking results against
/// the sequential engine.
fn check_under_load(
    n: usize,
    probability: f64,
    duration: Duration,
    tolerance: f64,
    max_distance: f64,
) -> Result<()> {
    let graph = UniformRandom::new(n, 10, 10).build().with_self_loops();
    let expected = reference(&graph, false)?;
    for schedule in [Schedule::Synchronized, Schedule::BarrierFree] {
        for update in [UpdateOrder::Unordered, UpdateOrder::Ordered] {
            let result = compute(
                &graph,
                None,
                &Options {
                    schedule,
                    update,
                    helper_stealing: true,
                    sleep_probability: probability,
                    sleep_duration: duration,
                    tolerance,
                    seed: Some(0),
                    ..Default::default()
                },
            )?;
            let distance = Norm::L1.distance(&result.ranks, &expected.ranks);
            assert!(distance < max_distance, "{schedule}, {update}: {distance}");
            log::info!(
                "{schedule}, {update}: {:?}, {} iterations, {} steals",
                result.elapsed,
                result.iterations,
                result.steals
            );
        }
    }
    Ok(())
}

#[test]
fn test_under_load() -> Result<()> {
    logger_init();
    check_under_load(500, 0.01, Duration::from_millis(1), 1E-12, 1E-9)
}

#[cfg_attr(not(feature = "slow_tests"), ignore)]
#[test]
fn test_under_heavy_load() -> Result<()> {
    logger_init();
    check_under_load(100_000, 0.3, Duration::from_millis(5), 1E-8, 1E-6)
}
