/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{GlobalArgs, GraphArgs, RankArgs};
use crate::rank::{compute_with_logging, Norm, Options, Schedule, UpdateOrder};
use anyhow::Result;
use clap::Parser;
use dsi_progress_logger::{progress_logger, ProgressLog};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "bench",
    about = "Sweep stall probability and duration, comparing the parallel engines with a sequential reference.",
    long_about = None
)]
pub struct CliArgs {
    #[clap(flatten)]
    pub graph: GraphArgs,

    #[arg(long, default_value_t = 5)]
    /// How many times each computation is repeated.
    pub repeat: usize,

    #[arg(long, value_parser = super::parse_duration, default_value = "1")]
    /// The shortest stall duration.
    pub min_sleep_dur: Duration,

    #[arg(long, value_parser = super::parse_duration, default_value = "1s")]
    /// The longest stall duration.
    pub max_sleep_dur: Duration,

    #[arg(long, default_value_t = 0.1)]
    /// The step of the stall probability, which goes from zero to one.
    pub prob_step: f64,

    #[clap(flatten)]
    pub rank: RankArgs,
}

/// Returns the stall durations of the sweep: starting from `min`, durations
/// are alternately multiplied by five and by two (1, 5, 10, 50, … ms).
pub fn sleep_durations(min: Duration, max: Duration) -> Vec<Duration> {
    let mut durations = vec![];
    let mut duration = min;
    let mut times_five = true;
    while duration <= max && !duration.is_zero() {
        durations.push(duration);
        duration *= if times_five { 5 } else { 2 };
        times_five = !times_five;
    }
    durations
}

/// Returns the stall probabilities of the sweep, from zero to one (included)
/// with the given step.
pub fn sleep_probabilities(step: f64) -> Vec<f64> {
    let steps = (1.0 / step).round() as usize;
    (0..=steps).map(|i| (i as f64 * step).min(1.0)).collect()
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    anyhow::ensure!(
        args.prob_step > 0.0 && args.prob_step <= 1.0,
        "The probability step must be in (0 . . 1], got {}",
        args.prob_step
    );
    let graph = args.graph.load()?;
    let mut pl = progress_logger![];
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }
    let base = args.rank.to_options(Schedule::Synchronized, args.repeat);

    let variants = [
        ("synchronizedUnordered", Schedule::Synchronized, UpdateOrder::Unordered),
        ("synchronizedOrdered", Schedule::Synchronized, UpdateOrder::Ordered),
        ("barrierFreeUnordered", Schedule::BarrierFree, UpdateOrder::Unordered),
        ("barrierFreeOrdered", Schedule::BarrierFree, UpdateOrder::Ordered),
    ];

    log::info!("Computing the sequential reference...");
    let reference = compute_with_logging(
        &graph,
        None,
        &Options {
            repeat: 1,
            schedule: Schedule::Sequential,
            update: UpdateOrder::Unordered,
            sleep_probability: 0.0,
            ..base.clone()
        },
        &mut pl,
    )?;

    for sleep_duration in sleep_durations(args.min_sleep_dur, args.max_sleep_dur) {
        for sleep_probability in sleep_probabilities(args.prob_step) {
            for (name, schedule, update) in variants {
                let result = compute_with_logging(
                    &graph,
                    None,
                    &Options {
                        schedule,
                        update,
                        sleep_probability,
                        sleep_duration,
                        ..base.clone()
                    },
                    &mut pl,
                )?;
                println!(
                    "[{:09.3} ms; {:03} iters.] [{:.4e} err.] {:<22} {{sleep_prob: {:.1}, sleep_dur: {:04} ms}}",
                    result.elapsed.as_secs_f64() * 1000.0,
                    result.iterations,
                    Norm::L1.par_distance(&result.ranks, &reference.ranks),
                    name,
                    sleep_probability,
                    sleep_duration.as_millis()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep() {
        assert_eq!(
            sleep_durations(Duration::from_millis(1), Duration::from_secs(1))
                .iter()
                .map(|d| d.as_millis())
                .collect::<Vec<_>>(),
            vec![1, 5, 10, 50, 100, 500, 1000]
        );
        assert!(sleep_durations(Duration::ZERO, Duration::from_secs(1)).is_empty());
        let probabilities = sleep_probabilities(0.1);
        assert_eq!(probabilities.len(), 11);
        assert_eq!(probabilities[0], 0.0);
        assert_eq!(probabilities[10], 1.0);
    }

    #[test]
    fn test_main_with_log_interval() -> Result<()> {
        crate::cli::cli_main([
            "bfpr",
            "bench",
            "--random",
            "20",
            "--repeat",
            "1",
            "--max-iter",
            "3",
            "--min-sleep-dur",
            "1",
            "--max-sleep-dur",
            "1",
            "--prob-step",
            "1",
            "--log-interval",
            "1",
        ])
    }
}
