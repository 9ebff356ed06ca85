/*
 * SPDX-FileCopyrightText: 2026 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::{store_ranks, CliSchedule, GlobalArgs, GraphArgs, RankArgs};
use crate::rank::compute_with_logging;
use anyhow::{ensure, Result};
use clap::Parser;
use dsi_progress_logger::{progress_logger, ProgressLog};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rank",
    about = "Compute PageRank with a parallel engine and store the rank vector.",
    long_about = None
)]
pub struct CliArgs {
    #[clap(flatten)]
    pub graph: GraphArgs,

    #[arg(short, long)]
    /// Where to store the rank vector.
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = CliSchedule::Synchronized)]
    /// The engine driving the iteration.
    pub schedule: CliSchedule,

    #[arg(long, default_value_t = 1)]
    /// How many times the computation is repeated; the reported time is the
    /// average.
    pub repeat: usize,

    #[arg(long)]
    /// Decimal digits for the output.
    pub precision: Option<usize>,

    #[clap(flatten)]
    pub rank: RankArgs,
}

pub fn main(global_args: GlobalArgs, args: CliArgs) -> Result<()> {
    ensure!(
        // Note that 0.0..1.0 is [0.0..1.0) in mathematical notation
        (0.0..1.0).contains(&args.rank.damping),
        "The damping factor must be in [0 . . 1), got {}",
        args.rank.damping
    );

    let mut pl = progress_logger![];
    pl.display_memory(true);
    if let Some(log_interval) = global_args.log_interval {
        pl.log_interval(log_interval);
    }

    let graph = args.graph.load()?;
    let options = args.rank.to_options(args.schedule.into(), args.repeat);

    let result = compute_with_logging(&graph, None, &options, &mut pl)?;

    println!(
        "[{:09.3} ms; {:03} iters.] [{:.4e} err.] {} steals",
        result.elapsed.as_secs_f64() * 1000.0,
        result.iterations,
        result.error,
        result.steals
    );

    if let Some(output) = &args.output {
        store_ranks(output, &result.ranks, args.precision)?;
    }

    Ok(())
}
