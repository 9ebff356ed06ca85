/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Command-line interface.
//!
//! The `bfpr` binary has two subcommands: `rank`, which computes the ranks of
//! a graph and stores them, and `bench`, which sweeps the parameters of the
//! synthetic load and prints, for each engine, a line with timing, number of
//! iterations and distance from a sequential reference.

use crate::graphs::arcs::{load_arcs, ArcsFormat};
use crate::graphs::random::UniformRandom;
use crate::graphs::{CsrGraph, CsrView};
use crate::rank::{Norm, Options, Schedule, UpdateOrder};
use crate::utils::Granularity;
use anyhow::{anyhow, bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub mod bench;
pub mod rank;

/// Parses the number of threads from a string.
///
/// This function is meant to be used with `#[arg(...,  value_parser =
/// num_threads_parser)]`.
pub fn num_threads_parser(arg: &str) -> Result<usize> {
    let num_threads = arg.parse::<usize>()?;
    ensure!(num_threads > 0, "Number of threads must be greater than 0");
    Ok(num_threads)
}

/// Shared CLI arguments for commands that specify a number of threads.
#[derive(Args, Debug)]
pub struct NumThreadsArg {
    #[arg(short = 'j', long, default_value_t = num_cpus::get().max(1), value_parser = num_threads_parser)]
    /// The number of threads to use.
    pub num_threads: usize,
}

/// Shared CLI arguments for commands that specify a granularity.
#[derive(Args, Debug)]
pub struct GranularityArgs {
    #[arg(long, conflicts_with("node_granularity"))]
    /// The tentative number of arcs used to define the size of a chunk
    /// (advanced option).
    pub arc_granularity: Option<u64>,

    #[arg(long, conflicts_with("arc_granularity"))]
    /// The number of nodes in a chunk (advanced option).
    pub node_granularity: Option<usize>,
}

impl GranularityArgs {
    pub fn into_granularity(&self) -> Granularity {
        match (self.arc_granularity, self.node_granularity) {
            (Some(_), Some(_)) => unreachable!(),
            (Some(arc_granularity), None) => Granularity::Arcs(arc_granularity),
            (None, Some(node_granularity)) => Granularity::Nodes(node_granularity),
            (None, None) => Granularity::default(),
        }
    }
}

/// Shared CLI arguments specifying the graph to rank.
#[derive(Args, Debug)]
pub struct GraphArgs {
    #[arg(required_unless_present("random"))]
    /// A file containing a list of arcs, one per line, each given by a source
    /// and a target node identifier.
    pub arcs: Option<PathBuf>,

    #[arg(long, conflicts_with("arcs"))]
    /// Rank a seeded random graph with this number of nodes instead.
    pub random: Option<usize>,

    #[arg(long, default_value_t = 8)]
    /// The average outdegree of the random graph.
    pub avg_degree: usize,

    #[arg(long, default_value_t = 0)]
    /// The seed of the random graph.
    pub graph_seed: u64,

    #[arg(long)]
    /// The column separator of the arc list (default: any whitespace).
    pub separator: Option<char>,

    #[arg(long, default_value_t = '#')]
    /// Ignore lines of the arc list that start with this symbol.
    pub line_comment_symbol: char,

    #[arg(long)]
    /// The number of nodes; if not specified, it is one plus the largest node
    /// identifier in the arc list.
    pub num_nodes: Option<usize>,

    #[arg(long)]
    /// Add a self-loop to every node, so that there are no dead ends.
    pub self_loops: bool,
}

impl GraphArgs {
    /// Loads or generates the graph.
    pub fn load(&self) -> Result<CsrGraph> {
        let graph = match (&self.arcs, self.random) {
            (Some(path), None) => {
                log::info!("Loading arcs from {}", path.display());
                load_arcs(
                    path,
                    &ArcsFormat {
                        separator: self.separator,
                        comment: self.line_comment_symbol,
                        num_nodes: self.num_nodes,
                    },
                )
                .with_context(|| format!("Could not load arcs from {}", path.display()))?
            }
            (None, Some(n)) => {
                log::info!(
                    "Generating a random graph with {} nodes and average outdegree {}",
                    n,
                    self.avg_degree
                );
                UniformRandom::new(n, self.avg_degree, self.graph_seed).build()
            }
            _ => bail!("Exactly one of an arc list and --random must be specified"),
        };
        let graph = if self.self_loops {
            graph.with_self_loops()
        } else {
            graph
        };
        log::info!(
            "The graph has {} nodes and {} arcs",
            graph.num_nodes(),
            graph.num_arcs()
        );
        Ok(graph)
    }
}

/// The norm used to measure the error.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliNorm {
    /// Sum of absolute differences.
    #[default]
    L1,
    /// Square root of the sum of squared differences.
    L2,
    /// Maximum absolute difference.
    Linf,
}

impl From<CliNorm> for Norm {
    fn from(norm: CliNorm) -> Self {
        match norm {
            CliNorm::L1 => Norm::L1,
            CliNorm::L2 => Norm::L2,
            CliNorm::Linf => Norm::Linf,
        }
    }
}

/// The engine driving the iteration.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum CliSchedule {
    /// A single thread.
    Sequential,
    /// All threads in lockstep.
    #[default]
    Synchronized,
    /// Each thread performs its passes independently.
    BarrierFree,
}

impl From<CliSchedule> for Schedule {
    fn from(schedule: CliSchedule) -> Self {
        match schedule {
            CliSchedule::Sequential => Schedule::Sequential,
            CliSchedule::Synchronized => Schedule::Synchronized,
            CliSchedule::BarrierFree => Schedule::BarrierFree,
        }
    }
}

/// Shared CLI arguments specifying the parameters of a computation.
#[derive(Args, Debug)]
pub struct RankArgs {
    #[arg(short, long, default_value_t = 0.85)]
    /// The damping factor (must be in the interval [0 . . 1)).
    pub damping: f64,

    #[arg(short, long, default_value_t = 1E-6)]
    /// Stop when the error is below this threshold.
    pub tolerance: f64,

    #[arg(long, value_enum, default_value_t = CliNorm::L1)]
    /// The norm used to measure the error.
    pub norm: CliNorm,

    #[arg(long, default_value_t = 500)]
    /// Maximum number of iterations.
    pub max_iter: usize,

    #[arg(long)]
    /// Redistribute the rank of dead ends uniformly.
    pub dead_end_aware: bool,

    #[arg(long)]
    /// Update ranks in place (Gauss–Seidel-like iteration).
    pub ordered: bool,

    #[arg(long)]
    /// Let threads that run out of work steal from the others.
    pub stealing: bool,

    #[arg(long, requires("stealing"))]
    /// Steal the whole remaining range of a victim.
    pub steal_all: bool,

    #[arg(long, default_value_t = 0.0)]
    /// The probability of stalling before processing a node.
    pub sleep_prob: f64,

    #[arg(long, value_parser = parse_duration, default_value = "0")]
    /// The duration of a stall (see --log-interval for the syntax).
    pub sleep_dur: Duration,

    #[arg(long)]
    /// Process strongly connected components in topological order.
    pub split_components: bool,

    #[arg(long)]
    /// The seed of the random number generators of the threads.
    pub seed: Option<u64>,

    #[clap(flatten)]
    pub num_threads: NumThreadsArg,

    #[clap(flatten)]
    pub granularity: GranularityArgs,
}

impl RankArgs {
    /// Returns the options corresponding to these arguments.
    pub fn to_options(&self, schedule: Schedule, repeat: usize) -> Options {
        Options {
            repeat,
            damping: self.damping,
            tolerance_norm: self.norm.into(),
            tolerance: self.tolerance,
            max_iterations: self.max_iter,
            dead_end_aware: self.dead_end_aware,
            update: if self.ordered {
                UpdateOrder::Ordered
            } else {
                UpdateOrder::Unordered
            },
            schedule,
            helper_stealing: self.stealing,
            steal_all: self.steal_all,
            sleep_probability: self.sleep_prob,
            sleep_duration: self.sleep_dur,
            split_components: self.split_components,
            num_threads: Some(self.num_threads.num_threads),
            granularity: self.granularity.into_granularity(),
            seed: self.seed,
        }
    }
}

/// Creates all parent directories of the given file path.
pub fn create_parent_dir(file_path: impl AsRef<Path>) -> Result<()> {
    // ensure that the dst directory exists
    if let Some(parent_dir) = file_path.as_ref().parent() {
        std::fs::create_dir_all(parent_dir).with_context(|| {
            format!(
                "Failed to create the directory {:?}",
                parent_dir.to_string_lossy()
            )
        })?;
    }
    Ok(())
}

/// Stores a vector of floats in ASCII format, one per line.
pub fn store_ranks(path: impl AsRef<Path>, values: &[f64], precision: Option<usize>) -> Result<()> {
    create_parent_dir(&path)?;
    let path_display = path.as_ref().display();
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Could not create vector at {}", path_display))?;
    let mut file = BufWriter::new(file);
    log::info!("Storing in ASCII format at {}", path_display);
    for value in values.iter() {
        match precision {
            None => writeln!(file, "{value}"),
            Some(precision) => writeln!(file, "{value:.precision$}"),
        }
        .with_context(|| format!("Could not write vector to {}", path_display))?;
    }
    file.flush()
        .with_context(|| format!("Could not write vector to {}", path_display))?;
    Ok(())
}

fn parse_duration(value: &str) -> Result<Duration> {
    if value.is_empty() {
        bail!("Empty duration string, if you want every 0 milliseconds use `0`.");
    }
    let mut duration = Duration::from_secs(0);
    let mut acc = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            acc.push(c);
        } else if c.is_whitespace() {
            continue;
        } else {
            let dur = acc.parse::<u64>()?;
            match c {
                's' => duration += Duration::from_secs(dur),
                'm' => duration += Duration::from_secs(dur * 60),
                'h' => duration += Duration::from_secs(dur * 60 * 60),
                'd' => duration += Duration::from_secs(dur * 60 * 60 * 24),
                _ => return Err(anyhow!("Invalid duration suffix: {}", c)),
            }
            acc.clear();
        }
    }
    if !acc.is_empty() {
        let dur = acc.parse::<u64>()?;
        duration += Duration::from_millis(dur);
    }
    Ok(duration)
}

/// Initializes the `env_logger` logger with a custom format including
/// timestamps with elapsed time since initialization.
pub fn init_env_logger() -> Result<()> {
    use jiff::fmt::friendly::{Designator, Spacing, SpanPrinter};
    use jiff::SpanRound;

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    let start = std::time::Instant::now();
    let printer = SpanPrinter::new()
        .spacing(Spacing::None)
        .designator(Designator::Compact);
    let span_round = SpanRound::new()
        .largest(jiff::Unit::Day)
        .smallest(jiff::Unit::Millisecond)
        .days_are_24_hours();

    builder.format(move |buf, record| {
        let Ok(ts) = jiff::Timestamp::try_from(SystemTime::now()) else {
            return Err(std::io::Error::other("Failed to get timestamp"));
        };
        let style = buf.default_level_style(record.level());
        let elapsed = start.elapsed();
        let span = jiff::Span::new()
            .seconds(elapsed.as_secs() as i64)
            .milliseconds(elapsed.subsec_millis() as i64);
        let span = span.round(span_round).map_err(std::io::Error::other)?;
        writeln!(
            buf,
            "{} {} {style}{}{style:#} [{:?}] {} - {}",
            ts.strftime("%F %T%.3f"),
            printer.span_to_string(&span),
            record.level(),
            std::thread::current().id(),
            record.target(),
            record.args()
        )
    });
    builder.init();
    Ok(())
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    #[arg(long, value_parser = parse_duration, global=true, display_order = 1000)]
    /// How often to log progress. Default is 10s. You can use the suffixes "s"
    /// for seconds, "m" for minutes, "h" for hours, and "d" for days. If no
    /// suffix is provided it is assumed to be in milliseconds.
    /// Example: "1d2h3m4s567" is parsed as 1 day + 2 hours + 3 minutes + 4
    /// seconds + 567 milliseconds = 93784567 milliseconds.
    pub log_interval: Option<Duration>,
}

#[derive(Subcommand, Debug)]
pub enum SubCommands {
    Rank(rank::CliArgs),
    Bench(bench::CliArgs),
}

#[derive(Parser, Debug)]
#[command(name = "bfpr", version)]
/// Parallel PageRank with work stealing, barrier-free iterations and
/// synthetic load injection.
///
/// Noteworthy environment variables:
///
/// - RUST_LOG: configuration for env_logger
///   <https://docs.rs/env_logger/latest/env_logger/>
pub struct Cli {
    #[command(subcommand)]
    pub command: SubCommands,
    #[clap(flatten)]
    pub args: GlobalArgs,
}

/// The entry point of the command-line interface.
pub fn cli_main<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let start = std::time::Instant::now();
    let cli = Cli::parse_from(args);
    match cli.command {
        SubCommands::Rank(args) => {
            rank::main(cli.args, args)?;
        }
        SubCommands::Bench(args) => {
            bench::main(cli.args, args)?;
        }
    }

    log::info!(
        "The command took {}",
        pretty_print_elapsed(start.elapsed().as_secs_f64())
    );

    Ok(())
}

/// Pretty prints seconds in a humanly readable format.
fn pretty_print_elapsed(elapsed: f64) -> String {
    let mut result = String::new();
    let mut elapsed_seconds = elapsed as u64;
    let weeks = elapsed_seconds / (60 * 60 * 24 * 7);
    elapsed_seconds %= 60 * 60 * 24 * 7;
    let days = elapsed_seconds / (60 * 60 * 24);
    elapsed_seconds %= 60 * 60 * 24;
    let hours = elapsed_seconds / (60 * 60);
    elapsed_seconds %= 60 * 60;
    let minutes = elapsed_seconds / 60;

    match weeks {
        0 => {}
        1 => result.push_str("1 week "),
        _ => result.push_str(&format!("{} weeks ", weeks)),
    }
    match days {
        0 => {}
        1 => result.push_str("1 day "),
        _ => result.push_str(&format!("{} days ", days)),
    }
    match hours {
        0 => {}
        1 => result.push_str("1 hour "),
        _ => result.push_str(&format!("{} hours ", hours)),
    }
    match minutes {
        0 => {}
        1 => result.push_str("1 minute "),
        _ => result.push_str(&format!("{} minutes ", minutes)),
    }

    result.push_str(&format!("{:.3} seconds ({}s)", elapsed % 60.0, elapsed));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("5").unwrap(), Duration::from_millis(5));
        assert_eq!(
            parse_duration("1m2s3").unwrap(),
            Duration::from_millis(62_003)
        );
        assert!(parse_duration("").is_err());
        assert!(parse_duration("3x").is_err());
    }

    #[test]
    fn test_store_ranks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranks").join("test.txt");
        let values = vec![0.5, 0.3, 0.2];
        store_ranks(&path, &values, None).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<f64> = content.lines().map(|l| l.parse().unwrap()).collect();
        assert_eq!(parsed, values);

        store_ranks(&path, &values, Some(2)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().collect::<Vec<_>>(),
            vec!["0.50", "0.30", "0.20"]
        );
    }

    #[test]
    fn test_pretty_print_elapsed() {
        assert_eq!(pretty_print_elapsed(61.5), "1 minute 1.500 seconds (61.5s)");
    }
}
