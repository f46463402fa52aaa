//! Command-line driver for `hashperm-core`.
//!
//! Sweeps one or more hash algorithms over a geometric range of message
//! sizes and prints, per size, how many perturbations were digested, how many
//! leading bits the two closest digests share, and how long the trial took.

mod report;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use hashperm_core::{
    auto_shard_count, Algorithm, DigestFunction, ReportSink, SizeRange, Sweep, TrialOptions,
};
use tracing_subscriber::EnvFilter;

use crate::report::{JsonLinesSink, TableSink};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    /// One right-aligned table per algorithm.
    #[default]
    Table,
    /// One JSON object per trial.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "hashperm",
    version,
    about = "Measure hash diffusion by digesting every byte perturbation of a message.",
    long_about = None
)]
struct Cli {
    /// Algorithm to measure; repeat to sweep several [default: highwayhash, highwayhash128].
    #[arg(short = 'a', long = "algorithm", value_name = "NAME")]
    algorithms: Vec<String>,

    /// Log2 of the smallest message size.
    #[arg(long = "min-shift", value_name = "N", default_value_t = 8)]
    min_shift: u32,

    /// Log2 of the largest message size (inclusive).
    #[arg(long = "max-shift", value_name = "N", default_value_t = 22)]
    max_shift: u32,

    /// Explicit message size in bytes; repeatable, overrides the shift range.
    #[arg(long = "size", value_name = "BYTES")]
    sizes: Vec<usize>,

    /// Number of parallel shards (power of two) [default: CPU count rounded down].
    #[arg(long = "shards", value_name = "N")]
    shards: Option<usize>,

    /// Report format.
    #[arg(short = 'f', long = "format", value_enum, default_value = "table")]
    format: OutputFormat,

    /// Write the report to FILE instead of STDOUT.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// List the supported algorithms and exit.
    #[arg(long = "list", action = ArgAction::SetTrue)]
    list: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    match try_main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let _ = writeln!(io::stderr(), "{err:#}");
            std::process::exit(1);
        }
    }
}

fn try_main() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        print_algorithms(&mut io::stdout().lock())?;
        return Ok(0);
    }

    let options = build_options(&cli)?;
    tracing::debug!(auto_shards = auto_shard_count(), ?options, "resolved options");

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink: Box<dyn ReportSink> = match cli.format {
        OutputFormat::Table => Box::new(TableSink::new(out)),
        OutputFormat::Json => Box::new(JsonLinesSink::new(out)),
    };

    Sweep::new(&options).run(sink.as_mut()).context("sweep aborted")?;
    Ok(0)
}

fn build_options(cli: &Cli) -> Result<TrialOptions> {
    let mut options = TrialOptions::default();
    if !cli.algorithms.is_empty() {
        options = options.with_algorithms(&cli.algorithms)?;
    }
    options = if cli.sizes.is_empty() {
        options.with_size_range(SizeRange::new(cli.min_shift, cli.max_shift)?)?
    } else {
        options.with_sizes(cli.sizes.iter().copied())?
    };
    if let Some(shards) = cli.shards {
        options = options.with_shards(shards)?;
    }
    Ok(options)
}

fn print_algorithms<W: Write>(out: &mut W) -> io::Result<()> {
    for algorithm in Algorithm::ALL {
        let keyed = if algorithm.is_keyed() { "keyed" } else { "unkeyed" };
        writeln!(out, "{:<16}{:>4} bits  {keyed}", algorithm.as_str(), algorithm.output_len() * 8)?;
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
