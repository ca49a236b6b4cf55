//! hcalrecon CLI
//!
//! Runs Hcal track finding and muon/MIP triggers over JSON-lines event files.
#![allow(clippy::cast_precision_loss)]

use clap::{Parser, Subcommand};
use hcalrecon_algorithms::{Process, ProcessStatistics};
use hcalrecon_core::{Event, PerSection, Product, Section};
use hcalrecon_io::{EventFileReader, ProcessConfig, ProductFileWriter};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    HcalIo(#[from] hcalrecon_io::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Hcal reconstruction: track finding and muon/MIP triggers.
#[derive(Parser)]
#[command(name = "hcalrecon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured producers over event files
    Process {
        /// Input event file(s), one JSON event per line
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file for the products, one JSON event per line
        #[arg(short, long)]
        output: PathBuf,

        /// Process configuration (JSON); all producers with defaults if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Events processed in parallel per batch
        #[arg(long, default_value = "1000")]
        batch_size: usize,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short = 'j', long)]
        threads: Option<usize>,
    },

    /// Summarize the hit collections of an event file
    Info {
        /// Input event file
        input: PathBuf,

        /// Photo-electron threshold used to count noise hits
        #[arg(long, default_value = "5.5")]
        min_pe: f32,
    },

    /// Print the default process configuration
    Defaults,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            batch_size,
            threads,
        } => {
            if let Some(threads) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()?;
            }
            let config = match config {
                Some(path) => ProcessConfig::from_file(path)?,
                None => ProcessConfig::default(),
            };
            let process = config.build()?;
            for producer in process.producers() {
                debug!("producer {} ({})", producer.name(), producer.class());
            }
            run_process(&process, &input, &output, batch_size.max(1))?;
        }

        Commands::Info { input, min_pe } => print_info(&input, min_pe)?,

        Commands::Defaults => println!("{}", ProcessConfig::default().to_json()?),
    }

    Ok(())
}

fn run_process(
    process: &Process,
    input: &[PathBuf],
    output: &Path,
    batch_size: usize,
) -> Result<()> {
    let start = Instant::now();
    let mut writer = ProductFileWriter::create(output)?;
    let mut totals = ProcessStatistics::default();
    let mut fired: BTreeMap<String, usize> = BTreeMap::new();
    let mut tracks: BTreeMap<String, usize> = BTreeMap::new();

    for path in input {
        info!("reading {}", path.display());
        let mut reader = EventFileReader::open(path)?;
        loop {
            let mut batch = reader
                .by_ref()
                .take(batch_size)
                .collect::<hcalrecon_io::Result<Vec<Event>>>()?;
            if batch.is_empty() {
                break;
            }
            totals = totals.merge(process.run(&mut batch));

            for event in &batch {
                for (name, product) in event.products() {
                    match product {
                        Product::Trigger(decision) if decision.fired => {
                            *fired.entry(name.clone()).or_default() += 1;
                        }
                        Product::Tracks(found) => {
                            *tracks.entry(name.clone()).or_default() += found.len();
                        }
                        Product::Trigger(_) => {}
                    }
                }
                writer.write_event(event)?;
            }
        }
    }
    writer.flush()?;

    let elapsed = start.elapsed();
    println!(
        "Processed {} events in {:.2}s",
        totals.events,
        elapsed.as_secs_f64()
    );
    if totals.producer_failures > 0 {
        println!("Skipped producer runs: {}", totals.producer_failures);
    }
    for (name, count) in &tracks {
        println!("{name}: {count} tracks");
    }
    for (name, count) in &fired {
        println!(
            "{name}: fired {count} / {} ({:.1}%)",
            totals.events,
            100.0 * *count as f64 / totals.events.max(1) as f64
        );
    }
    println!("Output: {}", output.display());
    Ok(())
}

fn print_info(input: &Path, min_pe: f32) -> Result<()> {
    let mut events = 0usize;
    let mut collections: BTreeMap<String, (usize, PerSection<usize>, usize)> = BTreeMap::new();

    for event in EventFileReader::open(input)? {
        let event = event?;
        events += 1;
        for (tag, hits) in event.collections() {
            let entry = collections
                .entry(tag.to_string())
                .or_insert_with(|| (0, PerSection::splat(0), 0));
            entry.0 += hits.len();
            for hit in hits {
                entry.1[hit.section] += 1;
            }
            entry.2 += hits.iter().filter(|hit| hit.is_noise(min_pe)).count();
        }
    }

    println!("File: {}", input.display());
    println!("Events: {events}");
    for (name, (total, per_section, noise)) in &collections {
        println!("Collection {name}: {total} hits");
        for section in Section::ALL {
            println!("  {:<7} {}", section.name(), per_section[section]);
        }
        println!(
            "  noise (pe < {min_pe}): {noise} ({:.1}%)",
            100.0 * *noise as f64 / (*total).max(1) as f64
        );
    }
    Ok(())
}
