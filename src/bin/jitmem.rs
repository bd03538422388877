//! Driver for the jitarena memory subsystem.
//!
//! `simulate` pushes synthetic compilation units through independent arenas
//! (one per unit, optionally on several threads) and prints the aggregate
//! memory report. The `metrics` and `manifest` subcommands inspect the
//! summary and bundle artifacts.

use clap::{Parser, Subcommand};
use std::fs;
use std::mem::MaybeUninit;
use std::path::PathBuf;
use std::process;
use std::thread;

use jitarena::bundle::{Manifest, Reader};
use jitarena::core::{
    Arena, ArenaConfig, ArenaResult, CompilationSession, MemKind, MemStatsAggregator,
};
use jitarena::metrics::MetricsSummary;

#[derive(Parser, Debug)]
#[command(name = "jitmem", version, about = "Per-method compiler arena tooling")]
struct Cli {
    /// Default arena page size in bytes.
    #[arg(long, global = true, default_value_t = jitarena::core::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Disable page poisoning.
    #[arg(long, global = true)]
    no_poison: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every memory kind.
    Kinds,

    /// Compile synthetic units and report arena usage.
    Simulate {
        /// Number of units to compile.
        #[arg(long, default_value_t = 16)]
        units: usize,

        /// Worker threads, each with its own arenas.
        #[arg(long, default_value_t = 1)]
        threads: usize,

        /// Print the per-unit report for every unit.
        #[arg(long)]
        verbose: bool,

        /// Metrics summary to accumulate into.
        #[arg(long)]
        metrics: Option<PathBuf>,
    },

    /// Inspect or merge metrics summaries.
    Metrics {
        #[command(subcommand)]
        command: MetricsCommand,
    },

    /// Inspect bundle manifests.
    Manifest {
        #[command(subcommand)]
        command: ManifestCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ManifestCommand {
    /// Print every entry of a bundle manifest.
    Dump {
        /// Bundle image.
        file: PathBuf,

        /// Number of entries to read.
        #[arg(long)]
        count: usize,

        /// Byte offset of the manifest entries.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
}

#[derive(Subcommand, Debug)]
enum MetricsCommand {
    /// Print a summary file.
    Show { file: PathBuf },

    /// Sum two summaries into a new file.
    Combine {
        a: PathBuf,
        b: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = ArenaConfig::default()
        .with_page_size(cli.page_size)
        .with_poison(!cli.no_poison);

    if let Err(err) = run(cli.command, config) {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

fn run(command: Command, config: ArenaConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Kinds => {
            for kind in MemKind::ALL {
                println!("{:>2} {}", kind.index(), kind);
            }
        }
        Command::Simulate {
            units,
            threads,
            verbose,
            metrics,
        } => simulate(&config, units, threads.max(1), verbose, metrics)?,
        Command::Metrics { command } => match command {
            MetricsCommand::Show { file } => {
                print!("{}", MetricsSummary::load_from_file(&file)?);
            }
            MetricsCommand::Combine { a, b, output } => {
                let a = MetricsSummary::load_from_file(&a)?;
                let b = MetricsSummary::load_from_file(&b)?;
                a.combine(&b).save_to_file(&output)?;
                println!("Wrote {}", output.display());
            }
        },
        Command::Manifest {
            command: ManifestCommand::Dump {
                file,
                count,
                offset,
            },
        } => {
            let data = fs::read(&file)?;
            let mut reader = Reader::at(&data, offset)?;
            let manifest = Manifest::read(&mut reader, count)?;
            for entry in manifest.files() {
                println!("{}", entry);
            }
            println!(
                "{} files, extraction {}",
                manifest.len(),
                if manifest.need_extraction() { "required" } else { "not required" }
            );
        }
    }
    Ok(())
}

fn simulate(
    config: &ArenaConfig,
    units: usize,
    threads: usize,
    verbose: bool,
    metrics: Option<PathBuf>,
) -> ArenaResult<()> {
    let results: Vec<ArenaResult<(MemStatsAggregator, u64)>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|worker| {
                scope.spawn(move || -> ArenaResult<(MemStatsAggregator, u64)> {
                    let mut stats = MemStatsAggregator::new();
                    let mut code_bytes = 0u64;
                    for unit in (worker..units).step_by(threads) {
                        code_bytes += compile_unit(config, unit, verbose, &mut stats)?;
                    }
                    Ok((stats, code_bytes))
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    let mut stats = MemStatsAggregator::new();
    let mut code_bytes = 0u64;
    for result in results {
        let (worker_stats, worker_code) = result?;
        stats.merge(&worker_stats);
        code_bytes += worker_code;
    }
    print!("{}", stats);

    if let Some(path) = metrics {
        let mut summary = MetricsSummary::load_or_default(&path).unwrap_or_default();
        summary.aggregate_from(&MetricsSummary {
            successful_compiles: units as i64,
            num_code_bytes: code_bytes as i64,
            ..MetricsSummary::default()
        });
        if summary.save_or_warn(&path) {
            println!("Metrics written to {}", path.display());
        }
    }

    Ok(())
}

/// Compile one synthetic unit on a fresh arena; returns its "code size".
fn compile_unit(
    config: &ArenaConfig,
    unit: usize,
    verbose: bool,
    stats: &mut MemStatsAggregator,
) -> ArenaResult<u64> {
    let mut arena = Arena::with_config(config.clone());
    let blocks = 4 + unit % 13;
    let name = format!("Synthetic::Method{}", unit);

    let report = {
        let session = CompilationSession::new(&arena, &name);

        session.run_phase("import", |s| {
            let nodes = s.allocator(MemKind::AstNode);
            let bbs = s.allocator(MemKind::BasicBlock);
            for _ in 0..blocks {
                bbs.alloc_bytes(128)?;
                for _ in 0..8 {
                    nodes.alloc_bytes(48)?;
                }
            }
            s.intern_str(&name)?;
            Ok(())
        })?;

        session.run_phase("ssa", |s| {
            s.allocator(MemKind::Ssa).alloc_bytes(64 * blocks)?;
            s.allocator(MemKind::ZeroInit).alloc_zeroed_slice::<u64>(blocks)?;
            Ok(())
        })?;

        session.run_phase("lsra", |s| {
            let intervals = s.allocator(MemKind::LsraInterval);
            let refs = s.allocator(MemKind::LsraRefPosition);
            for _ in 0..blocks * 3 {
                intervals.alloc_bytes(64)?;
                refs.alloc_bytes(32)?;
            }
            Ok(())
        })?;

        session.run_phase("codegen", |s| {
            let code = s.allocator(MemKind::Codegen).alloc_bytes(256 * blocks)?;
            code.fill(MaybeUninit::new(0xCC));
            s.allocator(MemKind::DebugInfo).alloc_bytes(16 * blocks)?;
            Ok(())
        })?;

        session.finish()?
    };

    if verbose {
        print!("{}", report);
    }
    stats.record(&report.unit_name, &report.snapshot);
    arena.teardown()?;

    Ok((blocks * 24) as u64)
}
