use anyhow::{ensure, Context, Result};
use bnb_partition::{count_sides, output, BisectionPartitioningConfig, Circuit};
use clap::{CommandFactory, Parser};
use std::fs;
use std::path::{Path, PathBuf};
use std::time;

/// Branch-and-bound based balanced two-way partitioning of circuits.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Benchmark to partition.
    #[arg(short, long, value_name = "FILE")]
    infile: Option<PathBuf>,

    /// Show a saved result for the benchmark given with `--infile` instead of partitioning it.
    #[arg(short, long, value_name = "FILE", requires = "infile")]
    render: Option<PathBuf>,

    /// Partition every benchmark in the benchmarks directory.
    #[arg(short, long, conflicts_with = "infile")]
    all: bool,

    /// Directory scanned by `--all`.
    #[arg(long, value_name = "DIR", default_value = "benchmarks")]
    benchmarks: PathBuf,

    /// Directory results are written to.
    #[arg(short, long, value_name = "DIR", default_value = "outputs")]
    outputs: PathBuf,

    /// Seed for the initial random partitioning.
    #[arg(short, long, value_name = "INT")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let config = BisectionPartitioningConfig {
        rng_seed: args.seed,
    };

    match (&args.infile, &args.render) {
        (Some(infile), Some(render)) => render_result(infile, render),
        (Some(infile), None) => test_benchmark(infile, &args.outputs, &config),
        (None, _) if args.all => {
            let mut paths = fs::read_dir(&args.benchmarks)
                .with_context(|| format!("could not read {}", args.benchmarks.display()))?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()?;
            paths.retain(|p| p.is_file());
            paths.sort();
            for path in paths.iter() {
                test_benchmark(path, &args.outputs, &config)?;
            }
            Ok(())
        }
        (None, _) => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn test_benchmark(path: &Path, outputs: &Path, config: &BisectionPartitioningConfig) -> Result<()> {
    log::info!("opened benchmark: {}", path.display());
    let circuit = Circuit::deserialize_benchmark(path)?;
    log::info!(
        "cells: {}, nets: {}",
        circuit.cell_count(),
        circuit.net_count()
    );

    let t1 = time::Instant::now();
    let partition = circuit.run(config);
    log::info!(
        "best cut cost: {}, time: {}ms",
        partition.cost,
        t1.elapsed().as_millis()
    );

    let benchmark = circuit.benchmark.as_deref().unwrap_or("result.txt");
    let written = output::write_result(outputs, benchmark, &partition)?;
    log::info!("result written to {}", written.display());
    Ok(())
}

fn render_result(infile: &Path, render: &Path) -> Result<()> {
    let mut circuit = Circuit::deserialize_benchmark(infile)?;
    let partition = output::read_result(render)?;
    circuit.apply_assignment(&partition.assignment)?;

    let recomputed = circuit.total_cut_cost(&partition.assignment);
    ensure!(
        recomputed == partition.cost,
        "result claims cost {}, but the assignment cuts {recomputed} nets",
        partition.cost
    );

    let (left, right) = count_sides(&partition.assignment);
    println!("benchmark: {}", infile.display());
    println!("cut cost: {}", partition.cost);
    println!("left: {left}, right: {right}");
    for cell in circuit.cells.iter() {
        println!("cell {}: {:?}", cell.id, cell.side);
    }
    for net in circuit.nets.iter() {
        if net.label(&partition.assignment) == 1 {
            let [r, g, b] = net.color;
            println!("net {} (#{r:02x}{g:02x}{b:02x}) is cut", net.id);
        }
    }
    Ok(())
}
