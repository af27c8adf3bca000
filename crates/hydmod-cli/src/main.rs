//! Command-line driver: load a JSON scenario (or the built-in demo), run it,
//! print a daily water-balance summary and optionally write the full output
//! as JSON.

mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use hydmod_core::{Retention, Simulation, SimulationOutput, Variable};
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

use scenario::Scenario;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hydmod", about = "Gridded daily water-balance model")]
struct Args {
    /// Scenario JSON file (elevation, soil, forcing, config).
    #[arg(short, long, required_unless_present = "demo")]
    input: Option<PathBuf>,

    /// Run the built-in 3×3 valley instead of reading a scenario.
    #[arg(long, conflicts_with = "input")]
    demo: bool,

    /// Length of the demo run in days.
    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u32).range(1..))]
    demo_days: u32,

    /// Write the full run output here as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep only the current state and daily totals (no per-cell history).
    #[arg(long)]
    rolling: bool,

    /// Print the daily series of one cell, given as `row,col`.
    #[arg(long, value_parser = parse_cell)]
    cell: Option<(usize, usize)>,

    /// Increase log verbosity (-v info, -vv debug).  RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_cell(s: &str) -> std::result::Result<(usize, usize), String> {
    let (r, c) = s
        .split_once(',')
        .ok_or_else(|| format!("expected row,col, got {s:?}"))?;
    let r = r.trim().parse().map_err(|e| format!("bad row {r:?}: {e}"))?;
    let c = c.trim().parse().map_err(|e| format!("bad col {c:?}: {e}"))?;
    Ok((r, c))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut scenario = match &args.input {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo(args.demo_days as usize),
    };
    if args.rolling {
        scenario.config.retention = Retention::Rolling;
    }
    let inputs = scenario.into_inputs()?;
    let grid = inputs.elevation.grid;

    if let Some((r, c)) = args.cell {
        anyhow::ensure!(
            r < grid.rows && c < grid.cols,
            "cell ({r}, {c}) outside the {}×{} grid",
            grid.rows,
            grid.cols
        );
        anyhow::ensure!(!args.rolling, "--cell needs per-cell history; drop --rolling");
    }

    let sim = Simulation::new(&inputs.elevation, inputs.soil, inputs.forcing, inputs.config)
        .context("setting up simulation")?;
    eprintln!(
        "Running {} days on a {}×{} grid ({} sinks)",
        sim.days(),
        grid.rows,
        grid.cols,
        sim.network().sink_count()
    );
    let out = sim.run().context("simulation failed")?;

    print_summary(&out);
    if let Some((r, c)) = args.cell {
        print_cell(&out, grid.index(r, c), r, c);
    }

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&out).context("serialising output")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Output written to {}", path.display());
    }
    Ok(())
}

// ── Reporting ─────────────────────────────────────────────────────────────────

fn print_summary(out: &SimulationOutput) {
    println!(
        "{:>5} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>11} {:>10}",
        "day", "precip", "melt", "aet", "runoff", "perc", "boundary", "storage", "residual"
    );
    for b in &out.balances {
        println!(
            "{:>5} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>11.3} {:>10.2e}",
            b.day,
            b.precipitation,
            b.actual_melt,
            b.actual_et,
            b.runoff,
            b.percolation,
            b.boundary_loss,
            b.total_storage(),
            b.residual
        );
    }
    let flagged = out.balances.iter().filter(|b| !b.within_tolerance).count();
    println!(
        "status {:?}: {} days, boundary loss {:.3}, max residual {:.2e}, {} days outside tolerance",
        out.status,
        out.days_completed,
        out.total_boundary_loss(),
        out.max_residual(),
        flagged
    );
}

fn print_cell(out: &SimulationOutput, cell: usize, r: usize, c: usize) {
    let Some(h) = &out.history else {
        return;
    };
    let series: Vec<(Variable, Vec<f64>)> = Variable::ALL
        .iter()
        .map(|&v| (v, h.cell_series(v, cell)))
        .collect();
    println!("\ncell ({r}, {c})");
    for (v, values) in &series {
        let line: Vec<String> = values.iter().map(|x| format!("{x:.3}")).collect();
        println!("{:<18} {}", format!("{v:?}"), line.join(" "));
    }
}
