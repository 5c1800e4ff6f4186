// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Command-Line Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `stencil` command-line interface.
//!
//! ```sh
//! stencil 1024 1024 100 --workers 4
//! stencil --config run.json --report summary.json
//! RUST_LOG=debug stencil 512 512 10
//! ```

mod runner;

use clap::Parser;
use std::path::PathBuf;
use stencil_types::config::RunConfig;

#[derive(Parser, Debug)]
#[command(name = "stencil")]
#[command(about = "Distributed five-point stencil on a checkerboard grid")]
#[command(version)]
pub struct Cli {
    /// Logical grid width.
    #[arg(required_unless_present = "config")]
    pub nx: Option<usize>,
    /// Logical grid height.
    #[arg(required_unless_present = "config")]
    pub ny: Option<usize>,
    /// Number of timesteps (two stencil applications each).
    #[arg(required_unless_present = "config")]
    pub niters: Option<usize>,
    /// Worker count (default: available parallelism, capped at ny).
    #[arg(short, long, env = "STENCIL_WORKERS")]
    pub workers: Option<usize>,
    /// Kernel threads inside each worker.
    #[arg(short, long)]
    pub threads: Option<usize>,
    /// Output image path.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// JSON run configuration; replaces the positional arguments.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Write a JSON run summary here.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Use the MPI world communicator (run under mpirun).
    #[cfg(feature = "mpi")]
    #[arg(long)]
    pub mpi: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = runner::resolve_config(&cli)?;
    dispatch(&cli, &cfg)
}

#[cfg(feature = "mpi")]
fn dispatch(cli: &Cli, cfg: &RunConfig) -> anyhow::Result<()> {
    if cli.mpi {
        runner::run_mpi(cfg, cli.report.as_deref())
    } else {
        runner::run_threads(cfg, cli.report.as_deref())
    }
}

#[cfg(not(feature = "mpi"))]
fn dispatch(cli: &Cli, cfg: &RunConfig) -> anyhow::Result<()> {
    runner::run_threads(cfg, cli.report.as_deref())
}
