// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Run Orchestration
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Builds the run configuration and drives a run to image and report.

use std::path::Path;

use anyhow::{anyhow, Context, Result};

use stencil_core::driver::{launch, RunOutput, RunSummary};
use stencil_core::init::checkerboard;
use stencil_core::pgm::write_pgm;
use stencil_types::config::RunConfig;

use crate::Cli;

/// Merge the config file (if any) with command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<RunConfig> {
    let mut cfg = match &cli.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => {
            let nx = cli.nx.ok_or_else(|| anyhow!("nx is required"))?;
            let ny = cli.ny.ok_or_else(|| anyhow!("ny is required"))?;
            let niters = cli.niters.ok_or_else(|| anyhow!("niters is required"))?;
            RunConfig::new(nx, ny, niters)
        }
    };
    if let Some(workers) = cli.workers {
        cfg.workers = Some(workers);
    }
    if let Some(threads) = cli.threads {
        cfg.threads_per_worker = threads;
    }
    if let Some(output) = &cli.output {
        cfg.output = output.clone();
    }
    cfg.validate().context("Invalid run configuration")?;
    Ok(cfg)
}

/// Explicit worker count, or the machine's parallelism capped at `ny`.
pub fn worker_count(cfg: &RunConfig) -> usize {
    cfg.workers.unwrap_or_else(|| {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        available.min(cfg.ny).max(1)
    })
}

/// Coordinator epilogue: report runtime, write the image and summary.
fn finish(cfg: &RunConfig, out: &RunOutput, report: Option<&Path>) -> Result<()> {
    println!(" runtime: {:.6} s", out.runtime_secs);
    write_pgm(&cfg.output, &out.grid)
        .with_context(|| format!("Failed to write image {}", cfg.output.display()))?;
    log::info!("wrote {}", cfg.output.display());
    if let Some(path) = report {
        RunSummary::new(cfg, out)
            .write_json(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    Ok(())
}

/// In-process run: one thread per worker.
pub fn run_threads(cfg: &RunConfig, report: Option<&Path>) -> Result<()> {
    let workers = worker_count(cfg);
    if cfg.workers.is_none() {
        log::info!("no worker count given, using {workers}");
    }
    let out = launch(cfg, workers, checkerboard(cfg.nx, cfg.ny))
        .map_err(|e| {
            log::error!("run with {workers} workers failed: {e}");
            e
        })
        .with_context(|| format!("Run with {workers} workers failed"))?;
    finish(cfg, &out, report)
}

/// Multi-process run: this process is one rank of the MPI world.
#[cfg(feature = "mpi")]
pub fn run_mpi(cfg: &RunConfig, report: Option<&Path>) -> Result<()> {
    use stencil_core::comm::Communicator;
    use stencil_core::comm_mpi::MpiComm;
    use stencil_core::driver::run_worker;
    use stencil_core::partition::COORDINATOR;

    let universe = mpi::initialize().ok_or_else(|| anyhow!("MPI is already initialised"))?;
    let comm = MpiComm::new(universe.world());
    let global = (comm.rank() == COORDINATOR).then(|| checkerboard(cfg.nx, cfg.ny));
    match run_worker(&comm, cfg, global) {
        Ok(Some(out)) => finish(cfg, &out, report),
        Ok(None) => Ok(()),
        Err(e) => {
            log::error!("rank {} failed: {e}", comm.rank());
            comm.abort(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("stencil").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_positional_arguments() {
        let cfg = resolve_config(&parse(&["64", "32", "10", "--workers", "4"])).expect("config");
        assert_eq!((cfg.nx, cfg.ny, cfg.niters), (64, 32, 10));
        assert_eq!(cfg.workers, Some(4));
        assert_eq!(cfg.threads_per_worker, 1);
        assert_eq!(worker_count(&cfg), 4);
    }

    #[test]
    fn test_missing_positionals_rejected() {
        let err = Cli::try_parse_from(["stencil", "64", "32"]).expect_err("niters missing");
        assert_eq!(err.exit_code(), 2);
        assert!(Cli::try_parse_from(["stencil", "64", "x", "3"]).is_err());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(resolve_config(&parse(&["0", "32", "10"])).is_err());
        assert!(resolve_config(&parse(&["8", "8", "1", "--threads", "0"])).is_err());
    }

    #[test]
    fn test_config_file_with_overrides() {
        let path = std::env::temp_dir().join(format!("stencil_cli_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"nx": 16, "ny": 12, "niters": 3}"#).expect("write config");
        let path_str = path.to_string_lossy().to_string();
        let cli = parse(&["--config", &path_str, "--threads", "2", "--output", "out.pgm"]);
        let cfg = resolve_config(&cli).expect("config");
        let _ = std::fs::remove_file(&path);
        assert_eq!((cfg.nx, cfg.ny, cfg.niters), (16, 12, 3));
        assert_eq!(cfg.threads_per_worker, 2);
        assert_eq!(cfg.output, std::path::PathBuf::from("out.pgm"));
    }

    #[test]
    fn test_default_workers_capped_by_rows() {
        let cfg = RunConfig::new(8, 1, 1);
        assert_eq!(worker_count(&cfg), 1);
    }

    #[test]
    fn test_run_threads_writes_outputs() {
        let dir = std::env::temp_dir();
        let id = std::process::id();
        let mut cfg = RunConfig::new(20, 10, 2);
        cfg.workers = Some(2);
        cfg.output = dir.join(format!("stencil_cli_run_{id}.pgm"));
        let report = dir.join(format!("stencil_cli_run_{id}.json"));
        run_threads(&cfg, Some(&report)).expect("run");
        let image = std::fs::read(&cfg.output).expect("image");
        let summary = std::fs::read_to_string(&report).expect("report");
        let _ = std::fs::remove_file(&cfg.output);
        let _ = std::fs::remove_file(&report);
        assert!(image.starts_with(b"P5 20 10 255\n"));
        assert!(summary.contains("\"workers\": 2"));
    }

    #[test]
    fn test_run_threads_reports_infeasible_partition() {
        let mut cfg = RunConfig::new(8, 2, 1);
        cfg.workers = Some(4);
        cfg.output = std::env::temp_dir().join(format!("stencil_cli_bad_{}.pgm", std::process::id()));
        let err = run_threads(&cfg, None).expect_err("more workers than rows");
        let text = format!("{err:#}");
        assert!(text.contains("Run with 4 workers failed"), "{text}");
        assert!(text.contains("Too many workers"), "{text}");
        assert!(!cfg.output.exists());
    }
}
