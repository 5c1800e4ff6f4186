// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-worker iteration loop and the in-process launcher.
//!
//! One timestep is two half-steps. Each half-step refreshes the halos of
//! the current buffer, runs the kernel current → alternate, then swaps the
//! buffer roles:
//!
//!   exchange(A); A → B; exchange(B); B → A
//!
//! so after every full timestep the result is back in the first buffer.

use crate::buffers::SubgridPair;
use crate::comm::{ChannelComm, Communicator};
use crate::distribute::{gather, scatter, split_rows, stitch_rows};
use crate::halo::{exchange, serial_exchange};
use crate::kernel::{apply, apply_parallel};
use crate::partition::{decompose_rows, RowSlice, COORDINATOR};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use stencil_types::config::RunConfig;
use stencil_types::error::{StencilError, StencilResult};
use stencil_types::state::GlobalGrid;

/// How a worker sweeps its interior.
enum Sweep {
    Serial,
    Threaded(ThreadPool),
}

impl Sweep {
    fn new(threads: usize) -> StencilResult<Self> {
        if threads <= 1 {
            return Ok(Sweep::Serial);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| {
                StencilError::InvalidParameters(format!("Cannot build kernel thread pool: {e}"))
            })?;
        Ok(Sweep::Threaded(pool))
    }
}

/// State of one worker: its slice of the chain and its buffer pair.
pub struct Orchestrator<'c, C: Communicator> {
    comm: &'c C,
    nx: usize,
    slices: Vec<RowSlice>,
    me: RowSlice,
    buffers: SubgridPair,
    sweep: Sweep,
}

impl<'c, C: Communicator> Orchestrator<'c, C> {
    /// Partition the grid and allocate this worker's buffers.
    ///
    /// Every worker computes the full partition table itself; an
    /// infeasible table fails on all of them before any message is sent.
    pub fn new(comm: &'c C, nx: usize, ny: usize, threads: usize) -> StencilResult<Self> {
        let slices = decompose_rows(ny, comm.size())?;
        let me = slices
            .get(comm.rank())
            .copied()
            .ok_or_else(|| {
                StencilError::InvalidParameters(format!(
                    "Rank {} outside chain of {}",
                    comm.rank(),
                    comm.size()
                ))
            })?;
        log::debug!(
            "worker {}: rows [{}, {}) left={:?} right={:?}",
            me.rank,
            me.row_start,
            me.row_end(),
            me.left(),
            me.right()
        );
        Ok(Orchestrator {
            comm,
            nx,
            slices,
            me,
            buffers: SubgridPair::new(nx, me.local_rows),
            sweep: Sweep::new(threads)?,
        })
    }

    pub fn slice(&self) -> &RowSlice {
        &self.me
    }

    pub fn buffers(&self) -> &SubgridPair {
        &self.buffers
    }

    /// Receive the owned rows into the current buffer.
    pub fn scatter(&mut self, global: Option<&GlobalGrid>) -> StencilResult<()> {
        scatter(self.comm, global, &self.slices, self.buffers.current_mut())
    }

    /// Send the current buffer's owned rows to the coordinator.
    pub fn gather(&self, global: Option<&mut GlobalGrid>) -> StencilResult<()> {
        gather(self.comm, self.buffers.current(), &self.slices, global)
    }

    /// Exchange halos on the current buffer, update into the alternate
    /// buffer, and swap roles.
    pub fn half_step(&mut self) -> StencilResult<()> {
        exchange(
            self.comm,
            self.buffers.current_mut(),
            self.me.left(),
            self.me.right(),
        )?;
        let (nx, rows) = (self.nx, self.me.local_rows);
        let (src, dst) = self.buffers.split();
        match &self.sweep {
            Sweep::Serial => apply(&src.cells, &mut dst.cells, nx, rows)?,
            Sweep::Threaded(pool) => apply_parallel(pool, &src.cells, &mut dst.cells, nx, rows)?,
        }
        self.buffers.swap();
        Ok(())
    }

    /// One full timestep (two half-steps).
    pub fn step(&mut self) -> StencilResult<()> {
        self.half_step()?;
        self.half_step()
    }

    /// Run `niters` timesteps and return the local wall-clock time.
    pub fn run(&mut self, niters: usize) -> StencilResult<Duration> {
        let tic = Instant::now();
        for _ in 0..niters {
            self.step()?;
        }
        Ok(tic.elapsed())
    }
}

/// Coordinator's view of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub grid: GlobalGrid,
    /// Slowest worker's loop time.
    pub runtime_secs: f64,
    pub workers: usize,
}

/// Serializable record of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub nx: usize,
    pub ny: usize,
    pub niters: usize,
    pub workers: usize,
    pub runtime_secs: f64,
    pub max_value: f32,
}

impl RunSummary {
    pub fn new(cfg: &RunConfig, out: &RunOutput) -> Self {
        RunSummary {
            nx: cfg.nx,
            ny: cfg.ny,
            niters: cfg.niters,
            workers: out.workers,
            runtime_secs: out.runtime_secs,
            max_value: out.grid.max_interior(),
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> StencilResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Full worker lifecycle: partition, scatter, iterate, gather, reduce.
///
/// The coordinator passes the initial grid and gets the result back;
/// every other worker passes `None` and returns `Ok(None)`.
pub fn run_worker<C: Communicator>(
    comm: &C,
    cfg: &RunConfig,
    global: Option<GlobalGrid>,
) -> StencilResult<Option<RunOutput>> {
    let is_root = comm.rank() == COORDINATOR;
    if is_root != global.is_some() {
        return Err(StencilError::InvalidParameters(format!(
            "Worker {} {} a global grid",
            comm.rank(),
            if is_root { "requires" } else { "must not hold" }
        )));
    }
    if let Some(g) = &global {
        if g.nx != cfg.nx || g.ny != cfg.ny {
            return Err(StencilError::ShapeMismatch(format!(
                "Initial grid is {}x{}, run expects {}x{}",
                g.nx, g.ny, cfg.nx, cfg.ny
            )));
        }
    }

    let mut worker = Orchestrator::new(comm, cfg.nx, cfg.ny, cfg.threads_per_worker)?;
    let mut global = global;
    worker.scatter(global.as_ref())?;
    let elapsed = worker.run(cfg.niters)?;
    worker.gather(global.as_mut())?;
    let runtime = comm.reduce_max(COORDINATOR, elapsed.as_secs_f64())?;
    log::debug!(
        "worker {} finished {} timesteps in {:.6} s",
        comm.rank(),
        cfg.niters,
        elapsed.as_secs_f64()
    );

    match (global, runtime) {
        (Some(grid), Some(runtime_secs)) => Ok(Some(RunOutput {
            grid,
            runtime_secs,
            workers: comm.size(),
        })),
        _ => Ok(None),
    }
}

/// Run `workers` threads over a channel fabric and return the
/// coordinator's result.
///
/// If any worker fails, the rest fail on disconnect; the reported error
/// is the first one that is not merely a disconnect.
pub fn launch(cfg: &RunConfig, workers: usize, initial: GlobalGrid) -> StencilResult<RunOutput> {
    cfg.validate()?;
    if workers < 1 {
        return Err(StencilError::InvalidParameters(
            "Worker count must be >= 1".to_string(),
        ));
    }
    if cfg.ny % workers != 0 && cfg.ny >= workers {
        log::warn!(
            "ny={} does not divide over {workers} workers; last worker takes {} extra rows",
            cfg.ny,
            cfg.ny % workers
        );
    }
    log::info!(
        "launching {workers} workers on {}x{} grid for {} timesteps",
        cfg.nx,
        cfg.ny,
        cfg.niters
    );

    let mut initial = Some(initial);
    let results: Vec<StencilResult<Option<RunOutput>>> = thread::scope(|s| {
        let handles: Vec<_> = ChannelComm::fabric(workers)
            .into_iter()
            .map(|comm| {
                let global = if comm.rank() == COORDINATOR {
                    initial.take()
                } else {
                    None
                };
                s.spawn(move || run_worker(&comm, cfg, global))
            })
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(rank, h)| {
                h.join().unwrap_or_else(|_| {
                    Err(StencilError::Comm {
                        rank,
                        message: "worker thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let mut output = None;
    let mut first_err: Option<StencilError> = None;
    for result in results {
        match result {
            Ok(Some(out)) => output = Some(out),
            Ok(None) => {}
            Err(e) => {
                let replace = match &first_err {
                    None => true,
                    Some(prev) => prev.is_comm() && !e.is_comm(),
                };
                if replace {
                    first_err = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_err {
        return Err(e);
    }
    let output = output.ok_or_else(|| StencilError::Comm {
        rank: COORDINATOR,
        message: "coordinator produced no result".to_string(),
    })?;
    log::info!("run finished in {:.6} s", output.runtime_secs);
    Ok(output)
}

/// Single-process reference of the decomposed run.
///
/// All slices live in one address space; halos are copied with
/// [`serial_exchange`] and the slices are swept in parallel.
pub fn run_tiled(initial: &GlobalGrid, workers: usize, niters: usize) -> StencilResult<GlobalGrid> {
    let slices = decompose_rows(initial.ny, workers)?;
    let nx = initial.nx;
    let mut current = split_rows(initial, &slices)?;
    let mut next = current.clone();
    for _ in 0..2 * niters {
        serial_exchange(&mut current, &slices)?;
        current
            .par_iter()
            .zip(next.par_iter_mut())
            .try_for_each(|(src, dst)| apply(&src.cells, &mut dst.cells, nx, src.local_rows))?;
        std::mem::swap(&mut current, &mut next);
    }
    stitch_rows(&current, &slices, nx)
}
