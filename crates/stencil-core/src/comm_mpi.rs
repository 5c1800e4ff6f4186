// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — MPI Communication
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Multi-process [`Communicator`] over rsmpi.
//!
//! The caller owns the MPI universe:
//!
//! ```ignore
//! let universe = mpi::initialize().ok_or(...)?;
//! let comm = MpiComm::new(universe.world());
//! ```
//!
//! MPI reports transport failures by aborting the job, so the methods
//! here only fail on layout errors detected before a call is issued.

use crate::comm::{Communicator, Tag};
use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::point_to_point::send_receive_into_with_tags;
use mpi::topology::{Communicator as MpiCommunicator, SimpleCommunicator};
use mpi::traits::{Destination, Root, Source};
use mpi::Count;
use stencil_types::error::{StencilError, StencilResult};

pub struct MpiComm {
    world: SimpleCommunicator,
}

impl MpiComm {
    pub fn new(world: SimpleCommunicator) -> Self {
        MpiComm { world }
    }

    /// Terminate every process of the job with `code`.
    pub fn abort(&self, code: i32) -> ! {
        self.world.abort(code)
    }

    fn rank_of(&self, peer: usize) -> StencilResult<i32> {
        i32::try_from(peer).map_err(|_| StencilError::Comm {
            rank: self.rank(),
            message: format!("Peer {peer} exceeds MPI rank range"),
        })
    }
}

fn to_counts(values: &[usize]) -> StencilResult<Vec<Count>> {
    values
        .iter()
        .map(|&v| {
            Count::try_from(v).map_err(|_| {
                StencilError::ShapeMismatch(format!("Transfer size {v} exceeds MPI count range"))
            })
        })
        .collect()
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send_recv(
        &self,
        send: &[f32],
        dest: Option<usize>,
        send_tag: Tag,
        recv: &mut [f32],
        source: Option<usize>,
        recv_tag: Tag,
    ) -> StencilResult<()> {
        match (dest, source) {
            (Some(d), Some(s)) => {
                let dest = self.world.process_at_rank(self.rank_of(d)?);
                let source = self.world.process_at_rank(self.rank_of(s)?);
                let _status =
                    send_receive_into_with_tags(send, &dest, send_tag, recv, &source, recv_tag);
            }
            (Some(d), None) => {
                self.world
                    .process_at_rank(self.rank_of(d)?)
                    .send_with_tag(send, send_tag);
            }
            (None, Some(s)) => {
                self.world
                    .process_at_rank(self.rank_of(s)?)
                    .receive_into_with_tag(recv, recv_tag);
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<&[f32]>,
        counts: &[usize],
        displs: &[usize],
        recv: &mut [f32],
    ) -> StencilResult<()> {
        let root_process = self.world.process_at_rank(self.rank_of(root)?);
        if self.rank() != root {
            root_process.scatter_varcount_into(recv);
            return Ok(());
        }
        let send = send.ok_or_else(|| {
            StencilError::InvalidParameters("Scatter root needs a send buffer".to_string())
        })?;
        let counts = to_counts(counts)?;
        let displs = to_counts(displs)?;
        let partition = Partition::new(send, counts, displs);
        root_process.scatter_varcount_into_root(&partition, recv);
        Ok(())
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        counts: &[usize],
        displs: &[usize],
        recv: Option<&mut [f32]>,
    ) -> StencilResult<()> {
        let root_process = self.world.process_at_rank(self.rank_of(root)?);
        if self.rank() != root {
            root_process.gather_varcount_into(send);
            return Ok(());
        }
        let recv = recv.ok_or_else(|| {
            StencilError::InvalidParameters("Gather root needs a receive buffer".to_string())
        })?;
        let counts = to_counts(counts)?;
        let displs = to_counts(displs)?;
        let mut partition = PartitionMut::new(recv, counts, displs);
        root_process.gather_varcount_into_root(send, &mut partition);
        Ok(())
    }

    fn reduce_max(&self, root: usize, value: f64) -> StencilResult<Option<f64>> {
        let root_process = self.world.process_at_rank(self.rank_of(root)?);
        if self.rank() != root {
            root_process.reduce_into(&value, SystemOperation::max());
            return Ok(None);
        }
        let mut out = 0.0f64;
        root_process.reduce_into_root(&value, &mut out, SystemOperation::max());
        Ok(Some(out))
    }
}
