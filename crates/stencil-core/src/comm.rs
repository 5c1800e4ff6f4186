// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Worker Communication
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Message passing between workers.
//!
//! [`Communicator`] is the seam between the decomposition logic and the
//! transport. [`ChannelComm`] runs every worker as an OS thread in one
//! process, with a dedicated channel per ordered pair of workers; the
//! `mpi` feature adds a multi-process backend with the same interface.
//!
//! Workers never share grid memory: every payload is an owned copy.
//! When a worker fails it drops its endpoints, and every peer blocked on
//! it sees a disconnect, so a single failure takes the whole run down.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use stencil_types::error::{StencilError, StencilResult};

/// Message-matching tag.
pub type Tag = i32;

pub const TAG_SCATTER: Tag = 101;
pub const TAG_GATHER: Tag = 102;
pub const TAG_REDUCE: Tag = 103;

/// Point-to-point and collective operations used by a worker.
///
/// All collectives must be entered by every worker of the chain.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Send `send` to `dest` while receiving into `recv` from `source`.
    ///
    /// A `None` peer makes that half a no-op and leaves `recv` untouched.
    fn send_recv(
        &self,
        send: &[f32],
        dest: Option<usize>,
        send_tag: Tag,
        recv: &mut [f32],
        source: Option<usize>,
        recv_tag: Tag,
    ) -> StencilResult<()>;

    /// Variable-size scatter from `root`: worker `r` receives
    /// `counts[r]` cells starting at `displs[r]` of the root's buffer.
    fn scatter_varcount(
        &self,
        root: usize,
        send: Option<&[f32]>,
        counts: &[usize],
        displs: &[usize],
        recv: &mut [f32],
    ) -> StencilResult<()>;

    /// Inverse of [`Communicator::scatter_varcount`]. Only `root` passes
    /// a receive buffer.
    fn gather_varcount(
        &self,
        root: usize,
        send: &[f32],
        counts: &[usize],
        displs: &[usize],
        recv: Option<&mut [f32]>,
    ) -> StencilResult<()>;

    /// Maximum of `value` over all workers, observed by `root` only.
    fn reduce_max(&self, root: usize, value: f64) -> StencilResult<Option<f64>>;
}

#[derive(Debug)]
enum Payload {
    Cells(Vec<f32>),
    Scalar(f64),
}

#[derive(Debug)]
struct Envelope {
    tag: Tag,
    payload: Payload,
}

/// In-process communicator: one endpoint per worker thread.
pub struct ChannelComm {
    rank: usize,
    size: usize,
    outboxes: Vec<Option<Sender<Envelope>>>,
    inboxes: Vec<Option<Receiver<Envelope>>>,
    // Envelopes that arrived before a receive with their tag was posted.
    stash: RefCell<Vec<VecDeque<Envelope>>>,
}

impl ChannelComm {
    /// Build the endpoints for `size` workers, indexed by rank.
    pub fn fabric(size: usize) -> Vec<ChannelComm> {
        let mut outboxes: Vec<Vec<Option<Sender<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut inboxes: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for src in 0..size {
            for dst in 0..size {
                if src == dst {
                    continue;
                }
                let (tx, rx) = channel();
                outboxes[src][dst] = Some(tx);
                inboxes[dst][src] = Some(rx);
            }
        }
        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| ChannelComm {
                rank,
                size,
                outboxes,
                inboxes,
                stash: RefCell::new((0..size).map(|_| VecDeque::new()).collect()),
            })
            .collect()
    }

    fn comm_error(&self, message: String) -> StencilError {
        StencilError::Comm {
            rank: self.rank,
            message,
        }
    }

    fn check_peer(&self, peer: usize) -> StencilResult<()> {
        if peer >= self.size || peer == self.rank {
            return Err(self.comm_error(format!(
                "Invalid peer {peer} (size {})",
                self.size
            )));
        }
        Ok(())
    }

    fn post(&self, dest: usize, tag: Tag, payload: Payload) -> StencilResult<()> {
        self.check_peer(dest)?;
        let tx = self.outboxes[dest]
            .as_ref()
            .ok_or_else(|| self.comm_error(format!("No channel to worker {dest}")))?;
        tx.send(Envelope { tag, payload })
            .map_err(|_| self.comm_error(format!("Worker {dest} disconnected")))
    }

    fn take(&self, source: usize, tag: Tag) -> StencilResult<Payload> {
        self.check_peer(source)?;
        {
            let mut stash = self.stash.borrow_mut();
            let queue = &mut stash[source];
            if let Some(pos) = queue.iter().position(|env| env.tag == tag) {
                if let Some(env) = queue.remove(pos) {
                    return Ok(env.payload);
                }
            }
        }
        let rx = self.inboxes[source]
            .as_ref()
            .ok_or_else(|| self.comm_error(format!("No channel from worker {source}")))?;
        loop {
            let env = rx
                .recv()
                .map_err(|_| self.comm_error(format!("Worker {source} disconnected")))?;
            if env.tag == tag {
                return Ok(env.payload);
            }
            self.stash.borrow_mut()[source].push_back(env);
        }
    }

    fn take_cells(&self, source: usize, tag: Tag, into: &mut [f32]) -> StencilResult<()> {
        match self.take(source, tag)? {
            Payload::Cells(cells) if cells.len() == into.len() => {
                into.copy_from_slice(&cells);
                Ok(())
            }
            Payload::Cells(cells) => Err(StencilError::ShapeMismatch(format!(
                "Worker {} expected {} cells from worker {source} (tag {tag}), got {}",
                self.rank,
                into.len(),
                cells.len()
            ))),
            Payload::Scalar(_) => Err(self.comm_error(format!(
                "Expected cells from worker {source} (tag {tag}), got a scalar"
            ))),
        }
    }

    fn check_layout(&self, counts: &[usize], displs: &[usize]) -> StencilResult<()> {
        if counts.len() != self.size || displs.len() != self.size {
            return Err(StencilError::ShapeMismatch(format!(
                "Layout for {} workers has {} counts and {} displacements",
                self.size,
                counts.len(),
                displs.len()
            )));
        }
        Ok(())
    }
}

fn window(buf_len: usize, offset: usize, count: usize) -> StencilResult<std::ops::Range<usize>> {
    let end = offset + count;
    if end > buf_len {
        return Err(StencilError::ShapeMismatch(format!(
            "Transfer window {offset}..{end} exceeds buffer of {buf_len} cells"
        )));
    }
    Ok(offset..end)
}

impl Communicator for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
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
        // Channels are unbounded, so posting first never blocks.
        if let Some(dest) = dest {
            self.post(dest, send_tag, Payload::Cells(send.to_vec()))?;
        }
        if let Some(source) = source {
            self.take_cells(source, recv_tag, recv)?;
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
        self.check_layout(counts, displs)?;
        if recv.len() != counts[self.rank] {
            return Err(StencilError::ShapeMismatch(format!(
                "Scatter receive buffer holds {} cells, worker {} expects {}",
                recv.len(),
                self.rank,
                counts[self.rank]
            )));
        }
        if self.rank != root {
            return self.take_cells(root, TAG_SCATTER, recv);
        }
        let send = send.ok_or_else(|| {
            StencilError::InvalidParameters("Scatter root needs a send buffer".to_string())
        })?;
        for peer in 0..self.size {
            let range = window(send.len(), displs[peer], counts[peer])?;
            if peer == root {
                recv.copy_from_slice(&send[range]);
            } else {
                self.post(peer, TAG_SCATTER, Payload::Cells(send[range].to_vec()))?;
            }
        }
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
        self.check_layout(counts, displs)?;
        if send.len() != counts[self.rank] {
            return Err(StencilError::ShapeMismatch(format!(
                "Gather send buffer holds {} cells, worker {} expects {}",
                send.len(),
                self.rank,
                counts[self.rank]
            )));
        }
        if self.rank != root {
            return self.post(root, TAG_GATHER, Payload::Cells(send.to_vec()));
        }
        let recv = recv.ok_or_else(|| {
            StencilError::InvalidParameters("Gather root needs a receive buffer".to_string())
        })?;
        for peer in 0..self.size {
            let range = window(recv.len(), displs[peer], counts[peer])?;
            if peer == root {
                recv[range].copy_from_slice(send);
            } else {
                self.take_cells(peer, TAG_GATHER, &mut recv[range])?;
            }
        }
        Ok(())
    }

    fn reduce_max(&self, root: usize, value: f64) -> StencilResult<Option<f64>> {
        if self.rank != root {
            self.post(root, TAG_REDUCE, Payload::Scalar(value))?;
            return Ok(None);
        }
        let mut best = value;
        for peer in (0..self.size).filter(|&p| p != root) {
            match self.take(peer, TAG_REDUCE)? {
                Payload::Scalar(v) => best = best.max(v),
                Payload::Cells(_) => {
                    return Err(self.comm_error(format!(
                        "Expected a scalar from worker {peer} for reduction"
                    )))
                }
            }
        }
        Ok(Some(best))
    }
}
