// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Halo Exchange
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Boundary-row exchange between chain neighbours.
//!
//! Each call performs two paired send/receive operations:
//!
//! 1. top owned row → left, bottom halo ← right (tag [`TAG_TO_LEFT`])
//! 2. bottom owned row → right, top halo ← left (tag [`TAG_TO_RIGHT`])
//!
//! Every worker posts its send before blocking on the receive, so no
//! cycle of blocked sends can form. A missing neighbour leaves the halo
//! row at zero, which is the Dirichlet boundary of the problem.

use crate::comm::{Communicator, Tag};
use crate::partition::RowSlice;
use ndarray::{Array1, ArrayView1};
use stencil_types::error::{StencilError, StencilResult};
use stencil_types::state::LocalSubgrid;

pub const TAG_TO_LEFT: Tag = 6;
pub const TAG_TO_RIGHT: Tag = 9;

/// Refresh both halo rows of `local` from its neighbours.
pub fn exchange<C: Communicator>(
    comm: &C,
    local: &mut LocalSubgrid,
    left: Option<usize>,
    right: Option<usize>,
) -> StencilResult<()> {
    let width = local.width();
    let mut recv = vec![0.0f32; width];

    let top = local.top_owned().to_vec();
    comm.send_recv(&top, left, TAG_TO_LEFT, &mut recv, right, TAG_TO_LEFT)?;
    if right.is_some() {
        local.bottom_halo_mut().assign(&ArrayView1::from(&recv[..]));
    }

    let bottom = local.bottom_owned().to_vec();
    comm.send_recv(&bottom, right, TAG_TO_RIGHT, &mut recv, left, TAG_TO_RIGHT)?;
    if left.is_some() {
        local.top_halo_mut().assign(&ArrayView1::from(&recv[..]));
    }
    Ok(())
}

/// Single-process reference: copy boundary rows between all slices at once.
///
/// Produces the same halos as every worker calling [`exchange`] in
/// lockstep.
pub fn serial_exchange(locals: &mut [LocalSubgrid], slices: &[RowSlice]) -> StencilResult<()> {
    if locals.len() != slices.len() {
        return Err(StencilError::ShapeMismatch(format!(
            "locals/slices mismatch: {} vs {}",
            locals.len(),
            slices.len()
        )));
    }
    for (i, (local, sdef)) in locals.iter().zip(slices).enumerate() {
        if local.local_rows != sdef.local_rows {
            return Err(StencilError::ShapeMismatch(format!(
                "Local block {i} has {} rows, slice expects {}",
                local.local_rows, sdef.local_rows
            )));
        }
    }

    let tops: Vec<Array1<f32>> = locals.iter().map(|l| l.top_owned().to_owned()).collect();
    let bottoms: Vec<Array1<f32>> = locals.iter().map(|l| l.bottom_owned().to_owned()).collect();

    for (local, sdef) in locals.iter_mut().zip(slices) {
        if let Some(left) = sdef.left() {
            local.top_halo_mut().assign(&bottoms[left]);
        }
        if let Some(right) = sdef.right() {
            local.bottom_halo_mut().assign(&tops[right]);
        }
    }
    Ok(())
}
