// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Grid Distribution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Moving rows between the coordinator's global grid and worker subgrids.
//!
//! [`scatter`] and [`gather`] are collective: every worker calls them at
//! the same point, and only the coordinator passes a global grid. Rows
//! travel at full padded width, so the zero side border goes along.
//! [`split_rows`] and [`stitch_rows`] are the in-memory equivalents used
//! when all slices live in one address space.

use crate::comm::Communicator;
use crate::partition::{transfer_layout, RowSlice, COORDINATOR};
use ndarray::{s, ArrayView2};
use stencil_types::error::{StencilError, StencilResult};
use stencil_types::state::{GlobalGrid, LocalSubgrid};

fn check_global(global: &GlobalGrid, slices: &[RowSlice], width: usize) -> StencilResult<()> {
    if global.width() != width {
        return Err(StencilError::ShapeMismatch(format!(
            "Global width {} does not match local width {width}",
            global.width()
        )));
    }
    if let Some(last) = slices.last() {
        if last.row_end() != global.ny {
            return Err(StencilError::ShapeMismatch(format!(
                "Slices cover {} rows, global grid has ny={}",
                last.row_end(),
                global.ny
            )));
        }
    }
    Ok(())
}

/// Load this worker's owned rows from the coordinator's grid.
pub fn scatter<C: Communicator>(
    comm: &C,
    global: Option<&GlobalGrid>,
    slices: &[RowSlice],
    local: &mut LocalSubgrid,
) -> StencilResult<()> {
    let width = local.width();
    let (counts, displs) = transfer_layout(slices, width);
    let send: Option<Vec<f32>> = match global {
        Some(g) => {
            check_global(g, slices, width)?;
            Some(g.interior_rows().iter().copied().collect())
        }
        None => None,
    };
    let mut recv = vec![0.0f32; local.owned_len()];
    comm.scatter_varcount(COORDINATOR, send.as_deref(), &counts, &displs, &mut recv)?;
    local.load_owned(&recv)
}

/// Reassemble every worker's owned rows into the coordinator's grid.
pub fn gather<C: Communicator>(
    comm: &C,
    local: &LocalSubgrid,
    slices: &[RowSlice],
    global: Option<&mut GlobalGrid>,
) -> StencilResult<()> {
    let width = local.width();
    let (counts, displs) = transfer_layout(slices, width);
    let send = local.owned_to_vec();
    match global {
        Some(g) => {
            check_global(g, slices, width)?;
            let mut recv = vec![0.0f32; g.ny * width];
            comm.gather_varcount(COORDINATOR, &send, &counts, &displs, Some(&mut recv))?;
            let rows = ArrayView2::from_shape((g.ny, width), &recv)
                .map_err(|e| StencilError::ShapeMismatch(e.to_string()))?;
            g.interior_rows_mut().assign(&rows);
            Ok(())
        }
        None => comm.gather_varcount(COORDINATOR, &send, &counts, &displs, None),
    }
}

/// Cut the global grid into padded subgrids, halos filled from the
/// neighbouring global rows (the zero border at either end).
pub fn split_rows(global: &GlobalGrid, slices: &[RowSlice]) -> StencilResult<Vec<LocalSubgrid>> {
    if slices.is_empty() {
        return Err(StencilError::InvalidParameters(
            "No slices provided for split_rows".to_string(),
        ));
    }
    check_global(global, slices, global.width())?;
    let out = slices
        .iter()
        .map(|sdef| {
            let mut local = LocalSubgrid::zeros(global.nx, sdef.local_rows);
            // Padded rows row_start..=row_end + 1 hold the slice plus both halos.
            local
                .cells
                .assign(&global.cells.slice(s![sdef.row_start..=sdef.row_end() + 1, ..]));
            local
        })
        .collect();
    Ok(out)
}

/// Write the owned rows of every subgrid back into a fresh global grid.
pub fn stitch_rows(
    locals: &[LocalSubgrid],
    slices: &[RowSlice],
    nx: usize,
) -> StencilResult<GlobalGrid> {
    if locals.len() != slices.len() {
        return Err(StencilError::ShapeMismatch(format!(
            "locals/slices mismatch: {} vs {}",
            locals.len(),
            slices.len()
        )));
    }
    let ny = slices
        .last()
        .map(|s| s.global_ny)
        .ok_or_else(|| StencilError::InvalidParameters("No slices provided".to_string()))?;
    let mut global = GlobalGrid::zeros(nx, ny);
    for (local, sdef) in locals.iter().zip(slices) {
        if local.nx != nx || local.local_rows != sdef.local_rows {
            return Err(StencilError::ShapeMismatch(format!(
                "Local block for rank {} is {}x{}, expected {}x{nx}",
                sdef.rank, local.local_rows, local.nx, sdef.local_rows
            )));
        }
        global
            .cells
            .slice_mut(s![sdef.row_start + 1..=sdef.row_end(), ..])
            .assign(&local.owned_rows());
    }
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::ChannelComm;
    use crate::partition::decompose_rows;
    use ndarray::Array2;
    use std::thread;

    fn sample_grid(nx: usize, ny: usize) -> GlobalGrid {
        GlobalGrid::from_interior(&Array2::from_shape_fn((ny, nx), |(j, i)| {
            (j as f32) * 10.0 + i as f32 + 0.125
        }))
    }

    fn scatter_then_gather(global: &GlobalGrid, workers: usize) -> (Vec<LocalSubgrid>, GlobalGrid) {
        let slices = decompose_rows(global.ny, workers).expect("decompose");
        let nx = global.nx;
        let slices = &slices;
        let results: Vec<(LocalSubgrid, Option<GlobalGrid>)> = thread::scope(|s| {
            let handles: Vec<_> = ChannelComm::fabric(workers)
                .into_iter()
                .map(move |comm| {
                    s.spawn(move || {
                        let me = slices[comm.rank()];
                        let mut local = LocalSubgrid::zeros(nx, me.local_rows);
                        let root = comm.rank() == COORDINATOR;
                        scatter(&comm, root.then_some(global), slices, &mut local)
                            .expect("scatter");
                        let mut out = root.then(|| GlobalGrid::zeros(nx, global.ny));
                        gather(&comm, &local, slices, out.as_mut()).expect("gather");
                        (local, out)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("join")).collect()
        });
        let mut locals = Vec::new();
        let mut gathered = None;
        for (local, out) in results {
            locals.push(local);
            if out.is_some() {
                gathered = out;
            }
        }
        (locals, gathered.expect("coordinator output"))
    }

    #[test]
    fn test_scatter_gather_roundtrip_is_exact() {
        let global = sample_grid(7, 10);
        for workers in [1, 2, 3, 4, 10] {
            let (_, back) = scatter_then_gather(&global, workers);
            assert_eq!(back, global, "roundtrip with {workers} workers");
        }
    }

    #[test]
    fn test_scatter_delivers_owned_rows_only() {
        let global = sample_grid(5, 9);
        let (locals, _) = scatter_then_gather(&global, 2);
        let slices = decompose_rows(9, 2).expect("decompose");
        for (local, sdef) in locals.iter().zip(&slices) {
            assert_eq!(
                local.owned_rows(),
                global.cells.slice(s![sdef.row_start + 1..=sdef.row_end(), ..])
            );
            assert!(local.cells.row(0).iter().all(|&v| v == 0.0));
            assert!(local.cells.row(local.local_rows + 1).iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_split_fills_halos_from_global_neighbours() {
        let global = sample_grid(4, 6);
        let slices = decompose_rows(6, 2).expect("decompose");
        let locals = split_rows(&global, &slices).expect("split");
        // Rank 0 bottom halo is global logical row 3 (padded row 4).
        assert_eq!(locals[0].cells.row(4), global.cells.row(4));
        // Rank 1 top halo is global logical row 2 (padded row 3).
        assert_eq!(locals[1].cells.row(0), global.cells.row(3));
        assert!(locals[0].cells.row(0).iter().all(|&v| v == 0.0));
        assert!(locals[1].cells.row(4).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_split_stitch_roundtrip() {
        let global = sample_grid(9, 13);
        let slices = decompose_rows(13, 4).expect("decompose");
        let locals = split_rows(&global, &slices).expect("split");
        let stitched = stitch_rows(&locals, &slices, 9).expect("stitch");
        assert_eq!(stitched, global);
    }

    #[test]
    fn test_global_shape_mismatch() {
        let global = sample_grid(4, 6);
        let slices = decompose_rows(8, 2).expect("decompose");
        let err = split_rows(&global, &slices).expect_err("row mismatch");
        match err {
            StencilError::ShapeMismatch(msg) => assert!(msg.contains("cover 8 rows")),
            other => panic!("Unexpected error: {other:?}"),
        }
        let ok_slices = decompose_rows(6, 2).expect("decompose");
        let locals = vec![LocalSubgrid::zeros(4, 3)];
        assert!(stitch_rows(&locals, &ok_slices, 4).is_err());
    }
}
