// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Row Partitioning
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Row-slab domain decomposition over an open chain of workers.
//!
//! Every worker evaluates these functions on its own and must arrive at the
//! same answer, so they depend only on `(ny, workers, rank)`.
//!
//! Each worker gets `ny / workers` rows; the whole remainder `ny % workers`
//! is appended to the last worker. This is not an even split and is kept
//! that way so results stay comparable with earlier runs.

use stencil_types::error::{StencilError, StencilResult};

/// Rank that owns the global grid and reassembles results.
pub const COORDINATOR: usize = 0;

/// One worker's band of logical rows `[row_start, row_start + local_rows)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlice {
    pub rank: usize,
    pub workers: usize,
    pub global_ny: usize,
    pub row_start: usize,
    pub local_rows: usize,
}

impl RowSlice {
    pub fn row_end(&self) -> usize {
        self.row_start + self.local_rows
    }

    pub fn left(&self) -> Option<usize> {
        compute_neighbors(self.rank, self.workers).0
    }

    pub fn right(&self) -> Option<usize> {
        compute_neighbors(self.rank, self.workers).1
    }

    /// Flat offset of this slice inside a buffer of `ny` rows of `width` cells.
    pub fn cell_offset(&self, width: usize) -> usize {
        self.row_start * width
    }

    pub fn cell_count(&self, width: usize) -> usize {
        self.local_rows * width
    }
}

/// `(row_start, local_rows)` for `rank`.
///
/// Fails for every rank alike when the grid is too short for the worker
/// count, so that no worker starts the exchange protocol alone.
pub fn compute_partition(ny: usize, workers: usize, rank: usize) -> StencilResult<(usize, usize)> {
    if workers < 1 {
        return Err(StencilError::InvalidParameters(
            "Worker count must be >= 1".to_string(),
        ));
    }
    if rank >= workers {
        return Err(StencilError::InvalidParameters(format!(
            "Rank {rank} out of range for {workers} workers"
        )));
    }
    let base = ny / workers;
    if base < 1 {
        return Err(StencilError::PartitionInfeasible {
            rank: 0,
            workers,
            ny,
            local_rows: base,
        });
    }
    let extra = if rank + 1 == workers { ny % workers } else { 0 };
    Ok((rank * base, base + extra))
}

/// `(left, right)` neighbours in the open chain. No wraparound.
pub fn compute_neighbors(rank: usize, workers: usize) -> (Option<usize>, Option<usize>) {
    let left = rank.checked_sub(1);
    let right = if rank + 1 < workers { Some(rank + 1) } else { None };
    (left, right)
}

pub fn row_slice(ny: usize, workers: usize, rank: usize) -> StencilResult<RowSlice> {
    let (row_start, local_rows) = compute_partition(ny, workers, rank)?;
    Ok(RowSlice {
        rank,
        workers,
        global_ny: ny,
        row_start,
        local_rows,
    })
}

/// All slices of the chain, in rank order.
pub fn decompose_rows(ny: usize, workers: usize) -> StencilResult<Vec<RowSlice>> {
    if workers < 1 {
        return Err(StencilError::InvalidParameters(
            "Worker count must be >= 1".to_string(),
        ));
    }
    let slices = (0..workers)
        .map(|rank| row_slice(ny, workers, rank))
        .collect::<StencilResult<Vec<_>>>()?;
    if let Some(last) = slices.last() {
        log::debug!(
            "decomposed ny={ny} over {workers} workers: {} rows each, last worker {}",
            ny / workers,
            last.local_rows
        );
    }
    Ok(slices)
}

/// Per-worker `(counts, displacements)` in cells for a variable-size
/// scatter or gather of rows `width` cells wide.
pub fn transfer_layout(slices: &[RowSlice], width: usize) -> (Vec<usize>, Vec<usize>) {
    let counts = slices.iter().map(|s| s.cell_count(width)).collect();
    let mut displs = Vec::with_capacity(slices.len());
    let mut cursor = 0usize;
    for s in slices {
        displs.push(cursor);
        cursor += s.cell_count(width);
    }
    (counts, displs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_rows_covers_domain() {
        let slices = decompose_rows(17, 4).expect("decomposition must succeed");
        assert_eq!(slices.len(), 4);
        assert_eq!(slices[0].row_start, 0);
        assert_eq!(slices.last().expect("slice expected").row_end(), 17);
        let covered: usize = slices.iter().map(|s| s.local_rows).sum();
        assert_eq!(covered, 17);
        for pair in slices.windows(2) {
            assert_eq!(pair[0].row_end(), pair[1].row_start);
        }
    }

    #[test]
    fn test_remainder_goes_to_last_worker() {
        let rows: Vec<usize> = decompose_rows(10, 4)
            .expect("decompose")
            .iter()
            .map(|s| s.local_rows)
            .collect();
        assert_eq!(rows, vec![2, 2, 2, 4]);
    }

    #[test]
    fn test_two_workers_on_four_rows() {
        assert_eq!(compute_partition(4, 2, 0).expect("rank 0"), (0, 2));
        assert_eq!(compute_partition(4, 2, 1).expect("rank 1"), (2, 2));
    }

    #[test]
    fn test_single_worker_owns_everything() {
        assert_eq!(compute_partition(7, 1, 0).expect("single"), (0, 7));
        assert_eq!(compute_neighbors(0, 1), (None, None));
    }

    #[test]
    fn test_neighbors_form_open_chain() {
        assert_eq!(compute_neighbors(0, 4), (None, Some(1)));
        assert_eq!(compute_neighbors(1, 4), (Some(0), Some(2)));
        assert_eq!(compute_neighbors(3, 4), (Some(2), None));
    }

    #[test]
    fn test_too_many_workers_fails_on_every_rank() {
        for rank in 0..5 {
            let err = compute_partition(4, 5, rank).expect_err("infeasible");
            match err {
                StencilError::PartitionInfeasible {
                    rank: r,
                    workers,
                    ny,
                    local_rows,
                } => {
                    assert_eq!((r, workers, ny, local_rows), (0, 5, 4, 0));
                }
                other => panic!("Unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_rejects_bad_rank_and_zero_workers() {
        assert!(matches!(
            compute_partition(8, 0, 0),
            Err(StencilError::InvalidParameters(_))
        ));
        assert!(matches!(
            compute_partition(8, 2, 2),
            Err(StencilError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_transfer_layout_uses_cumulative_offsets() {
        let slices = decompose_rows(10, 3).expect("decompose");
        let (counts, displs) = transfer_layout(&slices, 6);
        assert_eq!(counts, vec![18, 18, 24]);
        assert_eq!(displs, vec![0, 18, 36]);
        for (s, d) in slices.iter().zip(&displs) {
            assert_eq!(s.cell_offset(6), *d);
        }
    }
}
