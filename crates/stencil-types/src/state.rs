// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{StencilError, StencilResult};
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};

/// Full padded grid held by the coordinator.
///
/// Logical size is `nx × ny`; storage is `(ny + 2) × (nx + 2)` so that the
/// one-cell border can be read by the stencil without bounds checks.
/// Rows index `y`, columns index `x`. Border cells stay at `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalGrid {
    pub nx: usize,
    pub ny: usize,
    pub cells: Array2<f32>, // [ny + 2, nx + 2]
}

impl GlobalGrid {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        GlobalGrid {
            nx,
            ny,
            cells: Array2::zeros((ny + 2, nx + 2)),
        }
    }

    /// Build a padded grid around an unpadded `[ny, nx]` interior.
    pub fn from_interior(interior: &Array2<f32>) -> Self {
        let (ny, nx) = interior.dim();
        let mut grid = GlobalGrid::zeros(nx, ny);
        grid.interior_mut().assign(interior);
        grid
    }

    pub fn width(&self) -> usize {
        self.nx + 2
    }

    pub fn height(&self) -> usize {
        self.ny + 2
    }

    /// Logical cells only, border stripped.
    pub fn interior(&self) -> ArrayView2<'_, f32> {
        self.cells.slice(s![1..=self.ny, 1..=self.nx])
    }

    pub fn interior_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.cells.slice_mut(s![1..=self.ny, 1..=self.nx])
    }

    /// Logical rows at full padded width (side border included).
    pub fn interior_rows(&self) -> ArrayView2<'_, f32> {
        self.cells.slice(s![1..=self.ny, ..])
    }

    pub fn interior_rows_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.cells.slice_mut(s![1..=self.ny, ..])
    }

    /// Largest interior value, starting from `0.0`.
    pub fn max_interior(&self) -> f32 {
        self.interior().iter().fold(0.0f32, |acc, &v| acc.max(v))
    }

    pub fn border_is_zero(&self) -> bool {
        let (h, w) = self.cells.dim();
        let rows_zero = self.cells.row(0).iter().all(|&v| v == 0.0)
            && self.cells.row(h - 1).iter().all(|&v| v == 0.0);
        let cols_zero = self.cells.column(0).iter().all(|&v| v == 0.0)
            && self.cells.column(w - 1).iter().all(|&v| v == 0.0);
        rows_zero && cols_zero
    }
}

/// One worker's padded band of the grid.
///
/// Rows `1..=local_rows` are owned; row `0` and row `local_rows + 1` are
/// halo copies of the neighbours' boundary rows (zero at chain ends).
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSubgrid {
    pub nx: usize,
    pub local_rows: usize,
    pub cells: Array2<f32>, // [local_rows + 2, nx + 2]
}

impl LocalSubgrid {
    pub fn zeros(nx: usize, local_rows: usize) -> Self {
        LocalSubgrid {
            nx,
            local_rows,
            cells: Array2::zeros((local_rows + 2, nx + 2)),
        }
    }

    pub fn width(&self) -> usize {
        self.nx + 2
    }

    pub fn height(&self) -> usize {
        self.local_rows + 2
    }

    /// Number of cells in the owned rows at padded width.
    pub fn owned_len(&self) -> usize {
        self.local_rows * self.width()
    }

    pub fn owned_rows(&self) -> ArrayView2<'_, f32> {
        self.cells.slice(s![1..=self.local_rows, ..])
    }

    pub fn owned_rows_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.cells.slice_mut(s![1..=self.local_rows, ..])
    }

    /// Overwrite the owned rows from a flat row-major buffer.
    pub fn load_owned(&mut self, flat: &[f32]) -> StencilResult<()> {
        if flat.len() != self.owned_len() {
            return Err(StencilError::ShapeMismatch(format!(
                "Owned rows expect {} cells ({}x{}), got {}",
                self.owned_len(),
                self.local_rows,
                self.width(),
                flat.len()
            )));
        }
        let view = ArrayView2::from_shape((self.local_rows, self.width()), flat)
            .map_err(|e| StencilError::ShapeMismatch(e.to_string()))?;
        self.owned_rows_mut().assign(&view);
        Ok(())
    }

    /// Owned rows as a flat row-major buffer.
    pub fn owned_to_vec(&self) -> Vec<f32> {
        self.owned_rows().iter().copied().collect()
    }

    pub fn top_owned(&self) -> ArrayView1<'_, f32> {
        self.cells.row(1)
    }

    pub fn bottom_owned(&self) -> ArrayView1<'_, f32> {
        self.cells.row(self.local_rows)
    }

    pub fn top_halo_mut(&mut self) -> ArrayViewMut1<'_, f32> {
        self.cells.row_mut(0)
    }

    pub fn bottom_halo_mut(&mut self) -> ArrayViewMut1<'_, f32> {
        let last = self.local_rows + 1;
        self.cells.row_mut(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_grid_shapes() {
        let grid = GlobalGrid::zeros(5, 3);
        assert_eq!(grid.cells.dim(), (5, 7));
        assert_eq!(grid.width(), 7);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.interior().dim(), (3, 5));
        assert_eq!(grid.interior_rows().dim(), (3, 7));
        assert!(grid.border_is_zero());
    }

    #[test]
    fn test_from_interior_keeps_border_zero() {
        let interior = Array2::from_elem((4, 6), 2.5f32);
        let grid = GlobalGrid::from_interior(&interior);
        assert_eq!(grid.nx, 6);
        assert_eq!(grid.ny, 4);
        assert!(grid.border_is_zero());
        assert_eq!(grid.interior(), interior.view());
        assert_eq!(grid.max_interior(), 2.5);
    }

    #[test]
    fn test_border_detection() {
        let mut grid = GlobalGrid::zeros(3, 3);
        grid.cells[[0, 2]] = 1.0;
        assert!(!grid.border_is_zero());
    }

    #[test]
    fn test_local_load_and_rows() {
        let mut local = LocalSubgrid::zeros(3, 2);
        let flat: Vec<f32> = (0..10).map(|v| v as f32).collect();
        local.load_owned(&flat).expect("load");
        assert_eq!(local.top_owned().to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(local.bottom_owned().to_vec(), vec![5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(local.owned_to_vec(), flat);
        assert!(local.cells.row(0).iter().all(|&v| v == 0.0));
        assert!(local.cells.row(3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_load_owned_rejects_wrong_length() {
        let mut local = LocalSubgrid::zeros(3, 2);
        let err = local.load_owned(&[0.0; 7]).expect_err("short buffer");
        match err {
            StencilError::ShapeMismatch(msg) => assert!(msg.contains("expect 10")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }
}
