// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Five-point weighted-average update.
//!
//!   dst[j][i] = 0.6·src[j][i] + 0.1·(src[j-1][i] + src[j+1][i] + src[j][i-1] + src[j][i+1])
//!
//! The weights sum to one, so each output is a convex combination of its
//! inputs. The evaluation order is fixed; the parallel sweep evaluates the
//! identical expression per cell and is bit-for-bit equal to the serial one.

use ndarray::parallel::prelude::*;
use ndarray::{s, Array2, ArrayView2, ArrayViewMut1, Axis};
use rayon::ThreadPool;
use stencil_types::error::{StencilError, StencilResult};

pub const CENTRE_WEIGHT: f32 = 0.6;
pub const NEIGHBOUR_WEIGHT: f32 = 0.1;

fn check_shapes(
    src: &Array2<f32>,
    dst: &Array2<f32>,
    nx: usize,
    local_rows: usize,
) -> StencilResult<()> {
    let expected = (local_rows + 2, nx + 2);
    if src.dim() != expected || dst.dim() != expected {
        return Err(StencilError::ShapeMismatch(format!(
            "Kernel expects ({}, {}) buffers, got src {:?} dst {:?}",
            expected.0,
            expected.1,
            src.dim(),
            dst.dim()
        )));
    }
    Ok(())
}

#[inline]
fn update_row(src: &ArrayView2<'_, f32>, j: usize, out: &mut ArrayViewMut1<'_, f32>, nx: usize) {
    let up = src.row(j - 1);
    let mid = src.row(j);
    let down = src.row(j + 1);
    for i in 1..=nx {
        out[i] = CENTRE_WEIGHT * mid[i]
            + NEIGHBOUR_WEIGHT * (up[i] + down[i] + mid[i - 1] + mid[i + 1]);
    }
}

/// Update rows `1..=local_rows`, columns `1..=nx` of `dst` from `src`.
///
/// Halo rows and border columns of `dst` are left untouched.
pub fn apply(
    src: &Array2<f32>,
    dst: &mut Array2<f32>,
    nx: usize,
    local_rows: usize,
) -> StencilResult<()> {
    check_shapes(src, dst, nx, local_rows)?;
    let view = src.view();
    for j in 1..=local_rows {
        let mut out = dst.row_mut(j);
        update_row(&view, j, &mut out, nx);
    }
    Ok(())
}

/// Same update as [`apply`], with rows distributed over `pool`.
pub fn apply_parallel(
    pool: &ThreadPool,
    src: &Array2<f32>,
    dst: &mut Array2<f32>,
    nx: usize,
    local_rows: usize,
) -> StencilResult<()> {
    check_shapes(src, dst, nx, local_rows)?;
    let view = src.view();
    let mut interior = dst.slice_mut(s![1..=local_rows, ..]);
    pool.install(|| {
        interior
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(k, mut out)| update_row(&view, k + 1, &mut out, nx));
    });
    Ok(())
}
