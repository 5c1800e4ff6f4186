// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Initial Condition
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Checkerboard starting grid.

use ndarray::s;
use stencil_types::state::GlobalGrid;

/// Edge length of one checkerboard tile, in cells.
pub const TILE_SIZE: usize = 64;

/// Value of the "hot" tiles; everything else starts at zero.
pub const HOT_VALUE: f32 = 100.0;

/// Zero grid with every other `TILE_SIZE × TILE_SIZE` tile set to
/// [`HOT_VALUE`]. The tile at the origin is cold; tiles are clipped at the
/// grid edge and the border stays zero.
pub fn checkerboard(nx: usize, ny: usize) -> GlobalGrid {
    let mut grid = GlobalGrid::zeros(nx, ny);
    for jb in (0..ny).step_by(TILE_SIZE) {
        for ib in (0..nx).step_by(TILE_SIZE) {
            if (ib + jb) % (2 * TILE_SIZE) == 0 {
                continue;
            }
            let jlim = (jb + TILE_SIZE).min(ny);
            let ilim = (ib + TILE_SIZE).min(nx);
            grid.cells
                .slice_mut(s![jb + 1..=jlim, ib + 1..=ilim])
                .fill(HOT_VALUE);
        }
    }
    grid
}
