// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Netpbm Output
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Binary grayscale (P5) image of the grid interior.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use stencil_types::error::StencilResult;
use stencil_types::state::GlobalGrid;

pub const MAX_SAMPLE: u32 = 255;

/// Encode the interior, scaled so the largest cell maps to 255.
///
/// Samples truncate toward zero. An all-zero grid encodes as zeros.
pub fn encode_pgm(grid: &GlobalGrid) -> Vec<u8> {
    let header = format!("P5 {} {} {}\n", grid.nx, grid.ny, MAX_SAMPLE);
    let maximum = grid.max_interior();
    let mut out = Vec::with_capacity(header.len() + grid.nx * grid.ny);
    out.extend_from_slice(header.as_bytes());
    out.extend(grid.interior().iter().map(|&v| {
        if maximum > 0.0 {
            (MAX_SAMPLE as f32 * v / maximum) as u8
        } else {
            0
        }
    }));
    out
}

pub fn write_pgm(path: impl AsRef<Path>, grid: &GlobalGrid) -> StencilResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&encode_pgm(grid))?;
    writer.flush()?;
    log::debug!("wrote {}x{} image to {}", grid.nx, grid.ny, path.as_ref().display());
    Ok(())
}
