// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StencilError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error(
        "Too many workers: rank {rank} of {workers} gets {local_rows} rows of ny={ny} (need >= 1)"
    )]
    PartitionInfeasible {
        rank: usize,
        workers: usize,
        ny: usize,
        local_rows: usize,
    },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Communication failure on worker {rank}: {message}")]
    Comm { rank: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StencilError {
    /// True for failures that are only a consequence of a peer going away.
    pub fn is_comm(&self) -> bool {
        matches!(self, StencilError::Comm { .. })
    }
}

pub type StencilResult<T> = Result<T, StencilError>;
