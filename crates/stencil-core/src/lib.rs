// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Distributed five-point stencil on a row-slab decomposition.
//!
//! Layer 1: partition, kernel, buffers
//! Layer 2: communicator, halo exchange, scatter/gather
//! Layer 3: driver, initial condition, image output

pub mod buffers;
pub mod comm;
#[cfg(feature = "mpi")]
pub mod comm_mpi;
pub mod distribute;
pub mod driver;
pub mod halo;
pub mod init;
pub mod kernel;
pub mod partition;
pub mod pgm;
