// ─────────────────────────────────────────────────────────────────────
// SCPN Stencil — Double Buffering
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Two same-shaped local subgrids with a current/alternate role flag.

use stencil_types::state::LocalSubgrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Ping-pong pair. The stencil reads `current` and writes `alternate`;
/// [`SubgridPair::swap`] then flips the roles without copying.
#[derive(Debug, Clone)]
pub struct SubgridPair {
    a: LocalSubgrid,
    b: LocalSubgrid,
    current: Slot,
}

impl SubgridPair {
    pub fn new(nx: usize, local_rows: usize) -> Self {
        SubgridPair {
            a: LocalSubgrid::zeros(nx, local_rows),
            b: LocalSubgrid::zeros(nx, local_rows),
            current: Slot::A,
        }
    }

    pub fn current_slot(&self) -> Slot {
        self.current
    }

    pub fn current(&self) -> &LocalSubgrid {
        match self.current {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    pub fn current_mut(&mut self) -> &mut LocalSubgrid {
        match self.current {
            Slot::A => &mut self.a,
            Slot::B => &mut self.b,
        }
    }

    pub fn alternate(&self) -> &LocalSubgrid {
        match self.current {
            Slot::A => &self.b,
            Slot::B => &self.a,
        }
    }

    /// `(current, alternate)`: the read source and the write target.
    pub fn split(&mut self) -> (&LocalSubgrid, &mut LocalSubgrid) {
        match self.current {
            Slot::A => (&self.a, &mut self.b),
            Slot::B => (&self.b, &mut self.a),
        }
    }

    pub fn swap(&mut self) {
        self.current = self.current.other();
    }

    pub fn into_current(self) -> LocalSubgrid {
        match self.current {
            Slot::A => self.a,
            Slot::B => self.b,
        }
    }
}
