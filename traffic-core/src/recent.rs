//! Bounded history of recently loaded or spawned vehicles.
use std::fmt::{self, Write};

use smallvec::SmallVec;

use crate::constants::RECENT_VEHICLE_CAPACITY;
use crate::model::VehicleModelId;

/// FIFO of the last few vehicle ids, stored inline so that reading it from a
/// fault handler never touches the allocator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentVehicleLog {
    entries: SmallVec<[VehicleModelId; RECENT_VEHICLE_CAPACITY]>,
}

impl RecentVehicleLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `model`, evicting the oldest entry once capacity is reached.
    pub fn push(&mut self, model: VehicleModelId) {
        if self.entries.len() == RECENT_VEHICLE_CAPACITY {
            self.entries.remove(0);
        }
        self.entries.push(model);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = VehicleModelId> + '_ {
        self.entries.iter().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<VehicleModelId> {
        self.entries.last().copied()
    }

    /// Write the space-joined listing into `out`.
    pub fn render_into(&self, out: &mut impl Write) -> fmt::Result {
        for (idx, model) in self.entries.iter().enumerate() {
            if idx > 0 {
                out.write_char(' ')?;
            }
            write!(out, "{model}")?;
        }
        Ok(())
    }
}

impl fmt::Display for RecentVehicleLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render_into(f)
    }
}
