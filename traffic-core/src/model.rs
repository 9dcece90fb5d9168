//! Model identifiers and host enums shared by every module.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{VEHICLE_MODEL_MAX, VEHICLE_MODEL_MIN};

/// Vehicle archetype index in the host model table, always within `[400, 611]`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VehicleModelId(u16);

impl VehicleModelId {
    pub const MIN: Self = Self(VEHICLE_MODEL_MIN);
    pub const MAX: Self = Self(VEHICLE_MODEL_MAX);

    /// Build an id, rejecting values outside the vehicle range.
    #[must_use]
    pub const fn new(raw: u16) -> Option<Self> {
        if raw >= VEHICLE_MODEL_MIN && raw <= VEHICLE_MODEL_MAX {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Constructor for well-known ids in constant context.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a `const`) if `raw` is out of range.
    #[must_use]
    pub const fn known(raw: u16) -> Self {
        assert!(raw >= VEHICLE_MODEL_MIN && raw <= VEHICLE_MODEL_MAX);
        Self(raw)
    }

    /// Draw an id uniformly from the whole vehicle range.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(VEHICLE_MODEL_MIN..=VEHICLE_MODEL_MAX))
    }

    /// Raw model-table index.
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Every id in the vehicle range, ascending.
    pub fn all() -> impl Iterator<Item = Self> {
        (VEHICLE_MODEL_MIN..=VEHICLE_MODEL_MAX).map(Self)
    }
}

impl TryFrom<u16> for VehicleModelId {
    type Error = InvalidModelId;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidModelId(i64::from(value)))
    }
}

impl TryFrom<i32> for VehicleModelId {
    type Error = InvalidModelId;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(InvalidModelId(i64::from(value)))
    }
}

impl From<VehicleModelId> for u16 {
    fn from(value: VehicleModelId) -> Self {
        value.0
    }
}

impl From<VehicleModelId> for i32 {
    fn from(value: VehicleModelId) -> Self {
        Self::from(value.0)
    }
}

impl std::fmt::Display for VehicleModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised when a raw value does not name a vehicle model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a vehicle model id")]
pub struct InvalidModelId(pub i64);

/// Ped archetype index in the host model table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PedModelId(pub u16);

impl PedModelId {
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }
}

/// Residency of a model's asset as reported by the streaming loader.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loaded,
    Requested,
    Reading,
    Finishing,
}

impl LoadState {
    /// Map the host's raw byte, treating unknown values as not resident.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Loaded,
            2 => Self::Requested,
            3 => Self::Reading,
            4 => Self::Finishing,
            _ => Self::NotLoaded,
        }
    }

    #[must_use]
    pub const fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }
}

/// Host vehicle class, in the order of the host's enumeration.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum VehicleSubclass {
    Automobile,
    MonsterTruck,
    Quad,
    Heli,
    Plane,
    Boat,
    Train,
    FakeHeli,
    FakePlane,
    Bike,
    Bmx,
    Trailer,
}

impl VehicleSubclass {
    /// Slot of this class in the host's "spawn vehicle of class" jump table.
    ///
    /// The table has no entry for `Automobile`, so slots start at `MonsterTruck`.
    #[must_use]
    pub const fn dispatch_slot(self) -> Option<usize> {
        match self {
            Self::Automobile => None,
            other => Some(other as usize - 1),
        }
    }
}

/// Flags passed along with a streaming request.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct StreamingFlags(pub u32);

impl StreamingFlags {
    pub const NONE: Self = Self(0);
    pub const GAME_REQUIRED: Self = Self(0x02);
    pub const MISSION_REQUIRED: Self = Self(0x04);
    pub const KEEP_IN_MEMORY: Self = Self(0x08);
    pub const PRIORITY_REQUEST: Self = Self(0x10);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for StreamingFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand::rngs::mock::StepRng;

    #[test]
    fn range_bounds_are_inclusive() {
        assert!(VehicleModelId::new(399).is_none());
        assert_eq!(VehicleModelId::new(400), Some(VehicleModelId::MIN));
        assert_eq!(VehicleModelId::new(611), Some(VehicleModelId::MAX));
        assert!(VehicleModelId::new(612).is_none());
        assert_eq!(VehicleModelId::all().count(), 212);
    }

    #[test]
    fn signed_conversion_rejects_negatives() {
        assert!(VehicleModelId::try_from(-1_i32).is_err());
        assert_eq!(
            VehicleModelId::try_from(520_i32).map(VehicleModelId::index),
            Ok(520)
        );
    }

    #[test]
    fn random_draw_stays_in_range() {
        let mut low = StepRng::new(0, 0);
        assert_eq!(VehicleModelId::random(&mut low), VehicleModelId::MIN);

        let mut rng = SmallRng::seed_from_u64(0x5EED);
        for _ in 0..2_000 {
            let id = VehicleModelId::random(&mut rng);
            assert!(VehicleModelId::new(id.index()).is_some());
        }
    }

    #[test]
    fn train_and_boat_dispatch_slots() {
        assert_eq!(VehicleSubclass::Boat.dispatch_slot(), Some(4));
        assert_eq!(VehicleSubclass::Train.dispatch_slot(), Some(5));
        assert_eq!(VehicleSubclass::Automobile.dispatch_slot(), None);
    }

    #[test]
    fn unknown_load_state_is_not_resident() {
        assert!(LoadState::from_raw(1).is_loaded());
        assert!(!LoadState::from_raw(9).is_loaded());
        assert!(StreamingFlags(0x18).contains(StreamingFlags::KEEP_IN_MEMORY));
    }

    #[test]
    fn serde_rejects_out_of_range_ids() {
        assert!(serde_json::from_str::<VehicleModelId>("42").is_err());
        let id: VehicleModelId = serde_json::from_str("411").unwrap();
        assert_eq!(id.index(), 411);
    }
}
