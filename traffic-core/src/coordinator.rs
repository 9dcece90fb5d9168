//! Vehicle selection authority shared by every traffic hook.
use std::cell::{Cell, Ref, RefCell};

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::{CategoryConfig, TrafficConfig};
use crate::constants::{
    CAR_TYPE_POLICE, LOAD_RETRY_BUDGET, LOG_TARGET, NO_SELECTION, WARM_UP_VEHICLE_COUNT,
};
use crate::host::{CarControl, ModelInfo, Streaming};
use crate::model::{PedModelId, StreamingFlags, VehicleModelId};
use crate::policy;
use crate::recent::RecentVehicleLog;

/// Why a selection produced no vehicle. None of these are failures; the
/// caller falls back to whatever the host would have done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The streaming suggestion belongs to a disabled category.
    PolicyRejected(VehicleModelId),
    /// Streaming had no resident vehicle to offer.
    NoLoadedCandidate,
    /// The candidate is not resident yet.
    NotLoaded(VehicleModelId),
    /// The forced vehicle is not resident yet.
    ForcedNotLoaded(VehicleModelId),
    /// Every draw was rejected or already resident.
    RetryBudgetExhausted,
}

/// Outcome of a vehicle selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Chosen(VehicleModelId),
    Deferred(DeferReason),
}

impl Selection {
    #[must_use]
    pub const fn model(self) -> Option<VehicleModelId> {
        match self {
            Self::Chosen(model) => Some(model),
            Self::Deferred(_) => None,
        }
    }

    #[must_use]
    pub const fn is_chosen(self) -> bool {
        matches!(self, Self::Chosen(_))
    }

    /// Integer form expected at patched host call sites.
    #[must_use]
    pub fn to_host(self) -> i32 {
        self.model().map_or(NO_SELECTION, i32::from)
    }
}

/// Owns the policy, the forced override, and the recent-vehicle history.
///
/// One instance exists per process; [`crate::install`] hands it out behind an
/// `Rc` to every hook and to the crash handler.
#[derive(Debug)]
pub struct TrafficCoordinator {
    categories: CategoryConfig,
    forced: Option<VehicleModelId>,
    default_ped: PedModelId,
    recent_loaded: RefCell<RecentVehicleLog>,
    recent_spawned: RefCell<RecentVehicleLog>,
    initial_vehicles_loaded: Cell<bool>,
    rng: RefCell<SmallRng>,
}

impl TrafficCoordinator {
    #[must_use]
    pub fn new(config: &TrafficConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        Self {
            categories: config.categories,
            forced: config.forced_vehicle(),
            default_ped: config.default_model,
            recent_loaded: RefCell::new(RecentVehicleLog::new()),
            recent_spawned: RefCell::new(RecentVehicleLog::new()),
            initial_vehicles_loaded: Cell::new(false),
            rng: RefCell::new(rng),
        }
    }

    #[must_use]
    pub const fn forced_vehicle(&self) -> Option<VehicleModelId> {
        self.forced
    }

    #[must_use]
    pub const fn categories(&self) -> &CategoryConfig {
        &self.categories
    }

    #[must_use]
    pub const fn default_ped(&self) -> PedModelId {
        self.default_ped
    }

    #[must_use]
    pub fn initial_vehicles_loaded(&self) -> bool {
        self.initial_vehicles_loaded.get()
    }

    pub fn is_vehicle_allowed<M>(&self, info: &M, model: VehicleModelId) -> bool
    where
        M: ModelInfo + ?Sized,
    {
        policy::is_vehicle_allowed(&self.categories, info, model)
    }

    /// Pick a resident vehicle for traffic population.
    ///
    /// When `type_slot` is supplied the host fills in the car type, and a
    /// police pick is tagged as a police car.
    pub fn select_random_loaded_vehicle<H>(
        &self,
        host: &H,
        type_slot: Option<&mut i32>,
    ) -> Selection
    where
        H: ModelInfo + Streaming + CarControl + ?Sized,
    {
        // Streaming is always consulted, even when the override discards its answer.
        let suggested = host.random_loaded_vehicle();
        let candidate = match (self.forced, suggested) {
            (Some(forced), _) => forced,
            (None, None) => return Selection::Deferred(DeferReason::NoLoadedCandidate),
            (None, Some(model)) if !self.is_vehicle_allowed(host, model) => {
                return Selection::Deferred(DeferReason::PolicyRejected(model));
            }
            (None, Some(model)) => model,
        };

        if !host.load_state(candidate.index()).is_loaded() {
            let reason = if self.forced.is_some() {
                DeferReason::ForcedNotLoaded(candidate)
            } else {
                DeferReason::NotLoaded(candidate)
            };
            log::debug!(target: LOG_TARGET, "traffic pick deferred: {reason:?}");
            return Selection::Deferred(reason);
        }

        self.recent_spawned.borrow_mut().push(candidate);

        if let Some(slot) = type_slot {
            host.choose_car_type(slot);
            if host.is_police(candidate) {
                *slot = CAR_TYPE_POLICE;
            }
        }
        Selection::Chosen(candidate)
    }

    /// Pick a vehicle for the streaming loader to start loading.
    ///
    /// Makes at most [`LOAD_RETRY_BUDGET`] draws. A forced vehicle replaces
    /// any draw that passed the policy and is accepted even when resident.
    pub fn select_random_vehicle_to_load<H>(&self, host: &H) -> Selection
    where
        H: ModelInfo + ?Sized,
    {
        for _ in 0..LOAD_RETRY_BUDGET {
            let drawn = VehicleModelId::random(&mut *self.rng.borrow_mut());
            if !self.is_vehicle_allowed(host, drawn) {
                continue;
            }

            let candidate = self.forced.unwrap_or(drawn);
            if self.forced.is_some() || !host.load_state(candidate.index()).is_loaded() {
                self.recent_loaded.borrow_mut().push(candidate);
                return Selection::Chosen(candidate);
            }
        }
        Selection::Deferred(DeferReason::RetryBudgetExhausted)
    }

    /// Stream in a small random batch the first time the host asks for its
    /// initial vehicles, blocking until the batch is resident.
    ///
    /// Returns `true` when this call performed the warm-up.
    pub fn warm_up<H>(&self, host: &H) -> bool
    where
        H: ModelInfo + Streaming + ?Sized,
    {
        if self.initial_vehicles_loaded.get() {
            return false;
        }

        let mut requested = 0_usize;
        for _ in 0..WARM_UP_VEHICLE_COUNT {
            if let Selection::Chosen(model) = self.select_random_vehicle_to_load(host) {
                host.request_model(model.index(), StreamingFlags::KEEP_IN_MEMORY);
                requested += 1;
            }
        }
        host.load_all_requested(false);
        self.initial_vehicles_loaded.set(true);
        log::debug!(target: LOG_TARGET, "initial vehicles loaded ({requested} requested)");
        true
    }

    /// History of vehicles chosen for loading.
    #[must_use]
    pub fn recent_loaded(&self) -> Ref<'_, RecentVehicleLog> {
        self.recent_loaded.borrow()
    }

    /// History of vehicles chosen for spawning.
    #[must_use]
    pub fn recent_spawned(&self) -> Ref<'_, RecentVehicleLog> {
        self.recent_spawned.borrow()
    }

    /// Non-panicking variants for use while the host is faulting.
    pub(crate) fn try_recent_logs(
        &self,
    ) -> (
        Option<Ref<'_, RecentVehicleLog>>,
        Option<Ref<'_, RecentVehicleLog>>,
    ) {
        (
            self.recent_loaded.try_borrow().ok(),
            self.recent_spawned.try_borrow().ok(),
        )
    }
}
