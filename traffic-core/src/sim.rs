//! In-memory host used by the test suite and the QA harness.
//!
//! Classifies the full 400-611 range the way the retail game does, keeps a
//! load-state table with an asynchronous request queue, and records every
//! call the randomizer makes into it.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::PatchError;
use crate::host::{
    CarControl, FaultHandler, FaultInfo, FaultRegistry, ModelInfo, Patcher, Population,
    Streaming, TrainSoundParams, VehicleAudio, VehicleInstance,
};
use crate::model::{LoadState, PedModelId, StreamingFlags, VehicleModelId, VehicleSubclass};
use crate::patch::{HookHandler, HookKind};

const HELIS: &[u16] = &[417, 425, 447, 469, 487, 488, 497, 548, 563];
const RC_HELIS: &[u16] = &[465, 501];
const PLANES: &[u16] = &[460, 476, 511, 512, 513, 519, 520, 553, 577, 592, 593];
const RC_PLANES: &[u16] = &[464];
const BOATS: &[u16] = &[430, 446, 452, 453, 454, 472, 473, 484, 493, 595];
const BIKES: &[u16] = &[448, 461, 462, 463, 468, 521, 522, 523, 581, 586];
const BMXS: &[u16] = &[481, 509, 510];
const TRAINS: &[u16] = &[449, 537, 538, 569, 570, 590];
const QUADS: &[u16] = &[471];
const MONSTER_TRUCKS: &[u16] = &[444, 556, 557];
const TRAILERS: &[u16] = &[435, 450, 584, 591, 606, 607, 608, 610, 611];
const POLICE: &[u16] = &[427, 430, 490, 497, 523, 528, 596, 597, 598, 599, 601];
const TWO_PASSENGER: &[u16] = &[429, 451, 506, 541, 602];

/// Host class of a vehicle model in the retail taxonomy.
#[must_use]
pub fn subclass_of(model: VehicleModelId) -> VehicleSubclass {
    let raw = model.index();
    let table: [(&[u16], VehicleSubclass); 11] = [
        (HELIS, VehicleSubclass::Heli),
        (RC_HELIS, VehicleSubclass::FakeHeli),
        (PLANES, VehicleSubclass::Plane),
        (RC_PLANES, VehicleSubclass::FakePlane),
        (BOATS, VehicleSubclass::Boat),
        (BIKES, VehicleSubclass::Bike),
        (BMXS, VehicleSubclass::Bmx),
        (TRAINS, VehicleSubclass::Train),
        (QUADS, VehicleSubclass::Quad),
        (MONSTER_TRUCKS, VehicleSubclass::MonsterTruck),
        (TRAILERS, VehicleSubclass::Trailer),
    ];
    table
        .iter()
        .find(|(ids, _)| ids.contains(&raw))
        .map_or(VehicleSubclass::Automobile, |(_, subclass)| *subclass)
}

/// A vehicle instance owned by the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimVehicle {
    model: VehicleModelId,
}

impl SimVehicle {
    #[must_use]
    pub const fn new(model: VehicleModelId) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn subclass(&self) -> VehicleSubclass {
        subclass_of(self.model)
    }
}

impl VehicleInstance for SimVehicle {
    fn model_index(&self) -> VehicleModelId {
        self.model
    }

    fn set_model_index(&mut self, model: VehicleModelId) {
        self.model = model;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimPed {
    pub ped_type: i32,
    pub model: PedModelId,
    pub position: [f32; 3],
    pub flag: bool,
}

#[derive(Debug)]
pub struct SimulatedHost {
    rng: RefCell<ChaCha8Rng>,
    load_states: RefCell<HashMap<u16, LoadState>>,
    requested: RefCell<Vec<u16>>,
    load_state_queries: Cell<usize>,
    loaded_vehicle_queries: Cell<usize>,
    blocking_loads: Cell<usize>,
    occupant_calls: RefCell<Vec<VehicleModelId>>,
    fail_next_occupant_call: Cell<bool>,
    train_sound_calls: Cell<usize>,
    peds: RefCell<Vec<SimPed>>,
}

impl SimulatedHost {
    pub const CIVILIAN_CAR_TYPE: i32 = 0;
    pub const DEFAULT_COP_CAR: VehicleModelId = VehicleModelId::known(596);

    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RefCell::new(ChaCha8Rng::seed_from_u64(seed)),
            load_states: RefCell::new(HashMap::new()),
            requested: RefCell::new(Vec::new()),
            load_state_queries: Cell::new(0),
            loaded_vehicle_queries: Cell::new(0),
            blocking_loads: Cell::new(0),
            occupant_calls: RefCell::new(Vec::new()),
            fail_next_occupant_call: Cell::new(false),
            train_sound_calls: Cell::new(0),
            peds: RefCell::new(Vec::new()),
        }
    }

    /// Mark `models` resident.
    pub fn set_loaded(&self, models: impl IntoIterator<Item = VehicleModelId>) {
        let mut states = self.load_states.borrow_mut();
        for model in models {
            states.insert(model.index(), LoadState::Loaded);
        }
    }

    pub fn set_load_state(&self, model: u16, state: LoadState) {
        self.load_states.borrow_mut().insert(model, state);
    }

    /// Drop a resident vehicle, as the streaming loader does under memory pressure.
    pub fn evict(&self, model: VehicleModelId) {
        self.load_states.borrow_mut().remove(&model.index());
    }

    /// Complete up to `budget` queued requests, oldest first.
    pub fn pump_streaming(&self, budget: usize) -> usize {
        let finished: Vec<u16> = {
            let mut requested = self.requested.borrow_mut();
            let take = budget.min(requested.len());
            requested.drain(..take).collect()
        };
        let mut states = self.load_states.borrow_mut();
        for model in &finished {
            states.insert(*model, LoadState::Loaded);
        }
        finished.len()
    }

    #[must_use]
    pub fn loaded_vehicles(&self) -> Vec<VehicleModelId> {
        let states = self.load_states.borrow();
        let mut loaded: Vec<VehicleModelId> = states
            .iter()
            .filter(|(_, state)| state.is_loaded())
            .filter_map(|(raw, _)| VehicleModelId::new(*raw))
            .collect();
        loaded.sort_unstable();
        loaded
    }

    #[must_use]
    pub fn pending_requests(&self) -> Vec<u16> {
        self.requested.borrow().clone()
    }

    #[must_use]
    pub fn load_state_queries(&self) -> usize {
        self.load_state_queries.get()
    }

    /// Times streaming was asked for a random resident vehicle.
    #[must_use]
    pub fn loaded_vehicle_queries(&self) -> usize {
        self.loaded_vehicle_queries.get()
    }

    #[must_use]
    pub fn blocking_loads(&self) -> usize {
        self.blocking_loads.get()
    }

    /// Model index each occupant call observed on the vehicle.
    #[must_use]
    pub fn occupant_calls(&self) -> Vec<VehicleModelId> {
        self.occupant_calls.borrow().clone()
    }

    /// Make the next occupant call panic, standing in for a host fault.
    pub fn fail_next_occupant_call(&self) {
        self.fail_next_occupant_call.set(true);
    }

    #[must_use]
    pub fn train_sound_calls(&self) -> usize {
        self.train_sound_calls.get()
    }

    #[must_use]
    pub fn spawned_peds(&self) -> Vec<SimPed> {
        self.peds.borrow().clone()
    }
}

impl ModelInfo for SimulatedHost {
    fn is_heli(&self, model: VehicleModelId) -> bool {
        matches!(
            subclass_of(model),
            VehicleSubclass::Heli | VehicleSubclass::FakeHeli
        )
    }

    fn is_plane(&self, model: VehicleModelId) -> bool {
        matches!(
            subclass_of(model),
            VehicleSubclass::Plane | VehicleSubclass::FakePlane
        )
    }

    fn is_boat(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::Boat
    }

    fn is_bike(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::Bike
    }

    fn is_bmx(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::Bmx
    }

    fn is_train(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::Train
    }

    fn is_car(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::Automobile
    }

    fn is_quad_bike(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::Quad
    }

    fn is_monster_truck(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::MonsterTruck
    }

    fn is_trailer(&self, model: VehicleModelId) -> bool {
        subclass_of(model) == VehicleSubclass::Trailer
    }

    fn is_police(&self, model: VehicleModelId) -> bool {
        POLICE.contains(&model.index())
    }

    fn passenger_seats_from_doors(&self, model: VehicleModelId) -> u8 {
        match subclass_of(model) {
            VehicleSubclass::Bike | VehicleSubclass::Bmx | VehicleSubclass::Quad => 1,
            _ if TWO_PASSENGER.contains(&model.index()) => 2,
            _ => 3,
        }
    }

    fn load_state(&self, model: u16) -> LoadState {
        self.load_state_queries.set(self.load_state_queries.get() + 1);
        self.load_states
            .borrow()
            .get(&model)
            .copied()
            .unwrap_or_default()
    }
}

impl Streaming for SimulatedHost {
    fn random_loaded_vehicle(&self) -> Option<VehicleModelId> {
        self.loaded_vehicle_queries
            .set(self.loaded_vehicle_queries.get() + 1);
        let loaded = self.loaded_vehicles();
        loaded.choose(&mut *self.rng.borrow_mut()).copied()
    }

    fn request_model(&self, model: u16, _flags: StreamingFlags) {
        let mut states = self.load_states.borrow_mut();
        let state = states.entry(model).or_default();
        if state.is_loaded() {
            return;
        }
        *state = LoadState::Requested;
        let mut requested = self.requested.borrow_mut();
        if !requested.contains(&model) {
            requested.push(model);
        }
    }

    /// Loads everything queued; the sim has no priority lane.
    fn load_all_requested(&self, _priority_only: bool) {
        self.blocking_loads.set(self.blocking_loads.get() + 1);
        let pending = self.requested.borrow().len();
        self.pump_streaming(pending);
    }

    fn default_cop_car_model(&self, _context: i32) -> VehicleModelId {
        Self::DEFAULT_COP_CAR
    }
}

impl CarControl for SimulatedHost {
    type Vehicle = SimVehicle;

    fn choose_car_type(&self, type_slot: &mut i32) {
        *type_slot = Self::CIVILIAN_CAR_TYPE;
    }

    fn add_police_car_occupants(&self, vehicle: &mut SimVehicle, _flag: i8) {
        self.occupant_calls.borrow_mut().push(vehicle.model_index());
        if self.fail_next_occupant_call.replace(false) {
            panic!("simulated host fault while adding police occupants");
        }
    }
}

impl Population for SimulatedHost {
    type Ped = SimPed;

    fn add_ped(&self, ped_type: i32, model: PedModelId, position: [f32; 3], flag: bool) -> SimPed {
        let ped = SimPed {
            ped_type,
            model,
            position,
            flag,
        };
        self.peds.borrow_mut().push(ped);
        ped
    }
}

impl VehicleAudio for SimulatedHost {
    type Vehicle = SimVehicle;

    fn process_train_track_sound(&self, _params: &TrainSoundParams<'_, SimVehicle>) {
        self.train_sound_calls.set(self.train_sound_calls.get() + 1);
    }
}

/// Patcher that records writes instead of touching memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingPatcher {
    pub hooks: Vec<(u32, HookKind, HookHandler)>,
    pub dispatch_copies: Vec<(u32, usize, usize)>,
    /// Address whose write should be refused.
    pub reject: Option<u32>,
}

impl RecordingPatcher {
    fn check(&self, address: u32) -> Result<(), PatchError> {
        match self.reject {
            Some(rejected) if rejected == address => Err(PatchError {
                address,
                reason: "page is not writable".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl Patcher for RecordingPatcher {
    fn install_hook(
        &mut self,
        address: u32,
        kind: HookKind,
        handler: HookHandler,
    ) -> Result<(), PatchError> {
        self.check(address)?;
        self.hooks.push((address, kind, handler));
        Ok(())
    }

    fn copy_dispatch_entry(
        &mut self,
        table: u32,
        from_slot: usize,
        to_slot: usize,
    ) -> Result<(), PatchError> {
        self.check(table)?;
        self.dispatch_copies.push((table, from_slot, to_slot));
        Ok(())
    }
}

/// Fault registry that lets callers raise a fault on demand.
#[derive(Default)]
pub struct RecordingFaults {
    handlers: Vec<FaultHandler>,
}

impl RecordingFaults {
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn raise(&self, fault: FaultInfo) {
        for handler in &self.handlers {
            handler(&fault);
        }
    }
}

impl FaultRegistry for RecordingFaults {
    fn register_fault_handler(&mut self, handler: FaultHandler) {
        self.handlers.push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u16) -> VehicleModelId {
        VehicleModelId::new(raw).unwrap()
    }

    #[test]
    fn taxonomy_matches_retail_classes() {
        assert_eq!(subclass_of(id(411)), VehicleSubclass::Automobile);
        assert_eq!(subclass_of(id(537)), VehicleSubclass::Train);
        assert_eq!(subclass_of(id(501)), VehicleSubclass::FakeHeli);
        assert_eq!(subclass_of(id(611)), VehicleSubclass::Trailer);
        let host = SimulatedHost::new(0);
        assert!(host.is_heli(id(501)));
        assert!(host.is_heli(id(465)));
        assert!(host.is_plane(id(464)));
        assert!(!host.is_car(id(501)));
    }

    #[test]
    fn every_model_has_exactly_one_class() {
        let host = SimulatedHost::new(0);
        for model in VehicleModelId::all() {
            let claims = [
                host.is_heli(model),
                host.is_plane(model),
                host.is_boat(model),
                host.is_bike(model),
                host.is_bmx(model),
                host.is_train(model),
                host.is_car(model),
                host.is_quad_bike(model),
                host.is_monster_truck(model),
                host.is_trailer(model),
            ];
            assert_eq!(claims.iter().filter(|c| **c).count(), 1, "model {model}");
        }
    }

    #[test]
    fn requests_complete_only_when_pumped() {
        let host = SimulatedHost::new(0);
        host.request_model(411, StreamingFlags::KEEP_IN_MEMORY);
        host.request_model(411, StreamingFlags::KEEP_IN_MEMORY);
        assert_eq!(host.pending_requests(), vec![411]);
        assert_eq!(host.load_state(411), LoadState::Requested);
        assert!(host.random_loaded_vehicle().is_none());

        assert_eq!(host.pump_streaming(4), 1);
        assert_eq!(host.random_loaded_vehicle(), Some(id(411)));

        host.evict(id(411));
        assert!(host.loaded_vehicles().is_empty());
    }

    #[test]
    fn rejected_patch_address_is_reported() {
        let mut patcher = RecordingPatcher {
            reject: Some(0x10),
            ..RecordingPatcher::default()
        };
        let err = patcher
            .install_hook(0x10, HookKind::Call, HookHandler::RandomizeCarPeds)
            .unwrap_err();
        assert_eq!(err.address, 0x10);
        assert!(patcher.hooks.is_empty());
    }
}
