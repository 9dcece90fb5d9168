//! Host facilities the randomizer calls into.
//!
//! Platform glue implements these against the running game; tests and the QA
//! harness use [`crate::sim::SimulatedHost`]. All methods take `&self`
//! because the host is driven from a single simulation thread and owns its
//! own state.
use crate::error::PatchError;
use crate::model::{LoadState, PedModelId, StreamingFlags, VehicleModelId, VehicleSubclass};
use crate::patch::{HookHandler, HookKind};

/// Read-only queries against the host model-info table.
pub trait ModelInfo {
    fn is_heli(&self, model: VehicleModelId) -> bool;
    fn is_plane(&self, model: VehicleModelId) -> bool;
    fn is_boat(&self, model: VehicleModelId) -> bool;
    fn is_bike(&self, model: VehicleModelId) -> bool;
    fn is_bmx(&self, model: VehicleModelId) -> bool;
    fn is_train(&self, model: VehicleModelId) -> bool;
    fn is_car(&self, model: VehicleModelId) -> bool;
    fn is_quad_bike(&self, model: VehicleModelId) -> bool;
    fn is_monster_truck(&self, model: VehicleModelId) -> bool;
    fn is_trailer(&self, model: VehicleModelId) -> bool;
    fn is_police(&self, model: VehicleModelId) -> bool;

    /// Passenger seats the host derives from the model's door count.
    fn passenger_seats_from_doors(&self, model: VehicleModelId) -> u8;

    /// Residency of any model (vehicle or ped) by raw table index.
    fn load_state(&self, model: u16) -> LoadState;
}

/// The asynchronous model streaming loader.
pub trait Streaming {
    /// A random vehicle whose asset is already resident, if any.
    fn random_loaded_vehicle(&self) -> Option<VehicleModelId>;

    fn request_model(&self, model: u16, flags: StreamingFlags);

    /// Drain the request queue. Blocks until every request has completed.
    fn load_all_requested(&self, priority_only: bool);

    fn default_cop_car_model(&self, context: i32) -> VehicleModelId;
}

/// Access to the model index stored inside a live vehicle instance.
pub trait VehicleInstance {
    fn model_index(&self) -> VehicleModelId;
    fn set_model_index(&mut self, model: VehicleModelId);
}

/// Traffic-control and car-AI routines.
pub trait CarControl {
    type Vehicle: VehicleInstance;

    /// Let the host pick the car type (civilian, police, ...) for a spawn.
    fn choose_car_type(&self, type_slot: &mut i32);

    fn add_police_car_occupants(&self, vehicle: &mut Self::Vehicle, flag: i8);
}

/// Ped population routines.
pub trait Population {
    type Ped;

    fn add_ped(&self, ped_type: i32, model: PedModelId, position: [f32; 3], flag: bool)
    -> Self::Ped;
}

/// Parameters the host hands to the vehicle audio entity.
pub struct TrainSoundParams<'a, V> {
    pub subclass: VehicleSubclass,
    pub vehicle: &'a V,
}

pub trait VehicleAudio {
    type Vehicle: VehicleInstance;

    fn process_train_track_sound(&self, params: &TrainSoundParams<'_, Self::Vehicle>);
}

/// Snapshot of an unhandled host fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultInfo {
    pub code: u32,
    pub address: u32,
}

pub type FaultHandler = Box<dyn Fn(&FaultInfo)>;

/// The host's unhandled-fault dispatch.
pub trait FaultRegistry {
    fn register_fault_handler(&mut self, handler: FaultHandler);
}

/// The binary patcher that redirects host control flow.
pub trait Patcher {
    /// Redirect the jump or call at `address` to `handler`.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be rewritten.
    fn install_hook(
        &mut self,
        address: u32,
        kind: HookKind,
        handler: HookHandler,
    ) -> Result<(), PatchError>;

    /// Overwrite jump-table entry `to_slot` with the contents of `from_slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be rewritten.
    fn copy_dispatch_entry(
        &mut self,
        table: u32,
        from_slot: usize,
        to_slot: usize,
    ) -> Result<(), PatchError>;
}
