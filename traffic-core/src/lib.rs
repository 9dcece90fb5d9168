//! Traffic Randomizer Core
//!
//! Decides which vehicle models the host game spawns and streams in, keeps
//! randomized picks inside the configured vehicle categories, and guards the
//! host code paths that fault when handed a model they did not expect.
//! Everything that touches the running game goes through the traits in
//! [`host`], so the crate has no platform dependencies of its own.

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod crash;
pub mod error;
pub mod hooks;
pub mod host;
pub mod model;
pub mod patch;
pub mod policy;
pub mod recent;
pub mod sim;

use std::rc::Rc;

// Re-export commonly used types
pub use config::{CategoryConfig, TrafficConfig};
pub use coordinator::{DeferReason, Selection, TrafficCoordinator};
pub use error::{ConfigError, PatchError, TrafficError};
pub use hooks::{
    ModelIndexGuard, choose_police_vehicle_for_model, fix_empty_police_car,
    guard_train_track_sound, load_initial_vehicles, randomize_car_to_load, randomize_police_car,
    randomize_traffic_car, spawn_car_ped,
};
pub use host::{
    CarControl, FaultInfo, FaultRegistry, ModelInfo, Patcher, Population, Streaming,
    TrainSoundParams, VehicleAudio, VehicleInstance,
};
pub use model::{LoadState, PedModelId, StreamingFlags, VehicleModelId, VehicleSubclass};
pub use patch::{AddressMap, HOOK_TABLE, HookEntry, HookHandler, HookKind, HookSite};
pub use policy::{VehicleCategory, is_vehicle_allowed};
pub use recent::RecentVehicleLog;

/// Bring the traffic randomizer up inside the host.
///
/// Does nothing and returns `Ok(None)` when the configuration disables
/// randomization. Otherwise installs every hook, registers the crash report,
/// and reroutes train spawns through the boat handler. The returned
/// coordinator is the one every hook must be called with.
///
/// # Errors
///
/// Returns an error if a hook site has no address for this host build or the
/// patcher refuses a write.
pub fn install<P, F>(
    config: &TrafficConfig,
    patcher: &mut P,
    faults: &mut F,
    addresses: &AddressMap,
) -> Result<Option<Rc<TrafficCoordinator>>, TrafficError>
where
    P: Patcher + ?Sized,
    F: FaultRegistry + ?Sized,
{
    if !config.enabled {
        return Ok(None);
    }

    let traffic = Rc::new(TrafficCoordinator::new(config));
    patch::install_hooks(patcher, addresses)?;
    faults.register_fault_handler(crash::fault_handler(Rc::clone(&traffic)));
    log::info!(target: constants::LOG_TARGET, "{}", constants::LOG_REGISTERED);
    patch::patch_train_spawns(patcher, addresses)?;

    Ok(Some(traffic))
}
