//! Adapters invoked from the patched host call sites.
//!
//! Each function keeps the host's contract for its site: the same inputs,
//! and a plain integer where the host expects one. Selection decisions live
//! in [`TrafficCoordinator`]; this layer only translates.
use std::ops::{Deref, DerefMut};

use crate::constants::{
    DEFAULT_COP_CAR_CONTEXT, MODEL_FBI_RANCHER, MODEL_FBI_TRUCK, MODEL_FREIGHT,
    MODEL_FREIGHT_FLAT, MODEL_POLICE_BIKE, MODEL_POLICE_RANGER, MODEL_SWAT_VAN,
};
use crate::coordinator::{Selection, TrafficCoordinator};
use crate::host::{
    CarControl, ModelInfo, Population, Streaming, TrainSoundParams, VehicleAudio, VehicleInstance,
};
use crate::model::{PedModelId, VehicleModelId, VehicleSubclass};

/// Model for an ambient traffic car, or `-1` to let the host choose.
pub fn randomize_traffic_car<H>(
    traffic: &TrafficCoordinator,
    host: &H,
    type_slot: Option<&mut i32>,
) -> i32
where
    H: ModelInfo + Streaming + CarControl,
{
    traffic.select_random_loaded_vehicle(host, type_slot).to_host()
}

/// Model for a police car. Falls back to the area's regular cop car.
pub fn randomize_police_car<H>(traffic: &TrafficCoordinator, host: &H) -> VehicleModelId
where
    H: ModelInfo + Streaming + CarControl,
{
    match traffic.select_random_loaded_vehicle(host, None) {
        Selection::Chosen(model) => model,
        Selection::Deferred(_) => host.default_cop_car_model(DEFAULT_COP_CAR_CONTEXT),
    }
}

/// Model the streaming loader should request next, or `-1`.
pub fn randomize_car_to_load<H>(traffic: &TrafficCoordinator, host: &H) -> i32
where
    H: ModelInfo,
{
    traffic.select_random_vehicle_to_load(host).to_host()
}

/// First-request warm-up of the vehicle pool.
pub fn load_initial_vehicles<H>(traffic: &TrafficCoordinator, host: &H) -> bool
where
    H: ModelInfo + Streaming,
{
    traffic.warm_up(host)
}

/// Police model whose occupant setup the host knows how to run for `model`.
///
/// Genuine police models keep their own setup, except the FBI truck and SWAT
/// van whose crews do not spawn. Everything else borrows a police model with
/// a matching seat count.
pub fn choose_police_vehicle_for_model<M>(info: &M, model: VehicleModelId) -> VehicleModelId
where
    M: ModelInfo + ?Sized,
{
    if model != MODEL_FBI_TRUCK && model != MODEL_SWAT_VAN && info.is_police(model) {
        return model;
    }

    match info.passenger_seats_from_doors(model) {
        1 => MODEL_POLICE_BIKE,
        2 => MODEL_POLICE_RANGER,
        _ => MODEL_FBI_RANCHER,
    }
}

/// Temporarily gives a vehicle another model index and puts the original
/// back when dropped, including while unwinding out of a host fault.
pub struct ModelIndexGuard<'a, V: VehicleInstance> {
    vehicle: &'a mut V,
    original: VehicleModelId,
}

impl<'a, V: VehicleInstance> ModelIndexGuard<'a, V> {
    pub fn swap(vehicle: &'a mut V, substitute: VehicleModelId) -> Self {
        let original = vehicle.model_index();
        vehicle.set_model_index(substitute);
        Self { vehicle, original }
    }

    #[must_use]
    pub const fn original(&self) -> VehicleModelId {
        self.original
    }
}

impl<V: VehicleInstance> Deref for ModelIndexGuard<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        self.vehicle
    }
}

impl<V: VehicleInstance> DerefMut for ModelIndexGuard<'_, V> {
    fn deref_mut(&mut self) -> &mut V {
        self.vehicle
    }
}

impl<V: VehicleInstance> Drop for ModelIndexGuard<'_, V> {
    fn drop(&mut self) {
        self.vehicle.set_model_index(self.original);
    }
}

/// Populate a randomized police car by presenting it to the host as a
/// police model it has crew data for.
pub fn fix_empty_police_car<H>(host: &H, vehicle: &mut H::Vehicle, flag: i8)
where
    H: ModelInfo + CarControl,
{
    let substitute = choose_police_vehicle_for_model(host, vehicle.model_index());
    let mut guard = ModelIndexGuard::swap(vehicle, substitute);
    host.add_police_car_occupants(&mut guard, flag);
}

/// Spawn a car ped, replacing a non-resident model with the configured default.
pub fn spawn_car_ped<H>(
    traffic: &TrafficCoordinator,
    host: &H,
    ped_type: i32,
    model: PedModelId,
    position: [f32; 3],
    flag: bool,
) -> H::Ped
where
    H: ModelInfo + Population,
{
    let model = if host.load_state(model.index()).is_loaded() {
        model
    } else {
        traffic.default_ped()
    };
    host.add_ped(ped_type, model, position, flag)
}

/// Whether a vehicle is a freight train travelling through the boat code path.
pub fn is_freight_posing_as_boat<V: VehicleInstance>(params: &TrainSoundParams<'_, V>) -> bool {
    if params.subclass != VehicleSubclass::Boat {
        return false;
    }
    let model = params.vehicle.model_index();
    model == MODEL_FREIGHT || model == MODEL_FREIGHT_FLAT
}

/// Skip rail audio for freight trains spawned as boats.
pub fn guard_train_track_sound<A>(audio: &A, params: &TrainSoundParams<'_, A::Vehicle>)
where
    A: VehicleAudio,
{
    if is_freight_posing_as_boat(params) {
        return;
    }
    audio.process_train_track_sound(params);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrafficConfig;
    use crate::model::LoadState;
    use crate::sim::{SimVehicle, SimulatedHost};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    fn id(raw: u16) -> VehicleModelId {
        VehicleModelId::new(raw).unwrap()
    }

    fn traffic() -> TrafficCoordinator {
        TrafficCoordinator::new(&TrafficConfig::default().with_seed(11))
    }

    #[test]
    fn police_car_falls_back_to_default_cop_car() {
        let host = SimulatedHost::new(5);
        assert_eq!(
            randomize_police_car(&traffic(), &host),
            host.default_cop_car_model(0)
        );
    }

    #[test]
    fn police_car_uses_randomized_pick_when_available() {
        let host = SimulatedHost::new(5);
        host.set_loaded([id(411)]);
        assert_eq!(randomize_police_car(&traffic(), &host), id(411));
    }

    #[test]
    fn traffic_and_load_hooks_use_host_sentinel() {
        let host = SimulatedHost::new(5);
        host.set_loaded(VehicleModelId::all());
        let traffic = TrafficCoordinator::new(
            &TrafficConfig::default()
                .with_seed(11)
                .with_categories(crate::config::CategoryConfig::all_disabled()),
        );
        assert_eq!(randomize_traffic_car(&traffic, &host, None), -1);
        assert_eq!(randomize_car_to_load(&traffic, &host), -1);
    }

    #[test]
    fn police_substitution_by_seat_count() {
        let host = SimulatedHost::new(5);
        assert_eq!(choose_police_vehicle_for_model(&host, id(596)), id(596));
        assert_eq!(choose_police_vehicle_for_model(&host, id(461)), id(523));
        assert_eq!(choose_police_vehicle_for_model(&host, id(602)), id(599));
        assert_eq!(choose_police_vehicle_for_model(&host, id(411)), id(490));
    }

    #[test]
    fn fbi_truck_and_swat_van_are_substituted() {
        let host = SimulatedHost::new(5);
        assert!(host.is_police(id(528)));
        assert!(host.is_police(id(601)));
        assert_ne!(choose_police_vehicle_for_model(&host, id(528)), id(528));
        assert_ne!(choose_police_vehicle_for_model(&host, id(601)), id(601));
    }

    #[test]
    fn occupants_see_substitute_and_model_is_restored() {
        let host = SimulatedHost::new(5);
        let mut vehicle = SimVehicle::new(id(411));

        fix_empty_police_car(&host, &mut vehicle, 1);

        assert_eq!(host.occupant_calls(), vec![id(490)]);
        assert_eq!(vehicle.model_index(), id(411));
    }

    #[test]
    fn model_is_restored_when_host_faults() {
        let host = SimulatedHost::new(5);
        host.fail_next_occupant_call();
        let mut vehicle = SimVehicle::new(id(411));

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            fix_empty_police_car(&host, &mut vehicle, 0);
        }));

        assert!(outcome.is_err());
        assert_eq!(vehicle.model_index(), id(411));
    }

    #[test]
    fn guard_exposes_substitute_until_dropped() {
        let mut vehicle = SimVehicle::new(id(560));
        {
            let guard = ModelIndexGuard::swap(&mut vehicle, id(599));
            assert_eq!(guard.model_index(), id(599));
            assert_eq!(guard.original(), id(560));
        }
        assert_eq!(vehicle.model_index(), id(560));
    }

    #[test]
    fn unloaded_ped_is_replaced_by_default_model() {
        let host = SimulatedHost::new(5);
        let traffic = TrafficCoordinator::new(&TrafficConfig {
            default_model: PedModelId(0),
            ..TrafficConfig::default()
        });
        host.set_load_state(280, LoadState::NotLoaded);
        host.set_load_state(281, LoadState::Loaded);

        let replaced = spawn_car_ped(&traffic, &host, 4, PedModelId(280), [0.0; 3], false);
        let kept = spawn_car_ped(&traffic, &host, 4, PedModelId(281), [1.0, 2.0, 3.0], true);

        assert_eq!(replaced.model, PedModelId(0));
        assert_eq!(kept.model, PedModelId(281));
        assert_eq!(kept.position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn freight_trains_skip_track_audio() {
        let host = SimulatedHost::new(5);
        for raw in [537, 569] {
            let vehicle = SimVehicle::new(id(raw));
            let params = TrainSoundParams {
                subclass: VehicleSubclass::Boat,
                vehicle: &vehicle,
            };
            guard_train_track_sound(&host, &params);
        }
        assert_eq!(host.train_sound_calls(), 0);
    }

    #[test]
    fn other_vehicles_get_track_audio_once() {
        let host = SimulatedHost::new(5);
        let cases = [
            (VehicleSubclass::Boat, 538),
            (VehicleSubclass::Boat, 452),
            (VehicleSubclass::Train, 537),
            (VehicleSubclass::Train, 449),
        ];
        for (subclass, raw) in cases {
            let vehicle = SimVehicle::new(id(raw));
            guard_train_track_sound(
                &host,
                &TrainSoundParams {
                    subclass,
                    vehicle: &vehicle,
                },
            );
        }
        assert_eq!(host.train_sound_calls(), cases.len());
    }
}
