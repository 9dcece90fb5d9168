//! Declarative hook table and the host-build address map it resolves against.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TrafficError;
use crate::host::Patcher;
use crate::model::VehicleSubclass;

/// Patched locations inside the host, named by what the original code does there.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum HookSite {
    /// Picks the model for a newly generated police car.
    PoliceCarModel,
    /// Fills a roadblock police car with occupants.
    PoliceOccupantsRoadblock,
    /// Picks the model for an ambient traffic car.
    TrafficCarModel,
    /// Creates the driver or passenger ped of a car.
    CarPedSpawn,
    /// Picks the next car model the streaming loader should request.
    CarToLoad,
    /// Fills a dispatched police car with occupants.
    PoliceOccupantsGeneric,
    /// Runs rail track audio for a vehicle.
    TrainTrackSound,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum HookKind {
    /// Replace the target of an unconditional jump (whole-function takeover).
    Jump,
    /// Replace the target of a single call instruction.
    Call,
}

/// Adapters the patcher routes redirected control flow into.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum HookHandler {
    RandomizePoliceCars,
    FixEmptyPoliceCars,
    RandomizeTrafficCars,
    RandomizeCarPeds,
    RandomizeCarToLoad,
    FixFreightTrainCrash,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct HookEntry {
    pub site: HookSite,
    pub kind: HookKind,
    pub handler: HookHandler,
}

const fn entry(site: HookSite, kind: HookKind, handler: HookHandler) -> HookEntry {
    HookEntry {
        site,
        kind,
        handler,
    }
}

/// Every redirection installed when the randomizer comes up, in install order.
pub const HOOK_TABLE: [HookEntry; 7] = [
    entry(
        HookSite::PoliceCarModel,
        HookKind::Jump,
        HookHandler::RandomizePoliceCars,
    ),
    entry(
        HookSite::PoliceOccupantsRoadblock,
        HookKind::Call,
        HookHandler::FixEmptyPoliceCars,
    ),
    entry(
        HookSite::TrafficCarModel,
        HookKind::Call,
        HookHandler::RandomizeTrafficCars,
    ),
    entry(
        HookSite::CarPedSpawn,
        HookKind::Call,
        HookHandler::RandomizeCarPeds,
    ),
    entry(
        HookSite::CarToLoad,
        HookKind::Jump,
        HookHandler::RandomizeCarToLoad,
    ),
    entry(
        HookSite::PoliceOccupantsGeneric,
        HookKind::Call,
        HookHandler::FixEmptyPoliceCars,
    ),
    entry(
        HookSite::TrainTrackSound,
        HookKind::Call,
        HookHandler::FixFreightTrainCrash,
    ),
];

/// Addresses of hook sites and patched tables for one host build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMap {
    pub sites: HashMap<HookSite, u32>,
    /// "Spawn vehicle of class" jump table.
    pub spawn_dispatch_table: u32,
}

impl AddressMap {
    /// Retail 1.0 US executable.
    #[must_use]
    pub fn san_andreas_us_1_0() -> Self {
        Self {
            sites: HashMap::from([
                (HookSite::PoliceCarModel, 0x0042_1980),
                (HookSite::PoliceOccupantsRoadblock, 0x0043_1EE5),
                (HookSite::TrafficCarModel, 0x0043_022A),
                (HookSite::CarPedSpawn, 0x0061_3B7F),
                (HookSite::CarToLoad, 0x0042_1900),
                (HookSite::PoliceOccupantsGeneric, 0x0042_C620),
                (HookSite::TrainTrackSound, 0x0050_1F3B),
            ]),
            spawn_dispatch_table: 0x0042_170C,
        }
    }

    /// Address of `site`.
    ///
    /// # Errors
    ///
    /// Returns an error if this build has no address for the site.
    pub fn resolve(&self, site: HookSite) -> Result<u32, TrafficError> {
        self.sites
            .get(&site)
            .copied()
            .ok_or(TrafficError::UnresolvedSite(site))
    }
}

/// Install every entry of [`HOOK_TABLE`].
///
/// Addresses are resolved up front so that a map missing any site leaves
/// the host untouched.
///
/// # Errors
///
/// Returns an error if a site is unresolved or the patcher rejects a write.
pub fn install_hooks<P: Patcher + ?Sized>(
    patcher: &mut P,
    addresses: &AddressMap,
) -> Result<(), TrafficError> {
    let resolved = HOOK_TABLE
        .iter()
        .map(|entry| addresses.resolve(entry.site).map(|address| (address, entry)))
        .collect::<Result<Vec<_>, _>>()?;
    for (address, entry) in resolved {
        patcher.install_hook(address, entry.kind, entry.handler)?;
    }
    Ok(())
}

/// Make the host spawn trains through the boat handler.
///
/// The randomizer can hand the spawner a train model in places where the
/// train handler cannot cope; the boat handler places it without faulting.
/// This is a permanent table rewrite, not a change to the vehicle's class.
///
/// # Errors
///
/// Returns an error if the patcher rejects the table write.
pub fn patch_train_spawns<P: Patcher + ?Sized>(
    patcher: &mut P,
    addresses: &AddressMap,
) -> Result<(), TrafficError> {
    let (Some(boat), Some(train)) = (
        VehicleSubclass::Boat.dispatch_slot(),
        VehicleSubclass::Train.dispatch_slot(),
    ) else {
        return Ok(());
    };
    patcher.copy_dispatch_entry(addresses.spawn_dispatch_table, boat, train)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::RecordingPatcher;

    #[test]
    fn table_covers_every_site_once() {
        let map = AddressMap::san_andreas_us_1_0();
        assert_eq!(map.sites.len(), HOOK_TABLE.len());
        for entry in HOOK_TABLE {
            assert!(map.resolve(entry.site).is_ok(), "{:?}", entry.site);
        }
        let occupant_fixes = HOOK_TABLE
            .iter()
            .filter(|e| e.handler == HookHandler::FixEmptyPoliceCars)
            .count();
        assert_eq!(occupant_fixes, 2);
    }

    #[test]
    fn install_writes_hooks_in_table_order() {
        let mut patcher = RecordingPatcher::default();
        install_hooks(&mut patcher, &AddressMap::san_andreas_us_1_0()).unwrap();

        assert_eq!(patcher.hooks.len(), 7);
        assert_eq!(
            patcher.hooks[0],
            (0x0042_1980, HookKind::Jump, HookHandler::RandomizePoliceCars)
        );
        assert_eq!(
            patcher.hooks[6],
            (0x0050_1F3B, HookKind::Call, HookHandler::FixFreightTrainCrash)
        );
    }

    #[test]
    fn missing_site_installs_nothing() {
        let mut map = AddressMap::san_andreas_us_1_0();
        map.sites.remove(&HookSite::TrainTrackSound);
        let mut patcher = RecordingPatcher::default();

        let err = install_hooks(&mut patcher, &map).unwrap_err();

        assert!(matches!(
            err,
            TrafficError::UnresolvedSite(HookSite::TrainTrackSound)
        ));
        assert!(patcher.hooks.is_empty());
    }

    #[test]
    fn train_slot_receives_boat_handler() {
        let mut patcher = RecordingPatcher::default();
        patch_train_spawns(&mut patcher, &AddressMap::san_andreas_us_1_0()).unwrap();
        assert_eq!(patcher.dispatch_copies, vec![(0x0042_170C, 4, 5)]);
    }

    #[test]
    fn address_map_round_trips_through_json() {
        let map = AddressMap::san_andreas_us_1_0();
        let json = serde_json::to_string(&map).unwrap();
        let back: AddressMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
