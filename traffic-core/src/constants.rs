//! Fixed tuning values and well-known host model ids.
//!
//! Everything here mirrors a value baked into the host executable or a
//! budget the randomizer commits to per frame. Changing any of them changes
//! observable behaviour in game.
use crate::model::VehicleModelId;

// Model id range -----------------------------------------------------------
pub const VEHICLE_MODEL_MIN: u16 = 400;
pub const VEHICLE_MODEL_MAX: u16 = 611;

// Budgets ------------------------------------------------------------------
pub const RECENT_VEHICLE_CAPACITY: usize = 5;
pub const LOAD_RETRY_BUDGET: usize = 16;
pub const WARM_UP_VEHICLE_COUNT: usize = 5;
pub(crate) const CRASH_REPORT_CAPACITY: usize = 160;

// Host sentinels and car types ---------------------------------------------
pub const NO_SELECTION: i32 = -1;
pub const CAR_TYPE_POLICE: i32 = 13;
pub(crate) const DEFAULT_COP_CAR_CONTEXT: i32 = 0;

// Police occupant substitutes ----------------------------------------------
pub const MODEL_FBI_TRUCK: VehicleModelId = VehicleModelId::known(528);
pub const MODEL_SWAT_VAN: VehicleModelId = VehicleModelId::known(601);
pub const MODEL_POLICE_BIKE: VehicleModelId = VehicleModelId::known(523);
pub const MODEL_POLICE_RANGER: VehicleModelId = VehicleModelId::known(599);
pub const MODEL_FBI_RANCHER: VehicleModelId = VehicleModelId::known(490);

// Freight trains that spawn through the boat handler -----------------------
pub const MODEL_FREIGHT: VehicleModelId = VehicleModelId::known(537);
pub const MODEL_FREIGHT_FLAT: VehicleModelId = VehicleModelId::known(569);

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_TARGET: &str = "traffic";
pub(crate) const LOG_REGISTERED: &str = "Registered Traffic Randomizer";
