//! Category allow-list applied to randomized vehicle picks.
use crate::config::CategoryConfig;
use crate::host::ModelInfo;
use crate::model::VehicleModelId;

/// Vehicle categories the configuration can switch off.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VehicleCategory {
    Aircraft,
    Boat,
    Bike,
    Train,
    Car,
    Trailer,
}

impl VehicleCategory {
    /// Evaluation order; the first disabled category claiming a model wins.
    pub const ALL: [Self; 6] = [
        Self::Aircraft,
        Self::Boat,
        Self::Bike,
        Self::Train,
        Self::Car,
        Self::Trailer,
    ];

    /// Whether the host classifies `model` as part of this category.
    pub fn claims<M: ModelInfo + ?Sized>(self, info: &M, model: VehicleModelId) -> bool {
        match self {
            Self::Aircraft => info.is_heli(model) || info.is_plane(model),
            Self::Boat => info.is_boat(model),
            Self::Bike => info.is_bike(model) || info.is_bmx(model),
            Self::Train => info.is_train(model),
            Self::Car => {
                info.is_car(model) || info.is_quad_bike(model) || info.is_monster_truck(model)
            }
            Self::Trailer => info.is_trailer(model),
        }
    }

    #[must_use]
    pub const fn enabled_in(self, config: &CategoryConfig) -> bool {
        match self {
            Self::Aircraft => config.enable_aircrafts,
            Self::Boat => config.enable_boats,
            Self::Bike => config.enable_bikes,
            Self::Train => config.enable_trains,
            Self::Car => config.enable_cars,
            Self::Trailer => config.enable_trailers,
        }
    }
}

/// Returns the disabled category that rejects `model`, if any.
pub fn rejecting_category<M: ModelInfo + ?Sized>(
    config: &CategoryConfig,
    info: &M,
    model: VehicleModelId,
) -> Option<VehicleCategory> {
    VehicleCategory::ALL
        .into_iter()
        .filter(|category| !category.enabled_in(config))
        .find(|category| category.claims(info, model))
}

/// True unless a disabled category claims `model`.
///
/// Models the host does not classify at all are always allowed.
pub fn is_vehicle_allowed<M: ModelInfo + ?Sized>(
    config: &CategoryConfig,
    info: &M,
    model: VehicleModelId,
) -> bool {
    rejecting_category(config, info, model).is_none()
}
