//! Traffic randomizer configuration.
//!
//! Loaded once by the host's configuration collaborator and never mutated
//! afterwards. Missing fields fall back to the defaults below, so a config
//! containing only `{"enabled": true}` is valid.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{PedModelId, VehicleModelId};

/// Per-category enable switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    #[serde(default = "default_true")]
    pub enable_aircrafts: bool,
    #[serde(default = "default_true")]
    pub enable_boats: bool,
    #[serde(default = "default_true")]
    pub enable_bikes: bool,
    #[serde(default = "default_true")]
    pub enable_trains: bool,
    #[serde(default = "default_true")]
    pub enable_cars: bool,
    #[serde(default = "default_true")]
    pub enable_trailers: bool,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl CategoryConfig {
    #[must_use]
    pub const fn all_enabled() -> Self {
        Self {
            enable_aircrafts: true,
            enable_boats: true,
            enable_bikes: true,
            enable_trains: true,
            enable_cars: true,
            enable_trailers: true,
        }
    }

    #[must_use]
    pub const fn all_disabled() -> Self {
        Self {
            enable_aircrafts: false,
            enable_boats: false,
            enable_bikes: false,
            enable_trains: false,
            enable_cars: false,
            enable_trailers: false,
        }
    }

    /// Only regular road cars (including quads and monster trucks).
    #[must_use]
    pub const fn cars_only() -> Self {
        Self {
            enable_cars: true,
            ..Self::all_disabled()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub categories: CategoryConfig,
    #[serde(default)]
    pub forced_vehicle_enabled: bool,
    #[serde(default)]
    pub forced_vehicle_id: i32,
    /// Ped spawned in place of a car occupant whose model is not resident.
    #[serde(default)]
    pub default_model: PedModelId,
    /// Fixed RNG seed for reproducible sessions; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: CategoryConfig::default(),
            forced_vehicle_enabled: false,
            forced_vehicle_id: 0,
            default_model: PedModelId::default(),
            seed: None,
        }
    }
}

impl TrafficConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON for this shape.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Forced vehicle, if enabled and naming a real vehicle model.
    ///
    /// Out-of-range ids are ignored without complaint.
    #[must_use]
    pub fn forced_vehicle(&self) -> Option<VehicleModelId> {
        if !self.forced_vehicle_enabled {
            return None;
        }
        VehicleModelId::try_from(self.forced_vehicle_id).ok()
    }

    #[must_use]
    pub fn with_forced_vehicle(mut self, model: i32) -> Self {
        self.forced_vehicle_enabled = true;
        self.forced_vehicle_id = model;
        self
    }

    #[must_use]
    pub const fn with_categories(mut self, categories: CategoryConfig) -> Self {
        self.categories = categories;
        self
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = TrafficConfig::from_json("{}").unwrap();
        assert_eq!(cfg, TrafficConfig::default());
        assert!(cfg.enabled);
        assert!(cfg.forced_vehicle().is_none());
    }

    #[test]
    fn flattened_category_flags_parse() {
        let cfg = TrafficConfig::from_json(
            r#"{
                "enabled": true,
                "enable_boats": false,
                "enable_trains": false,
                "forced_vehicle_enabled": true,
                "forced_vehicle_id": 520,
                "default_model": 7,
                "seed": 99
            }"#,
        )
        .unwrap();
        assert!(!cfg.categories.enable_boats);
        assert!(!cfg.categories.enable_trains);
        assert!(cfg.categories.enable_cars);
        assert_eq!(cfg.forced_vehicle().map(VehicleModelId::index), Some(520));
        assert_eq!(cfg.default_model, PedModelId(7));
        assert_eq!(cfg.seed, Some(99));
    }

    #[test]
    fn forced_vehicle_outside_range_is_ignored() {
        let low = TrafficConfig::default().with_forced_vehicle(399);
        let high = TrafficConfig::default().with_forced_vehicle(612);
        assert!(low.forced_vehicle().is_none());
        assert!(high.forced_vehicle().is_none());
    }

    #[test]
    fn forced_vehicle_requires_enable_flag() {
        let cfg = TrafficConfig {
            forced_vehicle_id: 411,
            ..TrafficConfig::default()
        };
        assert!(cfg.forced_vehicle().is_none());
    }

    #[test]
    fn malformed_json_reports_parse_error() {
        let err = TrafficConfig::from_json("{ enabled: yes }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TrafficConfig::load("/definitely/not/here/traffic.json").unwrap_err();
        assert!(err.to_string().contains("traffic.json"));
    }
}
