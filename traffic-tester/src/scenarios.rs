use traffic_core::{CategoryConfig, TrafficConfig, VehicleModelId};

/// Forced vehicle used by the override scenarios.
pub const FORCED_MODEL: VehicleModelId = VehicleModelId::known(560);

/// What an iteration must demonstrate beyond the shared invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Shared invariants only.
    Invariants,
    /// Every streamed and spawned vehicle is a road car.
    CarsOnly,
    /// Every spawned vehicle is the forced model.
    ForcedAlways,
    /// The forced model is never resident, so nothing is ever spawned.
    ForcedNever,
    /// The first warm-up blocks once and every batch vehicle is resident.
    WarmUp,
    /// Occupant calls fault now and then; identities must survive.
    OccupantFaults,
    /// Half the car peds are not resident and must be replaced.
    PedSubstitution,
    /// Freight trains are routed through the boat handler.
    FreightAsBoat,
}

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: &'static str,
    pub description: &'static str,
    pub frames: usize,
    pub expectation: Expectation,
}

impl TestScenario {
    /// Scenario configuration layered over the base config.
    #[must_use]
    pub fn configure(&self, base: &TrafficConfig) -> TrafficConfig {
        let mut config = base.clone();
        config.enabled = true;
        match self.expectation {
            Expectation::CarsOnly => config.with_categories(CategoryConfig::cars_only()),
            Expectation::ForcedAlways | Expectation::ForcedNever => {
                config.with_forced_vehicle(i32::from(FORCED_MODEL))
            }
            _ => config,
        }
    }
}

const SCENARIOS: &[TestScenario] = &[
    TestScenario {
        name: "smoke",
        description: "Default configuration through every hook",
        frames: 200,
        expectation: Expectation::Invariants,
    },
    TestScenario {
        name: "cars-only",
        description: "Only road cars may be streamed or spawned",
        frames: 400,
        expectation: Expectation::CarsOnly,
    },
    TestScenario {
        name: "forced-loaded",
        description: "Resident forced vehicle replaces every traffic pick",
        frames: 200,
        expectation: Expectation::ForcedAlways,
    },
    TestScenario {
        name: "forced-unloaded",
        description: "Forced vehicle that never becomes resident is never spawned",
        frames: 200,
        expectation: Expectation::ForcedNever,
    },
    TestScenario {
        name: "warm-up",
        description: "Initial vehicle batch is streamed in exactly once",
        frames: 50,
        expectation: Expectation::WarmUp,
    },
    TestScenario {
        name: "police-occupants",
        description: "Occupant population faults leave vehicle identity intact",
        frames: 150,
        expectation: Expectation::OccupantFaults,
    },
    TestScenario {
        name: "ped-guard",
        description: "Non-resident car peds fall back to the default ped",
        frames: 150,
        expectation: Expectation::PedSubstitution,
    },
    TestScenario {
        name: "freight-guard",
        description: "Freight trains spawned as boats skip track audio",
        frames: 150,
        expectation: Expectation::FreightAsBoat,
    },
];

#[must_use]
pub fn list_scenarios() -> &'static [TestScenario] {
    SCENARIOS
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<&'static TestScenario> {
    SCENARIOS.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Expand the CLI scenario list, where `all` selects every scenario.
#[must_use]
pub fn expand_scenarios(tokens: &[String]) -> Vec<String> {
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("all")) {
        return SCENARIOS.iter().map(|s| s.name.to_string()).collect();
    }
    tokens.to_vec()
}
