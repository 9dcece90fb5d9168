use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use traffic_core::sim::{RecordingFaults, RecordingPatcher, SimVehicle, SimulatedHost};
use traffic_core::{
    AddressMap, FaultInfo, LoadState, ModelInfo, PedModelId, Streaming, StreamingFlags,
    TrafficConfig, TrafficCoordinator, TrainSoundParams, VehicleInstance, VehicleModelId,
    VehicleSubclass, crash, fix_empty_police_car, guard_train_track_sound, install,
    load_initial_vehicles, randomize_car_to_load, randomize_police_car, randomize_traffic_car,
    spawn_car_ped,
};

use crate::scenarios::{Expectation, FORCED_MODEL, TestScenario};

const EVICT_EVERY_FRAMES: usize = 25;
const STREAMING_BUDGET_PER_FRAME: usize = 2;
const OCCUPANT_FAULT_EVERY_FRAMES: usize = 7;
const FREIGHT_ROTATION: [u16; 4] = [537, 569, 538, 590];

/// Counters gathered over one simulated session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationStats {
    pub traffic_picks: usize,
    pub traffic_deferrals: usize,
    pub load_requests: usize,
    pub occupant_faults: usize,
    pub ped_substitutions: usize,
    pub track_sounds_skipped: usize,
}

impl IterationStats {
    fn absorb(&mut self, other: &Self) {
        self.traffic_picks += other.traffic_picks;
        self.traffic_deferrals += other.traffic_deferrals;
        self.load_requests += other.load_requests;
        self.occupant_faults += other.occupant_faults;
        self.ped_substitutions += other.ped_substitutions;
        self.track_sounds_skipped += other.track_sounds_skipped;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub average_duration: Duration,
    pub totals: IterationStats,
}

pub struct ScenarioRunner {
    base_config: TrafficConfig,
    verbose: bool,
}

impl ScenarioRunner {
    pub const fn new(base_config: TrafficConfig, verbose: bool) -> Self {
        Self {
            base_config,
            verbose,
        }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (seed: {seed})",
                        scenario.name.bright_white()
                    );
                }
                self.run_single_scenario(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut failures = Vec::new();
        let mut successes = 0;
        let mut totals = IterationStats::default();
        let mut durations = Vec::with_capacity(iterations);

        for i in 0..iterations {
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let start = Instant::now();
            let outcome = run_iteration(scenario, &self.base_config, iteration_seed);
            durations.push(start.elapsed());

            match outcome {
                Ok(stats) => {
                    successes += 1;
                    totals.absorb(&stats);
                }
                Err(err) => {
                    if self.verbose {
                        println!("  ❌ Iteration {}/{iterations} failed: {}", i + 1, err.red());
                    }
                    failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): {err}",
                        i + 1
                    ));
                }
            }
        }

        let average_duration = if durations.is_empty() {
            Duration::ZERO
        } else {
            durations.iter().sum::<Duration>() / u32::try_from(durations.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            totals,
        }
    }
}

fn is_road_car(host: &SimulatedHost, model: VehicleModelId) -> bool {
    host.is_car(model) || host.is_quad_bike(model) || host.is_monster_truck(model)
}

/// Drive one installed session through `scenario.frames` frames.
///
/// # Errors
///
/// Returns a description of the first violated expectation.
pub fn run_iteration(
    scenario: &TestScenario,
    base: &TrafficConfig,
    seed: u64,
) -> Result<IterationStats, String> {
    let config = scenario.configure(base).with_seed(seed);
    let host = SimulatedHost::new(seed);
    let mut patcher = RecordingPatcher::default();
    let mut faults = RecordingFaults::default();
    let traffic = install(
        &config,
        &mut patcher,
        &mut faults,
        &AddressMap::san_andreas_us_1_0(),
    )
    .map_err(|err| format!("install failed: {err}"))?
    .ok_or_else(|| "randomizer disabled by configuration".to_string())?;

    let expectation = scenario.expectation;
    let mut stats = IterationStats::default();

    if expectation == Expectation::ForcedAlways {
        host.set_loaded([FORCED_MODEL]);
    }
    if !load_initial_vehicles(&traffic, &host) {
        return Err("first warm-up request did not load vehicles".to_string());
    }
    match expectation {
        Expectation::ForcedNever => host.evict(FORCED_MODEL),
        Expectation::WarmUp => check_warm_up(&traffic, &host)?,
        _ => {}
    }

    for frame in 0..scenario.frames {
        stream_frame(&traffic, &host, expectation, frame, &mut stats)?;
        traffic_frame(&traffic, &host, expectation, &mut stats)?;
        police_frame(&traffic, &host, expectation, frame, &mut stats)?;
        ped_frame(&traffic, &host, expectation, frame, &mut stats)?;
        freight_frame(&host, expectation, frame, &mut stats);

        if traffic.recent_loaded().len() > 5 || traffic.recent_spawned().len() > 5 {
            return Err(format!("frame {frame}: recent vehicle log over capacity"));
        }
    }

    faults.raise(FaultInfo {
        code: 0xC000_0005,
        address: 0,
    });
    let report = crash::report(&traffic);
    if !report.contains("Last spawned vehicles:") {
        return Err(format!("crash report incomplete: {report:?}"));
    }

    log::debug!("seed {seed}: {stats:?}");
    Ok(stats)
}

fn check_warm_up(traffic: &TrafficCoordinator, host: &SimulatedHost) -> Result<(), String> {
    if host.blocking_loads() != 1 || !host.pending_requests().is_empty() {
        return Err("warm-up did not block until its batch was resident".to_string());
    }
    if traffic.recent_loaded().iter().any(|m| !host.load_state(m.index()).is_loaded()) {
        return Err("warm-up left a requested vehicle non-resident".to_string());
    }
    if load_initial_vehicles(traffic, host) || host.blocking_loads() != 1 {
        return Err("warm-up ran twice".to_string());
    }
    Ok(())
}

fn stream_frame(
    traffic: &TrafficCoordinator,
    host: &SimulatedHost,
    expectation: Expectation,
    frame: usize,
    stats: &mut IterationStats,
) -> Result<(), String> {
    let to_load = randomize_car_to_load(traffic, host);
    if let Ok(model) = VehicleModelId::try_from(to_load) {
        if expectation == Expectation::CarsOnly && !is_road_car(host, model) {
            return Err(format!("frame {frame}: streamed non-car model {model}"));
        }
        if !(expectation == Expectation::ForcedNever && model == FORCED_MODEL) {
            host.request_model(model.index(), StreamingFlags::KEEP_IN_MEMORY);
            stats.load_requests += 1;
        }
    }
    host.pump_streaming(STREAMING_BUDGET_PER_FRAME);

    if frame % EVICT_EVERY_FRAMES == EVICT_EVERY_FRAMES - 1 {
        let victim = host
            .loaded_vehicles()
            .into_iter()
            .find(|model| *model != FORCED_MODEL);
        if let Some(model) = victim {
            host.evict(model);
        }
    }
    Ok(())
}

fn traffic_frame(
    traffic: &TrafficCoordinator,
    host: &SimulatedHost,
    expectation: Expectation,
    stats: &mut IterationStats,
) -> Result<(), String> {
    let mut car_type = -1;
    let picked = randomize_traffic_car(traffic, host, Some(&mut car_type));
    let Ok(model) = VehicleModelId::try_from(picked) else {
        stats.traffic_deferrals += 1;
        if expectation == Expectation::ForcedAlways {
            return Err("resident forced vehicle was not picked".to_string());
        }
        return Ok(());
    };

    stats.traffic_picks += 1;
    if !host.load_state(model.index()).is_loaded() {
        return Err(format!("spawned non-resident model {model}"));
    }
    match expectation {
        Expectation::CarsOnly if !is_road_car(host, model) => {
            Err(format!("spawned non-car model {model}"))
        }
        Expectation::ForcedAlways if model != FORCED_MODEL => {
            Err(format!("picked {model} instead of forced {FORCED_MODEL}"))
        }
        Expectation::ForcedNever => Err(format!("spawned {model} while forced model is absent")),
        _ => Ok(()),
    }
}

fn police_frame(
    traffic: &TrafficCoordinator,
    host: &SimulatedHost,
    expectation: Expectation,
    frame: usize,
    stats: &mut IterationStats,
) -> Result<(), String> {
    let cop = randomize_police_car(traffic, host);
    let mut vehicle = SimVehicle::new(cop);

    let inject = expectation == Expectation::OccupantFaults
        && frame % OCCUPANT_FAULT_EVERY_FRAMES == 0;
    if inject {
        host.fail_next_occupant_call();
        let previous_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            fix_empty_police_car(host, &mut vehicle, 0);
        }));
        panic::set_hook(previous_hook);
        if outcome.is_ok() {
            return Err(format!("frame {frame}: injected occupant fault did not fire"));
        }
        stats.occupant_faults += 1;
    } else {
        fix_empty_police_car(host, &mut vehicle, 0);
    }

    if vehicle.model_index() != cop {
        return Err(format!(
            "frame {frame}: vehicle {cop} left as {}",
            vehicle.model_index()
        ));
    }
    Ok(())
}

fn ped_frame(
    traffic: &TrafficCoordinator,
    host: &SimulatedHost,
    expectation: Expectation,
    frame: usize,
    stats: &mut IterationStats,
) -> Result<(), String> {
    if expectation != Expectation::PedSubstitution {
        return Ok(());
    }
    let raw = u16::try_from(frame % 20 + 1).unwrap_or(1);
    let resident = raw % 2 == 0;
    host.set_load_state(
        raw,
        if resident {
            LoadState::Loaded
        } else {
            LoadState::NotLoaded
        },
    );

    let ped = spawn_car_ped(traffic, host, 4, PedModelId(raw), [0.0; 3], false);
    let expected = if resident {
        PedModelId(raw)
    } else {
        stats.ped_substitutions += 1;
        traffic.default_ped()
    };
    if ped.model != expected {
        return Err(format!(
            "frame {frame}: ped {raw} spawned as {:?}, expected {expected:?}",
            ped.model
        ));
    }
    Ok(())
}

fn freight_frame(
    host: &SimulatedHost,
    expectation: Expectation,
    frame: usize,
    stats: &mut IterationStats,
) {
    if expectation != Expectation::FreightAsBoat {
        return;
    }
    let raw = FREIGHT_ROTATION[frame % FREIGHT_ROTATION.len()];
    let Some(model) = VehicleModelId::new(raw) else {
        return;
    };
    let vehicle = SimVehicle::new(model);
    let before = host.train_sound_calls();
    guard_train_track_sound(
        host,
        &TrainSoundParams {
            subclass: VehicleSubclass::Boat,
            vehicle: &vehicle,
        },
    );
    if host.train_sound_calls() == before {
        stats.track_sounds_skipped += 1;
    }
}
