//! Recent-vehicle report written when the host faults.
use std::fmt::{self, Write};
use std::rc::Rc;

use crate::constants::{CRASH_REPORT_CAPACITY, LOG_TARGET};
use crate::coordinator::TrafficCoordinator;
use crate::host::{FaultHandler, FaultInfo};

/// Write both recent-vehicle logs into `out`.
///
/// A log that is mutably borrowed at the moment of the fault is reported as
/// unavailable instead of panicking.
pub fn format_report(traffic: &TrafficCoordinator, out: &mut impl Write) -> fmt::Result {
    let (loaded, spawned) = traffic.try_recent_logs();
    out.write_str("Last loaded vehicles: ")?;
    match loaded {
        Some(log) => log.render_into(out)?,
        None => out.write_str("<unavailable>")?,
    }
    out.write_str("\nLast spawned vehicles: ")?;
    match spawned {
        Some(log) => log.render_into(out)?,
        None => out.write_str("<unavailable>")?,
    }
    Ok(())
}

/// Build the report into a buffer sized for the worst case up front.
#[must_use]
pub fn report(traffic: &TrafficCoordinator) -> String {
    let mut out = String::with_capacity(CRASH_REPORT_CAPACITY);
    // Writing into a String cannot fail.
    let _ = format_report(traffic, &mut out);
    out
}

/// Handler for the host's fault registry. Logs the report and returns so
/// the host's own fault handling continues.
#[must_use]
pub fn fault_handler(traffic: Rc<TrafficCoordinator>) -> FaultHandler {
    Box::new(move |fault: &FaultInfo| {
        let report = report(&traffic);
        log::error!(
            target: LOG_TARGET,
            "fault {:#010x} at {:#010x}\n{report}",
            fault.code,
            fault.address
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrafficConfig;
    use crate::constants::RECENT_VEHICLE_CAPACITY;
    use crate::model::VehicleModelId;
    use crate::sim::SimulatedHost;

    #[test]
    fn empty_logs_render_headers_only() {
        let traffic = TrafficCoordinator::new(&TrafficConfig::default().with_seed(1));
        assert_eq!(
            report(&traffic),
            "Last loaded vehicles: \nLast spawned vehicles: "
        );
    }

    #[test]
    fn report_lists_loaded_then_spawned() {
        let host = SimulatedHost::new(2);
        let forced = VehicleModelId::new(560).unwrap();
        host.set_loaded([forced]);
        let traffic =
            TrafficCoordinator::new(&TrafficConfig::default().with_seed(1).with_forced_vehicle(560));

        traffic.select_random_vehicle_to_load(&host);
        traffic.select_random_loaded_vehicle(&host, None);
        traffic.select_random_loaded_vehicle(&host, None);

        assert_eq!(
            report(&traffic),
            "Last loaded vehicles: 560\nLast spawned vehicles: 560 560"
        );
    }

    #[test]
    fn full_report_fits_preallocated_buffer() {
        let host = SimulatedHost::new(2);
        host.set_loaded([VehicleModelId::MAX]);
        let traffic =
            TrafficCoordinator::new(&TrafficConfig::default().with_seed(1).with_forced_vehicle(611));
        for _ in 0..RECENT_VEHICLE_CAPACITY * 2 {
            traffic.select_random_vehicle_to_load(&host);
            traffic.select_random_loaded_vehicle(&host, None);
        }

        let text = report(&traffic);

        assert!(text.len() <= CRASH_REPORT_CAPACITY);
        assert!(text.ends_with("611 611 611 611 611"));
    }

    #[test]
    fn handler_runs_without_panicking() {
        let traffic = Rc::new(TrafficCoordinator::new(&TrafficConfig::default().with_seed(1)));
        let handler = fault_handler(Rc::clone(&traffic));
        handler(&FaultInfo {
            code: 0xC000_0005,
            address: 0x0050_1F3B,
        });
        assert_eq!(Rc::strong_count(&traffic), 2);
    }
}
