//! timing.rs — Pulse propagation and emission schedule
//!
//! Models the chain keying sequence:
//! 1. Master keys its pulse at t = 0
//! 2. Each slave hears the master after dist(Master, S) / speed
//! 3. The slave re-emits `slave_delay` after reception
//! 4. Every pulse reaches the receiver after dist(Station, Receiver) / speed
//!
//! All functions are pure; the schedule is a value derived from the layout, the
//! receiver and the constants.

use serde::Serialize;
use tracing::debug;

use gee_types::{Point2, PulseSchedule, PulseTiming, StationLayout, StationRole};

use crate::error::{GeeError, Result};

// ── Propagation constants ────────────────────────────────────────────────────

/// Propagation speed and slave relay delay, fixed for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PropagationConstants {
    /// Distance per time unit, e.g. 300 km/ms
    speed: f64,
    /// Fixed processing delay at each slave before re-emission
    slave_delay: f64,
}

impl PropagationConstants {
    pub fn new(speed: f64, slave_delay: f64) -> Result<Self> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(GeeError::invalid(format!(
                "propagation speed must be positive and finite, got {speed}"
            )));
        }
        if !(slave_delay.is_finite() && slave_delay >= 0.0) {
            return Err(GeeError::invalid(format!(
                "slave delay must be ≥ 0 and finite, got {slave_delay}"
            )));
        }
        Ok(Self { speed, slave_delay })
    }

    pub fn speed(&self) -> f64 { self.speed }
    pub fn slave_delay(&self) -> f64 { self.slave_delay }

    /// Time for a pulse to cover `distance`
    pub fn travel_time(&self, distance: f64) -> f64 { distance / self.speed }

    /// Distance a pulse covers in `elapsed`
    pub fn range(&self, elapsed: f64) -> f64 { self.speed * elapsed }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// Master-pulse reception time and emission time of one station.
fn emission(layout: &StationLayout, role: StationRole, constants: &PropagationConstants) -> (f64, f64) {
    match role {
        StationRole::Master => (0.0, 0.0),
        slave => {
            let heard = constants.travel_time(layout.master.dist(&layout.position(slave)));
            (heard, heard + constants.slave_delay)
        }
    }
}

/// Emission, arrival and distance for every station relative to `receiver`.
pub fn compute_schedule(
    layout: &StationLayout,
    constants: &PropagationConstants,
    receiver: &Point2,
) -> Result<PulseSchedule> {
    if !receiver.is_finite() {
        return Err(GeeError::invalid("receiver position must be finite"));
    }

    let timings = StationRole::ALL.map(|role| {
        let (master_reception_time, emission_time) = emission(layout, role, constants);
        let distance_to_receiver = layout.position(role).dist(receiver);
        PulseTiming {
            role,
            emission_time,
            master_reception_time,
            arrival_time: emission_time + constants.travel_time(distance_to_receiver),
            distance_to_receiver,
        }
    });

    for t in &timings {
        debug!(
            "{}: emit {:.4} → arrive {:.4} ({:.2} away)",
            t.role, t.emission_time, t.arrival_time, t.distance_to_receiver
        );
    }

    Ok(PulseSchedule { timings })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_b() -> StationLayout {
        StationLayout {
            master: Point2::new(0.0, 0.0),
            slave_a: Point2::new(150.0, 0.0),
            slave_b: Point2::new(0.0, 150.0),
        }
    }

    #[test]
    fn slave_emission_includes_relay_delay() {
        // 300 km/ms, 0.1 ms relay delay, slave 150 km out → 0.5 + 0.1 ms
        let c = PropagationConstants::new(300.0, 0.1).unwrap();
        let s = compute_schedule(&layout_b(), &c, &Point2::new(40.0, 40.0)).unwrap();
        let a = s.get(StationRole::SlaveA);
        assert!((a.emission_time - 0.6).abs() < 1e-12, "got {}", a.emission_time);
        assert!((a.master_reception_time - 0.5).abs() < 1e-12);
        assert!(a.emission_time > a.master_reception_time);
        assert_eq!(s.get(StationRole::Master).emission_time, 0.0);
    }

    #[test]
    fn arrival_never_precedes_emission() {
        let c = PropagationConstants::new(300.0, 0.1).unwrap();
        for (x, y) in [(0.0, 0.0), (-700.0, 300.0), (150.0, 0.0), (900.0, -900.0)] {
            let s = compute_schedule(&layout_b(), &c, &Point2::new(x, y)).unwrap();
            for t in &s.timings {
                assert!(t.emission_time >= 0.0);
                assert!(t.arrival_time >= t.emission_time);
            }
        }
    }

    #[test]
    fn receiver_on_station_arrives_at_emission() {
        let c = PropagationConstants::new(300.0, 0.1).unwrap();
        let s = compute_schedule(&layout_b(), &c, &Point2::new(150.0, 0.0)).unwrap();
        let a = s.get(StationRole::SlaveA);
        assert_eq!(a.distance_to_receiver, 0.0);
        assert_eq!(a.arrival_time, a.emission_time);
    }

    #[test]
    fn completion_is_latest_arrival() {
        let c = PropagationConstants::new(300.0, 0.1).unwrap();
        let s = compute_schedule(&layout_b(), &c, &Point2::new(-500.0, -500.0)).unwrap();
        let latest = s.timings.iter().map(|t| t.arrival_time).fold(0.0, f64::max);
        assert_eq!(s.completion_time(), latest);
    }

    #[test]
    fn non_physical_constants_rejected() {
        assert!(matches!(PropagationConstants::new(0.0, 0.1), Err(GeeError::InvalidConfiguration(_))));
        assert!(matches!(PropagationConstants::new(-300.0, 0.1), Err(GeeError::InvalidConfiguration(_))));
        assert!(matches!(PropagationConstants::new(f64::NAN, 0.1), Err(GeeError::InvalidConfiguration(_))));
        assert!(matches!(PropagationConstants::new(300.0, -0.1), Err(GeeError::InvalidConfiguration(_))));
    }
}
