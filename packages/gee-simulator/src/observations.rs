//! observations.rs — Range and TDOA derivation at the receiver
//!
//! The receiver knows every station's emission schedule (broadcast / published in
//! advance), so from an arrival time it can strip the relay delay and recover the
//! pure propagation time:
//!
//!   range(S)      = speed × (arrival(S) − emission(S))
//!   Δt(A, B)      = propagation(A) − propagation(B)
//!
//! Δt(Master, Slave) × speed is the range difference that puts the receiver on one
//! hyperbola with the pair as foci.

use serde::{Deserialize, Serialize};

use gee_types::{PulseSchedule, StationRole, TimeDifference};

use crate::error::{GeeError, Result};
use crate::timing::PropagationConstants;

// ── Units (annotation labels only) ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Units {
    pub time: String,
    pub distance: String,
}

impl Default for Units {
    fn default() -> Self {
        Self { time: "ms".into(), distance: "km".into() }
    }
}

// ── Inputs / outputs ──────────────────────────────────────────────────────────

/// What the receiver knows about one station's pulse: when it was keyed (published
/// schedule) and when it arrived (measured).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub role: StationRole,
    pub emission_time: f64,
    pub arrival_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeEstimate {
    pub role: StationRole,
    pub propagation_time: f64,
    pub range: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observations {
    pub ranges: Vec<RangeEstimate>,
    /// One entry per (Master, Slave) pair with both pulses observed
    pub time_differences: Vec<TimeDifference>,
}

impl Observations {
    pub fn range(&self, role: StationRole) -> Option<&RangeEstimate> {
        self.ranges.iter().find(|r| r.role == role)
    }

    pub fn time_difference(&self, first: StationRole, second: StationRole) -> Option<&TimeDifference> {
        self.time_differences.iter().find(|d| d.first == first && d.second == second)
    }
}

/// Strip a forward-model schedule down to what the receiver actually observes.
pub fn observations_from_schedule(schedule: &PulseSchedule) -> Vec<Observation> {
    schedule
        .timings
        .iter()
        .map(|t| Observation { role: t.role, emission_time: t.emission_time, arrival_time: t.arrival_time })
        .collect()
}

// ── Derivation ────────────────────────────────────────────────────────────────

fn propagation_time(obs: &Observation) -> Result<f64> {
    if !(obs.emission_time.is_finite() && obs.arrival_time.is_finite()) {
        return Err(GeeError::invalid(format!("{}: non-finite pulse times", obs.role)));
    }
    let elapsed = obs.arrival_time - obs.emission_time;
    if elapsed < 0.0 {
        return Err(GeeError::invalid(format!(
            "{}: arrival {} precedes emission {}",
            obs.role, obs.arrival_time, obs.emission_time
        )));
    }
    Ok(elapsed)
}

/// Ranges for every observed station plus Master/Slave time differences.
pub fn derive_observations(
    observed: &[Observation],
    constants: &PropagationConstants,
) -> Result<Observations> {
    let mut ranges: Vec<RangeEstimate> = Vec::with_capacity(observed.len());
    for obs in observed {
        if ranges.iter().any(|r| r.role == obs.role) {
            return Err(GeeError::invalid(format!("{} observed twice", obs.role)));
        }
        let propagation = propagation_time(obs)?;
        ranges.push(RangeEstimate {
            role: obs.role,
            propagation_time: propagation,
            range: constants.range(propagation),
        });
    }

    let time_differences = match ranges.iter().find(|r| r.role == StationRole::Master) {
        Some(master) => StationRole::SLAVES
            .iter()
            .filter_map(|slave| ranges.iter().find(|r| r.role == *slave))
            .map(|slave| pair_difference(master, slave, constants))
            .collect(),
        None => Vec::new(),
    };

    Ok(Observations { ranges, time_differences })
}

fn pair_difference(a: &RangeEstimate, b: &RangeEstimate, constants: &PropagationConstants) -> TimeDifference {
    let dt = a.propagation_time - b.propagation_time;
    TimeDifference {
        first: a.role,
        second: b.role,
        time_difference: dt,
        range_difference: constants.range(dt),
    }
}

/// Receiver label line, e.g. `Master Δt: 0.27 ms ∴ 80.62 km away`
pub fn annotation(role: StationRole, propagation_time: f64, range: f64, units: &Units) -> String {
    format!(
        "{} Δt: {:.2} {} ∴ {:.2} {} away",
        role.label(),
        propagation_time,
        units.time,
        range,
        units.distance
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use gee_types::{Point2, StationLayout};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::timing::compute_schedule;

    fn equilateral() -> StationLayout {
        StationLayout {
            master: Point2::new(0.0, 0.0),
            slave_a: Point2::new(100.0, 0.0),
            slave_b: Point2::new(50.0, 86.6),
        }
    }

    #[test]
    fn ranges_round_trip_to_geometry() {
        let layout = StationLayout {
            master: Point2::new(-300.0, 200.0),
            slave_a: Point2::new(450.0, -120.0),
            slave_b: Point2::new(80.0, 700.0),
        };
        let c = PropagationConstants::new(300.0, 0.1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..500 {
            let p = Point2::new(rng.gen_range(-1000.0..1000.0), rng.gen_range(-1000.0..1000.0));
            let schedule = compute_schedule(&layout, &c, &p).unwrap();
            let obs = derive_observations(&observations_from_schedule(&schedule), &c).unwrap();
            for role in StationRole::ALL {
                let truth = p.dist(&layout.position(role));
                let got = obs.range(role).unwrap().range;
                assert!(
                    (got - truth).abs() <= 1e-9 * truth.max(1.0),
                    "{role}: {got} vs {truth}"
                );
            }
        }
    }

    #[test]
    fn equilateral_chain_time_difference() {
        // 300 000 km/s, no relay delay, receiver at (70, 40)
        let c = PropagationConstants::new(300_000.0, 0.0).unwrap();
        let p = Point2::new(70.0, 40.0);
        let schedule = compute_schedule(&equilateral(), &c, &p).unwrap();
        let obs = derive_observations(&observations_from_schedule(&schedule), &c).unwrap();

        let d_master = schedule.get(StationRole::Master).distance_to_receiver;
        assert!((d_master - 80.6226).abs() < 1e-3);

        let expected = (d_master - p.dist(&Point2::new(100.0, 0.0))) / 300_000.0;
        let td = obs.time_difference(StationRole::Master, StationRole::SlaveA).unwrap();
        assert!((td.time_difference - expected).abs() < 1e-15);

        let forward = schedule.get(StationRole::Master).propagation_time()
            - schedule.get(StationRole::SlaveA).propagation_time();
        assert!((td.time_difference - forward).abs() < 1e-15);
    }

    #[test]
    fn master_only_has_no_differences() {
        let c = PropagationConstants::new(300.0, 0.1).unwrap();
        let obs = derive_observations(
            &[Observation { role: StationRole::Master, emission_time: 0.0, arrival_time: 0.5 }],
            &c,
        )
        .unwrap();
        assert!(obs.time_differences.is_empty());
        assert!((obs.range(StationRole::Master).unwrap().range - 150.0).abs() < 1e-12);
    }

    #[test]
    fn inconsistent_times_fail_closed() {
        let c = PropagationConstants::new(300.0, 0.1).unwrap();
        let early = Observation { role: StationRole::SlaveA, emission_time: 0.6, arrival_time: 0.2 };
        assert!(matches!(derive_observations(&[early], &c), Err(GeeError::InvalidConfiguration(_))));

        let nan = Observation { role: StationRole::SlaveA, emission_time: 0.6, arrival_time: f64::NAN };
        assert!(derive_observations(&[nan], &c).is_err());

        let ok = Observation { role: StationRole::Master, emission_time: 0.0, arrival_time: 1.0 };
        assert!(derive_observations(&[ok, ok], &c).is_err());
    }

    #[test]
    fn annotation_format() {
        let line = annotation(StationRole::SlaveA, 2.35, 705.0, &Units::default());
        assert_eq!(line, "Slave A Δt: 2.35 ms ∴ 705.00 km away");
    }
}
