//! driver.rs — Simulation build + time-stepped snapshots
//!
//! `Simulation::build` is the single entry point that draws (or accepts) the station
//! layout and the receiver, validates the constants and derives the pulse schedule.
//! Everything after that is immutable: `step(t)` is a pure function of `t`, so frames
//! can be requested in any order; animated playback simply asks for increasing `t`.

use rand::Rng;
use serde::Serialize;
use tracing::info;

use gee_types::{
    Bounds, PairLocus, Point2, PulseSchedule, Snapshot, StationLayout, StationPulse, StationRole,
};

use crate::error::{GeeError, Result};
use crate::layout::{
    generate_station_layout, sample_receiver, station_layout_from_points, validate_bounds,
};
use crate::locus::{FocalPair, LocusStrategy};
use crate::observations::{
    annotation, derive_observations, observations_from_schedule, Observation, Observations, Units,
};
use crate::timing::{compute_schedule, PropagationConstants};

// ── Setup ─────────────────────────────────────────────────────────────────────

/// Inputs of one run. `stations` / `receiver` are drawn at random when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSetup {
    pub bounds: Bounds,
    pub min_separation: f64,
    pub max_attempts: usize,
    pub receiver_margin: f64,
    pub speed: f64,
    pub slave_delay: f64,
    pub units: Units,
    /// Master, Slave A, Slave B
    pub stations: Option<[Point2; 3]>,
    pub receiver: Option<Point2>,
}

// ── Simulation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    layout: StationLayout,
    receiver: Point2,
    constants: PropagationConstants,
    units: Units,
    schedule: PulseSchedule,
}

impl Simulation {
    pub fn new(
        layout: StationLayout,
        receiver: Point2,
        constants: PropagationConstants,
        units: Units,
    ) -> Result<Self> {
        let schedule = compute_schedule(&layout, &constants, &receiver)?;
        Ok(Self { layout, receiver, constants, units, schedule })
    }

    /// Draw whatever the setup leaves open, then derive the schedule.
    /// Constants and bounds are checked before any random draw.
    pub fn build(setup: &SimulationSetup, rng: &mut impl Rng) -> Result<Self> {
        let constants = PropagationConstants::new(setup.speed, setup.slave_delay)?;
        validate_bounds(&setup.bounds)?;

        let layout = match &setup.stations {
            Some(points) => station_layout_from_points(points, setup.min_separation)?,
            None => generate_station_layout(&setup.bounds, setup.min_separation, setup.max_attempts, rng)?,
        };
        let receiver = match setup.receiver {
            Some(p) => p,
            None => sample_receiver(&setup.bounds, setup.receiver_margin, rng)?,
        };

        let sim = Self::new(layout, receiver, constants, setup.units.clone())?;
        info!(
            "🛰  Chain ready: master ({:.1}, {:.1}), receiver ({:.1}, {:.1}), all pulses in by t={:.3} {}",
            layout.master.x,
            layout.master.y,
            receiver.x,
            receiver.y,
            sim.completion_time(),
            sim.units.time
        );
        Ok(sim)
    }

    pub fn layout(&self) -> &StationLayout { &self.layout }
    pub fn receiver(&self) -> Point2 { self.receiver }
    pub fn constants(&self) -> &PropagationConstants { &self.constants }
    pub fn units(&self) -> &Units { &self.units }
    pub fn schedule(&self) -> &PulseSchedule { &self.schedule }

    /// Time by which the receiver has heard every station
    pub fn completion_time(&self) -> f64 { self.schedule.completion_time() }

    /// Receiver-side derivation over the full schedule
    pub fn observations(&self) -> Result<Observations> {
        derive_observations(&observations_from_schedule(&self.schedule), &self.constants)
    }

    /// State of every pulse at simulation time `t`.
    pub fn step(&self, t: f64) -> Result<Snapshot> {
        if !(t.is_finite() && t >= 0.0) {
            return Err(GeeError::invalid(format!("simulation time must be ≥ 0, got {t}")));
        }

        // Only pulses that have actually arrived feed the receiver-side derivation
        let heard: Vec<Observation> = observations_from_schedule(&self.schedule)
            .into_iter()
            .filter(|o| t >= o.arrival_time)
            .collect();
        let derived = derive_observations(&heard, &self.constants)?;

        let stations = StationRole::ALL
            .iter()
            .map(|&role| {
                let timing = self.schedule.get(role);
                let range = derived.range(role);
                StationPulse {
                    role,
                    position: self.layout.position(role),
                    pulse_radius: if t >= timing.emission_time {
                        self.constants.range(t - timing.emission_time)
                    } else {
                        0.0
                    },
                    received_master: t >= timing.master_reception_time,
                    detected: range.is_some(),
                    derived_range: range.map(|r| r.range),
                    annotation: range.map(|r| annotation(role, r.propagation_time, r.range, &self.units)),
                }
            })
            .collect();

        Ok(Snapshot {
            t,
            receiver: self.receiver,
            stations,
            time_differences: derived.time_differences,
        })
    }

    /// The two lines of position: (Master, Slave A) and (Master, Slave B), each with
    /// d = dist(P, Master) − dist(P, Slave) as the receiver derives it.
    pub fn loci(&self, strategy: &dyn LocusStrategy, region: &Bounds) -> Result<Vec<PairLocus>> {
        let observations = self.observations()?;
        StationRole::SLAVES
            .iter()
            .map(|&slave| -> Result<PairLocus> {
                let td = observations
                    .time_difference(StationRole::Master, slave)
                    .ok_or_else(|| GeeError::invalid(format!("no time difference for {slave}")))?;
                let pair = FocalPair::new(self.layout.master, self.layout.position(slave), td.range_difference)?;
                let curve = strategy.trace(&pair, region)?;
                info!(
                    "〰 Locus Master/{slave} via {}: {} polylines, {} points",
                    strategy.name(),
                    curve.polylines.len(),
                    curve.point_count()
                );
                Ok(PairLocus { first: StationRole::Master, second: slave, curve })
            })
            .collect()
    }
}
