//! scenarios.rs — Named chain presets
//!
//! A scenario pins down some of the inputs that are otherwise drawn at random or
//! taken from config.toml. Fields left as `None` fall through to the config.
//!
//! - `random`: everything from config, layout and aircraft rejection-sampled
//! - `equilateral`: the classic demonstration chain (100 km baseline, aircraft at
//!   (70, 40), free-space speed, zoomed plot). Timed in µs so the whole exchange
//!   (~500 µs) spans the animation and Δt labels keep their digits
//! - `baseline`: fixed 150 km chain with the default 300 km/ms / 0.1 ms relay timing,
//!   aircraft still random

use serde::{Deserialize, Serialize};

use gee_types::{Bounds, Point2};

use crate::driver::SimulationSetup;
use crate::observations::Units;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    /// Random layout and aircraft from config bounds
    Random,
    /// Master (0,0), Slave A (100,0), Slave B (50,86.6), aircraft (70,40)
    Equilateral,
    /// Master (0,0), Slave A (150,0), Slave B (0,150)
    Baseline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub kind: ScenarioType,
    pub stations: Option<[Point2; 3]>,
    pub receiver: Option<Point2>,
    /// Replaces the plot bounds (and the default locus region)
    pub bounds: Option<Bounds>,
    pub min_separation: Option<f64>,
    pub speed: Option<f64>,
    pub slave_delay: Option<f64>,
    pub units: Option<Units>,
    /// Simulated time per animation frame, in this scenario's time unit
    pub frame_step: Option<f64>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            kind: ScenarioType::Random,
            stations: None,
            receiver: None,
            bounds: None,
            min_separation: None,
            speed: None,
            slave_delay: None,
            units: None,
            frame_step: None,
        }
    }
}

impl ScenarioConfig {
    /// Overlay this scenario on a config-derived setup
    pub fn apply(&self, mut setup: SimulationSetup) -> SimulationSetup {
        if let Some(stations) = self.stations { setup.stations = Some(stations); }
        if let Some(receiver) = self.receiver { setup.receiver = Some(receiver); }
        if let Some(bounds) = self.bounds { setup.bounds = bounds; }
        if let Some(sep) = self.min_separation { setup.min_separation = sep; }
        if let Some(speed) = self.speed { setup.speed = speed; }
        if let Some(delay) = self.slave_delay { setup.slave_delay = delay; }
        if let Some(units) = &self.units { setup.units = units.clone(); }
        setup
    }

    /// Animation step for this scenario, else the configured one
    pub fn frame_step(&self, configured: f64) -> f64 {
        self.frame_step.unwrap_or(configured)
    }
}

pub fn preset(kind: ScenarioType) -> ScenarioConfig {
    match kind {
        ScenarioType::Random => ScenarioConfig::default(),
        ScenarioType::Equilateral => preset_equilateral(),
        ScenarioType::Baseline => preset_baseline(),
    }
}

pub fn preset_equilateral() -> ScenarioConfig {
    ScenarioConfig {
        kind: ScenarioType::Equilateral,
        stations: Some([Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), Point2::new(50.0, 86.6)]),
        receiver: Some(Point2::new(70.0, 40.0)),
        bounds: Some(Bounds::new(-50.0, 150.0, -50.0, 150.0)),
        min_separation: Some(50.0),
        speed: Some(0.3), // km/µs (300 000 km/s)
        slave_delay: Some(0.0),
        units: Some(Units { time: "µs".into(), distance: "km".into() }),
        frame_step: Some(5.0),
    }
}

pub fn preset_baseline() -> ScenarioConfig {
    ScenarioConfig {
        kind: ScenarioType::Baseline,
        stations: Some([Point2::new(0.0, 0.0), Point2::new(150.0, 0.0), Point2::new(0.0, 150.0)]),
        speed: Some(300.0),
        slave_delay: Some(0.1),
        ..Default::default()
    }
}
