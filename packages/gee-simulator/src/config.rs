//! config.rs — config.toml model
//!
//! The file is optional: when it cannot be read the copy bundled into the binary is
//! used instead. Parsed values are only shape-checked here; the engine validates
//! the physics when the setup is built.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

use gee_types::Bounds;

use crate::driver::SimulationSetup;
use crate::error::Result;
use crate::locus::{ClosedForm, GridContour, LocusStrategy};
use crate::observations::Units;

pub const BUNDLED_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct FullConfig {
    pub layout: LayoutConfig,
    pub propagation: PropagationConfig,
    pub animation: AnimationConfig,
    pub locus: LocusConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    pub bounds: [f64; 4],
    pub min_separation: f64,
    pub max_attempts: usize,
    pub receiver_margin: f64,
    #[serde(default = "default_static_receiver_margin")]
    pub static_receiver_margin: f64,
}

fn default_static_receiver_margin() -> f64 { 50.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct PropagationConfig {
    pub speed: f64,
    pub slave_delay: f64,
    #[serde(default = "default_time_unit")]
    pub time_unit: String,
    #[serde(default = "default_distance_unit")]
    pub distance_unit: String,
}

fn default_time_unit() -> String { Units::default().time }
fn default_distance_unit() -> String { Units::default().distance }

#[derive(Debug, Clone, Deserialize)]
pub struct AnimationConfig {
    pub frame_step: f64,
    pub frames: usize,
    pub frame_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocusKind {
    Grid,
    ClosedForm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocusConfig {
    pub strategy: LocusKind,
    pub resolution: usize,
    pub samples: usize,
    pub region: Option<[f64; 4]>,
}

impl FullConfig {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("invalid config.toml")
    }

    /// Read `path`, falling back to the bundled defaults when it is missing
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                info!("⚙  Config loaded from {}", path.display());
                Self::parse(&raw).with_context(|| format!("parsing {}", path.display()))
            }
            Err(e) => {
                warn!("Config {} unreadable ({e}), using bundled defaults", path.display());
                Self::parse(BUNDLED_CONFIG)
            }
        }
    }

    pub fn units(&self) -> Units {
        Units {
            time: self.propagation.time_unit.clone(),
            distance: self.propagation.distance_unit.clone(),
        }
    }

    /// Run inputs with nothing pinned: layout and receiver are drawn at build time
    pub fn simulation_setup(&self) -> SimulationSetup {
        SimulationSetup {
            bounds: Bounds::from_array(self.layout.bounds),
            min_separation: self.layout.min_separation,
            max_attempts: self.layout.max_attempts,
            receiver_margin: self.layout.receiver_margin,
            speed: self.propagation.speed,
            slave_delay: self.propagation.slave_delay,
            units: self.units(),
            stations: None,
            receiver: None,
        }
    }

    /// Same as `simulation_setup`, but the aircraft is drawn with the static-report margin
    pub fn static_simulation_setup(&self) -> SimulationSetup {
        SimulationSetup {
            receiver_margin: self.layout.static_receiver_margin,
            ..self.simulation_setup()
        }
    }

    /// Explicit `[locus] region`, else `fallback` (the plot bounds of the run)
    pub fn locus_region(&self, fallback: &Bounds) -> Bounds {
        self.locus.region.map(Bounds::from_array).unwrap_or(*fallback)
    }

    pub fn locus_strategy(&self) -> Result<Box<dyn LocusStrategy>> {
        let strategy: Box<dyn LocusStrategy> = match self.locus.strategy {
            LocusKind::Grid => Box::new(GridContour::new(self.locus.resolution)?),
            LocusKind::ClosedForm => Box::new(ClosedForm::new(self.locus.samples)?),
        };
        Ok(strategy)
    }
}
