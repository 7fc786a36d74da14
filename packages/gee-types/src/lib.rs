//! # gee-types
//!
//! Shared data model for the GEE hyperbolic navigation simulator.
//!
//! These types are used by:
//! - `gee-simulator`: the layout / timing / locus engine produces them
//! - presentation layers (animated plotters, static renderers, the UDP frame feed):
//!   consume them as JSON without linking the engine
//!
//! ## Conventions
//!
//! - **Plane**: flat 2D Cartesian, x = east, y = north, distances in the configured
//!   distance unit (km by default)
//! - **Time**: simulation time in the configured time unit (ms by default), t = 0 is the
//!   master pulse emission
//! - **Roles**: station identity is role-based (Master, Slave A, Slave B), never by index
//!
//! Everything here is plain data. Validation lives in the engine.

use serde::{Deserialize, Serialize};

// ── Geometry ──────────────────────────────────────────────────────────────────

/// 2D point (distance units)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }

    /// Euclidean distance
    pub fn dist(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(&self) -> bool { self.x.is_finite() && self.y.is_finite() }

    /// Shortest distance from this point to the segment a→b
    pub fn dist_to_segment(&self, a: &Point2, b: &Point2) -> f64 {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return self.dist(a);
        }
        let t = (((self.x - a.x) * dx + (self.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
        self.dist(&Point2::new(a.x + t * dx, a.y + t * dy))
    }
}

/// Axis-aligned rectangle (plot bounds, sampling regions, locus grids)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Bounds {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self { xmin, xmax, ymin, ymax }
    }

    /// Build from the `[xmin, xmax, ymin, ymax]` array used in config files
    pub fn from_array(b: [f64; 4]) -> Self { Self::new(b[0], b[1], b[2], b[3]) }

    pub fn width(&self) -> f64 { self.xmax - self.xmin }
    pub fn height(&self) -> f64 { self.ymax - self.ymin }

    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    /// Shrink by `margin` on every side. May produce an empty (inverted) rectangle;
    /// callers check `width()`/`height()`.
    pub fn inset(&self, margin: f64) -> Bounds {
        Bounds::new(self.xmin + margin, self.xmax - margin, self.ymin + margin, self.ymax - margin)
    }

    pub fn diagonal(&self) -> f64 { self.width().hypot(self.height()) }

    pub fn center(&self) -> Point2 {
        Point2::new((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }
}

// ── Stations ──────────────────────────────────────────────────────────────────

/// Role of a transmitter in the chain. The master keys the chain; each slave re-emits
/// a fixed delay after it hears the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationRole {
    Master = 0,
    SlaveA = 1,
    SlaveB = 2,
}

impl StationRole {
    /// All roles in chain order
    pub const ALL: [StationRole; 3] = [StationRole::Master, StationRole::SlaveA, StationRole::SlaveB];

    /// The two slaves, each paired with the master for one line of position
    pub const SLAVES: [StationRole; 2] = [StationRole::SlaveA, StationRole::SlaveB];

    /// Human-readable label used in annotations
    pub fn label(&self) -> &'static str {
        match self {
            Self::Master => "Master",
            Self::SlaveA => "Slave A",
            Self::SlaveB => "Slave B",
        }
    }
}

impl std::fmt::Display for StationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub role: StationRole,
    pub position: Point2,
}

/// The three transmitters of one chain. Immutable once built; the engine guarantees
/// the pairwise minimum separation before handing one out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationLayout {
    pub master: Point2,
    pub slave_a: Point2,
    pub slave_b: Point2,
}

impl StationLayout {
    pub fn position(&self, role: StationRole) -> Point2 {
        match role {
            StationRole::Master => self.master,
            StationRole::SlaveA => self.slave_a,
            StationRole::SlaveB => self.slave_b,
        }
    }

    pub fn stations(&self) -> [Station; 3] {
        StationRole::ALL.map(|role| Station { role, position: self.position(role) })
    }

    /// Smallest distance between any two stations
    pub fn min_pairwise_distance(&self) -> f64 {
        let d_ab = self.master.dist(&self.slave_a);
        let d_ac = self.master.dist(&self.slave_b);
        let d_bc = self.slave_a.dist(&self.slave_b);
        d_ab.min(d_ac).min(d_bc)
    }
}

// ── Pulse timing ──────────────────────────────────────────────────────────────

/// Emission / reception schedule of one station's pulse relative to one receiver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseTiming {
    pub role: StationRole,
    /// When this station keys its pulse (0 for the master)
    pub emission_time: f64,
    /// When the master pulse reaches this station (0 for the master itself)
    pub master_reception_time: f64,
    /// When this station's pulse reaches the receiver
    pub arrival_time: f64,
    /// True geometric distance station → receiver
    pub distance_to_receiver: f64,
}

impl PulseTiming {
    /// Propagation-only part of the delay (processing delay stripped)
    pub fn propagation_time(&self) -> f64 { self.arrival_time - self.emission_time }
}

/// Schedule for all three stations, indexed by role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseSchedule {
    pub timings: [PulseTiming; 3],
}

impl PulseSchedule {
    pub fn get(&self, role: StationRole) -> &PulseTiming {
        &self.timings[role as usize]
    }

    /// Time at which the receiver has heard every station
    pub fn completion_time(&self) -> f64 {
        self.timings.iter().map(|t| t.arrival_time).fold(0.0, f64::max)
    }
}

/// TDOA observable between two stations, as seen at the receiver.
/// `time_difference = propagation(first) - propagation(second)`;
/// `range_difference = speed * time_difference = dist(P, first) - dist(P, second)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeDifference {
    pub first: StationRole,
    pub second: StationRole,
    pub time_difference: f64,
    pub range_difference: f64,
}

// ── Snapshots (driver output, one per animation frame) ───────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationPulse {
    pub role: StationRole,
    pub position: Point2,
    /// Radius of the expanding pulse circle (0 before emission)
    pub pulse_radius: f64,
    /// Has the master pulse reached this station yet ("Recv Master")
    pub received_master: bool,
    /// Has this station's pulse reached the receiver yet
    pub detected: bool,
    /// Back-calculated range, present once detected. Drawn both around the receiver
    /// and around the station.
    pub derived_range: Option<f64>,
    /// e.g. "Master Δt: 0.27 ms ∴ 80.62 km away"
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub t: f64,
    pub receiver: Point2,
    pub stations: Vec<StationPulse>,
    /// Master/slave differences, present once both pulses of a pair are detected
    pub time_differences: Vec<TimeDifference>,
}

impl Snapshot {
    pub fn station(&self, role: StationRole) -> Option<&StationPulse> {
        self.stations.iter().find(|s| s.role == role)
    }

    /// Receiver label text: one line per detected station
    pub fn annotation_text(&self) -> String {
        self.stations
            .iter()
            .filter_map(|s| s.annotation.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn all_detected(&self) -> bool { self.stations.iter().all(|s| s.detected) }
}

// ── Hyperbolic lines of position ─────────────────────────────────────────────

/// Locus `dist(X, focus_1) - dist(X, focus_2) = range_difference`, as one or more
/// ordered polylines clipped to the traced region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusCurve {
    pub focus_1: Point2,
    pub focus_2: Point2,
    pub range_difference: f64,
    pub polylines: Vec<Vec<Point2>>,
}

impl LocusCurve {
    pub fn point_count(&self) -> usize { self.polylines.iter().map(Vec::len).sum() }

    pub fn is_empty(&self) -> bool { self.point_count() == 0 }

    /// Minimum distance from `p` to any segment of the curve (infinite when empty)
    pub fn distance_to(&self, p: &Point2) -> f64 {
        self.polylines
            .iter()
            .flat_map(|line| {
                let single = if line.len() == 1 { Some(p.dist(&line[0])) } else { None };
                line.windows(2)
                    .map(|w| p.dist_to_segment(&w[0], &w[1]))
                    .chain(single)
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// Line of position for one master/slave pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairLocus {
    pub first: StationRole,
    pub second: StationRole,
    pub curve: LocusCurve,
}
