//! presenter.rs — Presentation strategies over one engine
//!
//! Drawing is somebody else's job. This module turns a `Simulation` into the
//! artifacts a plotter consumes and hands them to `FrameSink`s:
//!   - `AnimatedFeed`: a `Scene` message, then one `Frame` per tick (t = k × frame_step)
//!   - `StaticReport`: one-shot scene + the snapshot at completion time
//!
//! Wire shape is JSON with a `type` tag: `scene`, `frame` or `report`.

use std::io::Write;

use serde::Serialize;

use gee_types::{Bounds, PairLocus, Point2, PulseSchedule, Snapshot, StationLayout};

use crate::driver::Simulation;
use crate::error::{GeeError, Result};
use crate::locus::LocusStrategy;
use crate::observations::Units;
use crate::timing::PropagationConstants;

// ── Artifacts ─────────────────────────────────────────────────────────────────

/// Everything that stays fixed for the run
#[derive(Debug, Clone, Serialize)]
pub struct SceneSetup {
    pub layout: StationLayout,
    pub receiver: Point2,
    pub constants: PropagationConstants,
    pub units: Units,
    pub schedule: PulseSchedule,
    pub locus_strategy: String,
    pub locus_region: Bounds,
    pub loci: Vec<PairLocus>,
}

impl SceneSetup {
    pub fn capture(sim: &Simulation, strategy: &dyn LocusStrategy, region: &Bounds) -> Result<Self> {
        Ok(Self {
            layout: *sim.layout(),
            receiver: sim.receiver(),
            constants: *sim.constants(),
            units: sim.units().clone(),
            schedule: *sim.schedule(),
            locus_strategy: strategy.name().to_string(),
            locus_region: *region,
            loci: sim.loci(strategy, region)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub index: usize,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaticReport {
    pub scene: SceneSetup,
    /// All pulses received
    pub snapshot: Snapshot,
}

impl StaticReport {
    pub fn build(sim: &Simulation, strategy: &dyn LocusStrategy, region: &Bounds) -> Result<Self> {
        Ok(Self {
            scene: SceneSetup::capture(sim, strategy, region)?,
            snapshot: sim.step(sim.completion_time())?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Scene(SceneSetup),
    Frame(Frame),
    Report(StaticReport),
}

// ── Animated stepping ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedFeed {
    frame_step: f64,
    frames: usize,
}

impl AnimatedFeed {
    pub fn new(frame_step: f64, frames: usize) -> Result<Self> {
        if !(frame_step.is_finite() && frame_step > 0.0) {
            return Err(GeeError::invalid(format!("frame step must be positive, got {frame_step}")));
        }
        Ok(Self { frame_step, frames })
    }

    pub fn frame_count(&self) -> usize { self.frames }

    pub fn frame_time(&self, index: usize) -> f64 { index as f64 * self.frame_step }

    /// Frames in increasing time order
    pub fn frames<'a>(&self, sim: &'a Simulation) -> impl Iterator<Item = Result<Frame>> + 'a {
        let feed = *self;
        (0..feed.frames).map(move |index| -> Result<Frame> {
            Ok(Frame { index, snapshot: sim.step(feed.frame_time(index))? })
        })
    }
}

// ── Sinks ─────────────────────────────────────────────────────────────────────

pub trait FrameSink {
    fn send(&mut self, msg: &FeedMessage) -> anyhow::Result<()>;
}

/// One JSON document per message (pretty-printed for one-shot reports)
pub struct JsonLinesSink<W: Write> {
    out: W,
    pretty: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self { Self { out, pretty: false } }
    pub fn pretty(out: W) -> Self { Self { out, pretty: true } }
    pub fn into_inner(self) -> W { self.out }
}

impl<W: Write> FrameSink for JsonLinesSink<W> {
    fn send(&mut self, msg: &FeedMessage) -> anyhow::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.out, msg)?;
        } else {
            serde_json::to_writer(&mut self.out, msg)?;
        }
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gee_types::StationRole;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::locus::GridContour;
    use crate::scenarios::preset_baseline;
    use crate::driver::SimulationSetup;

    fn baseline_sim() -> Simulation {
        let setup = preset_baseline().apply(SimulationSetup {
            bounds: Bounds::new(-1000.0, 1000.0, -1000.0, 1000.0),
            min_separation: 150.0,
            max_attempts: 10_000,
            receiver_margin: 100.0,
            speed: 300.0,
            slave_delay: 0.1,
            units: Units::default(),
            stations: None,
            receiver: Some(Point2::new(400.0, 250.0)),
        });
        Simulation::build(&setup, &mut ChaCha8Rng::seed_from_u64(4)).unwrap()
    }

    #[test]
    fn frames_follow_the_step_plan() {
        let sim = baseline_sim();
        let feed = AnimatedFeed::new(0.1, 150).unwrap();
        let frames: Vec<Frame> = feed.frames(&sim).collect::<Result<_>>().unwrap();
        assert_eq!(frames.len(), 150);
        assert_eq!(frames[0].snapshot.t, 0.0);
        assert!((frames[149].snapshot.t - 14.9).abs() < 1e-9);
        // 15 ms covers the whole schedule for a receiver a few hundred km out
        assert!(frames[149].snapshot.all_detected());
    }

    #[test]
    fn zero_frame_step_rejected() {
        assert!(AnimatedFeed::new(0.0, 10).is_err());
        assert!(AnimatedFeed::new(-0.1, 10).is_err());
    }

    #[test]
    fn static_report_is_complete() {
        let sim = baseline_sim();
        let region = Bounds::new(-1000.0, 1000.0, -1000.0, 1000.0);
        let report = StaticReport::build(&sim, &GridContour::new(200).unwrap(), &region).unwrap();
        assert!(report.snapshot.all_detected());
        assert_eq!(report.scene.loci.len(), 2);
        assert_eq!(report.scene.loci[0].second, StationRole::SlaveA);
        assert_eq!(report.scene.locus_strategy, "grid");
    }

    #[test]
    fn json_lines_are_tagged() {
        let sim = baseline_sim();
        let mut sink = JsonLinesSink::new(Vec::new());
        let frame = AnimatedFeed::new(1.0, 3).unwrap().frames(&sim).nth(2).unwrap().unwrap();
        sink.send(&FeedMessage::Frame(frame)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text.lines().count(), 1);
        let v: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["type"], "frame");
        assert_eq!(v["index"], 2);
        assert_eq!(v["snapshot"]["stations"][0]["role"], "MASTER");
    }
}
