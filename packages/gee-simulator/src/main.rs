//! main.rs — GEE chain simulator entry point
//!
//! Builds one simulation run (config.toml + scenario preset + CLI overrides) and
//! hands it to one of two presentation strategies:
//!   1. animate: scene message, then one snapshot frame per step, optionally paced in
//!      wall-clock time
//!   2. static: one report with the final snapshot and both lines of position
//!
//! Output goes to stdout as JSON (and optionally to a UDP display). Logs go to stderr.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::time::interval;
use tracing::info;

use gee_simulator::config::FullConfig;
use gee_simulator::presenter::{AnimatedFeed, FeedMessage, FrameSink, JsonLinesSink, SceneSetup, StaticReport};
use gee_simulator::scenarios::{self, ScenarioType};
use gee_simulator::udp_tx::UdpTransmitter;
use gee_simulator::Simulation;
use gee_types::Point2;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Stream one snapshot per frame
    Animate,
    /// One report at completion time
    Static,
}

#[derive(Parser, Debug)]
#[command(name = "gee-sim", about = "GEE hyperbolic navigation chain simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
    /// Seed for station / aircraft placement (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Scenario preset
    #[arg(long, value_enum, default_value = "random")]
    scenario: ScenarioType,
    /// Fixed aircraft position "x,y" (drawn at random when omitted)
    #[arg(long, value_parser = parse_point)]
    receiver: Option<Point2>,
    /// Presentation strategy
    #[arg(long, value_enum, default_value = "animate")]
    mode: Mode,
    /// Override the configured frame count
    #[arg(long)]
    frames: Option<usize>,
    /// Pace frames at the configured wall-clock interval
    #[arg(long)]
    realtime: bool,
    /// Also send every message to a UDP display at this address
    #[arg(long)]
    udp: Option<String>,
    /// Multicast group for the UDP feed (requires --udp)
    #[arg(long, requires = "udp")]
    multicast: Option<String>,
}

fn parse_point(s: &str) -> Result<Point2, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected \"x,y\", got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {s:?}: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {s:?}: {e}"))?;
    Ok(Point2::new(x, y))
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gee_simulator=info,gee_sim=info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = FullConfig::load(&args.config)?;

    // Seed is always explicit so any run can be replayed
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let scenario = scenarios::preset(args.scenario);
    let base = match args.mode {
        Mode::Animate => cfg.simulation_setup(),
        Mode::Static => cfg.static_simulation_setup(),
    };
    let mut setup = scenario.apply(base);
    if let Some(p) = args.receiver {
        setup.receiver = Some(p);
    }
    info!("🎲 Scenario {:?}, seed {seed}", args.scenario);

    let sim = Simulation::build(&setup, &mut rng).context("building simulation")?;
    let strategy = cfg.locus_strategy()?;
    let region = cfg.locus_region(&setup.bounds);

    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();
    match args.mode {
        Mode::Animate => sinks.push(Box::new(JsonLinesSink::new(std::io::stdout()))),
        Mode::Static => sinks.push(Box::new(JsonLinesSink::pretty(std::io::stdout()))),
    }
    if let Some(addr) = &args.udp {
        let tx = UdpTransmitter::new(addr, args.multicast.as_deref())
            .with_context(|| format!("binding UDP feed for {addr}"))?;
        info!("📡 UDP feed → {addr}");
        sinks.push(Box::new(tx));
    }

    match args.mode {
        Mode::Static => {
            let report = StaticReport::build(&sim, strategy.as_ref(), &region)?;
            broadcast(&mut sinks, &FeedMessage::Report(report))?;
            info!("🗺  Static report written");
        }
        Mode::Animate => {
            let frames = args.frames.unwrap_or(cfg.animation.frames);
            let feed = AnimatedFeed::new(scenario.frame_step(cfg.animation.frame_step), frames)?;
            let scene = SceneSetup::capture(&sim, strategy.as_ref(), &region)?;
            broadcast(&mut sinks, &FeedMessage::Scene(scene))?;
            animate(&sim, &feed, &mut sinks, args.realtime.then_some(cfg.animation.frame_interval_ms)).await?;
        }
    }

    Ok(())
}

fn broadcast(sinks: &mut [Box<dyn FrameSink>], msg: &FeedMessage) -> anyhow::Result<()> {
    for sink in sinks.iter_mut() {
        sink.send(msg)?;
    }
    Ok(())
}

// ── Animated playback ─────────────────────────────────────────────────────────

async fn animate(
    sim: &Simulation,
    feed: &AnimatedFeed,
    sinks: &mut [Box<dyn FrameSink>],
    pacing_ms: Option<u64>,
) -> anyhow::Result<()> {
    let mut ticker = pacing_ms.map(|ms| interval(Duration::from_millis(ms.max(1))));
    info!("⏱ Animating {} frames{}", feed.frame_count(), if ticker.is_some() { " in real time" } else { "" });

    let mut detected_before = 0;
    for frame in feed.frames(sim) {
        if let Some(t) = ticker.as_mut() {
            t.tick().await;
        }
        let frame = frame?;

        let detected = frame.snapshot.stations.iter().filter(|s| s.detected).count();
        if detected != detected_before {
            info!("📶 t={:.2} {}: {}/3 pulses received", frame.snapshot.t, sim.units().time, detected);
            detected_before = detected;
        }
        if frame.index % 20 == 0 {
            info!("⏱ frame {} | t={:.2} {}", frame.index, frame.snapshot.t, sim.units().time);
        }

        broadcast(sinks, &FeedMessage::Frame(frame))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_receiver_points() {
        assert_eq!(parse_point("70,40").unwrap(), Point2::new(70.0, 40.0));
        assert_eq!(parse_point(" -12.5 , 3 ").unwrap(), Point2::new(-12.5, 3.0));
        assert!(parse_point("70").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn cli_accepts_presets() {
        let args = Args::try_parse_from(["gee-sim", "--scenario", "equilateral", "--mode", "static", "--seed", "9"]).unwrap();
        assert_eq!(args.scenario, ScenarioType::Equilateral);
        assert_eq!(args.mode, Mode::Static);
        assert_eq!(args.seed, Some(9));
        assert!(Args::try_parse_from(["gee-sim", "--multicast", "239.255.0.1:6060"]).is_err());
    }
}
