//! layout.rs — Constrained random placement of transmitters and the receiver
//!
//! Stations are placed by rejection sampling: draw a uniform candidate inside the
//! bounds, keep it only if it is at least `min_separation` from every point already
//! kept. Tight constraints can make this arbitrarily slow, so every call carries an
//! attempt cap and fails with `LayoutUnsatisfiable` once the cap is spent.
//!
//! The random source is always passed in. Seeded `ChaCha8Rng` gives reproducible runs.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use tracing::{debug, info};

use gee_types::{Bounds, Point2, StationLayout};

use crate::error::{GeeError, Result};

/// Default attempt cap for a three-station chain
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

// ── Validation ────────────────────────────────────────────────────────────────

pub fn validate_bounds(bounds: &Bounds) -> Result<()> {
    let finite = [bounds.xmin, bounds.xmax, bounds.ymin, bounds.ymax]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return Err(GeeError::invalid("bounds must be finite"));
    }
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Err(GeeError::invalid(format!(
            "bounds extents must be positive (width {}, height {})",
            bounds.width(),
            bounds.height()
        )));
    }
    Ok(())
}

fn uniform_over(bounds: &Bounds) -> (Uniform<f64>, Uniform<f64>) {
    (
        Uniform::new_inclusive(bounds.xmin, bounds.xmax),
        Uniform::new_inclusive(bounds.ymin, bounds.ymax),
    )
}

// ── Rejection sampler ────────────────────────────────────────────────────────

/// Draw `count` points inside `bounds`, pairwise at least `min_separation` apart.
///
/// `max_attempts` counts candidate draws (accepted or rejected).
pub fn generate_layout(
    bounds: &Bounds,
    min_separation: f64,
    count: usize,
    max_attempts: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Point2>> {
    validate_bounds(bounds)?;
    if !(min_separation.is_finite() && min_separation > 0.0) {
        return Err(GeeError::invalid(format!(
            "minimum separation must be positive, got {min_separation}"
        )));
    }
    if count == 0 {
        return Err(GeeError::invalid("station count must be at least 1"));
    }

    let (xs, ys) = uniform_over(bounds);
    let mut points: Vec<Point2> = Vec::with_capacity(count);
    let mut attempts = 0usize;

    while points.len() < count {
        if attempts >= max_attempts {
            return Err(GeeError::LayoutUnsatisfiable { count, min_separation, attempts });
        }
        attempts += 1;

        let candidate = Point2::new(xs.sample(rng), ys.sample(rng));
        if points.iter().all(|p| p.dist(&candidate) >= min_separation) {
            debug!("layout: accepted ({:.1}, {:.1}) on attempt {attempts}", candidate.x, candidate.y);
            points.push(candidate);
        }
    }

    info!("📡 Layout accepted: {count} stations, separation ≥ {min_separation} after {attempts} draws");
    Ok(points)
}

/// Random master + two slaves, in that order.
pub fn generate_station_layout(
    bounds: &Bounds,
    min_separation: f64,
    max_attempts: usize,
    rng: &mut impl Rng,
) -> Result<StationLayout> {
    let pts = generate_layout(bounds, min_separation, 3, max_attempts, rng)?;
    station_layout_from_points(&pts, min_separation)
}

/// Build a layout from externally supplied positions, enforcing the same invariant
/// the generator guarantees.
pub fn station_layout_from_points(points: &[Point2], min_separation: f64) -> Result<StationLayout> {
    let [master, slave_a, slave_b] = match points {
        [m, a, b] => [*m, *a, *b],
        _ => {
            return Err(GeeError::invalid(format!(
                "a station layout needs exactly 3 positions, got {}",
                points.len()
            )))
        }
    };
    if !points.iter().all(Point2::is_finite) {
        return Err(GeeError::invalid("station positions must be finite"));
    }

    let layout = StationLayout { master, slave_a, slave_b };
    let closest = layout.min_pairwise_distance();
    if closest < min_separation {
        return Err(GeeError::invalid(format!(
            "stations {closest:.3} apart, minimum separation is {min_separation}"
        )));
    }
    Ok(layout)
}

// ── Receiver (aircraft) draw ─────────────────────────────────────────────────

/// Uniform receiver position inside `bounds` inset by `margin` on every side.
pub fn sample_receiver(bounds: &Bounds, margin: f64, rng: &mut impl Rng) -> Result<Point2> {
    validate_bounds(bounds)?;
    if !(margin.is_finite() && margin >= 0.0) {
        return Err(GeeError::invalid(format!("receiver margin must be ≥ 0, got {margin}")));
    }
    let region = bounds.inset(margin);
    if region.width() <= 0.0 || region.height() <= 0.0 {
        return Err(GeeError::invalid(format!(
            "receiver margin {margin} leaves no room inside the bounds"
        )));
    }

    let (xs, ys) = uniform_over(&region);
    let receiver = Point2::new(xs.sample(rng), ys.sample(rng));
    info!("✈  Receiver at ({:.2}, {:.2})", receiver.x, receiver.y);
    Ok(receiver)
}
