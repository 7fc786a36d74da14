//! locus.rs — Hyperbolic lines of position
//!
//! A measured range difference `d` between foci F1, F2 puts the receiver on
//!
//!   g(X) = ||X − F1|| − ||X − F2|| − d = 0
//!
//! Two tracing strategies sit behind `LocusStrategy`:
//!   - `GridContour`: sample g over a regular grid, extract the zero iso-line with
//!     marching squares, stitch the cell segments into ordered polylines
//!   - `ClosedForm`: parametrize the hyperbola branch directly in the focal frame
//!
//! `FocalPair::residual` is the direct point test: g evaluated at any point, no grid.

use std::collections::HashMap;

use tracing::debug;

use gee_types::{Bounds, LocusCurve, Point2};

use crate::error::{GeeError, Result};
use crate::layout::validate_bounds;

/// Relative slack allowed when |d| is computed from a point sitting on the focal axis
const BASELINE_SLACK: f64 = 1e-9;

/// Largest grid accepted; the field holds (n + 1)² samples
pub const MAX_GRID_RESOLUTION: usize = 10_000;

// ── Focal pair ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalPair {
    focus_1: Point2,
    focus_2: Point2,
    range_difference: f64,
}

impl FocalPair {
    pub fn new(focus_1: Point2, focus_2: Point2, range_difference: f64) -> Result<Self> {
        if !(focus_1.is_finite() && focus_2.is_finite() && range_difference.is_finite()) {
            return Err(GeeError::invalid("foci and range difference must be finite"));
        }
        let baseline = focus_1.dist(&focus_2);
        if baseline == 0.0 {
            return Err(GeeError::invalid(format!(
                "coincident foci at ({}, {}): hyperbola undefined",
                focus_1.x, focus_1.y
            )));
        }
        if range_difference.abs() > baseline * (1.0 + BASELINE_SLACK) {
            return Err(GeeError::invalid(format!(
                "range difference {range_difference} exceeds focal baseline {baseline}"
            )));
        }
        Ok(Self { focus_1, focus_2, range_difference })
    }

    /// Pair whose locus passes through `point` (d taken from the point itself)
    pub fn through(focus_1: Point2, focus_2: Point2, point: &Point2) -> Result<Self> {
        Self::new(focus_1, focus_2, point.dist(&focus_1) - point.dist(&focus_2))
    }

    pub fn focus_1(&self) -> Point2 { self.focus_1 }
    pub fn focus_2(&self) -> Point2 { self.focus_2 }
    pub fn range_difference(&self) -> f64 { self.range_difference }
    pub fn baseline(&self) -> f64 { self.focus_1.dist(&self.focus_2) }

    /// g(X); zero on the locus
    pub fn residual(&self, x: &Point2) -> f64 {
        x.dist(&self.focus_1) - x.dist(&self.focus_2) - self.range_difference
    }

    fn empty_curve(&self) -> LocusCurve {
        LocusCurve {
            focus_1: self.focus_1,
            focus_2: self.focus_2,
            range_difference: self.range_difference,
            polylines: Vec::new(),
        }
    }
}

// ── Strategy seam ─────────────────────────────────────────────────────────────

pub trait LocusStrategy {
    fn name(&self) -> &'static str;

    /// Trace the locus of `pair` inside `region`. A locus that never enters the
    /// region yields a curve with no polylines.
    fn trace(&self, pair: &FocalPair, region: &Bounds) -> Result<LocusCurve>;
}

// ── Marching squares ──────────────────────────────────────────────────────────

/// Sampled-field strategy. `resolution` is the number of cells per axis.
///
/// A locus passes within one cell diagonal of any point on it, except when |d| equals
/// the focal baseline: the branch then collapses onto the ray beyond the nearer focus,
/// g never turns positive along it and no contour is extracted there. Use `ClosedForm`
/// for receivers on the focal axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridContour {
    resolution: usize,
}

impl GridContour {
    pub fn new(resolution: usize) -> Result<Self> {
        if !(2..=MAX_GRID_RESOLUTION).contains(&resolution) {
            return Err(GeeError::invalid(format!(
                "grid resolution must be 2..={MAX_GRID_RESOLUTION} cells per axis, got {resolution}"
            )));
        }
        Ok(Self { resolution })
    }

    pub fn resolution(&self) -> usize { self.resolution }

    /// Diagonal of one grid cell over `region`: the guaranteed tracing tolerance
    pub fn cell_diagonal(&self, region: &Bounds) -> f64 {
        let n = self.resolution as f64;
        (region.width() / n).hypot(region.height() / n)
    }
}

/// Grid edge carrying a zero crossing. Shared by the two cells on either side, which
/// is what lets cell segments be stitched without comparing coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EdgeKey {
    /// (i, j) → (i + 1, j)
    H(usize, usize),
    /// (i, j) → (i, j + 1)
    V(usize, usize),
}

struct SampledField {
    region: Bounds,
    n: usize,
    values: Vec<f64>,
}

impl SampledField {
    fn sample(pair: &FocalPair, region: &Bounds, n: usize) -> Self {
        let mut values = Vec::with_capacity((n + 1) * (n + 1));
        for j in 0..=n {
            for i in 0..=n {
                values.push(pair.residual(&grid_point(region, n, i, j)));
            }
        }
        Self { region: *region, n, values }
    }

    fn value(&self, i: usize, j: usize) -> f64 { self.values[j * (self.n + 1) + i] }

    fn inside(&self, i: usize, j: usize) -> bool { self.value(i, j) > 0.0 }

    /// Linear interpolation of the zero crossing along an edge
    fn crossing(&self, edge: EdgeKey) -> Point2 {
        let ((i0, j0), (i1, j1)) = match edge {
            EdgeKey::H(i, j) => ((i, j), (i + 1, j)),
            EdgeKey::V(i, j) => ((i, j), (i, j + 1)),
        };
        let (v0, v1) = (self.value(i0, j0), self.value(i1, j1));
        let p0 = grid_point(&self.region, self.n, i0, j0);
        let p1 = grid_point(&self.region, self.n, i1, j1);
        let t = if v0 == v1 { 0.5 } else { v0 / (v0 - v1) };
        Point2::new(p0.x + t * (p1.x - p0.x), p0.y + t * (p1.y - p0.y))
    }

    /// Cell segments as pairs of crossed edges
    fn segments(&self) -> Vec<(EdgeKey, EdgeKey)> {
        let mut segs = Vec::new();
        for j in 0..self.n {
            for i in 0..self.n {
                let case = (self.inside(i, j) as u8)
                    | (self.inside(i + 1, j) as u8) << 1
                    | (self.inside(i + 1, j + 1) as u8) << 2
                    | (self.inside(i, j + 1) as u8) << 3;

                let bottom = EdgeKey::H(i, j);
                let right = EdgeKey::V(i + 1, j);
                let top = EdgeKey::H(i, j + 1);
                let left = EdgeKey::V(i, j);

                let center_inside = || {
                    (self.value(i, j) + self.value(i + 1, j) + self.value(i + 1, j + 1) + self.value(i, j + 1))
                        / 4.0
                        > 0.0
                };

                match case {
                    0 | 15 => {}
                    1 | 14 => segs.push((left, bottom)),
                    2 | 13 => segs.push((bottom, right)),
                    3 | 12 => segs.push((left, right)),
                    4 | 11 => segs.push((right, top)),
                    6 | 9 => segs.push((bottom, top)),
                    7 | 8 => segs.push((left, top)),
                    // Saddles: the center sample decides which diagonal stays connected
                    5 => {
                        if center_inside() {
                            segs.push((bottom, right));
                            segs.push((left, top));
                        } else {
                            segs.push((left, bottom));
                            segs.push((right, top));
                        }
                    }
                    10 => {
                        if center_inside() {
                            segs.push((left, bottom));
                            segs.push((right, top));
                        } else {
                            segs.push((bottom, right));
                            segs.push((left, top));
                        }
                    }
                    _ => unreachable!("marching squares case is 4 bits"),
                }
            }
        }
        segs
    }
}

fn grid_point(region: &Bounds, n: usize, i: usize, j: usize) -> Point2 {
    Point2::new(
        region.xmin + region.width() * i as f64 / n as f64,
        region.ymin + region.height() * j as f64 / n as f64,
    )
}

/// Chain cell segments into polylines. Open chains (ending on the region boundary)
/// are walked from their free ends first; what remains are closed loops.
fn stitch(field: &SampledField, segs: &[(EdgeKey, EdgeKey)]) -> Vec<Vec<Point2>> {
    let mut adjacency: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    for (idx, (a, b)) in segs.iter().enumerate() {
        adjacency.entry(*a).or_default().push(idx);
        adjacency.entry(*b).or_default().push(idx);
    }

    let mut used = vec![false; segs.len()];
    let mut points: HashMap<EdgeKey, Point2> = HashMap::new();
    let mut polylines = Vec::new();

    let free_ends: Vec<EdgeKey> = segs
        .iter()
        .flat_map(|(a, b)| [*a, *b])
        .filter(|e| adjacency.get(e).map_or(false, |v| v.len() == 1))
        .collect();
    let all_starts = segs.iter().map(|(a, _)| *a);

    for start in free_ends.into_iter().chain(all_starts) {
        let mut line = Vec::new();
        let mut cur = start;
        loop {
            let next_seg = adjacency
                .get(&cur)
                .and_then(|v| v.iter().copied().find(|s| !used[*s]));
            let Some(seg) = next_seg else { break };
            if line.is_empty() {
                line.push(*points.entry(cur).or_insert_with(|| field.crossing(cur)));
            }
            used[seg] = true;
            let (a, b) = segs[seg];
            cur = if a == cur { b } else { a };
            line.push(*points.entry(cur).or_insert_with(|| field.crossing(cur)));
        }
        if line.len() >= 2 {
            polylines.push(line);
        }
    }
    polylines
}

impl LocusStrategy for GridContour {
    fn name(&self) -> &'static str { "grid" }

    fn trace(&self, pair: &FocalPair, region: &Bounds) -> Result<LocusCurve> {
        validate_bounds(region)?;
        let field = SampledField::sample(pair, region, self.resolution);
        let segs = field.segments();
        let polylines = stitch(&field, &segs);
        debug!(
            "grid {}²: {} cell segments → {} polylines",
            self.resolution,
            segs.len(),
            polylines.len()
        );
        Ok(LocusCurve { polylines, ..pair.empty_curve() })
    }
}

// ── Closed form ───────────────────────────────────────────────────────────────

/// Direct parametrization of the branch in the focal frame:
/// center C = (F1 + F2)/2, axis e = (F2 − F1)/|F2 − F1|, a = |d|/2, c = |F2 − F1|/2,
/// b² = c² − a². The branch with x·sign(d) > 0 is
///   x = sign(d)·a·√(1 + y²/b²)
/// sampled uniformly in y. |d| = 2c degenerates into the ray beyond the nearer focus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedForm {
    samples: usize,
}

impl ClosedForm {
    pub fn new(samples: usize) -> Result<Self> {
        if samples < 2 {
            return Err(GeeError::invalid(format!(
                "closed-form tracing needs at least 2 samples, got {samples}"
            )));
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> usize { self.samples }
}

/// Split an ordered point sequence into runs that lie inside `region`
fn clip(points: impl IntoIterator<Item = Point2>, region: &Bounds) -> Vec<Vec<Point2>> {
    let mut runs = Vec::new();
    let mut run: Vec<Point2> = Vec::new();
    for p in points {
        if region.contains(&p) {
            run.push(p);
        } else if !run.is_empty() {
            runs.push(std::mem::take(&mut run));
        }
    }
    if !run.is_empty() {
        runs.push(run);
    }
    runs
}

impl LocusStrategy for ClosedForm {
    fn name(&self) -> &'static str { "closed_form" }

    fn trace(&self, pair: &FocalPair, region: &Bounds) -> Result<LocusCurve> {
        validate_bounds(region)?;

        let (f1, f2) = (pair.focus_1, pair.focus_2);
        let center = f1.midpoint(&f2);
        let c = pair.baseline() / 2.0;
        let e = Point2::new((f2.x - f1.x) / (2.0 * c), (f2.y - f1.y) / (2.0 * c));
        let n = Point2::new(-e.y, e.x);
        let a = (pair.range_difference.abs() / 2.0).min(c);
        let b = (c * c - a * a).max(0.0).sqrt();
        let sign = if pair.range_difference < 0.0 { -1.0 } else { 1.0 };

        // Far enough from C to leave the region on both ends
        let reach = center.dist(&region.center()) + region.diagonal() / 2.0;
        let to_world = |x: f64, y: f64| Point2::new(center.x + x * e.x + y * n.x, center.y + x * e.y + y * n.y);
        let steps = (self.samples - 1) as f64;

        let points: Vec<Point2> = if b <= c * BASELINE_SLACK {
            // Ray from the nearer focus pointing away from the other one
            (0..self.samples)
                .map(|k| to_world(sign * (c + reach * k as f64 / steps), 0.0))
                .collect()
        } else {
            (0..self.samples)
                .map(|k| {
                    let y = -reach + 2.0 * reach * k as f64 / steps;
                    to_world(sign * a * (1.0 + (y / b).powi(2)).sqrt(), y)
                })
                .collect()
        };

        let polylines = clip(points, region);
        debug!("closed form: {} samples → {} polylines in region", self.samples, polylines.len());
        Ok(LocusCurve { polylines, ..pair.empty_curve() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::layout::{generate_station_layout, sample_receiver, DEFAULT_MAX_ATTEMPTS};

    fn static_region() -> Bounds {
        Bounds::new(-50.0, 150.0, -50.0, 150.0)
    }

    #[test]
    fn coincident_foci_rejected() {
        let f = Point2::new(10.0, 10.0);
        assert!(matches!(FocalPair::new(f, f, 0.0), Err(GeeError::InvalidConfiguration(_))));
        assert!(matches!(FocalPair::new(f, f, 5.0), Err(GeeError::InvalidConfiguration(_))));
        assert!(matches!(FocalPair::through(f, f, &Point2::new(0.0, 0.0)), Err(GeeError::InvalidConfiguration(_))));
    }

    #[test]
    fn difference_beyond_baseline_rejected() {
        let r = FocalPair::new(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), 120.0);
        assert!(matches!(r, Err(GeeError::InvalidConfiguration(_))));
    }

    #[test]
    fn direct_test_zero_at_receiver() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..1000 {
            let mut pt = || Point2::new(rng.gen_range(-1000.0..1000.0), rng.gen_range(-1000.0..1000.0));
            let (f1, f2, p) = (pt(), pt(), pt());
            let pair = FocalPair::through(f1, f2, &p).unwrap();
            assert!(pair.residual(&p).abs() < 1e-9);
        }
    }

    #[test]
    fn grid_locus_passes_through_receiver() {
        // Master (0,0), Slave A (100,0), Slave B (50,86.6), aircraft (70,40)
        let p = Point2::new(70.0, 40.0);
        let master = Point2::new(0.0, 0.0);
        let grid = GridContour::new(400).unwrap();
        for slave in [Point2::new(100.0, 0.0), Point2::new(50.0, 86.6)] {
            let pair = FocalPair::through(master, slave, &p).unwrap();
            let curve = grid.trace(&pair, &static_region()).unwrap();
            assert!(!curve.is_empty());
            assert!(curve.distance_to(&p) <= grid.cell_diagonal(&static_region()));
        }
    }

    #[test]
    fn grid_locus_tracks_random_layouts() {
        let bounds = Bounds::new(-1000.0, 1000.0, -1000.0, 1000.0);
        let grid = GridContour::new(400).unwrap();
        let tol = grid.cell_diagonal(&bounds);
        let mut checked = 0;
        for seed in 0..40 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let layout = generate_station_layout(&bounds, 150.0, DEFAULT_MAX_ATTEMPTS, &mut rng).unwrap();
            let p = sample_receiver(&bounds, 100.0, &mut rng).unwrap();
            let pair = FocalPair::through(layout.master, layout.slave_a, &p).unwrap();
            // Receiver on the focal axis: the locus is a ray and g never changes sign
            if pair.range_difference().abs() >= (1.0 - 1e-6) * pair.baseline() {
                continue;
            }
            let curve = grid.trace(&pair, &bounds).unwrap();
            assert!(curve.distance_to(&p) <= tol, "seed {seed}: {} > {tol}", curve.distance_to(&p));
            for line in &curve.polylines {
                for q in line {
                    assert!(pair.residual(q).abs() <= 2.0 * tol);
                }
            }
            checked += 1;
        }
        assert!(checked >= 35);
    }

    #[test]
    fn closed_form_points_satisfy_equation() {
        let master = Point2::new(0.0, 0.0);
        let p = Point2::new(70.0, 40.0);
        let cf = ClosedForm::new(2000).unwrap();
        for slave in [Point2::new(100.0, 0.0), Point2::new(50.0, 86.6)] {
            let pair = FocalPair::through(master, slave, &p).unwrap();
            let curve = cf.trace(&pair, &static_region()).unwrap();
            assert!(!curve.is_empty());
            for q in curve.polylines.iter().flatten() {
                assert!(pair.residual(q).abs() < 1e-9, "residual {}", pair.residual(q));
                assert!(static_region().contains(q));
            }
            assert!(curve.distance_to(&p) < 1.0);
        }
    }

    #[test]
    fn zero_difference_is_the_bisector() {
        let pair = FocalPair::new(Point2::new(-10.0, 0.0), Point2::new(10.0, 0.0), 0.0).unwrap();
        let curve = ClosedForm::new(101).unwrap().trace(&pair, &static_region()).unwrap();
        for q in curve.polylines.iter().flatten() {
            assert!(q.x.abs() < 1e-9);
        }
    }

    #[test]
    fn full_baseline_difference_is_a_ray() {
        let f1 = Point2::new(0.0, 0.0);
        let f2 = Point2::new(100.0, 0.0);
        let pair = FocalPair::new(f1, f2, 100.0).unwrap();
        let curve = ClosedForm::new(50).unwrap().trace(&pair, &static_region()).unwrap();
        for q in curve.polylines.iter().flatten() {
            assert!(q.x >= 100.0 - 1e-9 && q.y.abs() < 1e-9);
        }
    }

    #[test]
    fn locus_outside_region_is_empty_not_an_error() {
        let pair = FocalPair::new(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), 50.0).unwrap();
        let far = Bounds::new(-5000.0, -4000.0, 3000.0, 4000.0);
        let grid = GridContour::new(20).unwrap().trace(&pair, &far).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn strategy_parameters_validated() {
        assert!(GridContour::new(1).is_err());
        assert!(GridContour::new(MAX_GRID_RESOLUTION).is_ok());
        assert!(matches!(
            GridContour::new(MAX_GRID_RESOLUTION + 1),
            Err(GeeError::InvalidConfiguration(_))
        ));
        assert!(matches!(GridContour::new(usize::MAX), Err(GeeError::InvalidConfiguration(_))));
        assert!(ClosedForm::new(1).is_err());
        let pair = FocalPair::new(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), 10.0).unwrap();
        let flat = Bounds::new(0.0, 0.0, 0.0, 10.0);
        assert!(GridContour::new(10).unwrap().trace(&pair, &flat).is_err());
    }
}
