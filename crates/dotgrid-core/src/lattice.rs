//! Rotated dot lattice clipped to a lasso polygon.
//!
//! The lattice is laid out in a frame rotated by `rotation` degrees,
//! anchored so that its square footprint circumscribes the polygon's
//! bounding box around the vertex centroid. Candidates are visited
//! row-major in that frame and accepted when they fall inside the polygon
//! and keep at least `padding` pixels from every edge. Scanning stops as
//! soon as `target_count` dots are accepted, so scan order decides which
//! dots survive a truncated budget and which index each dot gets.

use std::hash::{Hash, Hasher};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{bounds, centroid, distance_point_to_segment, point_in_polygon};
use crate::types::{GridDot, Point, Polygon};

/// Random displacement applied to accepted dots.
///
/// Each axis gets an independent offset drawn uniformly from
/// `[0, magnitude)`. The offset is always added, so jittered dots drift
/// toward `+x`/`+y` on average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    pub enabled: bool,
    pub magnitude: f64,
}

impl Jitter {
    /// Jitter disabled.
    pub const OFF: Self = Self {
        enabled: false,
        magnitude: crate::config::EditorDefaults::DEFAULT_JITTER_MAGNITUDE,
    };

    const fn is_active(self) -> bool {
        self.enabled && self.magnitude > 0.0
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::OFF
    }
}

/// Inputs to [`generate`] other than the polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeParams {
    /// Dot diameter in pixels.
    pub size: f64,
    /// Clear space between neighbouring dots in pixels.
    pub gap: f64,
    /// Minimum distance from every polygon edge. Zero disables the check.
    pub padding: f64,
    /// Lattice rotation in degrees.
    pub rotation: f64,
    /// Maximum number of dots to accept.
    pub target_count: usize,
    pub jitter: Jitter,
}

impl LatticeParams {
    /// Centre-to-centre distance between neighbouring lattice points.
    #[must_use]
    pub fn spacing(&self) -> f64 {
        self.size + self.gap
    }
}

/// Fill `polygon` with lattice dots.
///
/// Returns an empty vector for polygons with fewer than three vertices,
/// a zero target, or a spacing that is not a positive finite number. The
/// scan is bounded by `ceil(2 * max_radius / spacing) * 2` steps on each
/// axis regardless of how many candidates are rejected.
///
/// `rng` is only consulted when jitter is enabled.
#[must_use = "returns the generated dots"]
pub fn generate<R: Rng + ?Sized>(
    polygon: &Polygon,
    params: &LatticeParams,
    rng: &mut R,
) -> Vec<GridDot> {
    let spacing = params.spacing();
    if !polygon.is_region() || params.target_count == 0 || !(spacing.is_finite() && spacing > 0.0)
    {
        return Vec::new();
    }

    let bbox = bounds(polygon);
    let center = centroid(polygon);
    let max_radius = [
        (bbox.min_x - center.x).abs(),
        (bbox.max_x - center.x).abs(),
        (bbox.min_y - center.y).abs(),
        (bbox.max_y - center.y).abs(),
    ]
    .into_iter()
    .fold(0.0_f64, f64::max);

    let (sin, cos) = params.rotation.to_radians().sin_cos();
    let dir_x = Point::new(cos, sin);
    let dir_y = Point::new(-sin, cos);
    let origin = Point::new(
        max_radius.mul_add(-dir_x.x, max_radius.mul_add(-dir_y.x, center.x)),
        max_radius.mul_add(-dir_x.y, max_radius.mul_add(-dir_y.y, center.y)),
    );
    let max_steps = scan_budget(max_radius, spacing);

    let padding = params.padding;
    let mut dots = Vec::with_capacity(params.target_count.min(max_steps.saturating_mul(max_steps)));

    'rows: for row in 0..max_steps {
        for col in 0..max_steps {
            if dots.len() >= params.target_count {
                break 'rows;
            }
            let (c, r) = (step_offset(col, spacing), step_offset(row, spacing));
            let candidate = Point::new(
                r.mul_add(dir_y.x, c.mul_add(dir_x.x, origin.x)),
                r.mul_add(dir_y.y, c.mul_add(dir_x.y, origin.y)),
            );

            if !bbox.contains_with_margin(candidate, padding) {
                continue;
            }
            if !point_in_polygon(candidate, polygon) {
                continue;
            }
            if padding != 0.0
                && polygon
                    .edges()
                    .any(|(a, b)| distance_point_to_segment(candidate, a, b) < padding)
            {
                continue;
            }

            let placed = if params.jitter.is_active() {
                candidate.offset(
                    rng.r#gen::<f64>() * params.jitter.magnitude,
                    rng.r#gen::<f64>() * params.jitter.magnitude,
                )
            } else {
                candidate
            };
            dots.push(GridDot::at(placed));
        }
    }

    log::debug!(
        "lattice: {} of {} dots accepted within {max_steps}x{max_steps} budget",
        dots.len(),
        params.target_count,
    );
    dots
}

#[allow(clippy::cast_precision_loss)]
fn step_offset(index: usize, spacing: f64) -> f64 {
    index as f64 * spacing
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scan_budget(max_radius: f64, spacing: f64) -> usize {
    let per_axis = (2.0 * max_radius / spacing).ceil();
    if per_axis.is_finite() && per_axis > 0.0 {
        (per_axis as usize).saturating_mul(2)
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

/// Single-entry memo of the most recent [`generate`] result, keyed on a
/// SipHash of the polygon and every parameter.
///
/// Jitter is sampled once per distinct key, so a preview does not shimmer
/// when the same parameters are requested repeatedly.
#[derive(Debug, Default, Clone)]
pub struct LatticeCache {
    key: Option<u64>,
    dots: Vec<GridDot>,
}

impl LatticeCache {
    /// Return cached dots for `(polygon, params)`, regenerating on a miss.
    pub fn get_or_generate<R: Rng + ?Sized>(
        &mut self,
        polygon: &Polygon,
        params: &LatticeParams,
        rng: &mut R,
    ) -> &[GridDot] {
        let key = cache_key(polygon, params);
        if self.key != Some(key) {
            self.dots = generate(polygon, params, rng);
            self.key = Some(key);
        }
        &self.dots
    }

    /// Forget the cached result.
    pub fn invalidate(&mut self) {
        self.key = None;
        self.dots.clear();
    }
}

fn cache_key(polygon: &Polygon, params: &LatticeParams) -> u64 {
    let mut hasher = siphasher::sip::SipHasher13::new();
    polygon.len().hash(&mut hasher);
    for p in polygon.points() {
        p.x.to_bits().hash(&mut hasher);
        p.y.to_bits().hash(&mut hasher);
    }
    for v in [
        params.size,
        params.gap,
        params.padding,
        params.rotation,
        params.jitter.magnitude,
    ] {
        v.to_bits().hash(&mut hasher);
    }
    params.target_count.hash(&mut hasher);
    params.jitter.enabled.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::geometry::distance_point_to_segment;

    fn square(side: f64) -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(side, 0.0),
            Point::new(side, side),
            Point::new(0.0, side),
        ])
    }

    fn params(size: f64, gap: f64, padding: f64, rotation: f64, count: usize) -> LatticeParams {
        LatticeParams {
            size,
            gap,
            padding,
            rotation,
            target_count: count,
            jitter: Jitter::OFF,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn square_fills_ten_by_ten() {
        let sq = square(100.0);
        let dots = generate(&sq, &params(5.0, 5.0, 0.0, 0.0, 100), &mut rng());
        assert_eq!(dots.len(), 100);
        for d in &dots {
            assert!(point_in_polygon(d.center(), &sq));
            assert!((0.0..100.0).contains(&d.cx));
            assert!((0.0..100.0).contains(&d.cy));
        }
    }

    #[test]
    fn scan_is_row_major() {
        let dots = generate(&square(100.0), &params(5.0, 5.0, 0.0, 0.0, 12), &mut rng());
        assert_eq!(dots.len(), 12);
        // First row fills left to right before the next row starts.
        for (i, d) in dots.iter().take(10).enumerate() {
            assert!(d.cy.abs() < 1e-9);
            assert!((d.cx - 10.0 * i as f64).abs() < 1e-9);
        }
        assert!((dots[10].cy - 10.0).abs() < 1e-9);
        assert!(dots[10].cx.abs() < 1e-9);
    }

    #[test]
    fn budget_truncates_to_target() {
        let dots = generate(&square(100.0), &params(1.0, 1.0, 0.0, 0.0, 7), &mut rng());
        assert_eq!(dots.len(), 7);
    }

    #[test]
    fn zero_target_is_empty() {
        assert!(generate(&square(100.0), &params(5.0, 5.0, 0.0, 0.0, 0), &mut rng()).is_empty());
    }

    #[test]
    fn degenerate_polygon_is_empty() {
        let two = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(50.0, 50.0)]);
        assert!(generate(&two, &params(5.0, 5.0, 0.0, 0.0, 10), &mut rng()).is_empty());
    }

    #[test]
    fn non_positive_spacing_is_empty() {
        let sq = square(100.0);
        assert!(generate(&sq, &params(0.0, 0.0, 0.0, 0.0, 10), &mut rng()).is_empty());
        assert!(generate(&sq, &params(-5.0, 2.0, 0.0, 0.0, 10), &mut rng()).is_empty());
    }

    #[test]
    fn padding_keeps_clear_of_edges() {
        let tri = Polygon::new(vec![
            Point::new(10.0, 10.0),
            Point::new(190.0, 30.0),
            Point::new(60.0, 170.0),
        ]);
        let dots = generate(&tri, &params(3.0, 4.0, 12.0, 17.0, 10_000), &mut rng());
        assert!(!dots.is_empty());
        for d in &dots {
            assert!(point_in_polygon(d.center(), &tri));
            for (a, b) in tri.edges() {
                assert!(distance_point_to_segment(d.center(), a, b) >= 12.0);
            }
        }
    }

    #[test]
    fn result_never_exceeds_target() {
        let sq = square(40.0);
        for target in [1, 5, 16, 50, 1000] {
            let dots = generate(&sq, &params(4.0, 6.0, 0.0, 30.0, target), &mut rng());
            assert!(dots.len() <= target);
        }
    }

    #[test]
    fn rotation_changes_layout_but_stays_inside() {
        let sq = square(100.0);
        let flat = generate(&sq, &params(5.0, 5.0, 0.0, 0.0, 500), &mut rng());
        let turned = generate(&sq, &params(5.0, 5.0, 0.0, 45.0, 500), &mut rng());
        assert_ne!(flat, turned);
        assert!(turned.iter().all(|d| point_in_polygon(d.center(), &sq)));
    }

    #[test]
    fn jitter_offsets_are_non_negative_and_bounded() {
        let sq = square(100.0);
        let base = generate(&sq, &params(5.0, 5.0, 0.0, 0.0, 50), &mut rng());
        let mut p = params(5.0, 5.0, 0.0, 0.0, 50);
        p.jitter = Jitter {
            enabled: true,
            magnitude: 2.0,
        };
        let jittered = generate(&sq, &p, &mut rng());
        assert_eq!(base.len(), jittered.len());
        for (a, b) in base.iter().zip(&jittered) {
            let (dx, dy) = (b.cx - a.cx, b.cy - a.cy);
            assert!((0.0..2.0).contains(&dx));
            assert!((0.0..2.0).contains(&dy));
        }
    }

    #[test]
    fn jitter_disabled_ignores_magnitude() {
        let sq = square(100.0);
        let mut p = params(5.0, 5.0, 0.0, 0.0, 30);
        p.jitter.magnitude = 50.0;
        let a = generate(&sq, &p, &mut rng());
        let b = generate(&sq, &p, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    // --- LatticeCache tests ---

    #[test]
    fn cache_reuses_jitter_for_same_key() {
        let sq = square(100.0);
        let mut p = params(5.0, 5.0, 0.0, 0.0, 20);
        p.jitter.enabled = true;
        let mut cache = LatticeCache::default();
        let mut r = rng();
        let first = cache.get_or_generate(&sq, &p, &mut r).to_vec();
        let second = cache.get_or_generate(&sq, &p, &mut r).to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn cache_regenerates_on_parameter_change() {
        let sq = square(100.0);
        let mut cache = LatticeCache::default();
        let mut r = rng();
        let a = cache
            .get_or_generate(&sq, &params(5.0, 5.0, 0.0, 0.0, 20), &mut r)
            .len();
        let b = cache
            .get_or_generate(&sq, &params(5.0, 5.0, 0.0, 0.0, 3), &mut r)
            .len();
        assert_eq!((a, b), (20, 3));
        cache.invalidate();
        assert!(cache.key.is_none());
    }
}
