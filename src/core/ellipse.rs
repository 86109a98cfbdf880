//! core/ellipse.rs — Confidence ellipse of one sample and view clipping.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::core::stats::DistributionSample;

/// Each semi-axis covers this many standard deviations.
pub const SIGMA_SCALE: f64 = 2.0;

/// Fixed view rectangle in phenotype space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl AxisBounds {
    pub fn symmetric(half: f64) -> Self {
        Self {
            x: (-half, half),
            y: (-half, half),
        }
    }

    pub fn is_valid(&self) -> bool {
        let ok = |(lo, hi): (f64, f64)| lo.is_finite() && hi.is_finite() && lo < hi;
        ok(self.x) && ok(self.y)
    }

    pub fn contains(&self, (px, py): (f64, f64)) -> bool {
        px >= self.x.0 && px <= self.x.1 && py >= self.y.0 && py <= self.y.1
    }
}

impl Default for AxisBounds {
    fn default() -> Self {
        Self::symmetric(4.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfidenceEllipse {
    pub center: (f64, f64),
    pub semi_axes: (f64, f64),
    /// Rotation of the first semi-axis, degrees counter-clockwise.
    pub angle_deg: f64,
}

impl ConfidenceEllipse {
    pub fn from_sample(sample: &DistributionSample) -> Self {
        Self {
            center: (sample.mean[0], sample.mean[1]),
            semi_axes: (SIGMA_SCALE * sample.spread[0], SIGMA_SCALE * sample.spread[1]),
            angle_deg: sample.theta.to_degrees(),
        }
    }

    /// Closed outline with `segments` vertices (the last edge wraps to the first).
    pub fn outline(&self, segments: usize) -> Vec<(f64, f64)> {
        let n = segments.max(3);
        let (sin_a, cos_a) = self.angle_deg.to_radians().sin_cos();
        let (a, b) = self.semi_axes;
        (0..n)
            .map(|k| {
                let t = 2.0 * PI * k as f64 / n as f64;
                let (ex, ey) = (a * t.cos(), b * t.sin());
                (
                    self.center.0 + ex * cos_a - ey * sin_a,
                    self.center.1 + ex * sin_a + ey * cos_a,
                )
            })
            .collect()
    }

    /// Like [`outline`](Self::outline), but `None` when the semi-axes or any
    /// vertex overflow to a non-finite value. A finite spread near `f64::MAX`
    /// doubles to infinity, and the outline then holds NaN vertices.
    pub fn finite_outline(&self, segments: usize) -> Option<Vec<(f64, f64)>> {
        let (a, b) = self.semi_axes;
        if !(a.is_finite() && b.is_finite()) {
            return None;
        }
        let outline = self.outline(segments);
        outline
            .iter()
            .all(|&(x, y)| x.is_finite() && y.is_finite())
            .then_some(outline)
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Edge {
    fn inside(self, (px, py): (f64, f64)) -> bool {
        match self {
            Edge::Left(v) => px >= v,
            Edge::Right(v) => px <= v,
            Edge::Bottom(v) => py >= v,
            Edge::Top(v) => py <= v,
        }
    }

    fn intersect(self, (ax, ay): (f64, f64), (bx, by): (f64, f64)) -> (f64, f64) {
        match self {
            Edge::Left(v) | Edge::Right(v) => {
                let t = (v - ax) / (bx - ax);
                (v, ay + t * (by - ay))
            }
            Edge::Bottom(v) | Edge::Top(v) => {
                let t = (v - ay) / (by - ay);
                (ax + t * (bx - ax), v)
            }
        }
    }
}

/// Sutherland–Hodgman clip of a closed polygon against `bounds`.
/// Returns an empty vec when the polygon lies fully outside.
pub fn clip_polygon(points: &[(f64, f64)], bounds: &AxisBounds) -> Vec<(f64, f64)> {
    let edges = [
        Edge::Left(bounds.x.0),
        Edge::Right(bounds.x.1),
        Edge::Bottom(bounds.y.0),
        Edge::Top(bounds.y.1),
    ];
    let mut output = points.to_vec();
    for edge in edges {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for &cur in &input {
            match (edge.inside(prev), edge.inside(cur)) {
                (true, true) => output.push(cur),
                (true, false) => output.push(edge.intersect(prev, cur)),
                (false, true) => {
                    output.push(edge.intersect(prev, cur));
                    output.push(cur);
                }
                (false, false) => {}
            }
            prev = cur;
        }
    }
    output
}

/// Liang–Barsky clip of segment `a`-`b`; `None` when nothing is visible.
pub fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    bounds: &AxisBounds,
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let checks = [
        (-dx, a.0 - bounds.x.0),
        (dx, bounds.x.1 - a.0),
        (-dy, a.1 - bounds.y.0),
        (dy, bounds.y.1 - a.1),
    ];
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Splits a polyline into visible runs, clipping each segment to `bounds`.
pub fn clip_polyline(points: &[(f64, f64)], bounds: &AxisBounds) -> Vec<Vec<(f64, f64)>> {
    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for pair in points.windows(2) {
        match clip_segment(pair[0], pair[1], bounds) {
            Some((start, end)) => {
                let continues = current.last().is_some_and(|&last| last == start);
                if !continues {
                    if current.len() > 1 {
                        runs.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(start);
                }
                current.push(end);
            }
            None => {
                if current.len() > 1 {
                    runs.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(spread: [f64; 2], theta: f64) -> DistributionSample {
        DistributionSample {
            step: 0,
            time: 0.0,
            mean: [1.0, -1.0],
            spread,
            theta,
        }
    }

    #[test]
    fn semi_axes_are_twice_the_spread() {
        let e = ConfidenceEllipse::from_sample(&sample([0.3, 0.4], PI / 2.0));
        assert_eq!(e.center, (1.0, -1.0));
        assert_eq!(e.semi_axes, (0.6, 0.8));
        assert!((e.angle_deg - 90.0).abs() < 1e-12);
    }

    #[test]
    fn outline_points_lie_on_rotated_ellipse() {
        let e = ConfidenceEllipse::from_sample(&sample([1.0, 0.5], 0.7));
        let (sin_a, cos_a) = 0.7f64.sin_cos();
        for (x, y) in e.outline(64) {
            let (dx, dy) = (x - 1.0, y + 1.0);
            let u = dx * cos_a + dy * sin_a;
            let v = -dx * sin_a + dy * cos_a;
            let r = (u / 2.0).powi(2) + (v / 1.0).powi(2);
            assert!((r - 1.0).abs() < 1e-9, "r={r}");
        }
    }

    #[test]
    fn first_outline_vertex_follows_rotation() {
        let e = ConfidenceEllipse::from_sample(&sample([1.0, 0.25], PI / 2.0));
        let (x, y) = e.outline(16)[0];
        assert!((x - 1.0).abs() < 1e-9);
        assert!((y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn overflowing_spread_has_no_outline() {
        let huge = ConfidenceEllipse::from_sample(&sample([1e308, 1.0], 0.0));
        assert!(huge.semi_axes.0.is_infinite());
        assert!(huge.finite_outline(32).is_none());

        // Finite axes whose rotated vertices still overflow.
        let edge = ConfidenceEllipse {
            center: (f64::MAX, 0.0),
            semi_axes: (f64::MAX / 2.0, 1.0),
            angle_deg: 0.0,
        };
        assert!(edge.finite_outline(32).is_none());

        let ok = ConfidenceEllipse::from_sample(&sample([0.5, 0.25], 0.3));
        assert_eq!(ok.finite_outline(32), Some(ok.outline(32)));
    }

    #[test]
    fn polygon_inside_bounds_is_unchanged() {
        let square = vec![(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        assert_eq!(clip_polygon(&square, &AxisBounds::default()), square);
    }

    #[test]
    fn polygon_is_cut_at_bounds() {
        let square = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let clipped = clip_polygon(&square, &AxisBounds::default());
        assert!(!clipped.is_empty());
        let bounds = AxisBounds::default();
        assert!(clipped.iter().all(|&p| bounds.contains(p)));
        assert!(clipped.contains(&(4.0, 4.0)));
    }

    #[test]
    fn polygon_outside_bounds_vanishes() {
        let far = vec![(10.0, 10.0), (11.0, 10.0), (11.0, 11.0)];
        assert!(clip_polygon(&far, &AxisBounds::default()).is_empty());
    }

    #[test]
    fn segment_clipping() {
        let b = AxisBounds::default();
        assert_eq!(
            clip_segment((-10.0, 0.0), (10.0, 0.0), &b),
            Some(((-4.0, 0.0), (4.0, 0.0)))
        );
        assert_eq!(clip_segment((5.0, 5.0), (6.0, 6.0), &b), None);
        assert_eq!(
            clip_segment((0.0, 0.0), (1.0, 1.0), &b),
            Some(((0.0, 0.0), (1.0, 1.0)))
        );
    }

    #[test]
    fn polyline_leaving_and_reentering_splits_into_runs() {
        let path = vec![(0.0, 0.0), (2.0, 0.0), (6.0, 0.0), (6.0, 1.0), (2.0, 1.0), (1.0, 1.0)];
        let runs = clip_polyline(&path, &AxisBounds::default());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], vec![(0.0, 0.0), (2.0, 0.0), (4.0, 0.0)]);
        assert_eq!(runs[1], vec![(4.0, 1.0), (2.0, 1.0), (1.0, 1.0)]);
    }
}
