//! Turning curves and stroked paths into straight-edged rings.

use std::f64::consts::PI;

use geo::Polygon;

use crate::geometry::polygon::PolygonSet;
use crate::types::{Contour, PathNode, Point};

/// Fewest segments used for a full circle, however coarse the tolerance.
const MIN_SEGMENTS_PER_CIRCLE: usize = 8;
const MAX_SEGMENTS_PER_CIRCLE: usize = 3600;

/// Number of chords needed so that no chord strays more than `max_error`
/// from an arc of `radius` sweeping `sweep` radians.
pub fn arc_segments(radius: f64, sweep: f64, max_error: f64) -> usize {
    let fraction = sweep.abs() / (2.0 * PI);
    let per_circle = if radius <= max_error {
        MIN_SEGMENTS_PER_CIRCLE
    } else {
        let half_step = (1.0 - max_error / radius).acos();
        ((PI / half_step).ceil() as usize).clamp(MIN_SEGMENTS_PER_CIRCLE, MAX_SEGMENTS_PER_CIRCLE)
    };
    ((per_circle as f64 * fraction).ceil() as usize).max(1)
}

/// Points along an arc, both end points included.
pub fn arc_points(center: Point, radius: f64, start_angle: f64, sweep: f64, max_error: f64) -> Vec<Point> {
    let n = arc_segments(radius, sweep, max_error);
    (0..=n)
        .map(|k| {
            let angle = start_angle + sweep * (k as f64) / (n as f64);
            [center[0] + radius * angle.cos(), center[1] + radius * angle.sin()]
        })
        .collect()
}

pub fn circle(center: Point, radius: f64, max_error: f64) -> Option<Polygon<f64>> {
    if radius <= 0.0 || !radius.is_finite() {
        return None;
    }
    let mut points = arc_points(center, radius, 0.0, 2.0 * PI, max_error);
    points.pop();
    PolygonSet::ring(points)
}

/// Ring with an inner hole; a plain disc when the hole closes up.
pub fn annulus(center: Point, outer: f64, inner: f64, max_error: f64) -> Option<PolygonSet> {
    let mut set = PolygonSet::from(circle(center, outer, max_error)?);
    if let Some(hole) = circle(center, inner, max_error) {
        set.subtract(&PolygonSet::from(hole));
    }
    Some(set)
}

/// Filled outline of a straight stroke with round caps.
pub fn stadium(start: Point, end: Point, width: f64, max_error: f64) -> Option<Polygon<f64>> {
    let radius = width / 2.0;
    if radius <= 0.0 || !radius.is_finite() {
        return None;
    }
    let dx = end[0] - start[0];
    let dy = end[1] - start[1];
    if dx.hypot(dy) < 1e-9 {
        return circle(start, radius, max_error);
    }
    let heading = dy.atan2(dx);
    let mut points = arc_points(end, radius, heading - PI / 2.0, PI, max_error);
    points.extend(arc_points(start, radius, heading + PI / 2.0, PI, max_error));
    PolygonSet::ring(points)
}

/// An arc as center, radius, start angle and signed sweep (radians), or
/// `None` when the three points are collinear.
pub fn arc_through(start: Point, mid: Point, end: Point) -> Option<(Point, f64, f64, f64)> {
    let [ax, ay] = start;
    let [bx, by] = mid;
    let [cx, cy] = end;

    let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
    if d.abs() < 1e-10 {
        return None;
    }

    let ux = ((ax * ax + ay * ay) * (by - cy) + (bx * bx + by * by) * (cy - ay) + (cx * cx + cy * cy) * (ay - by))
        / d;
    let uy = ((ax * ax + ay * ay) * (cx - bx) + (bx * bx + by * by) * (ax - cx) + (cx * cx + cy * cy) * (bx - ax))
        / d;

    let radius = (ax - ux).hypot(ay - uy);
    let a0 = (ay - uy).atan2(ax - ux);
    let am = (by - uy).atan2(bx - ux);
    let a1 = (cy - uy).atan2(cx - ux);

    let ccw = |from: f64, to: f64| (to - from).rem_euclid(2.0 * PI);
    let mut sweep = ccw(a0, a1);
    if ccw(a0, am) > sweep {
        // mid lies on the other side, go clockwise
        sweep -= 2.0 * PI;
    }
    if sweep == 0.0 {
        sweep = 2.0 * PI;
    }
    Some(([ux, uy], radius, a0, sweep))
}

/// Points along a three-point arc; the chord when the points are collinear.
pub fn arc_path(start: Point, mid: Point, end: Point, max_error: f64) -> Vec<Point> {
    match arc_through(start, mid, end) {
        Some((center, radius, a0, sweep)) => {
            let mut points = arc_points(center, radius, a0, sweep, max_error);
            // pin the exact end points
            if let Some(first) = points.first_mut() {
                *first = start;
            }
            if let Some(last) = points.last_mut() {
                *last = end;
            }
            points
        }
        None => vec![start, end],
    }
}

/// Filled outline of an arc stroke: an annular sector plus round caps.
pub fn arc_ribbon(start: Point, mid: Point, end: Point, width: f64, max_error: f64) -> Option<PolygonSet> {
    let Some((center, radius, a0, sweep)) = arc_through(start, mid, end) else {
        return stadium(start, end, width, max_error).map(PolygonSet::from);
    };
    let half = width / 2.0;
    if half <= 0.0 || !half.is_finite() {
        return None;
    }
    let mut ring = arc_points(center, radius + half, a0, sweep, max_error);
    let inner = radius - half;
    if inner > 0.0 {
        let mut back = arc_points(center, inner, a0 + sweep, -sweep, max_error);
        ring.append(&mut back);
    } else {
        ring.push(center);
    }
    let caps = [circle(start, half, max_error), circle(end, half, max_error)];
    Some(PolygonSet::from_polygons(
        std::iter::once(PolygonSet::ring(ring)).chain(caps).flatten(),
    ))
}

/// Flatten an outline that may contain arc nodes into plain points.
pub fn flatten_contour(contour: &Contour, max_error: f64) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::with_capacity(contour.len());
    for node in contour {
        match node {
            PathNode::Point(p) => points.push(*p),
            PathNode::Arc { start, mid, end } => {
                let arc = arc_path(*start, *mid, *end, max_error);
                let skip = usize::from(points.last() == arc.first());
                points.extend(arc.into_iter().skip(skip));
            }
        }
    }
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Points along a cubic Bézier, subdivided so chords stay within `max_error`.
pub fn bezier(points: &[Point; 4], max_error: f64) -> Vec<Point> {
    let [p0, p1, p2, p3] = *points;
    let dd = |a: Point, b: Point, c: Point| (a[0] - 2.0 * b[0] + c[0]).hypot(a[1] - 2.0 * b[1] + c[1]);
    let m = dd(p0, p1, p2).max(dd(p1, p2, p3));
    let n = ((0.75 * m / max_error).sqrt().ceil() as usize).clamp(1, 1000);
    (0..=n)
        .map(|k| {
            let t = k as f64 / n as f64;
            let u = 1.0 - t;
            let (b0, b1, b2, b3) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
            [
                b0 * p0[0] + b1 * p1[0] + b2 * p2[0] + b3 * p3[0],
                b0 * p0[1] + b1 * p1[1] + b2 * p2[1] + b3 * p3[1],
            ]
        })
        .collect()
}

/// Stroke a polyline with round joins and caps.
pub fn stroke(points: &[Point], width: f64, closed: bool, max_error: f64) -> Option<PolygonSet> {
    if width <= 0.0 || !width.is_finite() || points.is_empty() {
        return None;
    }
    let closing = closed.then(|| (points[points.len() - 1], points[0]));
    let pieces = points
        .windows(2)
        .map(|w| (w[0], w[1]))
        .chain(closing)
        .filter_map(|(a, b)| stadium(a, b, width, max_error));
    let set = if points.len() == 1 {
        PolygonSet::from(circle(points[0], width / 2.0, max_error)?)
    } else {
        PolygonSet::from_polygons(pieces)
    };
    (!set.is_empty()).then_some(set)
}
