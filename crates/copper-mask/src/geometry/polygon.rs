use geo::{Area, BooleanOps, BoundingRect, LineString, MultiPolygon, Polygon, Rect};
use log::debug;

use crate::types::Point;

/// Filled area made of outer boundaries and holes, in millimetres.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSet {
    inner: MultiPolygon<f64>,
}

impl Default for PolygonSet {
    fn default() -> Self {
        Self {
            inner: MultiPolygon::new(vec![]),
        }
    }
}

/// Whether a loop bounds filled area or cuts a hole out of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    Outer,
    /// `parent` is the index (in [`PolygonSet::loops`]) of the outer loop
    /// this hole belongs to.
    Hole { parent: usize },
}

/// One closed ring. The closing point is implicit and not repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub polygon: usize,
    pub kind: LoopKind,
    pub points: Vec<Point>,
}

impl Loop {
    pub fn is_hole(&self) -> bool {
        matches!(self.kind, LoopKind::Hole { .. })
    }
}

impl PolygonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union a batch of possibly overlapping rings and polygons.
    pub fn from_polygons(polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        let mut set = Self::new();
        for p in polygons {
            if p.exterior().0.len() < 4 {
                continue;
            }
            set.union_with(&Self {
                inner: MultiPolygon::new(vec![p]),
            });
        }
        set
    }

    /// Polygon from an open ring of points; `None` when degenerate.
    pub fn ring(points: Vec<Point>) -> Option<Polygon<f64>> {
        let ring = LineString::from(points);
        (ring.0.len() >= 3).then(|| Polygon::new(ring, vec![]))
    }

    pub fn union_with(&mut self, other: &PolygonSet) {
        if other.is_empty() {
            return;
        }
        self.inner = self.inner.union(&other.inner);
    }

    /// Remove `other`'s area from this set.
    pub fn subtract(&mut self, other: &PolygonSet) {
        if self.is_empty() || other.is_empty() {
            return;
        }
        self.inner = self.inner.difference(&other.inner);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.0.iter().all(|p| p.exterior().0.is_empty())
    }

    pub fn polygon_count(&self) -> usize {
        self.inner.0.len()
    }

    pub fn area(&self) -> f64 {
        self.inner.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.inner.bounding_rect()
    }

    /// All rings, polygon by polygon, each outer loop followed by its holes.
    pub fn loops(&self) -> Vec<Loop> {
        let mut loops = Vec::new();
        for (index, polygon) in self.inner.0.iter().enumerate() {
            let parent = loops.len();
            loops.push(Loop {
                polygon: index,
                kind: LoopKind::Outer,
                points: open_ring(polygon.exterior()),
            });
            for hole in polygon.interiors() {
                loops.push(Loop {
                    polygon: index,
                    kind: LoopKind::Hole { parent },
                    points: open_ring(hole),
                });
            }
        }
        loops
    }

    /// Apply `f` to every coordinate.
    pub fn map_points(&self, f: impl Fn(Point) -> Point + Copy) -> Self {
        use geo::MapCoords;
        Self {
            inner: self.inner.map_coords(|c| {
                let [x, y] = f([c.x, c.y]);
                geo::coord! { x: x, y: y }
            }),
        }
    }
}

impl From<Polygon<f64>> for PolygonSet {
    fn from(polygon: Polygon<f64>) -> Self {
        Self::from_polygons([polygon])
    }
}

fn open_ring(ring: &LineString<f64>) -> Vec<Point> {
    let mut points: Vec<Point> = ring.0.iter().map(|c| [c.x, c.y]).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Running union of every converted item.
#[derive(Debug, Default)]
pub struct Accumulator {
    combined: PolygonSet,
    stats: AccumulatorStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulatorStats {
    pub added: usize,
    pub skipped: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union one item's conversion result. Failed or empty conversions are
    /// counted and dropped; the export carries on.
    pub fn add(&mut self, what: &str, converted: Option<PolygonSet>) -> bool {
        match converted {
            Some(set) if !set.is_empty() => {
                self.combined.union_with(&set);
                self.stats.added += 1;
                true
            }
            _ => {
                debug!("skipping {what}: conversion produced no geometry");
                self.stats.skipped += 1;
                false
            }
        }
    }

    pub fn finish(self) -> (PolygonSet, AccumulatorStats) {
        (self.combined, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        PolygonSet::ring(vec![[x, y], [x + size, y], [x + size, y + size], [x, y + size]]).unwrap()
    }

    #[test]
    fn test_overlapping_squares_merge() {
        let set = PolygonSet::from_polygons([square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)]);
        assert_eq!(set.polygon_count(), 1);
        assert_relative_eq!(set.area(), 7.0, epsilon = 1e-6);
        let loops = set.loops();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].kind, LoopKind::Outer);
    }

    #[test]
    fn test_disjoint_squares_stay_apart() {
        let set = PolygonSet::from_polygons([square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0)]);
        assert_eq!(set.polygon_count(), 2);
        let loops = set.loops();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].polygon, 0);
        assert_eq!(loops[1].polygon, 1);
        assert!(loops.iter().all(|l| l.points.len() == 4));
    }

    #[test]
    fn test_subtract_makes_tagged_hole() {
        let mut set = PolygonSet::from(square(0.0, 0.0, 10.0));
        set.subtract(&PolygonSet::from(square(4.0, 4.0, 2.0)));
        assert_relative_eq!(set.area(), 96.0, epsilon = 1e-6);
        let loops = set.loops();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].kind, LoopKind::Outer);
        assert_eq!(loops[1].kind, LoopKind::Hole { parent: 0 });
        assert_eq!(loops[1].polygon, 0);
    }

    #[test]
    fn test_degenerate_rings_are_ignored() {
        assert!(PolygonSet::ring(vec![[0.0, 0.0], [1.0, 1.0]]).is_none());
        assert!(PolygonSet::new().is_empty());
        assert!(PolygonSet::new().bounding_rect().is_none());
    }

    #[test]
    fn test_accumulator_counts() {
        let mut acc = Accumulator::new();
        assert!(acc.add("a", Some(PolygonSet::from(square(0.0, 0.0, 1.0)))));
        assert!(!acc.add("b", None));
        assert!(!acc.add("c", Some(PolygonSet::new())));
        assert!(acc.add("d", Some(PolygonSet::from(square(0.5, 0.0, 1.0)))));
        let (set, stats) = acc.finish();
        assert_eq!(stats, AccumulatorStats { added: 2, skipped: 2 });
        assert_relative_eq!(set.area(), 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_map_points() {
        let set = PolygonSet::from(square(0.0, 0.0, 1.0)).map_points(|[x, y]| [x + 10.0, y]);
        let rect = set.bounding_rect().unwrap();
        assert_relative_eq!(rect.min().x, 10.0, epsilon = 1e-6);
        assert_relative_eq!(rect.max().x, 11.0, epsilon = 1e-6);
    }
}
