use std::f64::consts::PI;

use geo::Polygon;
use log::debug;

use crate::geometry::flatten::{self, arc_ribbon, circle, flatten_contour, stadium, stroke};
use crate::geometry::polygon::PolygonSet;
use crate::types::*;

/// Converts board items into the filled area they cover.
///
/// Implementations must return the true footprint of the item (stroke widths
/// expanded, pads at their final placement), flattened so that no edge strays
/// more than `max_error` millimetres from the exact outline. `None` means the
/// item could not be converted and should be skipped.
pub trait ShapeConverter {
    fn shape_to_polygon(&self, item: &Primitive, max_error: f64) -> Option<PolygonSet>;

    /// The solid fill a zone holds on `layer`, or `None` when there is none.
    fn solid_fill_to_polygon(&self, _zone: &Zone, _layer: &str, _max_error: f64) -> Option<PolygonSet> {
        None
    }
}

/// Zone conversion: the solid fill stored for `layer`. A zone that was never
/// filled carries no copper; its outline ignores clearances and is not used.
pub fn zone_to_polygon(
    converter: &dyn ShapeConverter,
    zone: &Zone,
    layer: &str,
    max_error: f64,
) -> Option<PolygonSet> {
    if zone.keepout {
        return None;
    }
    let fill = converter.solid_fill_to_polygon(zone, layer, max_error);
    if fill.is_none() {
        debug!("zone has no fill on {layer}; refill zones before exporting");
    }
    fill
}

/// Native converter flattening every curve to `max_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatteningConverter;

impl ShapeConverter for FlatteningConverter {
    fn shape_to_polygon(&self, item: &Primitive, max_error: f64) -> Option<PolygonSet> {
        if max_error <= 0.0 || !max_error.is_finite() {
            return None;
        }
        let set = match item {
            Primitive::Track(t) => PolygonSet::from(stadium(t.start, t.end, t.width, max_error)?),
            Primitive::ArcTrack(a) => arc_ribbon(a.start, a.mid, a.end, a.width, max_error)?,
            Primitive::Via(v) => PolygonSet::from(circle(v.at, v.size / 2.0, max_error)?),
            Primitive::Shape(s) => shape_area(s, max_error)?,
            Primitive::Pad(p) => pad_area(p, max_error)?,
            // zones only have copper per layer, see `solid_fill_to_polygon`
            Primitive::Zone(_) => return None,
        };
        (!set.is_empty()).then_some(set)
    }

    fn solid_fill_to_polygon(&self, zone: &Zone, layer: &str, max_error: f64) -> Option<PolygonSet> {
        // KiCad 5 fills carry no layer and belong to the zone's single layer.
        let own_layer = zone.layers.first().map(String::as_str);
        let rings = zone
            .fills
            .iter()
            .filter(|f| f.layer.as_deref().or(own_layer) == Some(layer))
            .filter_map(|f| PolygonSet::ring(flatten_contour(&f.contour, max_error)));
        let set = PolygonSet::from_polygons(rings);
        (!set.is_empty()).then_some(set)
    }
}

// ─── Graphic shapes ──────────────────────────────────────────────────

fn shape_area(shape: &Shape, max_error: f64) -> Option<PolygonSet> {
    let w = shape.stroke_width;
    match &shape.geometry {
        ShapeGeometry::Segment { start, end } => stadium(*start, *end, w, max_error).map(PolygonSet::from),
        ShapeGeometry::Rect { start, end } => {
            let corners = vec![*start, [end[0], start[1]], *end, [start[0], end[1]]];
            closed_area(corners, w, shape.filled, max_error)
        }
        ShapeGeometry::Circle { center, radius } => {
            if shape.filled {
                circle(*center, radius + w / 2.0, max_error).map(PolygonSet::from)
            } else if w > 0.0 {
                flatten::annulus(*center, radius + w / 2.0, radius - w / 2.0, max_error)
            } else {
                None
            }
        }
        ShapeGeometry::Arc { start, mid, end } => arc_ribbon(*start, *mid, *end, w, max_error),
        ShapeGeometry::Polygon { contour } => {
            closed_area(flatten_contour(contour, max_error), w, shape.filled, max_error)
        }
        ShapeGeometry::Curve { points } => stroke(&flatten::bezier(points, max_error), w, false, max_error),
    }
}

/// A closed outline, filled and/or stroked.
fn closed_area(points: Vec<Point>, width: f64, filled: bool, max_error: f64) -> Option<PolygonSet> {
    let outline = stroke(&points, width, true, max_error);
    if !filled {
        return outline;
    }
    let mut set = PolygonSet::from(PolygonSet::ring(points)?);
    if let Some(outline) = outline {
        set.union_with(&outline);
    }
    Some(set)
}

// ─── Pads ────────────────────────────────────────────────────────────

fn pad_area(pad: &Pad, max_error: f64) -> Option<PolygonSet> {
    let [w, h] = pad.size;
    let local = match &pad.shape {
        PadShape::Circle => PolygonSet::from(circle([0.0, 0.0], w / 2.0, max_error)?),
        PadShape::Rect => PolygonSet::from(rounded_rect(pad.size, 0.0, 0.0, Chamfer::default(), max_error)?),
        PadShape::Oval => {
            let (a, b, width) = if w >= h {
                ([-(w - h) / 2.0, 0.0], [(w - h) / 2.0, 0.0], h)
            } else {
                ([0.0, -(h - w) / 2.0], [0.0, (h - w) / 2.0], w)
            };
            PolygonSet::from(stadium(a, b, width, max_error)?)
        }
        PadShape::RoundRect { radius } => {
            PolygonSet::from(rounded_rect(pad.size, *radius, 0.0, Chamfer::default(), max_error)?)
        }
        PadShape::ChamferedRect {
            radius,
            chamfer,
            corners,
        } => PolygonSet::from(rounded_rect(pad.size, *radius, *chamfer, *corners, max_error)?),
        PadShape::Trapezoid { delta } => PolygonSet::from(trapezoid(pad.size, *delta)?),
        PadShape::Custom { anchor, primitives } => {
            let anchor = match anchor {
                PadAnchor::Circle => circle([0.0, 0.0], w / 2.0, max_error),
                PadAnchor::Rect => rounded_rect(pad.size, 0.0, 0.0, Chamfer::default(), max_error),
            };
            let mut set = anchor.map(PolygonSet::from).unwrap_or_default();
            for prim in primitives {
                if let Some(area) = shape_area(prim, max_error) {
                    set.union_with(&area);
                }
            }
            set
        }
    };

    // The drill offset moves the copper away from the pad anchor, in the
    // pad's own frame.
    let offset = pad.offset;
    let angle_rad = -pad.angle * PI / 180.0;
    let (sin_a, cos_a) = angle_rad.sin_cos();
    let [tx, ty] = pad.position;
    let placed = local.map_points(|[x, y]| {
        let (lx, ly) = (x + offset[0], y + offset[1]);
        [lx * cos_a - ly * sin_a + tx, lx * sin_a + ly * cos_a + ty]
    });
    (!placed.is_empty()).then_some(placed)
}

/// Rectangle centered on the origin with optional corner rounding and
/// chamfers. Chamfered corners are not rounded.
fn rounded_rect(size: [f64; 2], radius: f64, chamfer: f64, corners: Chamfer, max_error: f64) -> Option<Polygon<f64>> {
    let (hw, hh) = (size[0] / 2.0, size[1] / 2.0);
    if hw <= 0.0 || hh <= 0.0 {
        return None;
    }
    let radius = radius.clamp(0.0, hw.min(hh));
    let chamfer = chamfer.clamp(0.0, hw.min(hh));

    // Walk the corners clockwise on screen (Y down): top-left, top-right,
    // bottom-right, bottom-left. `arrive` points back along the incoming
    // edge, `depart` along the outgoing one.
    let table: [(Point, Point, Point, bool); 4] = [
        ([-hw, -hh], [0.0, 1.0], [1.0, 0.0], corners.top_left),
        ([hw, -hh], [-1.0, 0.0], [0.0, 1.0], corners.top_right),
        ([hw, hh], [0.0, -1.0], [-1.0, 0.0], corners.bottom_right),
        ([-hw, hh], [1.0, 0.0], [0.0, -1.0], corners.bottom_left),
    ];

    let mut points = Vec::new();
    for (corner, arrive, depart, chamfered) in table {
        let along = |d: Point, len: f64| [corner[0] + d[0] * len, corner[1] + d[1] * len];
        if chamfered && chamfer > 0.0 {
            points.push(along(arrive, chamfer));
            points.push(along(depart, chamfer));
        } else if radius > 0.0 {
            let center = [
                corner[0] + (arrive[0] + depart[0]) * radius,
                corner[1] + (arrive[1] + depart[1]) * radius,
            ];
            let from = (-depart[1]).atan2(-depart[0]);
            let to = (-arrive[1]).atan2(-arrive[0]);
            let sweep = (to - from + PI).rem_euclid(2.0 * PI) - PI;
            points.extend(flatten::arc_points(center, radius, from, sweep, max_error));
        } else {
            points.push(corner);
        }
    }
    points.dedup();
    PolygonSet::ring(points)
}

/// KiCad trapezoid: `delta.x` grows the left side and shrinks the right,
/// `delta.y` grows the bottom edge and shrinks the top.
fn trapezoid(size: [f64; 2], delta: [f64; 2]) -> Option<Polygon<f64>> {
    let (hw, hh) = (size[0] / 2.0, size[1] / 2.0);
    let (dx, dy) = (delta[0] / 2.0, delta[1] / 2.0);
    PolygonSet::ring(vec![
        [-hw - dy, hh + dx],
        [hw + dy, hh - dx],
        [hw - dy, -hh + dx],
        [-hw + dy, -hh - dx],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOL: f64 = 0.001;

    fn pad(shape: PadShape, size: [f64; 2], angle: f64) -> Primitive {
        Primitive::Pad(Pad {
            name: "1".to_string(),
            position: [10.0, 20.0],
            angle,
            size,
            offset: [0.0, 0.0],
            shape,
            layers: vec!["F.Cu".to_string()],
        })
    }

    fn convert(item: &Primitive) -> PolygonSet {
        FlatteningConverter.shape_to_polygon(item, TOL).unwrap()
    }

    #[test]
    fn test_track_is_a_ribbon() {
        let track = Primitive::Track(TrackSegment {
            start: [0.0, 0.0],
            end: [5.0, 0.0],
            width: 0.4,
            layer: "F.Cu".to_string(),
        });
        let set = convert(&track);
        let loops = set.loops();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].points.len() >= 4);
        assert_relative_eq!(set.area(), 0.4 * 5.0 + PI * 0.04, epsilon = 0.005);
    }

    #[test]
    fn test_via_is_a_disc() {
        let via = Primitive::Via(Via {
            at: [1.0, 1.0],
            size: 0.8,
            span: None,
        });
        assert_relative_eq!(convert(&via).area(), PI * 0.16, epsilon = 0.005);
    }

    #[test]
    fn test_rect_pad_rotation() {
        let set = convert(&pad(PadShape::Rect, [2.0, 1.0], 90.0));
        assert_relative_eq!(set.area(), 2.0, epsilon = 1e-6);
        let rect = set.bounding_rect().unwrap();
        assert_relative_eq!(rect.width(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(rect.height(), 2.0, epsilon = 1e-6);
        assert_relative_eq!(rect.center().x, 10.0, epsilon = 1e-6);
        assert_relative_eq!(rect.center().y, 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_roundrect_pad_area() {
        let r = 0.25;
        let set = convert(&pad(PadShape::RoundRect { radius: r }, [2.0, 1.0], 0.0));
        let exact = 2.0 - (4.0 - PI) * r * r;
        assert_relative_eq!(set.area(), exact, epsilon = 0.005);
    }

    #[test]
    fn test_chamfered_pad_area() {
        let corners = Chamfer {
            top_left: true,
            bottom_right: true,
            ..Chamfer::default()
        };
        let set = convert(&pad(
            PadShape::ChamferedRect {
                radius: 0.0,
                chamfer: 0.2,
                corners,
            },
            [2.0, 1.0],
            0.0,
        ));
        assert_relative_eq!(set.area(), 2.0 - 0.04, epsilon = 1e-6);
    }

    #[test]
    fn test_oval_and_circle_pads() {
        let oval = convert(&pad(PadShape::Oval, [1.0, 3.0], 0.0));
        assert_relative_eq!(oval.area(), 2.0 + PI * 0.25, epsilon = 0.005);
        let rect = oval.bounding_rect().unwrap();
        assert_relative_eq!(rect.height(), 3.0, epsilon = 2.0 * TOL);

        let round = convert(&pad(PadShape::Circle, [1.5, 1.5], 0.0));
        assert_relative_eq!(round.area(), PI * 0.5625, epsilon = 0.005);
    }

    #[test]
    fn test_trapezoid_pad_area() {
        let set = convert(&pad(PadShape::Trapezoid { delta: [0.4, 0.0] }, [2.0, 1.0], 0.0));
        // parallel sides 1.4 and 0.6 high, 2.0 apart
        assert_relative_eq!(set.area(), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_custom_pad_unions_primitives() {
        let triangle = Shape {
            geometry: ShapeGeometry::Polygon {
                contour: vec![
                    PathNode::Point([0.0, 0.0]),
                    PathNode::Point([3.0, 0.0]),
                    PathNode::Point([0.0, 3.0]),
                ],
            },
            stroke_width: 0.0,
            filled: true,
            layer: String::new(),
        };
        let set = convert(&pad(
            PadShape::Custom {
                anchor: PadAnchor::Rect,
                primitives: vec![triangle],
            },
            [1.0, 1.0],
            0.0,
        ));
        // triangle 4.5 plus the anchor quadrant it does not cover
        assert_relative_eq!(set.area(), 4.5 + 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_unfilled_circle_has_hole() {
        let ring = Primitive::Shape(Shape {
            geometry: ShapeGeometry::Circle {
                center: [0.0, 0.0],
                radius: 2.0,
            },
            stroke_width: 0.2,
            filled: false,
            layer: "F.Cu".to_string(),
        });
        let loops = convert(&ring).loops();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[1].kind, crate::geometry::LoopKind::Hole { parent: 0 });
    }

    #[test]
    fn test_zero_width_line_is_skipped() {
        let line = Primitive::Shape(Shape {
            geometry: ShapeGeometry::Segment {
                start: [0.0, 0.0],
                end: [1.0, 0.0],
            },
            stroke_width: 0.0,
            filled: false,
            layer: "F.Cu".to_string(),
        });
        assert!(FlatteningConverter.shape_to_polygon(&line, TOL).is_none());
    }

    #[test]
    fn test_zone_uses_stored_fill_only() {
        let square = |s: f64| {
            vec![
                PathNode::Point([0.0, 0.0]),
                PathNode::Point([s, 0.0]),
                PathNode::Point([s, s]),
                PathNode::Point([0.0, s]),
            ]
        };
        let zone = Zone {
            layers: vec!["F.Cu".to_string(), "B.Cu".to_string()],
            fills: vec![ZoneFill {
                layer: Some("F.Cu".to_string()),
                contour: square(8.0),
            }],
            keepout: false,
        };
        let front = zone_to_polygon(&FlatteningConverter, &zone, "F.Cu", TOL).unwrap();
        assert_relative_eq!(front.area(), 64.0, epsilon = 1e-6);
        // never filled on the back: no copper rather than the whole outline
        assert!(zone_to_polygon(&FlatteningConverter, &zone, "B.Cu", TOL).is_none());
        assert!(FlatteningConverter
            .shape_to_polygon(&Primitive::Zone(zone.clone()), TOL)
            .is_none());

        let keepout = Zone {
            keepout: true,
            ..zone
        };
        assert!(zone_to_polygon(&FlatteningConverter, &keepout, "F.Cu", TOL).is_none());
    }

    #[test]
    fn test_chamfer_is_capped_at_half_the_short_side() {
        let all = Chamfer {
            top_left: true,
            top_right: true,
            bottom_right: true,
            bottom_left: true,
        };
        let set = convert(&pad(
            PadShape::ChamferedRect {
                radius: 0.0,
                chamfer: 0.9,
                corners: all,
            },
            [2.0, 1.0],
            0.0,
        ));
        // capped at 0.5: four 0.5 x 0.5 corner triangles come off
        assert_relative_eq!(set.area(), 2.0 - 4.0 * 0.125, epsilon = 1e-6);
    }
}
