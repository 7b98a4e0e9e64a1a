use crate::error::ExportError;
use crate::parsers::kicad_sexpr::{self, SExpr};
use crate::types::*;
use log::{debug, warn};
use std::f64::consts::PI;
use std::path::PathBuf;

/// Parse a KiCad `.kicad_pcb` file from bytes into a Board.
pub fn parse(data: &[u8], source: Option<PathBuf>) -> Result<Board, ExportError> {
    let root = kicad_sexpr::parse(data)
        .map_err(|e| ExportError::ParseError(format!("S-expression parse error: {e}")))?;

    if root.tag() != Some("kicad_pcb") {
        return Err(ExportError::ParseError("not a kicad_pcb file".to_string()));
    }

    let layers = parse_layers(&root);
    let mut primitives = Vec::new();

    for child in root.children() {
        let tag = match child.tag() {
            Some(t) => t,
            None => continue,
        };

        let item = match tag {
            "segment" => parse_segment(child),
            "arc" => parse_arc_track(child),
            "via" => parse_via(child),
            "gr_line" | "gr_rect" | "gr_circle" | "gr_arc" | "gr_poly" | "gr_curve" => {
                parse_shape(child, &Placement::BOARD).map(Primitive::Shape)
            }
            "zone" => parse_zone(child).map(Primitive::Zone),
            "footprint" | "module" => {
                primitives.extend(parse_footprint(child));
                continue;
            }
            _ => continue,
        };

        match item {
            Some(p) => primitives.push(p),
            None => debug!("skipping malformed {tag}"),
        }
    }

    debug!(
        "parsed board: {} layers, {} primitives",
        layers.entries.len(),
        primitives.len()
    );

    Ok(Board {
        source,
        layers,
        primitives,
    })
}

// ─── Layer handling ──────────────────────────────────────────────────

fn parse_layers(root: &SExpr) -> LayerTable {
    let mut entries = Vec::new();
    if let Some(layers_node) = root.find("layers") {
        for child in layers_node.children() {
            if let SExpr::List(items) = child {
                if items.len() < 3 {
                    continue;
                }
                let id = items[0].as_atom().and_then(|s| s.parse::<i64>().ok());
                let name = items[1].as_atom();
                let user_name = items
                    .get(3)
                    .and_then(|s| s.as_atom())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string());
                if let (Some(id), Some(name)) = (id, name) {
                    entries.push(LayerEntry {
                        id: LayerId(id),
                        name: name.to_string(),
                        user_name,
                    });
                }
            }
        }
    }
    if entries.is_empty() {
        warn!("board has no layer table, assuming a two layer stack");
        return LayerTable::two_layer();
    }
    LayerTable { entries }
}

fn get_layer_name(node: &SExpr) -> String {
    node.value("layer").unwrap_or("").to_string()
}

fn layer_list(node: &SExpr) -> Vec<String> {
    node.find("layers")
        .map(|l| l.atoms().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

// ─── Placement ───────────────────────────────────────────────────────

/// Footprint placement applied to footprint-local coordinates.
struct Placement {
    origin: Point,
    angle: f64,
}

impl Placement {
    const BOARD: Placement = Placement {
        origin: [0.0, 0.0],
        angle: 0.0,
    };

    fn apply(&self, p: Point) -> Point {
        let (x, y) = rotate_and_translate(p[0], p[1], self.origin[0], self.origin[1], self.angle);
        [x, y]
    }

    fn xy(&self, node: &SExpr, tag: &str) -> Option<Point> {
        node.xy(tag).map(|p| self.apply(p))
    }
}

/// Rotate point (lx, ly) by angle degrees and translate to (tx, ty).
fn rotate_and_translate(lx: f64, ly: f64, tx: f64, ty: f64, angle_deg: f64) -> (f64, f64) {
    if angle_deg == 0.0 {
        return (lx + tx, ly + ty);
    }
    let angle_rad = -angle_deg * PI / 180.0;
    let cos_a = angle_rad.cos();
    let sin_a = angle_rad.sin();
    let rx = lx * cos_a - ly * sin_a;
    let ry = lx * sin_a + ly * cos_a;
    (rx + tx, ry + ty)
}

// ─── Tracks and vias ─────────────────────────────────────────────────

fn parse_segment(node: &SExpr) -> Option<Primitive> {
    Some(Primitive::Track(TrackSegment {
        start: node.xy("start")?,
        end: node.xy("end")?,
        width: node.value_f64("width").unwrap_or(0.25),
        layer: get_layer_name(node),
    }))
}

fn parse_arc_track(node: &SExpr) -> Option<Primitive> {
    Some(Primitive::ArcTrack(ArcTrack {
        start: node.xy("start")?,
        mid: node.xy("mid")?,
        end: node.xy("end")?,
        width: node.value_f64("width").unwrap_or(0.25),
        layer: get_layer_name(node),
    }))
}

fn parse_via(node: &SExpr) -> Option<Primitive> {
    let layers = layer_list(node);
    let span = match layers.as_slice() {
        [a, b, ..] => Some((a.clone(), b.clone())),
        _ => None,
    };
    Some(Primitive::Via(Via {
        at: node.xy("at")?,
        size: node.value_f64("size").unwrap_or(0.6),
        span,
    }))
}

// ─── Graphic shapes ──────────────────────────────────────────────────

fn parse_width(node: &SExpr) -> f64 {
    node.value_f64("width")
        .or_else(|| {
            // KiCad 7+ uses (stroke (width N))
            node.find("stroke").and_then(|s| s.value_f64("width"))
        })
        .unwrap_or(0.0)
}

/// `(fill solid)`, `(fill yes)` and `(fill (type solid))` all mean filled.
fn parse_fill(node: &SExpr) -> Option<bool> {
    let fill = node.find("fill")?;
    let kind = fill.atom_at(0).or_else(|| fill.value("type"))?;
    Some(matches!(kind, "solid" | "yes" | "true"))
}

/// Read a `(pts (xy ..) (arc (start ..) (mid ..) (end ..)) ...)` list.
fn parse_contour(pts: &SExpr, placement: &Placement) -> Contour {
    pts.children()
        .iter()
        .filter_map(|c| match c.tag() {
            Some("xy") => Some(PathNode::Point(placement.apply([c.f64_at(0)?, c.f64_at(1)?]))),
            Some("arc") => Some(PathNode::Arc {
                start: placement.xy(c, "start")?,
                mid: placement.xy(c, "mid")?,
                end: placement.xy(c, "end")?,
            }),
            _ => None,
        })
        .collect()
}

/// Parse any `gr_*`/`fp_*` shape. Footprint shapes are placed into board
/// space; pad primitives are parsed with the identity placement and stay
/// pad-local.
fn parse_shape(node: &SExpr, placement: &Placement) -> Option<Shape> {
    let tag = node.tag()?;
    let kind = tag
        .strip_prefix("gr_")
        .or_else(|| tag.strip_prefix("fp_"))?;
    let stroke_width = parse_width(node);
    let fill = parse_fill(node);

    let (geometry, filled) = match kind {
        "line" => (
            ShapeGeometry::Segment {
                start: placement.xy(node, "start")?,
                end: placement.xy(node, "end")?,
            },
            false,
        ),
        "rect" => {
            let a = node.xy("start")?;
            let b = node.xy("end")?;
            if placement.angle != 0.0 {
                // A rotated rectangle is no longer axis aligned.
                let corners = [a, [b[0], a[1]], b, [a[0], b[1]]];
                let contour = corners
                    .iter()
                    .map(|&p| PathNode::Point(placement.apply(p)))
                    .collect();
                (ShapeGeometry::Polygon { contour }, fill.unwrap_or(false))
            } else {
                (
                    ShapeGeometry::Rect {
                        start: placement.apply(a),
                        end: placement.apply(b),
                    },
                    fill.unwrap_or(false),
                )
            }
        }
        "circle" => {
            let center = placement
                .xy(node, "center")
                .or_else(|| placement.xy(node, "start"))?;
            let end = placement.xy(node, "end")?;
            let radius = (end[0] - center[0]).hypot(end[1] - center[1]);
            (ShapeGeometry::Circle { center, radius }, fill.unwrap_or(false))
        }
        "arc" => (parse_arc_geometry(node, placement)?, false),
        "poly" => {
            let pts = node.find("pts")?;
            let contour = parse_contour(pts, placement);
            if contour.is_empty() {
                return None;
            }
            // polygons default to filled
            (ShapeGeometry::Polygon { contour }, fill.unwrap_or(true))
        }
        "curve" => {
            let pts = node.find("pts")?;
            let points: Vec<Point> = pts
                .find_all("xy")
                .filter_map(|xy| Some(placement.apply([xy.f64_at(0)?, xy.f64_at(1)?])))
                .collect();
            let points: [Point; 4] = points.get(..4)?.try_into().ok()?;
            (ShapeGeometry::Curve { points }, false)
        }
        _ => return None,
    };

    Some(Shape {
        geometry,
        stroke_width,
        filled,
        layer: get_layer_name(node),
    })
}

fn parse_arc_geometry(node: &SExpr, placement: &Placement) -> Option<ShapeGeometry> {
    // KiCad 7+ uses (start, mid, end) for arcs
    // KiCad 5-6 uses (start=center, end=startpoint, angle)
    if let Some(mid) = placement.xy(node, "mid") {
        return Some(ShapeGeometry::Arc {
            start: placement.xy(node, "start")?,
            mid,
            end: placement.xy(node, "end")?,
        });
    }
    let center = node.xy("start")?;
    let first = node.xy("end")?;
    let angle = node.value_f64("angle").unwrap_or(0.0);
    let sweep = |deg: f64| {
        let (x, y) = rotate_and_translate(
            first[0] - center[0],
            first[1] - center[1],
            center[0],
            center[1],
            -deg,
        );
        placement.apply([x, y])
    };
    Some(ShapeGeometry::Arc {
        start: placement.apply(first),
        mid: sweep(angle / 2.0),
        end: sweep(angle),
    })
}

// ─── Footprints ──────────────────────────────────────────────────────

fn parse_footprint(node: &SExpr) -> Vec<Primitive> {
    let at_node = node.find("at");
    let placement = Placement {
        origin: [
            at_node.and_then(|n| n.f64_at(0)).unwrap_or(0.0),
            at_node.and_then(|n| n.f64_at(1)).unwrap_or(0.0),
        ],
        angle: at_node.and_then(|n| n.f64_at(2)).unwrap_or(0.0),
    };

    let mut items = Vec::new();
    for child in node.children() {
        match child.tag() {
            Some("pad") => match parse_pad(child, &placement) {
                Some(pad) => items.push(Primitive::Pad(pad)),
                None => debug!("skipping malformed pad in {}", node.atom_at(0).unwrap_or("?")),
            },
            Some("fp_line" | "fp_rect" | "fp_circle" | "fp_arc" | "fp_poly" | "fp_curve") => {
                if let Some(shape) = parse_shape(child, &placement) {
                    items.push(Primitive::Shape(shape));
                }
            }
            Some("zone") => {
                // Footprint zones are stored in board coordinates.
                if let Some(zone) = parse_zone(child) {
                    items.push(Primitive::Zone(zone));
                }
            }
            _ => {}
        }
    }
    items
}

// ─── Pad parsing ─────────────────────────────────────────────────────

fn parse_pad(node: &SExpr, placement: &Placement) -> Option<Pad> {
    let name = node.atom_at(0).unwrap_or("").to_string();
    let shape_str = node.atom_at(2).unwrap_or("rect");

    let at_node = node.find("at")?;
    let local = [at_node.f64_at(0)?, at_node.f64_at(1)?];
    // KiCad stores the pad orientation already including the footprint's.
    let angle = at_node.f64_at(2).unwrap_or(0.0);

    let size_node = node.find("size")?;
    let size_w = size_node.f64_at(0)?;
    let size_h = size_node.f64_at(1).unwrap_or(size_w);

    let offset = node
        .find("drill")
        .and_then(|d| d.xy("offset"))
        .unwrap_or([0.0, 0.0]);

    let rounding = node.value_f64("roundrect_rratio").unwrap_or(0.0) * size_w.min(size_h);

    let shape = match shape_str {
        "circle" => PadShape::Circle,
        "rect" => PadShape::Rect,
        "oval" => PadShape::Oval,
        "roundrect" if node.find("chamfer").is_none() => PadShape::RoundRect { radius: rounding },
        // KiCad writes chamfered pads as roundrect with a (chamfer ...) list.
        "roundrect" | "chamfrect" | "chamfered_rect" => {
            let mut corners = Chamfer::default();
            if let Some(chamfer) = node.find("chamfer") {
                for corner in chamfer.atoms() {
                    match corner {
                        "top_left" => corners.top_left = true,
                        "top_right" => corners.top_right = true,
                        "bottom_right" => corners.bottom_right = true,
                        "bottom_left" => corners.bottom_left = true,
                        _ => {}
                    }
                }
            }
            PadShape::ChamferedRect {
                radius: rounding,
                chamfer: node.value_f64("chamfer_ratio").unwrap_or(0.0) * size_w.min(size_h),
                corners,
            }
        }
        "trapezoid" => PadShape::Trapezoid {
            delta: node.xy("rect_delta").unwrap_or([0.0, 0.0]),
        },
        "custom" => {
            let anchor = match node.find("options").and_then(|o| o.value("anchor")) {
                Some("circle") => PadAnchor::Circle,
                _ => PadAnchor::Rect,
            };
            let primitives = node
                .find("primitives")
                .map(|p| {
                    p.children()
                        .iter()
                        .filter_map(|c| parse_shape(c, &Placement::BOARD))
                        .collect()
                })
                .unwrap_or_default();
            PadShape::Custom { anchor, primitives }
        }
        other => {
            warn!("unknown pad shape '{other}' on pad {name}, treating as rect");
            PadShape::Rect
        }
    };

    Some(Pad {
        name,
        position: placement.apply(local),
        angle,
        size: [size_w, size_h],
        offset,
        shape,
        layers: layer_list(node),
    })
}

// ─── Zones ───────────────────────────────────────────────────────────

fn parse_zone(node: &SExpr) -> Option<Zone> {
    let mut layers = layer_list(node);
    if layers.is_empty() {
        let layer = get_layer_name(node);
        if !layer.is_empty() {
            layers.push(layer);
        }
    }

    let fills = node
        .find_all("filled_polygon")
        .filter_map(|fp| {
            let contour = parse_contour(fp.find("pts")?, &Placement::BOARD);
            if contour.is_empty() {
                return None;
            }
            let layer = fp.value("layer").map(|s| s.to_string());
            Some(ZoneFill { layer, contour })
        })
        .collect();

    // Rule areas carry their restrictions in a (keepout ...) list.
    let keepout = node.has_flag("keepout");

    Some(Zone {
        layers,
        fills,
        keepout,
    })
}
