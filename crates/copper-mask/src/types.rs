use std::path::PathBuf;

/// A point in board space, millimetres, Y pointing down.
pub type Point = [f64; 2];

// ─── Board ───────────────────────────────────────────────────────────

/// Everything read from a board file that the exporter needs.
#[derive(Debug, Clone, Default)]
pub struct Board {
    /// Path of the `.kicad_pcb` this board was loaded from, if any.
    pub source: Option<PathBuf>,
    pub layers: LayerTable,
    pub primitives: Vec<Primitive>,
}

impl Board {
    pub fn tracks(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Track(_) | Primitive::ArcTrack(_) | Primitive::Via(_)))
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Shape(_)))
    }

    pub fn pads(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Pad(_)))
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Zone(z) => Some(z),
            _ => None,
        })
    }
}

// ─── Layers ──────────────────────────────────────────────────────────

/// Ordinal of a layer as written in the board's `(layers ...)` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub i64);

#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub id: LayerId,
    pub name: String,
    pub user_name: Option<String>,
}

impl LayerEntry {
    pub fn is_copper(&self) -> bool {
        self.name.ends_with(".Cu")
    }
}

/// Layer slots of a board, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerTable {
    pub entries: Vec<LayerEntry>,
}

impl LayerTable {
    /// The stack KiCad writes for a plain two layer board, used when a file
    /// carries no layer section.
    pub fn two_layer() -> Self {
        let entry = |id, name: &str| LayerEntry {
            id: LayerId(id),
            name: name.to_string(),
            user_name: None,
        };
        Self {
            entries: vec![
                entry(0, "F.Cu"),
                entry(31, "B.Cu"),
                entry(32, "B.Adhes"),
                entry(33, "F.Adhes"),
                entry(34, "B.Paste"),
                entry(35, "F.Paste"),
                entry(36, "B.SilkS"),
                entry(37, "F.SilkS"),
                entry(38, "B.Mask"),
                entry(39, "F.Mask"),
                entry(44, "Edge.Cuts"),
            ],
        }
    }

    pub fn by_name(&self, name: &str) -> Option<&LayerEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Copper layers from front to back.
    pub fn copper(&self) -> impl Iterator<Item = &LayerEntry> {
        self.entries.iter().filter(|e| e.is_copper())
    }

    /// Position of a copper layer in the front-to-back stack.
    pub fn copper_depth(&self, name: &str) -> Option<usize> {
        self.copper().position(|e| e.name == name)
    }

    /// Expand a layer pattern as used in pad and zone layer lists
    /// (`*.Cu`, `F&B.Cu`, `*.Mask`, plain names) into canonical names.
    pub fn expand<'a>(&'a self, pattern: &'a str) -> Vec<&'a str> {
        if let Some(suffix) = pattern.strip_prefix("*.") {
            let suffix = format!(".{suffix}");
            return self
                .entries
                .iter()
                .filter(|e| e.name.ends_with(&suffix))
                .map(|e| e.name.as_str())
                .collect();
        }
        if let Some(suffix) = pattern.strip_prefix("F&B.") {
            return self
                .entries
                .iter()
                .filter(|e| e.name == format!("F.{suffix}") || e.name == format!("B.{suffix}"))
                .map(|e| e.name.as_str())
                .collect();
        }
        vec![pattern]
    }
}

// ─── Primitives ──────────────────────────────────────────────────────

/// A board item that can carry copper. Coordinates are board space unless
/// noted otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Track(TrackSegment),
    ArcTrack(ArcTrack),
    Via(Via),
    Shape(Shape),
    Pad(Pad),
    Zone(Zone),
}

impl Primitive {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Primitive::Track(_) => "track",
            Primitive::ArcTrack(_) => "arc track",
            Primitive::Via(_) => "via",
            Primitive::Shape(_) => "shape",
            Primitive::Pad(_) => "pad",
            Primitive::Zone(_) => "zone",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegment {
    pub start: Point,
    pub end: Point,
    pub width: f64,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArcTrack {
    pub start: Point,
    pub mid: Point,
    pub end: Point,
    pub width: f64,
    pub layer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Via {
    pub at: Point,
    pub size: f64,
    /// Outermost copper layers the via connects, when the file names them.
    pub span: Option<(String, String)>,
}

/// A vertex of an outline. KiCad 7+ outlines may mix straight vertices
/// with three-point arcs.
#[derive(Debug, Clone, PartialEq)]
pub enum PathNode {
    Point(Point),
    Arc { start: Point, mid: Point, end: Point },
}

pub type Contour = Vec<PathNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Segment { start: Point, end: Point },
    Rect { start: Point, end: Point },
    Circle { center: Point, radius: f64 },
    Arc { start: Point, mid: Point, end: Point },
    Polygon { contour: Contour },
    Curve { points: [Point; 4] },
}

/// A graphic shape, either board level or inside a footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub geometry: ShapeGeometry,
    pub stroke_width: f64,
    pub filled: bool,
    pub layer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chamfer {
    pub top_left: bool,
    pub top_right: bool,
    pub bottom_right: bool,
    pub bottom_left: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadAnchor {
    Rect,
    Circle,
}

/// Pad outline, in pad local coordinates (centered, unrotated).
#[derive(Debug, Clone, PartialEq)]
pub enum PadShape {
    Circle,
    Rect,
    Oval,
    RoundRect {
        radius: f64,
    },
    ChamferedRect {
        radius: f64,
        chamfer: f64,
        corners: Chamfer,
    },
    Trapezoid {
        delta: [f64; 2],
    },
    Custom {
        anchor: PadAnchor,
        primitives: Vec<Shape>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    pub name: String,
    /// Absolute position of the pad anchor.
    pub position: Point,
    /// Absolute orientation in degrees, footprint rotation included.
    pub angle: f64,
    pub size: [f64; 2],
    pub offset: Point,
    pub shape: PadShape,
    /// Layer names or patterns (`*.Cu`, `F&B.Cu`).
    pub layers: Vec<String>,
}

/// A copper pour. `fills` holds the solid areas KiCad stored when the zone
/// was last filled, tagged with their layer (`None` for KiCad 5 files,
/// meaning the zone's own layer).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Zone {
    pub layers: Vec<String>,
    pub fills: Vec<ZoneFill>,
    pub keepout: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneFill {
    pub layer: Option<String>,
    pub contour: Contour,
}
