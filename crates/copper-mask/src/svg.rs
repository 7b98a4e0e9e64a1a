use crate::error::ExportError;
use crate::geometry::{Loop, PolygonSet};
use crate::types::Point;

/// Extent of a polygon set in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Bounds {
    pub fn of(set: &PolygonSet) -> Result<Self, ExportError> {
        let rect = set.bounding_rect().ok_or(ExportError::EmptyBounds)?;
        Ok(Self {
            minx: rect.min().x,
            miny: rect.min().y,
            maxx: rect.max().x,
            maxy: rect.max().y,
        })
    }

    /// Grow by `margin` on every side.
    pub fn expand(self, margin: f64) -> Self {
        Self {
            minx: self.minx - margin,
            miny: self.miny - margin,
            maxx: self.maxx + margin,
            maxy: self.maxy + margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Translation that moves the lower corner to the origin.
    pub fn offset(&self) -> Point {
        [-self.minx, -self.miny]
    }

    pub fn contains(&self, p: Point) -> bool {
        (self.minx..=self.maxx).contains(&p[0]) && (self.miny..=self.maxy).contains(&p[1])
    }
}

/// `M x,y L x,y ... Z` for one loop, or `None` for loops too small to
/// enclose anything.
pub fn path_data(lp: &Loop, offset: Point) -> Option<String> {
    if lp.points.len() < 3 {
        return None;
    }
    let mut parts = Vec::with_capacity(lp.points.len() + 1);
    for (i, p) in lp.points.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { "L" };
        parts.push(format!("{cmd} {:.4},{:.4}", p[0] + offset[0], p[1] + offset[1]));
    }
    parts.push("Z".to_string());
    Some(parts.join(" "))
}

/// A rendered document and how many loops made it in.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub text: String,
    pub path_count: usize,
    pub width: f64,
    pub height: f64,
}

/// Render every loop of `set` as a filled path. Holes come out right
/// through the even-odd fill rule.
pub fn render(set: &PolygonSet, bounds: &Bounds, fill: &str) -> SvgDocument {
    let offset = bounds.offset();
    let (width, height) = (bounds.width(), bounds.height());
    let paths: Vec<String> = set.loops().iter().filter_map(|lp| path_data(lp, offset)).collect();

    let mut lines = Vec::with_capacity(paths.len() + 4);
    lines.push(r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#.to_string());
    lines.push(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.4}mm" height="{height:.4}mm" viewBox="0 0 {width:.4} {height:.4}">"#
    ));
    lines.push(format!(r#"<g fill="{fill}" stroke="none" fill-rule="evenodd">"#));
    for d in &paths {
        lines.push(format!(r#"  <path d="{d}"/>"#));
    }
    lines.push("</g></svg>".to_string());

    SvgDocument {
        text: lines.join("\n"),
        path_count: paths.len(),
        width,
        height,
    }
}
