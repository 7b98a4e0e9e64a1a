use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::error::ExportError;
use crate::geometry::{zone_to_polygon, Accumulator, AccumulatorStats, FlatteningConverter, ShapeConverter};
use crate::layers::{item_on_layer, resolve_layer};
use crate::svg::{self, Bounds, SvgDocument};
use crate::types::{Board, Primitive};

/// Knobs for one export run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Layer to export, canonical (`F.Cu`) or user name.
    pub layer: String,
    /// Include copper pours. Off by default so the mask does not turn into
    /// one solid sheet.
    pub include_zones: bool,
    /// Largest distance a flattened edge may stray from a true curve, mm.
    pub max_error_mm: f64,
    /// Blank border around the copper, mm.
    pub margin_mm: f64,
    pub fill_color: String,
    /// Appended to the board's base name to form the output file name.
    pub suffix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            layer: "F.Cu".to_string(),
            include_zones: false,
            max_error_mm: 0.02,
            margin_mm: 1.0,
            fill_color: "#000000".to_string(),
            suffix: "_laser.svg".to_string(),
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.max_error_mm <= 0.0 || !self.max_error_mm.is_finite() {
            return Err(ExportError::InvalidOption(format!(
                "max error must be a positive length, got {}",
                self.max_error_mm
            )));
        }
        if self.margin_mm < 0.0 || !self.margin_mm.is_finite() {
            return Err(ExportError::InvalidOption(format!(
                "margin must not be negative, got {}",
                self.margin_mm
            )));
        }
        let hex = self.fill_color.strip_prefix('#').unwrap_or("");
        if !matches!(hex.len(), 3 | 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ExportError::InvalidOption(format!(
                "fill color must look like #rgb or #rrggbb, got '{}'",
                self.fill_color
            )));
        }
        if self.suffix.is_empty() {
            return Err(ExportError::InvalidOption("output suffix is empty".to_string()));
        }
        Ok(())
    }
}

/// A finished, not yet written, export.
#[derive(Debug, Clone)]
pub struct LayerExport {
    /// Canonical name of the exported layer.
    pub layer: String,
    pub document: SvgDocument,
    pub stats: AccumulatorStats,
}

/// What `write_export` reports back; also the `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub output: PathBuf,
    pub layer: String,
    pub zones_included: bool,
    pub items_added: usize,
    pub items_skipped: usize,
    pub paths: usize,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Export one layer with the built-in converter.
pub fn export_layer(board: &Board, opts: &ExportOptions) -> Result<LayerExport, ExportError> {
    export_layer_with(board, opts, &FlatteningConverter)
}

/// Export one layer, converting items with `converter`.
pub fn export_layer_with(
    board: &Board,
    opts: &ExportOptions,
    converter: &dyn ShapeConverter,
) -> Result<LayerExport, ExportError> {
    opts.validate()?;
    let layer = resolve_layer(&board.layers, &opts.layer)?;
    debug!("exporting {} (slot {})", layer.name, layer.id.0);

    let max_error = opts.max_error_mm;
    let mut acc = Accumulator::new();

    // Tracks and vias, then copper drawings, then pads.
    for group in [
        board.tracks().collect::<Vec<_>>(),
        board.shapes().collect(),
        board.pads().collect(),
    ] {
        for item in group {
            if !item_on_layer(item, layer, &board.layers) {
                continue;
            }
            acc.add(item.kind_name(), converter.shape_to_polygon(item, max_error));
        }
    }

    if opts.include_zones {
        for item in &board.primitives {
            let Primitive::Zone(zone) = item else { continue };
            if zone.keepout || !item_on_layer(item, layer, &board.layers) {
                continue;
            }
            acc.add("zone", zone_to_polygon(converter, zone, &layer.name, max_error));
        }
    }

    let (combined, stats) = acc.finish();
    info!("{} items merged on {}, {} skipped", stats.added, layer.name, stats.skipped);
    if stats.skipped > 0 {
        warn!("{} items on {} could not be converted and were left out", stats.skipped, layer.name);
    }
    if stats.added == 0 {
        return Err(ExportError::NothingExported(opts.layer.clone()));
    }

    let bounds = Bounds::of(&combined)?.expand(opts.margin_mm);
    let document = svg::render(&combined, &bounds, &opts.fill_color);

    Ok(LayerExport {
        layer: layer.name.clone(),
        document,
        stats,
    })
}

/// `<dir>/<stem>_<layer with dots as underscores><suffix>`.
pub fn output_path(source: &Path, layer: &str, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{stem}_{}{suffix}", layer.replace('.', "_"));
    source.with_file_name(name)
}

/// Write a finished export next to the board file, or to `explicit`.
pub fn write_export(
    board: &Board,
    export: &LayerExport,
    opts: &ExportOptions,
    explicit: Option<&Path>,
) -> Result<ExportReport, ExportError> {
    let output = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let source = board.source.as_deref().ok_or(ExportError::NoSourcePath)?;
            output_path(source, &export.layer, &opts.suffix)
        }
    };
    std::fs::write(&output, &export.document.text)?;

    Ok(ExportReport {
        output,
        layer: export.layer.clone(),
        zones_included: opts.include_zones,
        items_added: export.stats.added,
        items_skipped: export.stats.skipped,
        paths: export.document.path_count,
        width_mm: export.document.width,
        height_mm: export.document.height,
    })
}

/// Resolve, convert, merge, render and write in one go.
pub fn run(board: &Board, opts: &ExportOptions, explicit: Option<&Path>) -> Result<ExportReport, ExportError> {
    let export = export_layer(board, opts)?;
    write_export(board, &export, opts, explicit)
}
