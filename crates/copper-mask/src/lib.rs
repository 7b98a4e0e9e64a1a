pub mod error;
pub mod export;
pub mod geometry;
pub mod layers;
pub mod parsers;
pub mod svg;
pub mod types;

use error::ExportError;
use std::path::Path;
use types::Board;

pub use export::{export_layer, export_layer_with, run, write_export, ExportOptions, ExportReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardFormat {
    KiCad,
    Archive,
}

/// Detect format from file extension.
pub fn detect_format(path: &Path) -> Option<BoardFormat> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("kicad_pcb") => Some(BoardFormat::KiCad),
        Some("zip") => Some(BoardFormat::Archive),
        _ => None,
    }
}

/// Auto-detect format from extension and load.
pub fn load_board(path: &Path) -> Result<Board, ExportError> {
    let format = detect_format(path).ok_or_else(|| {
        ExportError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        )
    })?;
    let data = std::fs::read(path)?;
    load_board_bytes(&data, format, Some(path))
}

/// Parse from bytes with explicit format. `source` is where the bytes came
/// from and decides where outputs are written.
pub fn load_board_bytes(
    data: &[u8],
    format: BoardFormat,
    source: Option<&Path>,
) -> Result<Board, ExportError> {
    match format {
        BoardFormat::KiCad => parsers::kicad::parse(data, source.map(Path::to_path_buf)),
        BoardFormat::Archive => parsers::archive::parse(data, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("a/board.kicad_pcb")), Some(BoardFormat::KiCad));
        assert_eq!(detect_format(Path::new("board.KICAD_PCB")), Some(BoardFormat::KiCad));
        assert_eq!(detect_format(Path::new("bundle.zip")), Some(BoardFormat::Archive));
        assert_eq!(detect_format(Path::new("board.brd")), None);
        assert_eq!(detect_format(Path::new("board")), None);
    }

    #[test]
    fn test_load_board_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.kicad_pcb");
        std::fs::write(
            &path,
            "(kicad_pcb (version 20240108) (layers (0 \"F.Cu\" signal))
               (segment (start 0 0) (end 1 0) (width 0.2) (layer \"F.Cu\") (net 0)))",
        )
        .unwrap();
        let board = load_board(&path).unwrap();
        assert_eq!(board.source.as_deref(), Some(path.as_path()));
        assert_eq!(board.tracks().count(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_board(Path::new("board.pcbdoc")).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(ext) if ext == "pcbdoc"));
    }
}
