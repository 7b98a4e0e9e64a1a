use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::ExportError;
use crate::types::Board;

/// Parse the first `.kicad_pcb` found inside a zip archive.
///
/// The board's source path becomes the archive's directory joined with the
/// entry's file name, so outputs land next to the archive.
pub fn parse(data: &[u8], archive_path: Option<&Path>) -> Result<Board, ExportError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() || !file.name().to_lowercase().ends_with(".kicad_pcb") {
            continue;
        }

        let entry = file.name().to_string();
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        debug!("reading {entry} from archive");

        let basename = Path::new(&entry)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&entry));
        let source = archive_path.map(|p| p.with_file_name(&basename));
        return super::kicad::parse(&content, source);
    }

    Err(ExportError::ParseError("no .kicad_pcb file found in zip".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const BOARD: &str = "(kicad_pcb (version 20240108)
      (layers (0 \"F.Cu\" signal) (31 \"B.Cu\" signal))
      (segment (start 0 0) (end 1 0) (width 0.2) (layer \"F.Cu\") (net 0)))";

    #[test]
    fn test_first_board_entry_is_used() {
        let data = zip_with(&[("README.txt", "hello"), ("project/demo.kicad_pcb", BOARD)]);
        let board = parse(&data, Some(Path::new("/tmp/out/bundle.zip"))).unwrap();
        assert_eq!(board.source, Some(PathBuf::from("/tmp/out/demo.kicad_pcb")));
        assert_eq!(board.tracks().count(), 1);
    }

    #[test]
    fn test_archive_without_board() {
        let data = zip_with(&[("gerbers/top.gtl", "G04*")]);
        assert!(matches!(parse(&data, None), Err(ExportError::ParseError(_))));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(parse(b"(kicad_pcb)", None), Err(ExportError::Zip(_))));
    }
}
