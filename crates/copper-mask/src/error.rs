use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("could not find layer '{0}'")]
    LayerNotFound(String),

    #[error("nothing exported on {0}; check the layer name and that copper exists on that layer")]
    NothingExported(String),

    #[error("bounds failed: polygon set appears empty")]
    EmptyBounds,

    #[error("board has no file name; save the board first or pass an output path")]
    NoSourcePath,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
