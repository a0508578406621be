use hdmap_geojson_lib::{LayerKind, TileId};
use std::path::PathBuf;

/// Exit code when the renderer produced nothing
pub const EXIT_NOTHING_RENDERED: u8 = 2;

/// Errors of the command line host
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Nothing rendered for layer {layer}, partition {partition}")]
    NothingRendered { layer: LayerKind, partition: TileId },
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::NothingRendered { .. } => EXIT_NOTHING_RENDERED,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
