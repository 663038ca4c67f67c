use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::api::types::BodyId;

/// Failure to turn a tile-map file into a [`TileMap`](crate::TileMap).
#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read tile map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse tile map {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("tile map {path} is invalid: {message}")]
    InvalidMap { path: PathBuf, message: String },
    #[error("tile map {path} has no layers")]
    Empty { path: PathBuf },
}

/// Errors reported by scene operations that distinguish their failure causes.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),
    #[error(transparent)]
    MapLoad(#[from] MapLoadError),
    #[error("no tile map is loaded")]
    NoTileMap,
}
