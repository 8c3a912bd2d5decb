//! Error taxonomy shared by every pipeline component.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T, E = WaypointError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WaypointError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unknown schema: no template for family '{family}' in mode '{mode}'")]
    UnknownSchema { family: String, mode: String },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("ambiguous mode: no mode was supplied and no session count to derive one from")]
    AmbiguousMode,

    #[error("conflict: {} already holds a different file", .0.display())]
    Conflict(PathBuf),

    #[error("partial write detected: {}", .0.join("; "))]
    PartialWriteDetected(Vec<String>),

    #[error("invalid extraction: {0}")]
    InvalidExtraction(String),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WaypointError {
    /// Stable name of the error kind, used as a prefix when errors cross the
    /// MCP boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::UnknownSchema { .. } => "UnknownSchema",
            Self::SchemaMismatch(_) => "SchemaMismatch",
            Self::AmbiguousMode => "AmbiguousMode",
            Self::Conflict(_) => "Conflict",
            Self::PartialWriteDetected(_) => "PartialWriteDetected",
            Self::InvalidExtraction(_) => "InvalidExtraction",
            Self::Io { .. } => "Io",
        }
    }

    /// Wrap an I/O failure with the path it happened on.
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
