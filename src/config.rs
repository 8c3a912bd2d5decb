//! Workspace configuration.
//!
//! Configuration is via environment variables:
//! - `WAYPOINT_ROOT` - Project root holding `summaries/` and `archive/` (default: current directory)
//!
//! The directory names below are part of the external file layout and are not configurable.

use std::path::{Path, PathBuf};

use crate::error::{Result, WaypointError};

pub const ROOT_ENV: &str = "WAYPOINT_ROOT";

pub const SUMMARIES_DIR: &str = "summaries";
pub const ARCHIVE_DIR: &str = "archive";
pub const HANDOFF_ARCHIVE_DIR: &str = "handoffs";
pub const BRIEF_FILE: &str = "00-project-brief.md";

/// Number of summary files at which the state report starts warning.
pub const SOFT_CAP: usize = 15;

#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(ROOT_ENV) {
            Some(root) if !root.is_empty() => Ok(Self::new(root)),
            _ => {
                let cwd = std::env::current_dir().map_err(WaypointError::io(Path::new(".")))?;
                Ok(Self::new(cwd))
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.root.join(SUMMARIES_DIR)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    pub fn handoff_archive_dir(&self) -> PathBuf {
        self.archive_dir().join(HANDOFF_ARCHIVE_DIR)
    }

    pub fn brief_path(&self) -> PathBuf {
        self.summaries_dir().join(BRIEF_FILE)
    }
}
