use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WaypointError;

/// Number of completed sessions at which a project is considered large
/// enough for full-verbosity records.
pub const FULL_MODE_SESSION_THRESHOLD: u32 = 5;

/// The kind of record a template describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    SourceSummary,
    Handoff,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceSummary => "source",
            Self::Handoff => "handoff",
        }
    }
}

impl FromStr for Family {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" | "source_summary" => Ok(Self::SourceSummary),
            "handoff" => Ok(Self::Handoff),
            other => Err(WaypointError::SchemaMismatch(format!(
                "unknown record family '{}'. Must be: source or handoff",
                other
            ))),
        }
    }
}

/// Verbosity tier of a template.
///
/// - `Light`: the minimal field set, for small projects
/// - `Full`: every field, for projects with a longer session history
///
/// The mode is always chosen by the caller. [`Mode::for_session_count`] is the
/// conventional heuristic, kept pure so callers can apply it themselves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Light,
    Full,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Full => "full",
        }
    }

    /// Fewer than five sessions means light, anything else full.
    pub fn for_session_count(sessions: u32) -> Self {
        if sessions < FULL_MODE_SESSION_THRESHOLD {
            Self::Light
        } else {
            Self::Full
        }
    }
}

impl FromStr for Mode {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "full" => Ok(Self::Full),
            _ => Err(WaypointError::SchemaMismatch(format!(
                "unresolvable mode '{}'. Must be: light or full",
                s
            ))),
        }
    }
}
