//! Waypoint: durable project memory for AI-assisted development.
//!
//! Raw documents are condensed into source summaries, each session ends with a
//! handoff record, and a state report tells the next session where to pick up.
//! Everything lives as markdown under `summaries/` and `archive/`.

pub mod config;
pub mod error;
pub mod extract;
pub mod handoff;
pub mod mcp;
pub mod models;
pub mod report;
pub mod store;

pub use error::{Result, WaypointError};
pub use store::Workspace;
