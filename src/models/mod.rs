//! Domain models for Waypoint.
//!
//! # Core Concepts
//!
//! ## Permanent Records
//!
//! - [`ProjectBrief`]: Static project context, written once and never archived.
//! - [`SourceDocumentSummary`]: Structured extraction of one input document.
//!   Immutable once written; its source document lives in the archive.
//!
//! ## Rotating Records
//!
//! - [`HandoffRecord`]: Snapshot of one session. Exactly one is active; the
//!   rest are archived (like `git log` for the project's sessions).
//!
//! ## Templates
//!
//! - [`Family`] and [`Mode`] select a template from the registry in
//!   [`crate::store::schema`].

mod brief;
mod handoff;
mod mode;
mod report;
mod summary;

pub use brief::*;
pub use handoff::*;
pub use mode::*;
pub use report::*;
pub use summary::*;
