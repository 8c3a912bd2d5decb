//! Template registry: the structural schema of every record family and mode.
//!
//! Only the structure is defined here (field names, kinds and whether a field
//! must always appear). Prose wording of the templates lives with the agent.

use crate::error::{Result, WaypointError};
use crate::models::{Family, Mode};

/// Section names used across templates.
pub mod field {
    pub const TITLE: &str = "Title";
    pub const SOURCE: &str = "Source";
    pub const CONTEXT: &str = "Context";
    pub const NUMERIC_FACTS: &str = "Numeric Facts";
    pub const REQUIREMENTS: &str = "Requirements";
    pub const DECISIONS: &str = "Decisions";
    pub const UNCERTAINTIES: &str = "Uncertainties";
    pub const CROSS_REFERENCES: &str = "Cross References";

    pub const DATE: &str = "Date";
    pub const TOPIC: &str = "Topic";
    pub const ACCOMPLISHMENTS: &str = "Accomplishments";
    pub const CONDITIONAL_LOGIC: &str = "Conditional Logic";
    pub const NEXT_STEPS: &str = "Next Steps";
    pub const OPEN_QUESTIONS: &str = "Open Questions";
    pub const NOTES: &str = "Notes";

    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const PHASE: &str = "Phase";
    pub const PHASES: &str = "Phases";
    pub const DESCRIPTION: &str = "Description";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, possibly several lines.
    Text,
    /// Bullet list, one item per line.
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Required fields are always rendered, with an explicit empty marker
    /// when they carry no content. Optional fields are rendered only when set.
    pub required: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

use FieldKind::{List, Text};

const SOURCE_LIGHT: &[FieldSpec] = &[
    required(field::TITLE, Text),
    required(field::SOURCE, Text),
    required(field::NUMERIC_FACTS, List),
    required(field::REQUIREMENTS, List),
    required(field::DECISIONS, List),
    required(field::UNCERTAINTIES, List),
];

const SOURCE_FULL: &[FieldSpec] = &[
    required(field::TITLE, Text),
    required(field::SOURCE, Text),
    optional(field::CONTEXT, Text),
    required(field::NUMERIC_FACTS, List),
    required(field::REQUIREMENTS, List),
    required(field::DECISIONS, List),
    required(field::UNCERTAINTIES, List),
    optional(field::CROSS_REFERENCES, List),
];

const HANDOFF_LIGHT: &[FieldSpec] = &[
    required(field::DATE, Text),
    required(field::TOPIC, Text),
    required(field::ACCOMPLISHMENTS, List),
    required(field::NEXT_STEPS, List),
    required(field::OPEN_QUESTIONS, List),
    optional(field::NUMERIC_FACTS, List),
    optional(field::CONDITIONAL_LOGIC, List),
];

const HANDOFF_FULL: &[FieldSpec] = &[
    required(field::DATE, Text),
    required(field::TOPIC, Text),
    required(field::ACCOMPLISHMENTS, List),
    required(field::NUMERIC_FACTS, List),
    required(field::CONDITIONAL_LOGIC, List),
    required(field::NEXT_STEPS, List),
    required(field::OPEN_QUESTIONS, List),
    optional(field::NOTES, Text),
];

/// The project brief sits outside the two record families but shares the
/// same section format.
pub const BRIEF: &[FieldSpec] = &[
    required(field::NAME, Text),
    required(field::TYPE, Text),
    required(field::PHASE, Text),
    optional(field::PHASES, List),
    optional(field::DESCRIPTION, Text),
];

/// Ordered field list for a family and mode.
pub fn schema(family: Family, mode: Mode) -> &'static [FieldSpec] {
    match (family, mode) {
        (Family::SourceSummary, Mode::Light) => SOURCE_LIGHT,
        (Family::SourceSummary, Mode::Full) => SOURCE_FULL,
        (Family::Handoff, Mode::Light) => HANDOFF_LIGHT,
        (Family::Handoff, Mode::Full) => HANDOFF_FULL,
    }
}

/// Resolve a template from its textual family and mode names.
pub fn lookup(family: &str, mode: &str) -> Result<(Family, Mode)> {
    let unknown = || WaypointError::UnknownSchema {
        family: family.to_string(),
        mode: mode.to_string(),
    };
    let family = family.parse::<Family>().map_err(|_| unknown())?;
    let mode = mode.parse::<Mode>().map_err(|_| unknown())?;
    Ok((family, mode))
}

pub fn field_spec(fields: &[FieldSpec], name: &str) -> Option<FieldSpec> {
    fields.iter().copied().find(|f| f.name == name)
}
