use serde::{Deserialize, Serialize};

use crate::error::{Result, WaypointError};
use crate::store::record::Record;
use crate::store::schema::{self, field};

/// Static project context, the fixed entry point of `summaries/`.
///
/// The brief is written once when the project is initialized and is never
/// archived. Its phase tracker is the current phase plus the planned phases
/// in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectBrief {
    pub name: String,
    /// Kind of project, e.g. "CLI tool" or "web service".
    pub project_type: String,
    /// The phase the project is currently in.
    pub phase: String,
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProjectBrief {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new(format!("Project Brief: {}", self.name.trim()));
        record
            .set_text(field::NAME, self.name.trim())
            .set_text(field::TYPE, self.project_type.trim())
            .set_text(field::PHASE, self.phase.trim())
            .set_list(field::PHASES, self.phases.iter().map(|p| p.trim()));
        if let Some(description) = &self.description {
            record.set_text(field::DESCRIPTION, description.trim());
        }
        record
    }

    pub fn render(&self) -> Result<String> {
        for (label, value) in [
            ("name", &self.name),
            ("type", &self.project_type),
            ("phase", &self.phase),
        ] {
            if value.trim().is_empty() {
                return Err(WaypointError::SchemaMismatch(format!(
                    "project brief {} must not be empty",
                    label
                )));
            }
        }
        self.to_record().render_with(schema::BRIEF)
    }

    pub fn parse(input: &str) -> Result<Self> {
        let record = Record::parse_as(input, schema::BRIEF)?;
        let text = |name: &str| record.text(name).unwrap_or_default().to_string();
        Ok(Self {
            name: text(field::NAME),
            project_type: text(field::TYPE),
            phase: text(field::PHASE),
            phases: record
                .list(field::PHASES)
                .map(|p| p.to_vec())
                .unwrap_or_default(),
            description: record
                .text(field::DESCRIPTION)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        })
    }
}
