use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::mode::{Family, Mode};
use crate::error::{Result, WaypointError};
use crate::store::record::Record;
use crate::store::schema::field;

pub const HANDOFF_PREFIX: &str = "handoff-";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const OUTPUT_ARROW: &str = " → ";

/// Something finished during a session, with the exact files it produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Accomplishment {
    pub description: String,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl Accomplishment {
    pub fn render(&self) -> String {
        if self.outputs.is_empty() {
            return self.description.clone();
        }
        let outputs: Vec<String> = self.outputs.iter().map(|o| format!("`{}`", o)).collect();
        format!("{}{}{}", self.description, OUTPUT_ARROW, outputs.join(", "))
    }

    /// Parse `description → path, path`. `->` is accepted as the arrow.
    pub fn parse(s: &str) -> Self {
        let split = s
            .rsplit_once(OUTPUT_ARROW)
            .or_else(|| s.rsplit_once(" -> "));
        match split {
            Some((description, outputs)) => Self {
                description: description.trim().to_string(),
                outputs: outputs
                    .split(',')
                    .map(|o| o.trim().trim_matches('`').to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            },
            None => Self {
                description: s.trim().to_string(),
                outputs: Vec::new(),
            },
        }
    }
}

/// Everything a session hands to the writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFacts {
    pub date: NaiveDate,
    pub topic: String,
    #[serde(default)]
    pub accomplishments: Vec<Accomplishment>,
    /// Numbers discovered during the session, verbatim.
    #[serde(default)]
    pub numeric_facts: Vec<String>,
    /// Conditional rules established, in IF/THEN form.
    #[serde(default)]
    pub conditional_logic: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    /// Free-form notes, only kept in full mode.
    #[serde(default)]
    pub notes: Option<String>,
    /// Sessions completed so far, used to derive a mode when none is given.
    #[serde(default)]
    pub session_count: Option<u32>,
}

/// Lifecycle of a handoff record. `Archived` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandoffState {
    Active,
    Archived,
}

/// A handoff record found on disk, active or archived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandoffEntry {
    pub state: HandoffState,
    pub date: NaiveDate,
    pub topic: String,
    pub path: PathBuf,
}

/// Structured snapshot of one session.
///
/// Exactly one record is active at a time; it lives in `summaries/` and moves
/// to `archive/handoffs/` when the next record is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandoffRecord {
    pub date: NaiveDate,
    /// Topic as the caller wrote it, on one line. The file name carries
    /// [`HandoffRecord::slug`].
    pub topic: String,
    pub mode: Mode,
    pub accomplishments: Vec<Accomplishment>,
    pub numeric_facts: Vec<String>,
    pub conditional_logic: Vec<String>,
    pub next_steps: Vec<String>,
    pub open_questions: Vec<String>,
    pub notes: Option<String>,
}

impl HandoffRecord {
    pub fn from_facts(facts: SessionFacts, mode: Mode) -> Result<Self> {
        let topic = facts
            .topic
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if slugify(&topic).is_empty() {
            return Err(WaypointError::SchemaMismatch(format!(
                "handoff topic '{}' has no usable characters",
                facts.topic
            )));
        }
        let clean = |items: Vec<String>| -> Vec<String> {
            items
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect()
        };

        Ok(Self {
            date: facts.date,
            topic,
            mode,
            accomplishments: facts
                .accomplishments
                .into_iter()
                .filter(|a| !a.description.trim().is_empty())
                .collect(),
            numeric_facts: clean(facts.numeric_facts),
            conditional_logic: clean(facts.conditional_logic),
            next_steps: clean(facts.next_steps),
            open_questions: clean(facts.open_questions),
            notes: facts
                .notes
                .filter(|n| !n.trim().is_empty() && mode == Mode::Full),
        })
    }

    pub fn slug(&self) -> String {
        slugify(&self.topic)
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}{}-{}.md",
            HANDOFF_PREFIX,
            self.date.format(DATE_FORMAT),
            self.slug()
        )
    }

    pub fn to_record(&self) -> Record {
        let mut record =
            Record::for_template(format!("Handoff: {}", self.topic), Family::Handoff, self.mode);
        record
            .set_text(field::DATE, self.date.format(DATE_FORMAT).to_string())
            .set_text(field::TOPIC, &self.topic)
            .set_list(field::ACCOMPLISHMENTS, self.accomplishments.iter().map(Accomplishment::render))
            .set_list(field::NUMERIC_FACTS, self.numeric_facts.iter().cloned())
            .set_list(field::CONDITIONAL_LOGIC, self.conditional_logic.iter().cloned())
            .set_list(field::NEXT_STEPS, self.next_steps.iter().cloned())
            .set_list(field::OPEN_QUESTIONS, self.open_questions.iter().cloned());
        if let Some(notes) = &self.notes {
            record.set_text(field::NOTES, notes);
        }
        record
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        let Some((Family::Handoff, mode)) = record.template() else {
            return Err(WaypointError::SchemaMismatch(
                "record is not a handoff".to_string(),
            ));
        };
        let date_text = record.text(field::DATE).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_text.trim(), DATE_FORMAT).map_err(|e| {
            WaypointError::SchemaMismatch(format!("invalid handoff date '{}': {}", date_text, e))
        })?;
        let list = |name: &str| {
            record
                .list(name)
                .map(|items| items.to_vec())
                .unwrap_or_default()
        };

        Ok(Self {
            date,
            topic: record.text(field::TOPIC).unwrap_or_default().trim().to_string(),
            mode,
            accomplishments: list(field::ACCOMPLISHMENTS)
                .iter()
                .map(|a| Accomplishment::parse(a))
                .collect(),
            numeric_facts: list(field::NUMERIC_FACTS),
            conditional_logic: list(field::CONDITIONAL_LOGIC),
            next_steps: list(field::NEXT_STEPS),
            open_questions: list(field::OPEN_QUESTIONS),
            notes: record
                .text(field::NOTES)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }

    pub fn synopsis(&self) -> String {
        let outputs: usize = self.accomplishments.iter().map(|a| a.outputs.len()).sum();
        format!(
            "Handoff {} '{}' ({}): {} accomplishment(s) with {} output file(s), {} next step(s), {} open question(s)",
            self.date.format(DATE_FORMAT),
            self.topic,
            self.mode.as_str(),
            self.accomplishments.len(),
            outputs,
            self.next_steps.len(),
            self.open_questions.len(),
        )
    }
}

/// Lowercase, ASCII alphanumerics separated by single hyphens.
pub fn slugify(topic: &str) -> String {
    let mut slug = String::with_capacity(topic.len());
    for c in topic.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Whether a file name matches the active-handoff pattern
/// `handoff-<YYYY-MM-DD>-<topic>.md`.
pub fn is_handoff_file_name(name: &str) -> bool {
    parse_handoff_file_name(name).is_some()
}

/// Split a handoff file name into its date and topic.
pub fn parse_handoff_file_name(name: &str) -> Option<(NaiveDate, String)> {
    let rest = name.strip_prefix(HANDOFF_PREFIX)?.strip_suffix(".md")?;
    if rest.len() < 12 || !rest.is_char_boundary(10) {
        return None;
    }
    let (date, topic) = rest.split_at(10);
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    let topic = topic.strip_prefix('-')?;
    if topic.is_empty() {
        return None;
    }
    Some((date, topic.to_string()))
}
