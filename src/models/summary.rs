use serde::{Deserialize, Serialize};

use super::mode::{Family, Mode};
use crate::store::record::Record;
use crate::store::schema::field;

/// How an uncertainty in a source document is to be treated.
///
/// - `Open`: the source flags it as unresolved
/// - `Assumed`: the source is silent and a default was inferred
/// - `Missing`: the source references it but its content is absent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UncertaintyKind {
    Open,
    Assumed,
    Missing,
}

impl UncertaintyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Assumed => "ASSUMED",
            Self::Missing => "MISSING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "ASSUMED" => Some(Self::Assumed),
            "MISSING" => Some(Self::Missing),
            _ => None,
        }
    }
}

/// A requirement normalized into IF/THEN/BUT/EXCEPT form.
///
/// A statement without an explicit condition is an unconditional THEN.
/// Every clause is a verbatim slice of the source statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    /// IF clause.
    pub condition: Option<String>,
    /// THEN clause, always present.
    pub outcome: String,
    /// BUT clause.
    pub caveat: Option<String>,
    /// EXCEPT clause.
    pub exception: Option<String>,
}

impl Requirement {
    pub fn unconditional(outcome: impl Into<String>) -> Self {
        Self {
            condition: None,
            outcome: outcome.into(),
            caveat: None,
            exception: None,
        }
    }

    /// All clause texts, in IF/THEN/BUT/EXCEPT order.
    pub fn clauses(&self) -> impl Iterator<Item = &str> {
        self.condition
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.outcome.as_str()))
            .chain(self.caveat.as_deref())
            .chain(self.exception.as_deref())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(condition) = &self.condition {
            out.push_str(&format!("IF {} ", condition));
        }
        out.push_str(&format!("THEN {}", self.outcome));
        if let Some(caveat) = &self.caveat {
            out.push_str(&format!(" BUT {}", caveat));
        }
        if let Some(exception) = &self.exception {
            out.push_str(&format!(" EXCEPT {}", exception));
        }
        out
    }
}

/// A decision recorded in a source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Decision {
    pub decision: String,
    pub rationale: Option<String>,
    /// Alternatives the source explicitly rejected.
    #[serde(default)]
    pub rejected: Vec<String>,
}

impl Decision {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.decision.as_str())
            .chain(self.rationale.as_deref())
            .chain(self.rejected.iter().map(String::as_str))
    }

    pub fn render(&self) -> String {
        let mut out = self.decision.clone();
        if let Some(rationale) = &self.rationale {
            out.push_str(&format!(" | WHY: {}", rationale));
        }
        if !self.rejected.is_empty() {
            out.push_str(&format!(" | REJECTED: {}", self.rejected.join("; ")));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Uncertainty {
    pub kind: UncertaintyKind,
    pub item: String,
}

impl Uncertainty {
    pub fn render(&self) -> String {
        format!("[{}] {}", self.kind.as_str(), self.item)
    }
}

/// Structured extraction of one processed input document.
///
/// Summaries are immutable once written. `source` is the archive location of
/// the original document, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDocumentSummary {
    pub title: String,
    pub source: String,
    pub mode: Mode,
    /// Only rendered in full mode.
    pub context: Option<String>,
    /// Quantity literals copied verbatim from requirements and decisions.
    pub numeric_facts: Vec<String>,
    pub requirements: Vec<Requirement>,
    pub decisions: Vec<Decision>,
    pub uncertainties: Vec<Uncertainty>,
    /// Only rendered in full mode.
    pub cross_references: Vec<String>,
}

impl SourceDocumentSummary {
    pub fn to_record(&self) -> Record {
        let mut record = Record::for_template(
            format!("Source Summary: {}", self.title),
            Family::SourceSummary,
            self.mode,
        );
        record
            .set_text(field::TITLE, &self.title)
            .set_text(field::SOURCE, &self.source)
            .set_list(field::NUMERIC_FACTS, self.numeric_facts.iter().cloned())
            .set_list(field::REQUIREMENTS, self.requirements.iter().map(Requirement::render))
            .set_list(field::DECISIONS, self.decisions.iter().map(Decision::render))
            .set_list(field::UNCERTAINTIES, self.uncertainties.iter().map(Uncertainty::render));

        if self.mode == Mode::Full {
            if let Some(context) = &self.context {
                record.set_text(field::CONTEXT, context);
            }
            record.set_list(field::CROSS_REFERENCES, self.cross_references.iter().cloned());
        }
        record
    }

    pub fn synopsis(&self) -> String {
        let count = |kind: UncertaintyKind| {
            self.uncertainties
                .iter()
                .filter(|u| u.kind == kind)
                .count()
        };
        format!(
            "'{}' ({}): {} requirement(s), {} decision(s), {} numeric fact(s), uncertainties {} open / {} assumed / {} missing",
            self.title,
            self.mode.as_str(),
            self.requirements.len(),
            self.decisions.len(),
            self.numeric_facts.len(),
            count(UncertaintyKind::Open),
            count(UncertaintyKind::Assumed),
            count(UncertaintyKind::Missing),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_requirement_renders_then_only() {
        let req = Requirement::unconditional("rate limit is 1000 requests/minute");
        assert_eq!(req.render(), "THEN rate limit is 1000 requests/minute");
    }

    #[test]
    fn full_requirement_renders_all_clauses_in_order() {
        let req = Requirement {
            condition: Some("the user is idle for 30 minutes".into()),
            outcome: "the session must expire".into(),
            caveat: Some("admins get 60 minutes".into()),
            exception: Some("during maintenance".into()),
        };
        assert_eq!(
            req.render(),
            "IF the user is idle for 30 minutes THEN the session must expire BUT admins get 60 minutes EXCEPT during maintenance"
        );
        assert_eq!(req.clauses().count(), 4);
    }

    #[test]
    fn uncertainty_kind_parses_case_insensitively() {
        assert_eq!(UncertaintyKind::parse("assumed"), Some(UncertaintyKind::Assumed));
        assert_eq!(UncertaintyKind::parse("maybe"), None);
    }
}
