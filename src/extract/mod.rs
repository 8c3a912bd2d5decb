//! Document extraction: raw input document → source summary.
//!
//! How free-form text maps onto summary fields is a judgment call, so it sits
//! behind the [`Extractor`] trait. Whatever an extractor produces is then
//! checked mechanically before anything touches the disk:
//!
//! - every quantity literal in a requirement or decision appears verbatim in
//!   the source
//! - every requirement has a THEN clause
//! - every uncertainty carries exactly one classification

mod rules;

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

pub use rules::RuleExtractor;

use crate::error::{Result, WaypointError};
use crate::models::*;
use crate::store::{archived_source_ref, file_name, Workspace, SOURCE_PREFIX};

/// Quantity literal: a number with an optional trailing unit, e.g.
/// `1000 requests/minute`, `99.9%`, `$5`, `3-5 days`, `5кг`,
/// `1000 requests per minute`. At most one space or tab separates the
/// number from its unit, and it is kept as written.
static QUANTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<num>[$€£]?\d+(?:[.,:/\-]\d+)*)(?:[^\S\r\n]?(?P<unit>%|[\p{L}µ°]\p{L}*(?:/\p{L}+|[^\S\r\n]+(?i:per)[^\S\r\n]+\p{L}+)?))?",
    )
    .expect("QUANTITY_PATTERN regex should compile")
});

/// Words that follow numbers without being their unit.
const NOT_UNITS: &[&str] = &[
    "a", "after", "also", "an", "and", "are", "as", "at", "be", "before", "but", "by", "can",
    "could", "for", "from", "has", "have", "if", "in", "is", "it", "may", "might", "must", "need",
    "needs", "not", "of", "on", "only", "or", "per", "shall", "should", "than", "that", "the",
    "then", "to", "until", "was", "were", "when", "which", "will", "with", "would",
];

/// A raw input document as read from disk.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name, e.g. `api-notes.md`.
    pub name: String,
    /// File name without extension.
    pub stem: String,
    pub text: String,
}

impl SourceDocument {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(WaypointError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(WaypointError::io(path))?;
        let name = file_name(path)
            .ok_or_else(|| WaypointError::NotFound(path.to_path_buf()))?
            .to_string();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        Ok(Self { name, stem, text })
    }
}

/// An uncertainty as an extractor reported it. `kind` is `None` when the
/// extractor could not classify it, which fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUncertainty {
    pub item: String,
    pub kind: Option<UncertaintyKind>,
}

/// Unvalidated extractor output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub title: String,
    pub context: Option<String>,
    pub requirements: Vec<Requirement>,
    pub decisions: Vec<Decision>,
    pub uncertainties: Vec<RawUncertainty>,
    pub cross_references: Vec<String>,
}

/// Maps a raw document onto summary fields.
pub trait Extractor {
    fn extract(&self, document: &SourceDocument) -> Result<Extraction>;
}

/// Every quantity literal in `text`, in order of appearance.
///
/// Digits glued to a preceding letter (`OAuth2`, `SHA256`) belong to a name,
/// not a quantity, and are skipped.
pub fn quantity_literals(text: &str) -> Vec<String> {
    QUANTITY_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if text[..whole.start()]
                .chars()
                .next_back()
                .is_some_and(char::is_alphabetic)
            {
                return None;
            }
            let num = caps.name("num").map_or("", |m| m.as_str());
            let literal = match caps.name("unit") {
                Some(unit) if !NOT_UNITS.contains(&first_word(unit.as_str()).as_str()) => {
                    whole.as_str()
                }
                _ => num,
            };
            Some(literal.to_string())
        })
        .collect()
}

fn first_word(unit: &str) -> String {
    unit.split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or(unit)
        .to_lowercase()
}

/// Whether `literal` occurs in `haystack` as a whole quantity, not as part of
/// a longer number or word.
pub fn contains_literal(haystack: &str, literal: &str) -> bool {
    const JOINERS: &str = ".,:/-";
    haystack.match_indices(literal).any(|(start, _)| {
        let before = haystack[..start].chars().rev().take(2).collect::<Vec<_>>();
        let after = haystack[start + literal.len()..].chars().take(2).collect::<Vec<_>>();

        let digit_or_alnum_before = before.first().is_some_and(|c| c.is_ascii_digit())
            || (before.first().is_some_and(|c| JOINERS.contains(*c))
                && before.get(1).is_some_and(|c| c.is_ascii_digit()));
        let continues_after = after.first().is_some_and(|c| c.is_alphanumeric())
            || (after.first().is_some_and(|c| JOINERS.contains(*c))
                && after.get(1).is_some_and(|c| c.is_ascii_digit()));

        !digit_or_alnum_before && !continues_after
    })
}

/// Check extractor output against the document and turn it into a summary.
pub fn validate(
    document: &SourceDocument,
    extraction: Extraction,
    mode: Mode,
    source: String,
) -> Result<SourceDocumentSummary> {
    let title = extraction.title.trim().to_string();
    if title.is_empty() {
        return Err(WaypointError::InvalidExtraction(format!(
            "summary of {} has no title",
            document.name
        )));
    }

    for (i, requirement) in extraction.requirements.iter().enumerate() {
        if requirement.outcome.trim().is_empty() {
            return Err(WaypointError::InvalidExtraction(format!(
                "requirement {} has no THEN clause",
                i + 1
            )));
        }
    }
    for (i, decision) in extraction.decisions.iter().enumerate() {
        if decision.decision.trim().is_empty() {
            return Err(WaypointError::InvalidExtraction(format!(
                "decision {} is empty",
                i + 1
            )));
        }
    }

    let texts = extraction
        .requirements
        .iter()
        .flat_map(|r| r.clauses())
        .chain(extraction.decisions.iter().flat_map(|d| d.texts()));
    let mut numeric_facts: Vec<String> = Vec::new();
    for text in texts {
        for literal in quantity_literals(text) {
            if !contains_literal(&document.text, &literal) {
                return Err(WaypointError::InvalidExtraction(format!(
                    "numeric literal '{}' in \"{}\" does not appear verbatim in {}",
                    literal, text, document.name
                )));
            }
            if !numeric_facts.contains(&literal) {
                numeric_facts.push(literal);
            }
        }
    }

    let uncertainties = extraction
        .uncertainties
        .into_iter()
        .map(|raw| match raw.kind {
            Some(kind) => Ok(Uncertainty {
                kind,
                item: raw.item.trim().to_string(),
            }),
            None => Err(WaypointError::InvalidExtraction(format!(
                "uncertainty '{}' has no OPEN/ASSUMED/MISSING classification",
                raw.item.trim()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SourceDocumentSummary {
        title,
        source,
        mode,
        context: extraction.context.filter(|c| !c.trim().is_empty()),
        numeric_facts,
        requirements: extraction.requirements,
        decisions: extraction.decisions,
        uncertainties,
        cross_references: extraction.cross_references,
    })
}

impl Workspace {
    /// Summarize a raw document with the built-in rule extractor and move the
    /// original into the archive.
    pub fn process_document(&self, path: impl AsRef<Path>, mode: Mode) -> Result<ProcessOutcome> {
        self.process_document_with(&RuleExtractor, path, mode)
    }

    /// Summarize a raw document with `extractor` and move the original into
    /// the archive.
    ///
    /// The summary is staged, the source is archived, and only then is the
    /// summary committed. If archiving fails the staged summary is discarded,
    /// so no summary ever exists without its archived source.
    pub fn process_document_with(
        &self,
        extractor: &dyn Extractor,
        path: impl AsRef<Path>,
        mode: Mode,
    ) -> Result<ProcessOutcome> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(WaypointError::NotFound(path.to_path_buf()));
        }
        self.ensure_unmanaged(path)?;
        self.check()?;

        let document = SourceDocument::read(path)?;
        let slug = slugify(&document.stem);
        if slug.is_empty() {
            return Err(WaypointError::SchemaMismatch(format!(
                "cannot derive a summary name from '{}'",
                document.name
            )));
        }
        let summary_name = format!("{}{}.md", SOURCE_PREFIX, slug);
        let summary_path = self.summaries_dir().join(&summary_name);
        let archived = self.archive().source_destination(&document.name);

        if summary_path.exists() {
            return Err(WaypointError::Conflict(summary_path));
        }
        self.archive().ensure_vacant(path, &archived)?;

        let extraction = extractor.extract(&document)?;
        let summary = validate(&document, extraction, mode, archived_source_ref(&document.name))?;
        let rendered = summary.to_record().render()?;
        tracing::debug!(
            "Extracted {} requirement(s) from {}",
            summary.requirements.len(),
            document.name
        );

        self.ensure_layout()?;
        let staged = self.stage(&summary_name, &rendered)?;
        if let Err(e) = self.archive().move_file(path, &archived) {
            self.discard(&staged);
            return Err(e);
        }
        self.commit(&staged, &summary_path)?;

        tracing::info!(
            "Processed {} -> {} (source archived at {})",
            path.display(),
            summary_path.display(),
            archived.display()
        );
        Ok(ProcessOutcome {
            summary_path,
            archived_source: archived,
            synopsis: summary.synopsis(),
        })
    }

    /// Raw inputs must live outside `summaries/` and `archive/`.
    fn ensure_unmanaged(&self, path: &Path) -> Result<()> {
        let canonical = fs::canonicalize(path).map_err(WaypointError::io(path))?;
        for managed in [self.summaries_dir(), self.archive().root().to_path_buf()] {
            if let Ok(dir) = fs::canonicalize(&managed) {
                if canonical.starts_with(&dir) {
                    return Err(WaypointError::SchemaMismatch(format!(
                        "{} is a managed record, not a raw input document",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}
