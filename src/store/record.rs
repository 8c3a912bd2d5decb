//! Markdown form of every record written under `summaries/`.
//!
//! A record is a `# ` heading, an optional template marker, and one `## `
//! section per field:
//!
//! ```text
//! # Handoff: auth-flow
//! <!-- waypoint:handoff:light -->
//!
//! ## Date
//! 2024-03-01
//!
//! ## Next Steps
//! - implement token refresh
//!
//! ## Open Questions
//! _None_
//! ```

use crate::error::{Result, WaypointError};
use crate::models::{Family, Mode};

use super::schema::{self, field_spec, FieldKind, FieldSpec};

/// Written in place of a required field that has no content.
pub const EMPTY_MARKER: &str = "_None_";

const MARKER_PREFIX: &str = "<!-- waypoint:";
const MARKER_SUFFIX: &str = "-->";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(t) => t.trim().is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::List(_) => FieldKind::List,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    heading: String,
    template: Option<(Family, Mode)>,
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// A free-form record, rendered in insertion order.
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            template: None,
            fields: Vec::new(),
        }
    }

    /// A record bound to a registry template.
    pub fn for_template(heading: impl Into<String>, family: Family, mode: Mode) -> Self {
        Self {
            heading: heading.into(),
            template: Some((family, mode)),
            fields: Vec::new(),
        }
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn template(&self) -> Option<(Family, Mode)> {
        self.template
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.set(name, FieldValue::Text(value.into()))
    }

    pub fn set_list<I, S>(&mut self, name: &str, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(name, FieldValue::List(items.into_iter().map(Into::into).collect()))
    }

    fn set(&mut self, name: &str, value: FieldValue) -> &mut Self {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Text content of a field. An explicitly empty field reads as `""`.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Text(t) => Some(t.as_str()),
            FieldValue::List(items) if items.is_empty() => Some(""),
            FieldValue::List(_) => None,
        }
    }

    /// List content of a field. An explicitly empty field reads as `[]`.
    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            FieldValue::List(items) => Some(items.as_slice()),
            FieldValue::Text(t) if t.trim().is_empty() => Some(&[]),
            FieldValue::Text(_) => None,
        }
    }

    /// Render against the bound template, or in insertion order for free-form records.
    pub fn render(&self) -> Result<String> {
        match self.template {
            Some((family, mode)) => self.render_with(schema::schema(family, mode)),
            None => {
                let mut out = self.preamble();
                for (name, value) in &self.fields {
                    push_section(&mut out, name, value);
                }
                Ok(out)
            }
        }
    }

    /// Render in the order of `fields`, marking empty required fields explicitly.
    pub fn render_with(&self, fields: &[FieldSpec]) -> Result<String> {
        self.conform_kinds(fields)?;

        let mut out = self.preamble();
        for spec in fields {
            match self.get(spec.name) {
                Some(value) if !value.is_empty() => push_section(&mut out, spec.name, value),
                _ if spec.required => {
                    let empty = match spec.kind {
                        FieldKind::Text => FieldValue::Text(String::new()),
                        FieldKind::List => FieldValue::List(Vec::new()),
                    };
                    push_section(&mut out, spec.name, &empty);
                }
                _ => {}
            }
        }
        Ok(out)
    }

    fn preamble(&self) -> String {
        let mut out = format!("# {}\n", self.heading.trim());
        if let Some((family, mode)) = self.template {
            out.push_str(&format!(
                "{}{}:{} {}\n",
                MARKER_PREFIX,
                family.as_str(),
                mode.as_str(),
                MARKER_SUFFIX
            ));
        }
        out
    }

    /// Parse a record. When the record carries a template marker every
    /// required field of that template must be present.
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_inner(input, None)
    }

    /// Parse a record with a known field list, such as the project brief.
    pub fn parse_as(input: &str, fields: &[FieldSpec]) -> Result<Self> {
        Self::parse_inner(input, Some(fields))
    }

    fn parse_inner(input: &str, explicit: Option<&[FieldSpec]>) -> Result<Self> {
        let mut heading: Option<String> = None;
        let mut template = None;
        let mut sections: Vec<(String, Vec<&str>)> = Vec::new();

        for line in input.lines() {
            if sections.is_empty() {
                if heading.is_none() {
                    if let Some(h) = line.strip_prefix("# ") {
                        heading = Some(h.trim().to_string());
                        continue;
                    }
                }
                if let Some(marker) = parse_marker(line)? {
                    template = Some(marker);
                    continue;
                }
            }
            if let Some(name) = line.strip_prefix("## ") {
                let name = name.trim().to_string();
                if sections.iter().any(|(n, _)| *n == name) {
                    return Err(WaypointError::SchemaMismatch(format!(
                        "section '{}' appears more than once",
                        name
                    )));
                }
                sections.push((name, Vec::new()));
                continue;
            }
            if let Some((_, lines)) = sections.last_mut() {
                lines.push(line);
            }
        }

        let heading = heading.ok_or_else(|| {
            WaypointError::SchemaMismatch("record has no '# ' heading".to_string())
        })?;

        let fields = explicit.or_else(|| template.map(|(f, m)| schema::schema(f, m)));

        let mut record = Self {
            heading,
            template,
            fields: Vec::with_capacity(sections.len()),
        };
        for (name, lines) in sections {
            let kind = fields.and_then(|fs| field_spec(fs, &name)).map(|s| s.kind);
            let value = parse_value(&name, &lines, kind)?;
            record.fields.push((name, value));
        }

        if let Some(fields) = fields {
            record.conform(fields)?;
        }
        Ok(record)
    }

    /// Check that every required field is present and no unknown field is.
    pub fn conform(&self, fields: &[FieldSpec]) -> Result<()> {
        self.conform_kinds(fields)?;
        let missing: Vec<&str> = fields
            .iter()
            .filter(|spec| spec.required && self.get(spec.name).is_none())
            .map(|spec| spec.name)
            .collect();
        if !missing.is_empty() {
            return Err(WaypointError::SchemaMismatch(format!(
                "{}missing required field(s): {}",
                self.template_label(),
                missing.join(", ")
            )));
        }
        Ok(())
    }

    fn conform_kinds(&self, fields: &[FieldSpec]) -> Result<()> {
        for (name, value) in &self.fields {
            let spec = field_spec(fields, name).ok_or_else(|| {
                WaypointError::SchemaMismatch(format!(
                    "{}field '{}' is not part of the template",
                    self.template_label(),
                    name
                ))
            })?;
            if spec.kind != value.kind() && !value.is_empty() {
                return Err(WaypointError::SchemaMismatch(format!(
                    "{}field '{}' expects {}",
                    self.template_label(),
                    name,
                    match spec.kind {
                        FieldKind::Text => "text",
                        FieldKind::List => "a bullet list",
                    }
                )));
            }
        }
        Ok(())
    }

    fn template_label(&self) -> String {
        match self.template {
            Some((family, mode)) => format!("{}/{} template: ", family.as_str(), mode.as_str()),
            None => String::new(),
        }
    }
}

fn parse_marker(line: &str) -> Result<Option<(Family, Mode)>> {
    let Some(rest) = line.trim().strip_prefix(MARKER_PREFIX) else {
        return Ok(None);
    };
    let body = rest.trim_end_matches(MARKER_SUFFIX).trim();
    let (family, mode) = body.split_once(':').unwrap_or((body, ""));
    schema::lookup(family, mode).map(Some)
}

fn push_section(out: &mut String, name: &str, value: &FieldValue) {
    out.push('\n');
    out.push_str("## ");
    out.push_str(name);
    out.push('\n');
    match value {
        FieldValue::Text(t) if t.trim().is_empty() => out.push_str(EMPTY_MARKER),
        FieldValue::Text(t) => {
            let lines: Vec<String> = t.trim().lines().map(escape_line).collect();
            out.push_str(&lines.join("\n"));
        }
        FieldValue::List(items) if items.is_empty() => out.push_str(EMPTY_MARKER),
        FieldValue::List(items) => {
            let lines: Vec<String> = items
                .iter()
                .map(|item| format!("- {}", flatten(item)))
                .collect();
            out.push_str(&lines.join("\n"));
        }
    }
    out.push('\n');
}

fn parse_value(name: &str, lines: &[&str], kind: Option<FieldKind>) -> Result<FieldValue> {
    let content: Vec<&str> = lines
        .iter()
        .copied()
        .skip_while(|l| l.trim().is_empty())
        .collect();
    let end = content
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);
    let content = &content[..end];

    let is_empty = content.is_empty() || (content.len() == 1 && content[0].trim() == EMPTY_MARKER);
    let kind = kind.unwrap_or_else(|| {
        let bullets = !content.is_empty() && content.iter().all(|l| l.starts_with("- "));
        if bullets {
            FieldKind::List
        } else {
            FieldKind::Text
        }
    });

    match kind {
        FieldKind::Text if is_empty => Ok(FieldValue::Text(String::new())),
        FieldKind::Text => {
            let text: Vec<&str> = content.iter().map(|l| unescape_line(l)).collect();
            Ok(FieldValue::Text(text.join("\n")))
        }
        FieldKind::List if is_empty => Ok(FieldValue::List(Vec::new())),
        FieldKind::List => content
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                l.strip_prefix("- ")
                    .map(|item| item.trim().to_string())
                    .ok_or_else(|| {
                        WaypointError::SchemaMismatch(format!(
                            "section '{}' expects a bullet list, found '{}'",
                            name, l
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(FieldValue::List),
    }
}

/// Text lines that would read as headings get a leading backslash.
fn escape_line(line: &str) -> String {
    if line.starts_with('#') || line.starts_with("\\#") {
        format!("\\{}", line)
    } else {
        line.to_string()
    }
}

fn unescape_line(line: &str) -> &str {
    match line.strip_prefix('\\') {
        Some(rest) if rest.starts_with('#') => rest,
        _ => line,
    }
}

/// List items are single lines. Line breaks become single spaces; every
/// other character, whitespace included, is kept as given.
fn flatten(item: &str) -> String {
    item.trim()
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::field;

    fn handoff_record() -> Record {
        let mut record = Record::for_template("Handoff: auth-flow", Family::Handoff, Mode::Light);
        record
            .set_text(field::DATE, "2024-03-01")
            .set_text(field::TOPIC, "auth-flow")
            .set_list(field::ACCOMPLISHMENTS, ["Wrote login → `src/login.rs`"])
            .set_list(field::NEXT_STEPS, ["implement token refresh"]);
        record
    }

    #[test]
    fn required_fields_render_with_empty_marker() {
        let rendered = handoff_record().render().unwrap();
        assert!(rendered.contains("## Open Questions\n_None_\n"));
        // Optional and unset: omitted
        assert!(!rendered.contains("## Numeric Facts"));
        assert!(rendered.starts_with("# Handoff: auth-flow\n<!-- waypoint:handoff:light -->\n"));
    }

    #[test]
    fn parse_reads_back_rendered_fields() {
        let rendered = handoff_record().render().unwrap();
        let parsed = Record::parse(&rendered).unwrap();

        assert_eq!(parsed.template(), Some((Family::Handoff, Mode::Light)));
        assert_eq!(parsed.text(field::DATE), Some("2024-03-01"));
        assert_eq!(parsed.list(field::NEXT_STEPS).unwrap(), ["implement token refresh"]);
        assert!(parsed.list(field::OPEN_QUESTIONS).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_missing_required_section() {
        let input = "# Handoff: x\n<!-- waypoint:handoff:light -->\n\n## Date\n2024-03-01\n";
        let err = Record::parse(input).unwrap_err();
        assert_eq!(err.kind(), "SchemaMismatch");
        assert!(err.to_string().contains("Topic"));
    }

    #[test]
    fn parse_rejects_unknown_marker() {
        let input = "# X\n<!-- waypoint:handoff:huge -->\n";
        assert_eq!(Record::parse(input).unwrap_err().kind(), "UnknownSchema");
    }

    #[test]
    fn render_rejects_fields_outside_the_template() {
        let mut record = handoff_record();
        record.set_text(field::CROSS_REFERENCES, "nope");
        assert_eq!(record.render().unwrap_err().kind(), "SchemaMismatch");
    }

    #[test]
    fn heading_like_text_survives_a_round_trip() {
        let mut record = Record::new("Brief");
        record.set_text(field::DESCRIPTION, "# not a heading\nplain");
        let parsed = Record::parse(&record.render().unwrap()).unwrap();
        assert_eq!(parsed.text(field::DESCRIPTION), Some("# not a heading\nplain"));
    }

    #[test]
    fn list_items_keep_inner_whitespace() {
        assert_eq!(flatten("1000\u{a0}requests/minute"), "1000\u{a0}requests/minute");
        assert_eq!(flatten("burst of 50\trequests"), "burst of 50\trequests");
        assert_eq!(flatten("  first line\r\n  second line \n"), "first line second line");
    }
}
