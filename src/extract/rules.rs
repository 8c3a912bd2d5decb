//! Deterministic, line-based extractor.
//!
//! Each sentence is classified by cue words, in order: explicit tags
//! (`OPEN:`, `[MISSING]`, `Decision:`), open-question cues, decision cues,
//! modal requirements, missing/assumed cues, and finally any sentence stating
//! a quantity. Clauses are slices of the source sentence, so literals are
//! never rewritten.

use std::sync::LazyLock;

use regex::Regex;

use super::{quantity_literals, Extraction, Extractor, RawUncertainty, SourceDocument};
use crate::error::Result;
use crate::models::{Decision, Requirement, UncertaintyKind};

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:\[(open|assumed|missing)\]\s*:?|(open|assumed|missing|decision)\s*:)\s*(.*)$")
        .expect("TAG_PATTERN regex should compile")
});
static OPEN_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(tbd|tbc|to be (?:decided|determined|confirmed)|open question|unresolved|undecided|unclear|not yet (?:decided|known|agreed))\b")
        .expect("OPEN_CUE regex should compile")
});
static DECISION_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(decided|chose|chosen|opted|went with|we will use|agreed to)\b")
        .expect("DECISION_CUE regex should compile")
});
static MODAL_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(must|shall|should|required|requires|needs? to|has to|have to|may not|cannot|at most|at least|no more than|up to)\b")
        .expect("MODAL_CUE regex should compile")
});
static MISSING_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(missing|not (?:provided|specified|included|attached|given|available)|absent|left blank)\b")
        .expect("MISSING_CUE regex should compile")
});
static ASSUMED_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(assum(?:e|es|ed|ing|ption)|presumably|defaults? to)\b")
        .expect("ASSUMED_CUE regex should compile")
});

static EXCEPT_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),?\s*\b(?:except(?:\s+(?:when|if))?|unless)\b\s*")
        .expect("EXCEPT_SPLIT regex should compile")
});
static BUT_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i),?\s*\bbut\b\s*").expect("BUT_SPLIT regex should compile"));
static CONDITION_LEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:if|when|whenever|once|in case)\b\s*")
        .expect("CONDITION_LEAD regex should compile")
});
static CONDITION_MID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),?\s+\b(?:if|when|whenever)\b\s+").expect("CONDITION_MID regex should compile")
});
static THEN_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),\s+(?:then\s+)?|\s+then\s+").expect("THEN_SPLIT regex should compile")
});
static RATIONALE_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),?\s*\b(?:because|since|due to|given that)\b\s*")
        .expect("RATIONALE_SPLIT regex should compile")
});
static REJECTED_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),?\s*\b(?:instead of|rather than)\b\s*")
        .expect("REJECTED_SPLIT regex should compile")
});
static ALTERNATIVE_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*,\s+(?:or\s+|and\s+)?|\s+(?:or|and)\s+")
        .expect("ALTERNATIVE_SPLIT regex should compile")
});
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]+\]\(([^)\s]+)\)").expect("LINK_PATTERN regex should compile")
});
static SEE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsee\s+`?([A-Za-z0-9_./\-]+\.[A-Za-z0-9]+)`?")
        .expect("SEE_PATTERN regex should compile")
});

/// What a single sentence contributes to the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Finding {
    Requirement(Requirement),
    Decision(Decision),
    Uncertainty(RawUncertainty),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleExtractor;

impl Extractor for RuleExtractor {
    fn extract(&self, document: &SourceDocument) -> Result<Extraction> {
        let mut extraction = Extraction::default();
        let mut in_code = false;

        for raw in document.text.lines() {
            let line = raw.trim();
            if line.starts_with("```") {
                in_code = !in_code;
                continue;
            }
            if in_code || line.is_empty() || line.starts_with('|') {
                continue;
            }
            if let Some(heading) = line.strip_prefix('#') {
                if extraction.title.is_empty() && heading.starts_with(' ') {
                    extraction.title = heading.trim().to_string();
                }
                continue;
            }

            let line = strip_list_marker(line);
            for target in LINK_PATTERN
                .captures_iter(line)
                .chain(SEE_PATTERN.captures_iter(line))
                .filter_map(|caps| caps.get(1))
            {
                let target = target.as_str().to_string();
                if !extraction.cross_references.contains(&target) {
                    extraction.cross_references.push(target);
                }
            }

            let mut classified = false;
            for sentence in sentences(line) {
                match classify(sentence) {
                    Some(Finding::Requirement(r)) => extraction.requirements.push(r),
                    Some(Finding::Decision(d)) => extraction.decisions.push(d),
                    Some(Finding::Uncertainty(u)) => extraction.uncertainties.push(u),
                    None => continue,
                }
                classified = true;
            }
            if !classified && extraction.context.is_none() {
                extraction.context = Some(line.to_string());
            }
        }

        if extraction.title.is_empty() {
            extraction.title = document.stem.clone();
        }
        Ok(extraction)
    }
}

fn classify(sentence: &str) -> Option<Finding> {
    if let Some(caps) = TAG_PATTERN.captures(sentence) {
        let tag = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        let rest = caps.get(3).map_or("", |m| m.as_str()).trim();
        if rest.is_empty() {
            return None;
        }
        return Some(match tag.as_str() {
            "decision" => Finding::Decision(parse_decision(rest)),
            other => Finding::Uncertainty(RawUncertainty {
                item: rest.to_string(),
                kind: UncertaintyKind::parse(other),
            }),
        });
    }

    let uncertainty = |kind| {
        Some(Finding::Uncertainty(RawUncertainty {
            item: sentence.to_string(),
            kind: Some(kind),
        }))
    };

    if OPEN_CUE.is_match(sentence) || sentence.ends_with('?') {
        return uncertainty(UncertaintyKind::Open);
    }
    if DECISION_CUE.is_match(sentence) {
        return Some(Finding::Decision(parse_decision(sentence)));
    }
    if MODAL_CUE.is_match(sentence) {
        return Some(Finding::Requirement(normalize_requirement(sentence)));
    }
    if MISSING_CUE.is_match(sentence) {
        return uncertainty(UncertaintyKind::Missing);
    }
    if ASSUMED_CUE.is_match(sentence) {
        return uncertainty(UncertaintyKind::Assumed);
    }
    if !quantity_literals(sentence).is_empty() {
        return Some(Finding::Requirement(normalize_requirement(sentence)));
    }
    None
}

/// Split a requirement sentence into IF/THEN/BUT/EXCEPT clauses.
pub(crate) fn normalize_requirement(sentence: &str) -> Requirement {
    let sentence = trim_clause(sentence);
    let (head, exception) = split_clause(&EXCEPT_SPLIT, sentence);
    let (head, caveat) = split_clause(&BUT_SPLIT, head);

    let (condition, outcome) = if let Some(lead) = CONDITION_LEAD.find(head) {
        let rest = &head[lead.end()..];
        match THEN_SPLIT.find(rest) {
            Some(sep) if sep.start() > 0 && sep.end() < rest.len() => (
                Some(trim_clause(&rest[..sep.start()])),
                trim_clause(&rest[sep.end()..]),
            ),
            _ => (None, head),
        }
    } else if let Some(mid) = CONDITION_MID.find(head).filter(|m| m.start() > 0) {
        let after = trim_clause(&head[mid.end()..]);
        if after.is_empty() {
            (None, head)
        } else {
            (Some(after), trim_clause(&head[..mid.start()]))
        }
    } else {
        (None, head)
    };

    Requirement {
        condition: condition.map(str::to_string),
        outcome: outcome.to_string(),
        caveat: caveat.map(str::to_string),
        exception: exception.map(str::to_string),
    }
}

/// Split a decision sentence into the decision, its rationale, and the
/// alternatives it rejected.
pub(crate) fn parse_decision(sentence: &str) -> Decision {
    let sentence = trim_clause(sentence);
    let (head, rationale) = split_clause(&RATIONALE_SPLIT, sentence);
    let (decision, rejected) = split_clause(&REJECTED_SPLIT, head);

    Decision {
        decision: decision.to_string(),
        rationale: rationale.map(str::to_string),
        rejected: rejected
            .map(|r| {
                ALTERNATIVE_SPLIT
                    .split(r)
                    .map(trim_clause)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// Split at the first match of `re`. A match at the start of the sentence
/// (`Unless X, Y`) takes the text up to the next comma as the tail clause.
/// Commas only separate clauses when followed by a space, so `1,000` stays
/// whole.
fn split_clause<'a>(re: &Regex, s: &'a str) -> (&'a str, Option<&'a str>) {
    let Some(m) = re.find(s) else {
        return (s, None);
    };
    if m.start() == 0 {
        let rest = &s[m.end()..];
        return match rest.split_once(", ") {
            Some((tail, head)) if !trim_clause(head).is_empty() => {
                (trim_clause(head), Some(trim_clause(tail)))
            }
            _ => (s, None),
        };
    }
    let tail = trim_clause(&s[m.end()..]);
    if tail.is_empty() {
        return (s, None);
    }
    (trim_clause(&s[..m.start()]), Some(tail))
}

fn trim_clause(s: &str) -> &str {
    s.trim()
        .trim_end_matches(['.', ',', ';', ':'])
        .trim()
}

fn strip_list_marker(line: &str) -> &str {
    for marker in ["- [ ] ", "- [x] ", "- ", "* ", "+ ", "> "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim();
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ").or_else(|| line[digits..].strip_prefix(") ")) {
            return rest.trim();
        }
    }
    line
}

/// Sentences of one line. A sentence ends at `.`, `!` or `?` followed by
/// whitespace or the end of the line, so `1.5` and `e.g.x` stay whole.
fn sentences(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_break = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_break {
                let end = idx + c.len_utf8();
                let sentence = line[start..end].trim();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = line[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}
