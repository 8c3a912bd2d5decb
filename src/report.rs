//! State reporter and plain-text rendering for the CLI.

use crate::config::SOFT_CAP;
use crate::error::Result;
use crate::models::*;
use crate::store::Workspace;

const ACTIVE: char = '●';
const ARCHIVED: char = '○';

/// Whether a census of `file_count` live records calls for consolidation.
pub fn soft_cap_reached(file_count: usize) -> bool {
    file_count >= SOFT_CAP
}

impl Workspace {
    /// Aggregate status from the brief, the active handoff and the census.
    /// Reads only; two calls with no write in between return the same report.
    pub fn report_state(&self) -> Result<StateReport> {
        let brief = self.read_brief()?;

        let (last_session, next_steps, open_questions) = match self.active_handoff()? {
            Some(path) => {
                let record = self.read_handoff(&path)?;
                let session = SessionRef {
                    date: record.date.format(DATE_FORMAT).to_string(),
                    topic: record.topic,
                    path,
                };
                (Some(session), record.next_steps, record.open_questions)
            }
            None => (None, Vec::new(), Vec::new()),
        };

        let file_count = self.summary_files()?.len();
        let warning = soft_cap_reached(file_count);
        if warning {
            tracing::warn!(
                "{} records in summaries/ (soft cap {}); consider consolidating",
                file_count,
                SOFT_CAP
            );
        }

        Ok(StateReport {
            project: brief.name,
            project_type: brief.project_type,
            phase: brief.phase,
            last_session,
            next_steps,
            open_questions,
            file_count,
            warning,
        })
    }
}

/// Render a report for humans.
///
/// Example output:
/// ```text
/// tokenctl (CLI tool), phase: design
/// ├── Last session: 2024-03-01 auth-flow
/// ├── Next steps
/// │   └── implement token refresh
/// ├── Open questions: none
/// └── Records: 3
/// ```
pub fn render_report(report: &StateReport) -> String {
    let mut output = format!(
        "{} ({}), phase: {}\n",
        report.project, report.project_type, report.phase
    );

    let session = match &report.last_session {
        Some(s) => format!("Last session: {} {}", s.date, s.topic),
        None => "Last session: none".to_string(),
    };
    push_leaf(&mut output, &session, false);
    push_list(&mut output, "Next steps", &report.next_steps);
    push_list(&mut output, "Open questions", &report.open_questions);

    let mut records = format!("Records: {}", report.file_count);
    if report.warning {
        records.push_str(&format!(" (soft cap {} reached, consolidate)", SOFT_CAP));
    }
    push_leaf(&mut output, &records, true);
    output
}

/// Render handoff history, one line per record.
///
/// ```text
/// ○ 2024-03-01 auth-flow
/// ● 2024-03-02 token-refresh
/// ```
pub fn render_history(entries: &[HandoffEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        let symbol = match entry.state {
            HandoffState::Active => ACTIVE,
            HandoffState::Archived => ARCHIVED,
        };
        output.push(symbol);
        output.push(' ');
        output.push_str(&entry.date.format(DATE_FORMAT).to_string());
        output.push(' ');
        output.push_str(&entry.topic);
        output.push('\n');
    }
    output
}

fn push_leaf(output: &mut String, text: &str, is_last: bool) {
    output.push_str(if is_last { "└── " } else { "├── " });
    output.push_str(text);
    output.push('\n');
}

fn push_list(output: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        push_leaf(output, &format!("{}: none", label), false);
        return;
    }
    push_leaf(output, label, false);
    for (i, item) in items.iter().enumerate() {
        let branch = if i == items.len() - 1 { "└── " } else { "├── " };
        output.push_str("│   ");
        output.push_str(branch);
        output.push_str(item);
        output.push('\n');
    }
}
