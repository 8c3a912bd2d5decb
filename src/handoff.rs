//! Handoff writer: rotates the single active session record.

use std::fs;

use crate::error::{Result, WaypointError};
use crate::models::*;
use crate::store::{file_name, Workspace};

/// Pick the template mode for a handoff.
///
/// An explicit mode wins; otherwise it is derived from the session count.
/// With neither there is nothing to go on.
pub fn resolve_mode(explicit: Option<Mode>, session_count: Option<u32>) -> Result<Mode> {
    match (explicit, session_count) {
        (Some(mode), _) => Ok(mode),
        (None, Some(sessions)) => Ok(Mode::for_session_count(sessions)),
        (None, None) => Err(WaypointError::AmbiguousMode),
    }
}

impl Workspace {
    /// Write a new handoff record and archive the one it replaces.
    ///
    /// Everything is validated before the first write. The new record is then
    /// staged, the previous record is copied into `archive/handoffs/`, the
    /// staged record is renamed into place, and only then is the previous
    /// record removed from `summaries/`. An interrupted write leaves the old
    /// record in both places, possibly next to an uncommitted staged file
    /// (reported by [`Workspace::check`], cleared by
    /// [`Workspace::discard_staged`]) or next to the committed new record
    /// (removed by the next write).
    pub fn generate_handoff(
        &self,
        facts: SessionFacts,
        mode: Option<Mode>,
    ) -> Result<HandoffOutcome> {
        let mode = resolve_mode(mode, facts.session_count)?;
        let record = HandoffRecord::from_facts(facts, mode)?;
        let rendered = record.to_record().render()?;

        self.check()?;

        let name = record.file_name();
        let path = self.summaries_dir().join(&name);
        let previous = self.active_handoff()?;

        if previous.as_deref() == Some(path.as_path()) {
            let existing = fs::read_to_string(&path).map_err(WaypointError::io(&path))?;
            if existing != rendered {
                return Err(WaypointError::Conflict(path));
            }
            tracing::debug!("Handoff {} already written; nothing to do", name);
            return Ok(HandoffOutcome {
                record_path: path,
                archived_previous: None,
                synopsis: record.synopsis(),
            });
        }
        if path.exists() {
            return Err(WaypointError::Conflict(path));
        }

        // The new record will itself be archived by the next write.
        let future_slot = self.archive().handoff_destination(&name);
        if future_slot.exists() {
            let archived = fs::read_to_string(&future_slot).map_err(WaypointError::io(&future_slot))?;
            if archived != rendered {
                return Err(WaypointError::Conflict(future_slot));
            }
        }

        let displaced = match &previous {
            Some(prev) => {
                let prev_name = file_name(prev)
                    .ok_or_else(|| WaypointError::NotFound(prev.to_path_buf()))?;
                let dst = self.archive().handoff_destination(prev_name);
                self.archive().ensure_vacant(prev, &dst)?;
                Some((prev.clone(), dst))
            }
            None => None,
        };

        self.ensure_layout()?;
        self.finish_rotations()?;

        let staged = self.stage(&name, &rendered)?;
        if let Some((prev, dst)) = &displaced {
            if let Err(e) = self.archive().link(prev, dst) {
                self.discard(&staged);
                return Err(e);
            }
        }
        if let Err(e) = self.commit(&staged, &path) {
            self.discard(&staged);
            return Err(e);
        }
        if let Some((prev, dst)) = &displaced {
            self.archive().release(prev, dst)?;
        }

        let archived_previous = displaced.map(|(_, dst)| dst);
        match &archived_previous {
            Some(dst) => tracing::info!(
                "Wrote handoff {} (previous record archived at {})",
                path.display(),
                dst.display()
            ),
            None => tracing::info!("Wrote first handoff {}", path.display()),
        }
        Ok(HandoffOutcome {
            record_path: path,
            archived_previous,
            synopsis: record.synopsis(),
        })
    }

    /// Every handoff on disk, archived ones first, oldest first.
    pub fn handoffs(&self) -> Result<Vec<HandoffEntry>> {
        let archived = self
            .archive()
            .handoff_entries()?
            .into_iter()
            .map(|path| (HandoffState::Archived, path));
        let active = self
            .active_handoffs()?
            .into_iter()
            .map(|path| (HandoffState::Active, path));

        let mut entries: Vec<HandoffEntry> = archived
            .chain(active)
            .filter_map(|(state, path)| {
                let (date, topic) = file_name(&path).and_then(parse_handoff_file_name)?;
                Some(HandoffEntry {
                    state,
                    date,
                    topic,
                    path,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.state == HandoffState::Active, a.date, &a.topic)
                .cmp(&(b.state == HandoffState::Active, b.date, &b.topic))
        });
        Ok(entries)
    }
}
