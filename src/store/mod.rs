pub mod archive;
pub mod record;
pub mod schema;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::{Config, ARCHIVE_DIR, BRIEF_FILE, SUMMARIES_DIR};
use crate::error::{Result, WaypointError};
use crate::models::*;

use archive::{list_visible_files, same_content, sync_dir, Archive};
use record::Record;
use schema::field;

pub const SOURCE_PREFIX: &str = "source-";
const STAGING_SUFFIX: &str = ".tmp";

/// The on-disk project memory: `summaries/` for live records and `archive/`
/// for everything superseded.
///
/// All state lives in the file layout; a `Workspace` only knows where it is.
#[derive(Debug, Clone)]
pub struct Workspace {
    config: Config,
    archive: Archive,
}

impl Workspace {
    pub fn open(config: Config) -> Self {
        let archive = Archive::new(config.archive_dir(), config.handoff_archive_dir());
        Self { config, archive }
    }

    pub fn open_default() -> Result<Self> {
        Ok(Self::open(Config::from_env()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.config.root()
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.config.summaries_dir()
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Create the directory layout. Idempotent.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [
            self.config.summaries_dir(),
            self.config.archive_dir(),
            self.config.handoff_archive_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(WaypointError::io(&dir))?;
        }
        Ok(())
    }

    // ============================================================
    // Project brief
    // ============================================================

    /// Set up the layout and write the project brief.
    ///
    /// The brief is written once. Re-running with an identical brief is a
    /// no-op; a different brief is a conflict.
    pub fn init(&self, brief: &ProjectBrief) -> Result<PathBuf> {
        let rendered = brief.render()?;
        self.ensure_layout()?;

        let path = self.config.brief_path();
        if path.exists() {
            let existing = fs::read_to_string(&path).map_err(WaypointError::io(&path))?;
            if existing != rendered {
                return Err(WaypointError::Conflict(path));
            }
            tracing::debug!("Project brief already present at {}", path.display());
            return Ok(path);
        }

        let staged = self.stage(BRIEF_FILE, &rendered)?;
        self.commit(&staged, &path)?;
        tracing::info!("Created project brief for '{}' at {}", brief.name, path.display());
        Ok(path)
    }

    pub fn read_brief(&self) -> Result<ProjectBrief> {
        let path = self.config.brief_path();
        if !path.is_file() {
            return Err(WaypointError::NotFound(path));
        }
        let content = fs::read_to_string(&path).map_err(WaypointError::io(&path))?;
        ProjectBrief::parse(&content)
    }

    // ============================================================
    // Summary directory census
    // ============================================================

    /// Live records in `summaries/`: every visible markdown file.
    pub fn summary_files(&self) -> Result<Vec<PathBuf>> {
        Ok(list_visible_files(&self.summaries_dir())?
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect())
    }

    /// Active handoff records in `summaries/`.
    ///
    /// A record that also sits byte for byte in `archive/handoffs/` while a
    /// newer record is live is the tail of an interrupted rotation, not an
    /// active record; see [`Workspace::superseded_handoffs`].
    pub fn active_handoffs(&self) -> Result<Vec<PathBuf>> {
        Ok(self.partition_handoffs()?.0)
    }

    /// Records already copied to the archive whose rotation stopped before
    /// the copy in `summaries/` was removed.
    pub fn superseded_handoffs(&self) -> Result<Vec<PathBuf>> {
        Ok(self.partition_handoffs()?.1)
    }

    fn partition_handoffs(&self) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut live = Vec::new();
        let mut archived = Vec::new();
        for path in self.summary_files()? {
            let Some(name) = file_name(&path).filter(|n| is_handoff_file_name(n)) else {
                continue;
            };
            let slot = self.archive.handoff_destination(name);
            if self.archive.holds_copy(&path, &slot)? {
                archived.push(path);
            } else {
                live.push(path);
            }
        }
        // With no newer record, the archived copy is still the active one.
        if live.is_empty() {
            return Ok((archived, Vec::new()));
        }
        Ok((live, archived))
    }

    /// The single active handoff, if any has been written.
    pub fn active_handoff(&self) -> Result<Option<PathBuf>> {
        let mut active = self.active_handoffs()?;
        match active.len() {
            0 => Ok(None),
            1 => Ok(active.pop()),
            _ => Err(WaypointError::PartialWriteDetected(vec![
                too_many_active(&active),
            ])),
        }
    }

    /// Remove the `summaries/` copies of records whose archive copy is
    /// already in place.
    pub(crate) fn finish_rotations(&self) -> Result<Vec<PathBuf>> {
        let superseded = self.superseded_handoffs()?;
        for path in &superseded {
            let name = file_name(path).ok_or_else(|| WaypointError::NotFound(path.clone()))?;
            self.archive.release(path, &self.archive.handoff_destination(name))?;
            tracing::warn!("Finished interrupted rotation of {}", path.display());
        }
        Ok(superseded)
    }

    pub fn read_handoff(&self, path: &Path) -> Result<HandoffRecord> {
        let content = fs::read_to_string(path).map_err(WaypointError::io(path))?;
        HandoffRecord::from_record(&Record::parse(&content)?)
    }

    pub fn source_summaries(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .summary_files()?
            .into_iter()
            .filter(|p| file_name(p).is_some_and(|n| n.starts_with(SOURCE_PREFIX)))
            .collect())
    }

    // ============================================================
    // Invariant check
    // ============================================================

    /// Verify the layout is consistent: at most one active handoff, no staged
    /// record left uncommitted, and every source summary's original present
    /// in the archive. Reports every violation at once.
    ///
    /// A superseded handoff still in `summaries/` is not a violation; the
    /// next handoff write removes it.
    pub fn check(&self) -> Result<()> {
        let summaries = self.summaries_dir();
        if !summaries.is_dir() {
            return Ok(());
        }
        let mut problems = Vec::new();

        for staged in self.staged_files()? {
            problems.push(format!(
                "staged record {} was never committed",
                staged.display()
            ));
        }

        let active = self.active_handoffs()?;
        if active.len() > 1 {
            problems.push(too_many_active(&active));
        }

        for summary in self.source_summaries()? {
            match self.archived_source_of(&summary) {
                Ok(source) if source.is_file() => {}
                Ok(source) => problems.push(format!(
                    "summary {} has no archived source at {}",
                    summary.display(),
                    source.display()
                )),
                Err(e) => problems.push(format!("summary {} is unreadable: {}", summary.display(), e)),
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            tracing::warn!("Workspace check found {} problem(s)", problems.len());
            Err(WaypointError::PartialWriteDetected(problems))
        }
    }

    fn archived_source_of(&self, summary: &Path) -> Result<PathBuf> {
        let content = fs::read_to_string(summary).map_err(WaypointError::io(summary))?;
        let record = Record::parse(&content)?;
        let source = record
            .text(field::SOURCE)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| WaypointError::SchemaMismatch("summary has no Source".to_string()))?;
        Ok(self.root().join(source))
    }

    /// Remove staged files left behind by an interrupted write. Committed
    /// records are untouched.
    pub fn discard_staged(&self) -> Result<Vec<PathBuf>> {
        if !self.summaries_dir().is_dir() {
            return Ok(Vec::new());
        }
        let staged = self.staged_files()?;
        for path in &staged {
            fs::remove_file(path).map_err(WaypointError::io(path))?;
            tracing::info!("Discarded uncommitted staged file {}", path.display());
        }
        Ok(staged)
    }

    fn staged_files(&self) -> Result<Vec<PathBuf>> {
        let dir = self.summaries_dir();
        let entries = fs::read_dir(&dir).map_err(WaypointError::io(&dir))?;
        let mut staged = Vec::new();
        for entry in entries {
            let entry = entry.map_err(WaypointError::io(&dir))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') && name.ends_with(STAGING_SUFFIX) {
                staged.push(entry.path());
            }
        }
        staged.sort();
        Ok(staged)
    }

    // ============================================================
    // Staged writes
    // ============================================================

    /// Write `contents` to a hidden, synced file in `summaries/` ready to be
    /// committed under `file_name`.
    pub(crate) fn stage(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        let staged = self
            .summaries_dir()
            .join(format!(".{}.{}{}", file_name, Uuid::new_v4(), STAGING_SUFFIX));
        let mut file = File::create(&staged).map_err(WaypointError::io(&staged))?;
        file.write_all(contents.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(WaypointError::io(&staged))?;
        tracing::debug!("Staged {}", staged.display());
        Ok(staged)
    }

    /// Rename a staged file into place. Never replaces a different file.
    pub(crate) fn commit(&self, staged: &Path, dst: &Path) -> Result<()> {
        if dst.exists() && !same_content(staged, dst)? {
            return Err(WaypointError::Conflict(dst.to_path_buf()));
        }
        fs::rename(staged, dst).map_err(WaypointError::io(dst))?;
        if let Some(parent) = dst.parent() {
            sync_dir(parent);
        }
        Ok(())
    }

    pub(crate) fn discard(&self, staged: &Path) {
        if let Err(e) = fs::remove_file(staged) {
            tracing::warn!("Could not remove staged file {}: {}", staged.display(), e);
        }
    }

    /// Path relative to the project root, with `/` separators, as recorded in
    /// summaries and shown to agents.
    pub fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(self.root()).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

pub(crate) fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn too_many_active(active: &[PathBuf]) -> String {
    let names: Vec<&str> = active.iter().filter_map(|p| file_name(p)).collect();
    format!(
        "{} active handoff records in {}/ (expected at most one): {}",
        active.len(),
        SUMMARIES_DIR,
        names.join(", ")
    )
}

/// Archive slot for a source document, relative to the project root.
pub(crate) fn archived_source_ref(file_name: &str) -> String {
    format!("{}/{}", ARCHIVE_DIR, file_name)
}
