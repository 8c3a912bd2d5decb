//! Append-only archive with move semantics.
//!
//! Nothing outside this module writes under `archive/`, and nothing here ever
//! deletes or overwrites an existing entry. A move places the file at its
//! destination before removing the source, so an interrupted move leaves the
//! file in both places rather than in neither.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{Result, WaypointError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file now exists only at the destination.
    Moved,
    /// The destination already held identical content (a prior move was
    /// interrupted); the source was removed to finish it.
    AlreadyArchived,
}

#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
    handoffs: PathBuf,
}

impl Archive {
    pub fn new(root: PathBuf, handoffs: PathBuf) -> Self {
        Self { root, handoffs }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Archive slot for a processed source document.
    pub fn source_destination(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Archive slot for a superseded handoff record.
    pub fn handoff_destination(&self, file_name: &str) -> PathBuf {
        self.handoffs.join(file_name)
    }

    /// Fail with `Conflict` if moving `src` to `dst` would collide with a
    /// different file. Used to validate before any mutation begins.
    pub fn ensure_vacant(&self, src: &Path, dst: &Path) -> Result<()> {
        if dst.exists() && !same_content(src, dst)? {
            return Err(WaypointError::Conflict(dst.to_path_buf()));
        }
        Ok(())
    }

    /// Relocate `src` to `dst`. On success `src` no longer exists.
    pub fn move_file(&self, src: &Path, dst: &Path) -> Result<MoveOutcome> {
        let outcome = self.link(src, dst)?;
        fs::remove_file(src).map_err(WaypointError::io(src))?;
        match outcome {
            MoveOutcome::Moved => {
                tracing::info!("Archived {} -> {}", src.display(), dst.display())
            }
            MoveOutcome::AlreadyArchived => tracing::warn!(
                "{} was already archived at {}; removed the leftover copy",
                src.display(),
                dst.display()
            ),
        }
        Ok(outcome)
    }

    /// First half of a move: put a copy of `src` at `dst` and leave `src`
    /// where it is. Identical content already at `dst` counts as done.
    pub fn link(&self, src: &Path, dst: &Path) -> Result<MoveOutcome> {
        if !src.is_file() {
            return Err(WaypointError::NotFound(src.to_path_buf()));
        }
        if dst.exists() {
            if !same_content(src, dst)? {
                return Err(WaypointError::Conflict(dst.to_path_buf()));
            }
            return Ok(MoveOutcome::AlreadyArchived);
        }

        let parent = dst
            .parent()
            .ok_or_else(|| WaypointError::NotFound(dst.to_path_buf()))?;
        fs::create_dir_all(parent).map_err(WaypointError::io(parent))?;

        place(src, dst)?;
        sync_dir(parent);
        Ok(MoveOutcome::Moved)
    }

    /// Second half of a move: remove `src` once `dst` holds the same bytes.
    pub fn release(&self, src: &Path, dst: &Path) -> Result<()> {
        if !dst.is_file() || !same_content(src, dst)? {
            return Err(WaypointError::Conflict(dst.to_path_buf()));
        }
        fs::remove_file(src).map_err(WaypointError::io(src))?;
        if let Some(parent) = src.parent() {
            sync_dir(parent);
        }
        Ok(())
    }

    /// Whether `src` already sits byte for byte at `dst`.
    pub fn holds_copy(&self, src: &Path, dst: &Path) -> Result<bool> {
        Ok(dst.is_file() && same_content(src, dst)?)
    }

    /// Archived handoff records, sorted by file name (and so by date).
    pub fn handoff_entries(&self) -> Result<Vec<PathBuf>> {
        list_visible_files(&self.handoffs)
    }

    /// Top-level archive entries (processed source documents).
    pub fn source_entries(&self) -> Result<Vec<PathBuf>> {
        list_visible_files(&self.root)
    }
}

/// Put a copy of `src` at `dst` without ever replacing an existing file.
///
/// A hard link is atomic and refuses to clobber. Where links are unavailable
/// (another filesystem), the content is copied to a hidden temp file, synced,
/// and renamed into place.
fn place(src: &Path, dst: &Path) -> Result<()> {
    match fs::hard_link(src, dst) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(WaypointError::Conflict(dst.to_path_buf()));
        }
        Err(e) => tracing::debug!("hard link to {} failed ({}); copying", dst.display(), e),
    }

    let parent = dst.parent().unwrap_or_else(|| Path::new("."));
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(".{}.{}.tmp", name, Uuid::new_v4()));

    let copied = fs::copy(src, &temp)
        .and_then(|_| File::open(&temp)?.sync_all())
        .map_err(WaypointError::io(&temp));
    if let Err(e) = copied {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    if dst.exists() {
        let _ = fs::remove_file(&temp);
        return Err(WaypointError::Conflict(dst.to_path_buf()));
    }
    fs::rename(&temp, dst).map_err(WaypointError::io(dst))
}

/// Best-effort directory fsync so a rename or link survives a crash.
pub(crate) fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

/// Byte-for-byte comparison of two files.
pub(crate) fn same_content(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = fs::metadata(a).map_err(WaypointError::io(a))?;
    let meta_b = fs::metadata(b).map_err(WaypointError::io(b))?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut file_a = File::open(a).map_err(WaypointError::io(a))?;
    let mut file_b = File::open(b).map_err(WaypointError::io(b))?;
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let n = file_a.read(&mut buf_a).map_err(WaypointError::io(a))?;
        if n == 0 {
            return Ok(true);
        }
        file_b
            .read_exact(&mut buf_b[..n])
            .map_err(WaypointError::io(b))?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
    }
}

/// Regular, non-hidden files directly under `dir`, sorted. A missing
/// directory has no entries.
pub(crate) fn list_visible_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WaypointError::io(dir)(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(WaypointError::io(dir))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let is_file = entry
            .file_type()
            .map_err(WaypointError::io(dir))?
            .is_file();
        if is_file && !hidden {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
