//! # Reconciliation Engine
//!
//! Brings a project tree in line with a newly computed file set, given the
//! file set recorded by the previous run:
//!
//! - `removed = old - new`: backed up to `name~`, then deleted.
//! - `added = new - old`: content fetched through the overlay. If a foreign
//!   file already sits at the destination it is backed up before being
//!   replaced.
//! - `kept = old ∩ new`: rewritten (with backup) only if the bytes differ.
//!
//! Files are compared by destination path. Each file is handled on its own;
//! a failure aborts the run but leaves earlier files (and their backups) in
//! place. Under dry-run nothing is written and every intended action is still
//! reported.

use crate::fileset::{FileTable, LogicalName};
use crate::overlay::{Origin, Overlay, ResolvedFile};
use crate::primitives::BACKUP_SUFFIX;
use crate::PortkitError;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

// =============================================================================
// LINK MODES
// =============================================================================

/// How a resolved file is materialized in the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    #[default]
    Copy,
    Symlink,
    Hardlink,
}

/// Link modes for canonical and local-override content. Dynamically patched
/// content is always copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkPolicy {
    pub canonical: LinkMode,
    pub local: LinkMode,
}

impl LinkPolicy {
    const fn mode_for(self, origin: Origin) -> LinkMode {
        match origin {
            Origin::Root => self.canonical,
            Origin::Local(_) => self.local,
            Origin::Dynamic => LinkMode::Copy,
        }
    }
}

// =============================================================================
// PLAN
// =============================================================================

/// One file of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Project-relative destination.
    pub destination: PathBuf,
    pub logical: LogicalName,
    /// Whether something already exists at the destination.
    pub exists: bool,
}

/// Partition of `old ∪ new` by destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub removed: Vec<PlannedFile>,
    pub added: Vec<PlannedFile>,
    pub kept: Vec<PlannedFile>,
}

impl Plan {
    /// Partition `old` and `new`, surveying `project_root` for existing
    /// destinations.
    #[must_use]
    pub fn compute(old: &FileTable, new: &FileTable, project_root: &Path) -> Self {
        let planned = |destination: &PathBuf, logical: &LogicalName| PlannedFile {
            destination: destination.clone(),
            logical: logical.clone(),
            exists: project_root.join(destination).symlink_metadata().is_ok(),
        };

        let mut plan = Self::default();
        for (destination, logical) in old.iter() {
            if !new.contains(destination) {
                plan.removed.push(planned(destination, logical));
            }
        }
        for (destination, logical) in new.iter() {
            if old.contains(destination) {
                plan.kept.push(planned(destination, logical));
            } else {
                plan.added.push(planned(destination, logical));
            }
        }
        plan
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// What happened (or would happen) to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Remove,
    Copy,
    /// Added over a file that was not ours.
    Replace,
    Update,
    Unchanged,
}

impl FileAction {
    /// Report line for this action, or `None` for unchanged files.
    #[must_use]
    pub fn describe(self, destination: &Path, dry_run: bool) -> Option<String> {
        let d = destination.display();
        let line = match (self, dry_run) {
            (Self::Unchanged, _) => return None,
            (Self::Remove, true) => format!("Remove file {d} (backup in {d}{BACKUP_SUFFIX})"),
            (Self::Remove, false) => format!("Removing file {d} (backup in {d}{BACKUP_SUFFIX})"),
            (Self::Copy, true) => format!("Copy file {d}"),
            (Self::Copy, false) => format!("Copying file {d}"),
            (Self::Replace, true) => {
                format!("Replace file {d} (foreign code backed up in {d}{BACKUP_SUFFIX}) !!")
            }
            (Self::Replace, false) => {
                format!("Replacing file {d} (foreign code backed up in {d}{BACKUP_SUFFIX}) !!")
            }
            (Self::Update, true) => format!("Update file {d} (backup in {d}{BACKUP_SUFFIX})"),
            (Self::Update, false) => format!("Updating file {d} (backup in {d}{BACKUP_SUFFIX})"),
        };
        Some(line)
    }
}

/// One reported action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub destination: PathBuf,
    pub logical: LogicalName,
    pub action: FileAction,
}

/// Outcome of a reconciliation, in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub dry_run: bool,
    pub removed: Vec<ActionRecord>,
    /// Copies and replacements.
    pub added: Vec<ActionRecord>,
    pub updated: Vec<ActionRecord>,
    pub unchanged: Vec<ActionRecord>,
}

impl Report {
    /// True if nothing was (or would be) written.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.updated.is_empty()
    }

    /// Human-readable lines: removals, additions, updates.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.removed
            .iter()
            .chain(&self.added)
            .chain(&self.updated)
            .filter_map(|r| r.action.describe(&r.destination, self.dry_run))
            .collect()
    }
}

// =============================================================================
// RECONCILER
// =============================================================================

/// Applies plans to one project tree.
#[derive(Debug, Clone)]
pub struct Reconciler<'a> {
    project_root: &'a Path,
    overlay: &'a Overlay,
    links: LinkPolicy,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub const fn new(project_root: &'a Path, overlay: &'a Overlay) -> Self {
        Self {
            project_root,
            overlay,
            links: LinkPolicy {
                canonical: LinkMode::Copy,
                local: LinkMode::Copy,
            },
            dry_run: false,
        }
    }

    #[must_use]
    pub const fn with_links(mut self, links: LinkPolicy) -> Self {
        self.links = links;
        self
    }

    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Plan and apply in one step.
    pub fn reconcile(&self, old: &FileTable, new: &FileTable) -> Result<Report, PortkitError> {
        let plan = Plan::compute(old, new, self.project_root);
        self.apply(&plan)
    }

    /// Apply `plan`.
    pub fn apply(&self, plan: &Plan) -> Result<Report, PortkitError> {
        let mut report = Report {
            dry_run: self.dry_run,
            ..Report::default()
        };

        for file in &plan.removed {
            if !file.exists {
                tracing::debug!(file = %file.destination.display(), "removed file already absent");
                continue;
            }
            if !self.dry_run {
                let target = self.project_root.join(&file.destination);
                backup(&target)?;
                fs::remove_file(&target).map_err(|e| PortkitError::io(&target, e))?;
            }
            report.removed.push(record(file, FileAction::Remove));
        }

        for file in &plan.added {
            let action = if file.exists {
                FileAction::Replace
            } else {
                FileAction::Copy
            };
            let resolved = self.overlay.resolve(file.logical.source_name())?;
            if !self.dry_run {
                self.write(&resolved, &file.destination, file.exists)?;
            }
            report.added.push(record(file, action));
        }

        for file in &plan.kept {
            let resolved = self.overlay.resolve(file.logical.source_name())?;
            if !file.exists {
                if !self.dry_run {
                    self.write(&resolved, &file.destination, false)?;
                }
                report.added.push(record(file, FileAction::Copy));
                continue;
            }
            let target = self.project_root.join(&file.destination);
            if current_content(&target)? == Some(resolved.read()?) {
                report.unchanged.push(record(file, FileAction::Unchanged));
                continue;
            }
            if !self.dry_run {
                self.write(&resolved, &file.destination, true)?;
            }
            report.updated.push(record(file, FileAction::Update));
        }

        Ok(report)
    }

    /// Install a single file outside any plan, with the same backup rules.
    pub fn install(
        &self,
        logical: &LogicalName,
        destination: &Path,
    ) -> Result<ActionRecord, PortkitError> {
        let resolved = self.overlay.resolve(logical.source_name())?;
        let target = self.project_root.join(destination);
        let exists = target.symlink_metadata().is_ok();
        let action = if !exists {
            FileAction::Copy
        } else if current_content(&target)? == Some(resolved.read()?) {
            FileAction::Unchanged
        } else {
            FileAction::Update
        };
        if !self.dry_run && action != FileAction::Unchanged {
            self.write(&resolved, destination, exists)?;
        }
        Ok(ActionRecord {
            destination: destination.to_path_buf(),
            logical: logical.clone(),
            action,
        })
    }

    /// Materialize `resolved` at the project-relative `destination`.
    fn write(
        &self,
        resolved: &ResolvedFile,
        destination: &Path,
        with_backup: bool,
    ) -> Result<(), PortkitError> {
        let target = self.project_root.join(destination);
        if with_backup {
            backup(&target)?;
        }
        let parent = target
            .parent()
            .map_or_else(|| self.project_root.to_path_buf(), Path::to_path_buf);
        fs::create_dir_all(&parent).map_err(|e| PortkitError::io(&parent, e))?;

        let mode = self.links.mode_for(resolved.origin());
        tracing::debug!(file = %destination.display(), ?mode, backup = with_backup, "writing file");
        match mode {
            LinkMode::Copy => write_atomic(resolved.path(), &target, &parent),
            LinkMode::Symlink => {
                let source = fs::canonicalize(resolved.path())
                    .map_err(|e| PortkitError::io(resolved.path(), e))?;
                remove_existing(&target)?;
                symlink(&source, &target).map_err(|e| PortkitError::io(&target, e))
            }
            LinkMode::Hardlink => {
                remove_existing(&target)?;
                fs::hard_link(resolved.path(), &target).map_err(|e| PortkitError::io(&target, e))
            }
        }
    }
}

fn record(file: &PlannedFile, action: FileAction) -> ActionRecord {
    ActionRecord {
        destination: file.destination.clone(),
        logical: file.logical.clone(),
        action,
    }
}

// =============================================================================
// FILE PRIMITIVES
// =============================================================================

/// The backup location of `path`.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copy the current content of `path` to `path~`, replacing any previous
/// backup. A symlink is backed up as a link to the same target, so a
/// dangling link can still be backed up.
fn backup(path: &Path) -> Result<PathBuf, PortkitError> {
    let backup = backup_path(path);
    remove_existing(&backup)?;
    let metadata = path.symlink_metadata().map_err(|e| PortkitError::io(path, e))?;
    if metadata.file_type().is_symlink() {
        let link = fs::read_link(path).map_err(|e| PortkitError::io(path, e))?;
        symlink(&link, &backup).map_err(|e| PortkitError::io(&backup, e))?;
    } else {
        fs::copy(path, &backup).map_err(|e| PortkitError::io(path, e))?;
    }
    Ok(backup)
}

/// Bytes at `path`, or `None` for a symlink whose target is gone.
fn current_content(path: &Path) -> Result<Option<Vec<u8>>, PortkitError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && path.symlink_metadata().is_ok() => {
            tracing::debug!(file = %path.display(), "dangling symlink");
            Ok(None)
        }
        Err(e) => Err(PortkitError::io(path, e)),
    }
}

/// Remove whatever sits at `path` (file or link), if anything.
fn remove_existing(path: &Path) -> Result<(), PortkitError> {
    if path.symlink_metadata().is_ok() {
        fs::remove_file(path).map_err(|e| PortkitError::io(path, e))?;
    }
    Ok(())
}

/// Copy `source` over `target` through a temporary file in the target
/// directory, so the target is either old or new, never partial. The rename
/// replaces a link at `target` rather than writing through it.
fn write_atomic(source: &Path, target: &Path, dir: &Path) -> Result<(), PortkitError> {
    let bytes = fs::read(source).map_err(|e| PortkitError::io(source, e))?;
    let permissions = fs::metadata(source)
        .map_err(|e| PortkitError::io(source, e))?
        .permissions();

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| PortkitError::io(dir, e))?;
    temp.write_all(&bytes)
        .map_err(|e| PortkitError::io(temp.path(), e))?;
    fs::set_permissions(temp.path(), permissions).map_err(|e| PortkitError::io(temp.path(), e))?;
    temp.persist(target)
        .map_err(|e| PortkitError::io(target, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source, target)
}

// =============================================================================
// TESTS
// =============================================================================
