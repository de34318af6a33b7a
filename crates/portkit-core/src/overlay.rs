//! # Overlay Resolver
//!
//! Fetches the authoritative bytes of a logical file through the layered
//! override system:
//!
//! 1. a verbatim copy in a local override tree (first tree in order wins),
//! 2. otherwise the canonical file patched with every `name.diff` found in the
//!    local trees, applied lowest priority first,
//! 3. otherwise the canonical file itself.
//!
//! A patch failure is fatal; the unpatched canonical file is never returned in
//! its place.

use crate::primitives::DIFF_SUFFIX;
use crate::process::PatchTool;
use crate::PortkitError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// RESOLVED FILE
// =============================================================================

/// Where resolved content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The canonical source tree.
    Root,
    /// A local override tree, by index in tree order.
    Local(usize),
    /// Canonical content patched by local diffs into a scratch file.
    Dynamic,
}

/// Resolved file content, located on disk.
///
/// For [`Origin::Dynamic`] the file lives in a scratch directory owned by
/// this value and removed when it is dropped.
#[derive(Debug)]
pub struct ResolvedFile {
    path: PathBuf,
    origin: Origin,
    _scratch: Option<TempDir>,
}

impl ResolvedFile {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    pub fn read(&self) -> Result<Vec<u8>, PortkitError> {
        fs::read(&self.path).map_err(|e| PortkitError::io(&self.path, e))
    }
}

// =============================================================================
// OVERLAY
// =============================================================================

/// The canonical source tree plus ordered local override trees.
#[derive(Debug, Clone)]
pub struct Overlay {
    canonical: PathBuf,
    locals: Vec<PathBuf>,
    patch: PatchTool,
    /// Where patched scratch copies live; the system temp dir if unset.
    scratch_root: Option<PathBuf>,
}

impl Overlay {
    #[must_use]
    pub fn new(canonical: impl Into<PathBuf>) -> Self {
        Self {
            canonical: canonical.into(),
            locals: Vec::new(),
            patch: PatchTool::default(),
            scratch_root: None,
        }
    }

    /// Add override trees, highest priority first.
    #[must_use]
    pub fn with_local_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.locals.extend(dirs.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_patch_tool(mut self, patch: PatchTool) -> Self {
        self.patch = patch;
        self
    }

    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn canonical(&self) -> &Path {
        &self.canonical
    }

    #[must_use]
    pub fn local_dirs(&self) -> &[PathBuf] {
        &self.locals
    }

    /// Resolve `name` (a source-tree-relative path).
    pub fn resolve(&self, name: &str) -> Result<ResolvedFile, PortkitError> {
        for (index, local) in self.locals.iter().enumerate() {
            let candidate = local.join(name);
            if candidate.is_file() {
                tracing::debug!(file = name, tree = %local.display(), "using local override");
                return Ok(ResolvedFile {
                    path: candidate,
                    origin: Origin::Local(index),
                    _scratch: None,
                });
            }
        }

        let primary = self.canonical.join(name);
        let diff_name = format!("{name}{DIFF_SUFFIX}");
        let diffs: Vec<PathBuf> = self
            .locals
            .iter()
            .rev()
            .map(|local| local.join(&diff_name))
            .filter(|diff| diff.is_file())
            .collect();

        if !primary.is_file() {
            return Err(PortkitError::FileNotFound(name.to_string()));
        }
        if diffs.is_empty() {
            return Ok(ResolvedFile {
                path: primary,
                origin: Origin::Root,
                _scratch: None,
            });
        }

        let scratch_root = self
            .scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let scratch = tempfile::Builder::new()
            .prefix("portkit-")
            .tempdir_in(&scratch_root)
            .map_err(|e| PortkitError::io(&scratch_root, e))?;
        let file_name = Path::new(name)
            .file_name()
            .map_or_else(|| "patched".into(), |n| n.to_os_string());
        let target = scratch.path().join(file_name);
        fs::copy(&primary, &target).map_err(|e| PortkitError::io(&primary, e))?;
        for diff in &diffs {
            tracing::debug!(file = name, diff = %diff.display(), "applying local diff");
            self.patch.apply(&target, diff)?;
        }

        Ok(ResolvedFile {
            path: target,
            origin: Origin::Dynamic,
            _scratch: Some(scratch),
        })
    }

    /// Names directly inside `dir` across all trees. A `X.diff` entry in a
    /// local tree stands for `X`.
    pub fn list_dir(&self, dir: &str) -> Result<BTreeSet<String>, PortkitError> {
        let mut names = entry_names(&self.canonical.join(dir))?;
        for local in &self.locals {
            for entry in entry_names(&local.join(dir))? {
                match entry.strip_suffix(DIFF_SUFFIX) {
                    Some(base) => names.insert(base.to_string()),
                    None => names.insert(entry),
                };
            }
        }
        Ok(names)
    }
}

fn entry_names(dir: &Path) -> Result<BTreeSet<String>, PortkitError> {
    let mut names = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    let entries = fs::read_dir(dir).map_err(|e| PortkitError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PortkitError::io(dir, e))?;
        if entry.path().is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

// =============================================================================
// TESTS
// =============================================================================
