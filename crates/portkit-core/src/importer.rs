//! # Importer
//!
//! Runs one import end to end:
//!
//! 1. Read `configure.ac` hints and the previous cache.
//! 2. Merge cached settings with overrides for the mode.
//! 3. Load the catalog through the overlay.
//! 4. Resolve the closure and gate it on licenses.
//! 5. Derive the new file set and reconcile the project against the old one.
//! 6. Rewrite the cache (not under dry-run).
//!
//! Any failure before step 5 leaves the project untouched.

use crate::closure::{self, ClosureResult};
use crate::fileset::{DirLayout, FileSet, LogicalName};
use crate::formats::{autoconf, cache};
use crate::license;
use crate::process::PatchTool;
use crate::reconcile::{ActionRecord, LinkPolicy, Reconciler, Report};
use crate::settings::{ImportMode, Settings, SettingsOverrides};
use crate::{Catalog, Overlay, PortkitError};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What happened to the cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheWrite {
    Created,
    Updated,
    /// Dry-run: nothing written.
    Skipped,
}

/// Result of a successful import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub mode: ImportMode,
    pub settings: Settings,
    pub closure: ClosureResult,
    pub report: Report,
    pub cache_path: PathBuf,
    pub cache: CacheWrite,
}

/// Import context shared by every operation on one project.
#[derive(Debug, Clone)]
pub struct Importer {
    project_root: PathBuf,
    source_dir: PathBuf,
    patch: PatchTool,
    links: LinkPolicy,
    dry_run: bool,
}

impl Importer {
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            source_dir: source_dir.into(),
            patch: PatchTool::default(),
            links: LinkPolicy::default(),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_patch_tool(mut self, patch: PatchTool) -> Self {
        self.patch = patch;
        self
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

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The overlay for `local_dirs` (relative to the project root).
    #[must_use]
    pub fn overlay(&self, local_dirs: &[PathBuf]) -> Overlay {
        Overlay::new(&self.source_dir)
            .with_local_dirs(local_dirs.iter().map(|d| self.project_root.join(d)))
            .with_patch_tool(self.patch.clone())
    }

    /// The catalog visible through `local_dirs`.
    pub fn catalog(&self, local_dirs: &[PathBuf]) -> Result<Catalog, PortkitError> {
        Catalog::load(&self.overlay(local_dirs))
    }

    /// Run an import in `mode`.
    pub fn run(
        &self,
        mode: ImportMode,
        overrides: &SettingsOverrides,
    ) -> Result<ImportOutcome, PortkitError> {
        let hints = autoconf::scan_project(&self.project_root)?;
        let cache_path = cache::path_in(&self.project_root, &overrides.m4_base_hint(&hints));
        let cached = cache::load(&cache_path)?;
        if cached.is_some() {
            tracing::debug!(path = %cache_path.display(), "read cached settings");
        }

        let mut settings = Settings::merge(cached.as_ref(), overrides, mode, &hints)?;
        let overlay = self.overlay(&settings.local_dirs);
        let catalog = Catalog::load(&overlay)?;
        let policy = settings.to_policy();

        let closure = closure::resolve(&settings.modules, &catalog, &policy, policy.tests)?;
        let main_modules = closure
            .main
            .iter()
            .map(|name| catalog.require(name))
            .collect::<Result<Vec<_>, _>>()?;
        license::audit(main_modules, &policy).into_result()?;

        let files = FileSet::from_closure(&closure, &catalog, settings.tests)?;
        let old = cached
            .as_ref()
            .map(|c| c.files.table(&c.layout))
            .unwrap_or_default();
        let new = files.table(&settings.layout);

        tracing::info!(
            %mode,
            modules = closure.full.len(),
            files = new.len(),
            "reconciling project"
        );
        let report = Reconciler::new(&self.project_root, &overlay)
            .with_links(self.links)
            .dry_run(self.dry_run)
            .reconcile(&old, &new)?;

        settings.files = files;
        let cache_path = cache::path_in(&self.project_root, &settings.layout.m4_base);
        let cache = if self.dry_run {
            CacheWrite::Skipped
        } else {
            self.write_cache(&cache_path, &settings)?
        };

        Ok(ImportOutcome {
            mode,
            settings,
            closure,
            report,
            cache_path,
            cache,
        })
    }

    /// Import `overrides.modules` with their tests into a new directory at
    /// the project root. Relative local dirs resolve against that new
    /// directory, so callers pass absolute ones.
    pub fn create_testdir(
        &self,
        overrides: &SettingsOverrides,
    ) -> Result<ImportOutcome, PortkitError> {
        if self.project_root.exists() {
            return Err(PortkitError::Usage(format!(
                "test directory {} already exists",
                self.project_root.display()
            )));
        }
        if !self.dry_run {
            fs::create_dir_all(&self.project_root)
                .map_err(|e| PortkitError::io(&self.project_root, e))?;
        }
        let overrides = SettingsOverrides {
            tests: true,
            ..overrides.clone()
        };
        self.run(ImportMode::Import, &overrides)
    }

    /// Install a single file. Without `destination` the file lands where the
    /// default layout puts it; a destination that is a directory receives the
    /// file under its own name.
    pub fn copy_file(
        &self,
        name: &str,
        destination: Option<&Path>,
        local_dirs: &[PathBuf],
    ) -> Result<ActionRecord, PortkitError> {
        let logical = LogicalName::new(name);
        let destination = match destination {
            None => DirLayout::default().rewrite(&logical),
            Some(dest) if self.project_root.join(dest).is_dir() => {
                let file_name = Path::new(logical.source_name())
                    .file_name()
                    .ok_or_else(|| PortkitError::Usage(format!("{name} is not a file name")))?;
                dest.join(file_name)
            }
            Some(dest) => dest.to_path_buf(),
        };
        let overlay = self.overlay(local_dirs);
        Reconciler::new(&self.project_root, &overlay)
            .with_links(self.links)
            .dry_run(self.dry_run)
            .install(&logical, &destination)
    }

    fn write_cache(&self, path: &Path, settings: &Settings) -> Result<CacheWrite, PortkitError> {
        let existed = path.exists();
        let dir = path
            .parent()
            .map_or_else(|| self.project_root.clone(), Path::to_path_buf);
        fs::create_dir_all(&dir).map_err(|e| PortkitError::io(&dir, e))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| PortkitError::io(&dir, e))?;
        temp.write_all(cache::render(settings).as_bytes())
            .map_err(|e| PortkitError::io(temp.path(), e))?;
        temp.persist(path).map_err(|e| PortkitError::io(path, e.error))?;

        Ok(if existed {
            CacheWrite::Updated
        } else {
            CacheWrite::Created
        })
    }
}
