//! # Core Type Definitions
//!
//! This module contains the core types of the portkit engine:
//! - Module records (`Module`, `ModuleStatus`, `Applicability`, `Dependency`)
//! - Error types (`PortkitError`, `ErrorCategory`)
//!
//! ## Determinism Guarantees
//!
//! All collections in this module are `BTreeSet`s so that iteration order,
//! and therefore every derived report, is stable across runs.

use crate::primitives::{DEFAULT_LICENSE, TESTS_MODULE_SUFFIX};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// MODULE STATUS
// =============================================================================

/// Lifecycle status of a module. Every status except `Normal` is gated by a
/// policy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    Normal,
    Obsolete,
    CxxTest,
    LongrunningTest,
    PrivilegedTest,
    UnportableTest,
}

impl ModuleStatus {
    /// Parse the first word of a Status section. Unknown words (for example
    /// `deprecated`) carry no inclusion constraint.
    #[must_use]
    pub fn from_word(word: &str) -> Self {
        match word {
            "obsolete" => Self::Obsolete,
            "c++-test" => Self::CxxTest,
            "longrunning-test" => Self::LongrunningTest,
            "privileged-test" => Self::PrivilegedTest,
            "unportable-test" => Self::UnportableTest,
            _ => Self::Normal,
        }
    }

    /// The word used for this status in module descriptions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Obsolete => "obsolete",
            Self::CxxTest => "c++-test",
            Self::LongrunningTest => "longrunning-test",
            Self::PrivilegedTest => "privileged-test",
            Self::UnportableTest => "unportable-test",
        }
    }
}

// =============================================================================
// APPLICABILITY
// =============================================================================

/// Whether a module belongs to the main build, the test build, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Applicability {
    Main,
    Tests,
    All,
}

impl Applicability {
    /// Default applicability for a module name: `tests` for tests modules,
    /// `main` otherwise.
    #[must_use]
    pub fn default_for(name: &str) -> Self {
        if is_tests_module(name) {
            Self::Tests
        } else {
            Self::Main
        }
    }

    /// Parse an Applicability section value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "main" => Some(Self::Main),
            "tests" => Some(Self::Tests),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Tests => "tests",
            Self::All => "all",
        }
    }
}

/// True if `name` names a tests module.
#[must_use]
pub fn is_tests_module(name: &str) -> bool {
    name.ends_with(TESTS_MODULE_SUFFIX)
}

// =============================================================================
// DEPENDENCY
// =============================================================================

/// A declared dependency: the module name plus an optional build-time
/// condition, kept as an opaque predicate string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub module: String,
    pub condition: Option<String>,
}

impl Dependency {
    /// An unconditional dependency.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            condition: None,
        }
    }

    /// A dependency guarded by `condition`.
    #[must_use]
    pub fn conditional(module: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            condition: Some(condition.into()),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(cond) => write!(f, "{:<30} [{}]", self.module, cond),
            None => f.write_str(&self.module),
        }
    }
}

// =============================================================================
// MODULE
// =============================================================================

/// A named unit of portable source code.
///
/// Built once per run from the catalog and never mutated afterwards; the
/// closure resolver only selects modules, it never edits them. The license
/// set is never empty: a module constructed without licenses carries the
/// default `GPL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    name: String,
    status: ModuleStatus,
    applicability: Applicability,
    files: BTreeSet<String>,
    dependencies: BTreeSet<Dependency>,
    licenses: BTreeSet<String>,
    snippets: Snippets,
}

/// Opaque text fields of a module description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippets {
    pub description: String,
    pub comment: String,
    pub notice: String,
    pub autoconf_early: String,
    pub autoconf: String,
    pub automake: String,
    pub include: String,
    pub link: String,
    pub maintainer: String,
}

impl Module {
    /// Create a module with default status, applicability and license.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let applicability = Applicability::default_for(&name);
        Self {
            name,
            status: ModuleStatus::Normal,
            applicability,
            files: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            licenses: BTreeSet::from([DEFAULT_LICENSE.to_string()]),
            snippets: Snippets::default(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: ModuleStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_applicability(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.files.insert(file.into());
        self
    }

    #[must_use]
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.insert(dependency);
        self
    }

    /// Depend unconditionally on each of `modules`.
    #[must_use]
    pub fn depends_on<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(modules.into_iter().map(Dependency::new));
        self
    }

    /// Replace the license set. An empty input keeps the default license.
    #[must_use]
    pub fn with_licenses<I, S>(mut self, licenses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let licenses: BTreeSet<String> = licenses.into_iter().map(Into::into).collect();
        if !licenses.is_empty() {
            self.licenses = licenses;
        }
        self
    }

    #[must_use]
    pub fn with_snippets(mut self, snippets: Snippets) -> Self {
        self.snippets = snippets;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn status(&self) -> ModuleStatus {
        self.status
    }

    #[must_use]
    pub const fn applicability(&self) -> Applicability {
        self.applicability
    }

    #[must_use]
    pub const fn files(&self) -> &BTreeSet<String> {
        &self.files
    }

    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<Dependency> {
        &self.dependencies
    }

    #[must_use]
    pub const fn licenses(&self) -> &BTreeSet<String> {
        &self.licenses
    }

    #[must_use]
    pub const fn snippets(&self) -> &Snippets {
        &self.snippets
    }

    /// True if this module is itself a tests module.
    #[must_use]
    pub fn is_tests_module(&self) -> bool {
        is_tests_module(&self.name)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification of errors, used for exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed invocation; reported before any resolution work.
    Usage,
    /// Bad or missing input data: unknown modules, missing files,
    /// incompatible licenses, inconsistent settings.
    Data,
    /// The environment failed us: I/O errors, external tool failures.
    Software,
}

/// Errors that can occur in portkit.
///
/// - No silent failures, no retries
/// - Every error aborts the current invocation
#[derive(Debug, Error)]
pub enum PortkitError {
    /// A requested module or a declared dependency is not in the catalog.
    #[error("module {0} doesn't exist")]
    UnknownModule(String),

    /// A file is absent from every source tree.
    #[error("file {0} not found")]
    FileNotFound(String),

    /// A required configuration input is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// A module description could not be interpreted.
    #[error("invalid module description {name}: {reason}")]
    InvalidModule { name: String, reason: String },

    /// A module description could not be fetched through the overlay.
    #[error("cannot load module {name}: {source}")]
    ModuleLoad {
        name: String,
        #[source]
        source: Box<PortkitError>,
    },

    /// The cache file could not be interpreted.
    #[error("invalid cache file: {0}")]
    InvalidCache(String),

    /// Some main modules have licenses incompatible with the requested one.
    /// Carries every offender, not just the first.
    #[error("incompatible license on modules:{}", format_offenders(.0))]
    IncompatibleLicenses(Vec<(String, BTreeSet<String>)>),

    /// The external patch program exited unsuccessfully.
    #[error("patch application failed: {command}\n{stdout}{stderr}")]
    PatchApplication {
        command: String,
        stdout: String,
        stderr: String,
    },

    /// A cached directory setting disagrees with the configured one.
    #[error("{setting} is {configured}, but the cache says {cached}")]
    Inconsistent {
        setting: String,
        cached: String,
        configured: String,
    },

    /// The invocation itself is malformed.
    #[error("{0}")]
    Usage(String),

    /// An I/O error occurred.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PortkitError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Usage(_) => ErrorCategory::Usage,
            Self::ModuleLoad { source, .. } => source.category(),
            Self::UnknownModule(_)
            | Self::FileNotFound(_)
            | Self::MissingConfig(_)
            | Self::InvalidModule { .. }
            | Self::InvalidCache(_)
            | Self::IncompatibleLicenses(_)
            | Self::Inconsistent { .. } => ErrorCategory::Data,
            Self::PatchApplication { .. } | Self::Io { .. } => ErrorCategory::Software,
        }
    }
}

fn format_offenders(offenders: &[(String, BTreeSet<String>)]) -> String {
    offenders
        .iter()
        .map(|(name, licenses)| {
            let licenses: Vec<&str> = licenses.iter().map(String::as_str).collect();
            format!("\n  {} ({})", name, licenses.join(", "))
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applicability_defaults_from_suffix() {
        assert_eq!(Module::new("foo").applicability(), Applicability::Main);
        assert_eq!(
            Module::new("foo-tests").applicability(),
            Applicability::Tests
        );
    }

    #[test]
    fn empty_license_set_keeps_default() {
        let module = Module::new("foo").with_licenses(Vec::<String>::new());
        assert_eq!(
            module.licenses(),
            &BTreeSet::from([DEFAULT_LICENSE.to_string()])
        );
    }

    #[test]
    fn status_words() {
        assert_eq!(ModuleStatus::from_word("obsolete"), ModuleStatus::Obsolete);
        assert_eq!(ModuleStatus::from_word("c++-test"), ModuleStatus::CxxTest);
        assert_eq!(ModuleStatus::from_word("deprecated"), ModuleStatus::Normal);
    }

    #[test]
    fn license_error_lists_every_offender() {
        let err = PortkitError::IncompatibleLicenses(vec![
            ("a".to_string(), BTreeSet::from(["GPL".to_string()])),
            ("b".to_string(), BTreeSet::from(["GPLv3+".to_string()])),
        ]);
        let text = err.to_string();
        assert!(text.contains("a (GPL)"));
        assert!(text.contains("b (GPLv3+)"));
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn conditional_dependency_display() {
        let dep = Dependency::conditional("bar", "test $HAVE_BAR = 0");
        assert!(dep.to_string().ends_with("[test $HAVE_BAR = 0]"));
        assert_eq!(Dependency::new("bar").to_string(), "bar");
    }
}
