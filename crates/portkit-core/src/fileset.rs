//! # File Sets
//!
//! Logical file names and their placement in the consuming project.
//!
//! A logical name is the name a module description uses (`lib/foo.c`,
//! `m4/foo.m4`). Files that a test-only module needs from `lib/` get the
//! placement prefix `tests=lib/`: they are sourced from `lib/` but installed
//! into the tests directory. The prefix is a tracked rewrite, carried by
//! [`LogicalName`], not an ad-hoc string substitution at use sites.

use crate::closure::ClosureResult;
use crate::primitives::{MANIFEST_FILES, TESTS_LIB_PREFIX};
use crate::{Catalog, PortkitError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// LOGICAL NAME
// =============================================================================

/// A repository-relative file name as used by module descriptions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalName(String);

impl LogicalName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name to look up in source trees. Strips the `tests=` placement
    /// prefix, so `tests=lib/foo.c` is fetched as `lib/foo.c`.
    #[must_use]
    pub fn source_name(&self) -> &str {
        if self.0.starts_with(TESTS_LIB_PREFIX) {
            &self.0["tests=".len()..]
        } else {
            &self.0
        }
    }

    /// Move a `lib/` file to the tests side. Other names are unchanged.
    #[must_use]
    pub fn into_tests_side(self) -> Self {
        match self.0.strip_prefix("lib/") {
            Some(rest) => Self(format!("{TESTS_LIB_PREFIX}{rest}")),
            None => self,
        }
    }
}

impl fmt::Display for LogicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// DIRECTORY LAYOUT
// =============================================================================

/// The consumer's directory names for each logical root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirLayout {
    pub source_base: String,
    pub m4_base: String,
    pub doc_base: String,
    pub tests_base: String,
    pub aux_dir: String,
}

impl Default for DirLayout {
    fn default() -> Self {
        Self {
            source_base: "lib".to_string(),
            m4_base: "m4".to_string(),
            doc_base: "doc".to_string(),
            tests_base: "tests".to_string(),
            aux_dir: "build-aux".to_string(),
        }
    }
}

impl DirLayout {
    /// Project-relative destination of a logical name.
    ///
    /// Only the leading marker is substituted, exactly once. Names without a
    /// known marker (including names starting with `..`) are kept verbatim.
    #[must_use]
    pub fn rewrite(&self, name: &LogicalName) -> PathBuf {
        let name = name.as_str();
        let markers: [(&str, &str); 7] = [
            (TESTS_LIB_PREFIX, &self.tests_base),
            ("lib/", &self.source_base),
            ("m4/", &self.m4_base),
            ("doc/", &self.doc_base),
            ("tests/", &self.tests_base),
            ("build-aux/", &self.aux_dir),
            ("top/", ""),
        ];
        for (marker, dir) in markers {
            if let Some(rest) = name.strip_prefix(marker) {
                return join_base(dir, rest);
            }
        }
        PathBuf::from(name)
    }
}

fn join_base(base: &str, rest: &str) -> PathBuf {
    let base = base.trim_end_matches('/');
    if base.is_empty() || base == "." {
        PathBuf::from(rest)
    } else {
        Path::new(base).join(rest)
    }
}

// =============================================================================
// FILE SET
// =============================================================================

/// The logical names an import installs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet(BTreeSet<LogicalName>);

impl FileSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the file set from a closure: every final module's files plus the
    /// manifest, with test-only `lib/` files moved to the tests side.
    ///
    /// Membership depends only on the closure and the catalog.
    pub fn from_closure(
        closure: &ClosureResult,
        catalog: &Catalog,
        include_tests: bool,
    ) -> Result<Self, PortkitError> {
        let mut files: BTreeSet<LogicalName> =
            MANIFEST_FILES.iter().map(|f| LogicalName::from(*f)).collect();

        let modules = if include_tests {
            &closure.full
        } else {
            &closure.main
        };
        for name in modules {
            let module = catalog.require(name)?;
            let test_only = closure.test_only.contains(name);
            for file in module.files() {
                let logical = LogicalName::new(file.as_str());
                files.insert(if test_only {
                    logical.into_tests_side()
                } else {
                    logical
                });
            }
        }
        Ok(Self(files))
    }

    #[must_use]
    pub fn contains(&self, name: &LogicalName) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogicalName> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Place every name with `layout`.
    #[must_use]
    pub fn table(&self, layout: &DirLayout) -> FileTable {
        FileTable(
            self.0
                .iter()
                .map(|name| (layout.rewrite(name), name.clone()))
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<S> for FileSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(LogicalName::new).collect())
    }
}

/// Destination path → logical name, for one layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTable(BTreeMap<PathBuf, LogicalName>);

impl FileTable {
    #[must_use]
    pub fn get(&self, destination: &Path) -> Option<&LogicalName> {
        self.0.get(destination)
    }

    #[must_use]
    pub fn contains(&self, destination: &Path) -> bool {
        self.0.contains_key(destination)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &LogicalName)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
