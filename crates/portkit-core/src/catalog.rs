//! # Module Catalog
//!
//! Read-only lookup from module name to [`Module`].
//!
//! Two lookup shapes are deliberately distinct:
//! - [`Catalog::get`] is optional: absence is a normal answer (used for the
//!   `-tests` companion check).
//! - [`Catalog::require`] is mandatory: absence is `UnknownModule`.

use crate::formats::module_desc::parse_module;
use crate::primitives::{MODULES_DIR, NON_MODULE_ENTRIES, TESTS_MODULE_SUFFIX};
use crate::{Module, Overlay, PortkitError};
use std::collections::BTreeMap;

/// All modules visible through an overlay, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: BTreeMap<String, Module>,
}

impl Catalog {
    /// Build a catalog from already constructed modules. A later module with
    /// the same name replaces an earlier one.
    #[must_use]
    pub fn from_modules<I: IntoIterator<Item = Module>>(modules: I) -> Self {
        Self {
            modules: modules
                .into_iter()
                .map(|m| (m.name().to_string(), m))
                .collect(),
        }
    }

    /// Load every module description visible through `overlay`.
    ///
    /// Descriptions are fetched through the overlay, so local overrides and
    /// `.diff` patches apply to them like to any other file.
    pub fn load(overlay: &Overlay) -> Result<Self, PortkitError> {
        let mut modules = BTreeMap::new();
        for name in overlay.list_dir(MODULES_DIR)? {
            if !is_module_entry(&name) {
                continue;
            }
            let bytes = overlay
                .resolve(&format!("{MODULES_DIR}/{name}"))
                .and_then(|resolved| resolved.read())
                .map_err(|e| PortkitError::ModuleLoad {
                    name: name.clone(),
                    source: Box::new(e),
                })?;
            let text = String::from_utf8_lossy(&bytes);
            let module = parse_module(&name, &text)?;
            modules.insert(name, module);
        }
        tracing::debug!(count = modules.len(), "loaded module catalog");
        Ok(Self { modules })
    }

    /// Optional lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Mandatory lookup.
    pub fn require(&self, name: &str) -> Result<&Module, PortkitError> {
        self.get(name)
            .ok_or_else(|| PortkitError::UnknownModule(name.to_string()))
    }

    /// The tests companion of `name`, if the catalog has one.
    #[must_use]
    pub fn tests_module_of(&self, name: &str) -> Option<&Module> {
        self.get(&format!("{name}{TESTS_MODULE_SUFFIX}"))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Modules whose Files section lists `file`.
    pub fn find_by_file<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Module> + 'a {
        self.modules
            .values()
            .filter(move |m| m.files().contains(file))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Whether a `modules/` directory entry names a module description.
fn is_module_entry(name: &str) -> bool {
    !(NON_MODULE_ENTRIES.contains(&name)
        || name.starts_with('.')
        || name.ends_with('~')
        || name.ends_with(".orig")
        || name.ends_with(".rej"))
}

// =============================================================================
// TESTS
// =============================================================================
