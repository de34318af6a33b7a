//! # Settings
//!
//! The persisted configuration of an import and the rules for combining it
//! with command-line overrides.
//!
//! | Mode           | Module list          | Other settings               |
//! |----------------|----------------------|------------------------------|
//! | `Import`       | command line         | command line, then defaults  |
//! | `AddImport`    | cached ∪ command line| cached, then command line    |
//! | `RemoveImport` | cached − command line| cached, then command line    |
//! | `Update`       | cached               | cached, then command line    |
//!
//! Outside `Import`, a directory base given on the command line must agree
//! with the cached one; so must the aux dir declared in `configure.ac`.

use crate::fileset::{DirLayout, FileSet};
use crate::formats::autoconf::AutoconfHints;
use crate::{LgplVersion, Policy, PortkitError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// How an invocation treats the cached settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportMode {
    Import,
    AddImport,
    RemoveImport,
    Update,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Import => "import",
            Self::AddImport => "add-import",
            Self::RemoveImport => "remove-import",
            Self::Update => "update",
        })
    }
}

/// The record written to the cache after a successful import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub modules: BTreeSet<String>,
    pub avoid: BTreeSet<String>,
    /// Local override trees, highest priority first, relative to the project.
    pub local_dirs: Vec<PathBuf>,
    pub layout: DirLayout,
    pub tests: bool,
    pub obsolete: bool,
    pub cxx_tests: bool,
    pub longrunning_tests: bool,
    pub privileged_tests: bool,
    pub unportable_tests: bool,
    pub lgpl: Option<LgplVersion>,
    /// Files installed by the import.
    pub files: FileSet,
}

/// Settings given on the command line. Inclusion flags can only be turned
/// on; `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub modules: Vec<String>,
    pub avoid: Vec<String>,
    pub local_dirs: Vec<PathBuf>,
    pub source_base: Option<String>,
    pub m4_base: Option<String>,
    pub doc_base: Option<String>,
    pub tests_base: Option<String>,
    pub aux_dir: Option<String>,
    pub tests: bool,
    pub obsolete: bool,
    pub cxx_tests: bool,
    pub longrunning_tests: bool,
    pub privileged_tests: bool,
    pub unportable_tests: bool,
    pub lgpl: Option<LgplVersion>,
}

impl SettingsOverrides {
    /// The m4 base to look for the cache in, before any cache is read.
    #[must_use]
    pub fn m4_base_hint(&self, hints: &AutoconfHints) -> String {
        self.m4_base
            .clone()
            .or_else(|| hints.macro_dir.clone())
            .unwrap_or_else(|| DirLayout::default().m4_base)
    }
}

impl Settings {
    /// Combine `cached` (if any) with `overrides` for `mode`.
    ///
    /// The returned settings carry an empty file list; the caller fills it in
    /// after resolution.
    pub fn merge(
        cached: Option<&Self>,
        overrides: &SettingsOverrides,
        mode: ImportMode,
        hints: &AutoconfHints,
    ) -> Result<Self, PortkitError> {
        if mode == ImportMode::Import {
            return Self::fresh(overrides, hints);
        }

        let base = match (cached, mode) {
            (Some(cached), _) => {
                check_consistency(&cached.layout, overrides, hints)?;
                cached.clone()
            }
            (None, ImportMode::AddImport) => Self {
                layout: fresh_layout(overrides, hints),
                ..Self::default()
            },
            (None, _) => {
                return Err(PortkitError::MissingConfig(format!(
                    "{mode} needs a previous import, but no cache file was found"
                )));
            }
        };

        let requested: BTreeSet<String> = overrides.modules.iter().cloned().collect();
        let modules = match mode {
            ImportMode::AddImport => base.modules.union(&requested).cloned().collect(),
            ImportMode::RemoveImport => base.modules.difference(&requested).cloned().collect(),
            ImportMode::Import | ImportMode::Update => base.modules.clone(),
        };

        let mut avoid = base.avoid.clone();
        avoid.extend(overrides.avoid.iter().cloned());

        let local_dirs = if overrides.local_dirs.is_empty() {
            base.local_dirs.clone()
        } else {
            overrides.local_dirs.clone()
        };

        Ok(Self {
            modules,
            avoid,
            local_dirs,
            layout: base.layout.clone(),
            tests: base.tests || overrides.tests,
            obsolete: base.obsolete || overrides.obsolete,
            cxx_tests: base.cxx_tests || overrides.cxx_tests,
            longrunning_tests: base.longrunning_tests || overrides.longrunning_tests,
            privileged_tests: base.privileged_tests || overrides.privileged_tests,
            unportable_tests: base.unportable_tests || overrides.unportable_tests,
            lgpl: overrides.lgpl.or(base.lgpl),
            files: FileSet::new(),
        })
    }

    fn fresh(overrides: &SettingsOverrides, hints: &AutoconfHints) -> Result<Self, PortkitError> {
        if overrides.modules.is_empty() {
            return Err(PortkitError::Usage("no modules specified".to_string()));
        }
        Ok(Self {
            modules: overrides.modules.iter().cloned().collect(),
            avoid: overrides.avoid.iter().cloned().collect(),
            local_dirs: overrides.local_dirs.clone(),
            layout: fresh_layout(overrides, hints),
            tests: overrides.tests,
            obsolete: overrides.obsolete,
            cxx_tests: overrides.cxx_tests,
            longrunning_tests: overrides.longrunning_tests,
            privileged_tests: overrides.privileged_tests,
            unportable_tests: overrides.unportable_tests,
            lgpl: overrides.lgpl,
            files: FileSet::new(),
        })
    }

    /// The resolver policy these settings describe.
    #[must_use]
    pub fn to_policy(&self) -> Policy {
        let policy = Policy {
            tests: self.tests,
            obsolete: self.obsolete,
            cxx_tests: self.cxx_tests,
            longrunning_tests: self.longrunning_tests,
            privileged_tests: self.privileged_tests,
            unportable_tests: self.unportable_tests,
            avoid: self.avoid.clone(),
            layout: self.layout.clone(),
            ..Policy::default()
        };
        match self.lgpl {
            Some(lgpl) => policy.with_lgpl(lgpl),
            None => policy,
        }
    }
}

/// Command-line bases, then `configure.ac`, then defaults.
fn fresh_layout(overrides: &SettingsOverrides, hints: &AutoconfHints) -> DirLayout {
    let defaults = DirLayout::default();
    let pick = |given: &Option<String>, hinted: Option<&String>, default: String| {
        given.clone().or_else(|| hinted.cloned()).unwrap_or(default)
    };
    DirLayout {
        source_base: pick(&overrides.source_base, None, defaults.source_base),
        m4_base: pick(&overrides.m4_base, hints.macro_dir.as_ref(), defaults.m4_base),
        doc_base: pick(&overrides.doc_base, None, defaults.doc_base),
        tests_base: pick(&overrides.tests_base, None, defaults.tests_base),
        aux_dir: pick(&overrides.aux_dir, hints.aux_dir.as_ref(), defaults.aux_dir),
    }
}

fn check_consistency(
    cached: &DirLayout,
    overrides: &SettingsOverrides,
    hints: &AutoconfHints,
) -> Result<(), PortkitError> {
    let given = [
        ("source base", &overrides.source_base, &cached.source_base),
        ("m4 base", &overrides.m4_base, &cached.m4_base),
        ("doc base", &overrides.doc_base, &cached.doc_base),
        ("tests base", &overrides.tests_base, &cached.tests_base),
        ("aux dir", &overrides.aux_dir, &cached.aux_dir),
        ("configure.ac aux dir", &hints.aux_dir, &cached.aux_dir),
    ];
    for (setting, configured, cached) in given {
        if let Some(configured) = configured {
            if configured.trim_end_matches('/') != cached.trim_end_matches('/') {
                return Err(PortkitError::Inconsistent {
                    setting: setting.to_string(),
                    cached: cached.clone(),
                    configured: configured.clone(),
                });
            }
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cached() -> Settings {
        Settings {
            modules: BTreeSet::from(["a".to_string(), "b".to_string()]),
            avoid: BTreeSet::from(["z".to_string()]),
            local_dirs: vec![PathBuf::from("local")],
            obsolete: true,
            lgpl: Some(LgplVersion::V2),
            ..Settings::default()
        }
    }

    fn requesting(modules: &[&str]) -> SettingsOverrides {
        SettingsOverrides {
            modules: modules.iter().map(|m| (*m).to_string()).collect(),
            ..SettingsOverrides::default()
        }
    }

    #[test]
    fn import_ignores_cache() {
        let merged = Settings::merge(
            Some(&cached()),
            &requesting(&["c"]),
            ImportMode::Import,
            &AutoconfHints::default(),
        )
        .expect("merge");
        assert_eq!(merged.modules, BTreeSet::from(["c".to_string()]));
        assert!(merged.avoid.is_empty());
        assert!(!merged.obsolete);
        assert_eq!(merged.lgpl, None);
    }

    #[test]
    fn import_takes_aux_dir_from_configure_ac() {
        let hints = AutoconfHints {
            aux_dir: Some("config".to_string()),
            macro_dir: Some("gl/m4".to_string()),
        };
        let merged =
            Settings::merge(None, &requesting(&["c"]), ImportMode::Import, &hints).expect("merge");
        assert_eq!(merged.layout.aux_dir, "config");
        assert_eq!(merged.layout.m4_base, "gl/m4");
    }

    #[test]
    fn import_without_modules_is_usage_error() {
        let result = Settings::merge(
            None,
            &SettingsOverrides::default(),
            ImportMode::Import,
            &AutoconfHints::default(),
        );
        assert!(matches!(result, Err(PortkitError::Usage(_))));
    }

    #[test]
    fn add_and_remove_adjust_cached_list() {
        let hints = AutoconfHints::default();
        let added = Settings::merge(
            Some(&cached()),
            &requesting(&["c"]),
            ImportMode::AddImport,
            &hints,
        )
        .expect("merge");
        assert_eq!(added.modules.len(), 3);
        assert!(added.obsolete);
        assert_eq!(added.local_dirs, vec![PathBuf::from("local")]);

        let removed = Settings::merge(
            Some(&cached()),
            &requesting(&["a"]),
            ImportMode::RemoveImport,
            &hints,
        )
        .expect("merge");
        assert_eq!(removed.modules, BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn add_import_without_cache_starts_fresh() {
        let hints = AutoconfHints {
            aux_dir: Some("config".to_string()),
            macro_dir: None,
        };
        let merged = Settings::merge(None, &requesting(&["c"]), ImportMode::AddImport, &hints)
            .expect("merge");
        assert_eq!(merged.modules, BTreeSet::from(["c".to_string()]));
        assert_eq!(merged.layout.aux_dir, "config");
    }

    #[test]
    fn update_without_cache_is_missing_config() {
        let result = Settings::merge(
            None,
            &SettingsOverrides::default(),
            ImportMode::Update,
            &AutoconfHints::default(),
        );
        assert!(matches!(result, Err(PortkitError::MissingConfig(_))));
    }

    #[test]
    fn conflicting_base_is_inconsistent() {
        let overrides = SettingsOverrides {
            source_base: Some("gnulib".to_string()),
            ..SettingsOverrides::default()
        };
        let result = Settings::merge(
            Some(&cached()),
            &overrides,
            ImportMode::Update,
            &AutoconfHints::default(),
        );
        assert!(matches!(
            result,
            Err(PortkitError::Inconsistent { setting, .. }) if setting == "source base"
        ));
    }

    #[test]
    fn configure_ac_aux_dir_must_match_cache() {
        let hints = AutoconfHints {
            aux_dir: Some("config".to_string()),
            macro_dir: None,
        };
        let result = Settings::merge(
            Some(&cached()),
            &SettingsOverrides::default(),
            ImportMode::Update,
            &hints,
        );
        assert!(matches!(result, Err(PortkitError::Inconsistent { .. })));
    }

    #[test]
    fn policy_carries_lgpl_and_avoid() {
        let policy = cached().to_policy();
        assert!(policy.avoids("z"));
        assert!(policy.obsolete);
        assert_eq!(
            policy.accepted_licenses,
            BTreeSet::from(["LGPLv2+".to_string()])
        );
    }
}
