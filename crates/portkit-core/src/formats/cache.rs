//! # Settings Cache
//!
//! The record of the last import, written as m4 macro invocations into
//! `<m4 base>/portkit-cache.m4` so it can live next to the consumer's other
//! macros:
//!
//! ```text
//! pk_LOCAL_DIR([local])
//! pk_MODULES([
//!   getopt
//!   strdup
//! ])
//! pk_SOURCE_BASE([lib])
//! pk_WITH_TESTS
//! pk_LGPL([3])
//! pk_FILE_LIST([
//!   lib/strdup.c
//! ])
//! ```
//!
//! Reading is pattern extraction, not m4 evaluation.

use crate::fileset::{DirLayout, FileSet};
use crate::primitives::CACHE_FILE_NAME;
use crate::settings::Settings;
use crate::{LgplVersion, PortkitError};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const HEADER: &str = "\
# DO NOT EDIT! GENERATED AUTOMATICALLY!
# Written by portkit. Regenerate with `portkit update`.
#
# The settings of the last import, as portkit macro invocations:
";

/// Macros carrying a bracketed argument.
const VALUED: &[&str] = &[
    "LOCAL_DIR",
    "MODULES",
    "AVOID",
    "SOURCE_BASE",
    "M4_BASE",
    "DOC_BASE",
    "TESTS_BASE",
    "AUX_DIR",
    "LGPL",
    "FILE_LIST",
];

/// Bare flag macros, in rendering order.
const FLAGS: &[&str] = &[
    "WITH_TESTS",
    "WITH_OBSOLETE",
    "WITH_CXX_TESTS",
    "WITH_LONGRUNNING_TESTS",
    "WITH_PRIVILEGED_TESTS",
    "WITH_UNPORTABLE_TESTS",
];

/// Location of the cache inside a project with m4 base `m4_base`.
#[must_use]
pub fn path_in(project_root: &Path, m4_base: &str) -> PathBuf {
    project_root.join(m4_base).join(CACHE_FILE_NAME)
}

/// Load the cache at `path`; `None` if there is none.
pub fn load(path: &Path) -> Result<Option<Settings>, PortkitError> {
    match fs::read_to_string(path) {
        Ok(text) => read(&text).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PortkitError::io(path, e)),
    }
}

/// Parse cache text into settings. Macros that are absent take their
/// defaults.
pub fn read(text: &str) -> Result<Settings, PortkitError> {
    let values = extract_values(text)?;
    let flags = extract_flags(text)?;
    let value = |name: &str| values.get(name).map(|v| v.trim());
    let words = |name: &str| -> Vec<String> {
        value(name)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    };

    let defaults = DirLayout::default();
    let base = |name: &str, default: String| value(name).map_or(default, str::to_string);
    let layout = DirLayout {
        source_base: base("SOURCE_BASE", defaults.source_base),
        m4_base: base("M4_BASE", defaults.m4_base),
        doc_base: base("DOC_BASE", defaults.doc_base),
        tests_base: base("TESTS_BASE", defaults.tests_base),
        aux_dir: base("AUX_DIR", defaults.aux_dir),
    };

    let lgpl = value("LGPL")
        .map(str::parse::<LgplVersion>)
        .transpose()
        .map_err(PortkitError::InvalidCache)?;

    let local_dirs = value("LOCAL_DIR")
        .map(|v| {
            v.split(':')
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(Settings {
        modules: words("MODULES").into_iter().collect(),
        avoid: words("AVOID").into_iter().collect(),
        local_dirs,
        layout,
        tests: flags.contains(&"WITH_TESTS"),
        obsolete: flags.contains(&"WITH_OBSOLETE"),
        cxx_tests: flags.contains(&"WITH_CXX_TESTS"),
        longrunning_tests: flags.contains(&"WITH_LONGRUNNING_TESTS"),
        privileged_tests: flags.contains(&"WITH_PRIVILEGED_TESTS"),
        unportable_tests: flags.contains(&"WITH_UNPORTABLE_TESTS"),
        lgpl,
        files: words("FILE_LIST").into_iter().collect::<FileSet>(),
    })
}

fn extract_values(text: &str) -> Result<BTreeMap<&'static str, String>, PortkitError> {
    let pattern = Regex::new(r"(?s)\bpk_([A-Z0-9_]+)\(\[(.*?)\]\)")
        .map_err(|e| PortkitError::InvalidCache(e.to_string()))?;

    let mut values = BTreeMap::new();
    for caps in pattern.captures_iter(text) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());
        if let Some(known) = VALUED.iter().copied().find(|k| *k == name) {
            values.insert(known, body.to_string());
        } else {
            tracing::debug!(macro_name = name, "ignoring unknown cache macro");
        }
    }

    for name in VALUED {
        if !values.contains_key(name) && text.contains(&format!("pk_{name}(")) {
            return Err(PortkitError::InvalidCache(format!(
                "unterminated pk_{name} invocation"
            )));
        }
    }
    Ok(values)
}

fn extract_flags(text: &str) -> Result<Vec<&'static str>, PortkitError> {
    let pattern = Regex::new(r"(?m)^\s*pk_([A-Z_]+)\s*$")
        .map_err(|e| PortkitError::InvalidCache(e.to_string()))?;
    Ok(pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            FLAGS.iter().copied().find(|f| *f == name)
        })
        .collect())
}

/// Render settings as cache text. `read(&render(s)) == s` for settings
/// whose names contain no whitespace.
#[must_use]
pub fn render(settings: &Settings) -> String {
    let mut out = String::from(HEADER);

    let local_dirs: Vec<String> = settings
        .local_dirs
        .iter()
        .map(|d| d.display().to_string())
        .collect();
    let _ = writeln!(out, "pk_LOCAL_DIR([{}])", local_dirs.join(":"));
    render_list(&mut out, "MODULES", settings.modules.iter().map(String::as_str));
    let avoid: Vec<&str> = settings.avoid.iter().map(String::as_str).collect();
    let _ = writeln!(out, "pk_AVOID([{}])", avoid.join(" "));

    let layout = &settings.layout;
    let _ = writeln!(out, "pk_SOURCE_BASE([{}])", layout.source_base);
    let _ = writeln!(out, "pk_M4_BASE([{}])", layout.m4_base);
    let _ = writeln!(out, "pk_DOC_BASE([{}])", layout.doc_base);
    let _ = writeln!(out, "pk_TESTS_BASE([{}])", layout.tests_base);
    let _ = writeln!(out, "pk_AUX_DIR([{}])", layout.aux_dir);

    let enabled = [
        settings.tests,
        settings.obsolete,
        settings.cxx_tests,
        settings.longrunning_tests,
        settings.privileged_tests,
        settings.unportable_tests,
    ];
    for (flag, on) in FLAGS.iter().zip(enabled) {
        if on {
            let _ = writeln!(out, "pk_{flag}");
        }
    }
    if let Some(lgpl) = settings.lgpl {
        let _ = writeln!(out, "pk_LGPL([{lgpl}])");
    }
    render_list(
        &mut out,
        "FILE_LIST",
        settings.files.iter().map(|f| f.as_str()),
    );
    out
}

fn render_list<'a>(out: &mut String, name: &str, items: impl Iterator<Item = &'a str>) {
    let _ = writeln!(out, "pk_{name}([");
    for item in items {
        let _ = writeln!(out, "  {item}");
    }
    let _ = writeln!(out, "])");
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn reads_hand_written_cache() {
        let text = "\
# some comment
pk_LOCAL_DIR([local:vendor/overrides])
pk_MODULES([
  strdup
  getopt
])
pk_AVOID([ canonicalize ])
pk_SOURCE_BASE([gnu])
pk_WITH_TESTS
pk_WITH_PRIVILEGED_TESTS
pk_LGPL([3orGPLv2])
";
        let settings = read(text).expect("read");
        assert_eq!(
            settings.modules,
            BTreeSet::from(["getopt".to_string(), "strdup".to_string()])
        );
        assert!(settings.avoid.contains("canonicalize"));
        assert_eq!(
            settings.local_dirs,
            vec![PathBuf::from("local"), PathBuf::from("vendor/overrides")]
        );
        assert_eq!(settings.layout.source_base, "gnu");
        assert_eq!(settings.layout.m4_base, "m4");
        assert!(settings.tests);
        assert!(settings.privileged_tests);
        assert!(!settings.obsolete);
        assert_eq!(settings.lgpl, Some(LgplVersion::V3OrGplV2));
        assert!(settings.files.is_empty());
    }

    #[test]
    fn rendered_cache_reads_back() {
        let settings = Settings {
            modules: BTreeSet::from(["a".to_string(), "b".to_string()]),
            local_dirs: vec![PathBuf::from("local")],
            obsolete: true,
            lgpl: Some(LgplVersion::V2),
            files: ["lib/a.c", "m4/a.m4"].into_iter().collect(),
            ..Settings::default()
        };
        assert_eq!(read(&render(&settings)).expect("read"), settings);
    }

    #[test]
    fn unterminated_macro_is_invalid() {
        let result = read("pk_MODULES([\n  a\n");
        assert!(matches!(result, Err(PortkitError::InvalidCache(_))));
    }

    #[test]
    fn bad_lgpl_value_is_invalid() {
        let result = read("pk_LGPL([4])\n");
        assert!(matches!(result, Err(PortkitError::InvalidCache(_))));
    }

    #[test]
    fn missing_cache_file_is_none() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = path_in(dir.path(), "m4");
        assert!(load(&path).expect("load").is_none());
    }
}
