//! # configure.ac Scraper
//!
//! Picks the auxiliary and macro directories out of a project's
//! `configure.ac`. Only the literal first argument is taken; nothing is
//! expanded.

use crate::PortkitError;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Directory settings found in `configure.ac`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoconfHints {
    /// `AC_CONFIG_AUX_DIR`
    pub aux_dir: Option<String>,
    /// `AC_CONFIG_MACRO_DIR` or `AC_CONFIG_MACRO_DIRS` (first entry)
    pub macro_dir: Option<String>,
}

/// Scrape `configure.ac` text.
pub fn scan(text: &str) -> Result<AutoconfHints, PortkitError> {
    Ok(AutoconfHints {
        aux_dir: first_argument(text, "AC_CONFIG_AUX_DIR")?,
        macro_dir: first_argument(text, "AC_CONFIG_MACRO_DIRS?")?
            .and_then(|dirs| dirs.split_whitespace().next().map(str::to_string)),
    })
}

/// Scrape `configure.ac` (or the older `configure.in`) under
/// `project_root`. A project without one yields no hints.
pub fn scan_project(project_root: &Path) -> Result<AutoconfHints, PortkitError> {
    for name in ["configure.ac", "configure.in"] {
        let path = project_root.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => return scan(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PortkitError::io(path, e)),
        }
    }
    Ok(AutoconfHints::default())
}

fn first_argument(text: &str, macro_pattern: &str) -> Result<Option<String>, PortkitError> {
    let pattern = Regex::new(&format!(
        r"(?m)^[^#\n]*\b{macro_pattern}\(\s*\[?([^\]),]*)\]?\s*[,)]"
    ))
    .map_err(|e| PortkitError::Usage(e.to_string()))?;
    Ok(pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quoted_and_bare_arguments() {
        let hints = scan(
            "AC_INIT([demo], [1.0])\nAC_CONFIG_AUX_DIR([build-aux])\nAC_CONFIG_MACRO_DIR(m4)\n",
        )
        .expect("scan");
        assert_eq!(hints.aux_dir.as_deref(), Some("build-aux"));
        assert_eq!(hints.macro_dir.as_deref(), Some("m4"));
    }

    #[test]
    fn macro_dirs_takes_first_entry() {
        let hints = scan("AC_CONFIG_MACRO_DIRS([m4 gl/m4])\n").expect("scan");
        assert_eq!(hints.macro_dir.as_deref(), Some("m4"));
    }

    #[test]
    fn commented_lines_are_ignored() {
        let hints = scan("# AC_CONFIG_AUX_DIR([old])\ndnl nothing else\n").expect("scan");
        assert_eq!(hints, AutoconfHints::default());
    }

    #[test]
    fn project_without_configure_has_no_hints() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        assert_eq!(
            scan_project(dir.path()).expect("scan"),
            AutoconfHints::default()
        );
    }
}
