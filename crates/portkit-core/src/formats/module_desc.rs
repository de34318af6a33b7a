//! # Module Description Format
//!
//! Parses the line-oriented, sectioned description files under `modules/`:
//!
//! ```text
//! Description:
//! Portable strdup.
//!
//! Files:
//! lib/strdup.c
//! m4/strdup.m4
//!
//! Depends-on:
//! string-h
//! malloc-posix    [test $HAVE_STRDUP = 0]
//!
//! License:
//! LGPLv2+
//! ```
//!
//! A section starts at a line made of a known key and a colon. Lines that
//! merely look like `key:` (Makefile rules, for instance) stay in the body of
//! the current section.

use crate::primitives::DEFAULT_LICENSE;
use crate::types::Snippets;
use crate::{Applicability, Dependency, Module, ModuleStatus, PortkitError};
use std::collections::{BTreeMap, BTreeSet};

/// Section keys, in canonical order.
pub const SECTION_KEYS: &[&str] = &[
    "Description",
    "Comment",
    "Status",
    "Notice",
    "Applicability",
    "Files",
    "Depends-on",
    "configure.ac-early",
    "configure.ac",
    "Makefile.am",
    "Include",
    "Link",
    "License",
    "Maintainer",
];

/// Split a description into raw section bodies, keyed by section name.
#[must_use]
pub fn split_sections(text: &str) -> BTreeMap<&'static str, String> {
    let mut sections: BTreeMap<&'static str, String> = BTreeMap::new();
    let mut current: Option<&'static str> = None;

    for line in text.lines() {
        if let Some(key) = section_header(line) {
            current = Some(key);
            sections.entry(key).or_default();
            continue;
        }
        if let Some(key) = current {
            let body = sections.entry(key).or_default();
            body.push_str(line);
            body.push('\n');
        }
    }

    for body in sections.values_mut() {
        let trimmed = body.trim_end_matches('\n').len();
        body.truncate(trimmed);
        if !body.is_empty() {
            body.push('\n');
        }
    }
    sections
}

fn section_header(line: &str) -> Option<&'static str> {
    let key = line.trim_end().strip_suffix(':')?;
    SECTION_KEYS.iter().copied().find(|k| *k == key)
}

/// Parse the description of module `name`.
pub fn parse_module(name: &str, text: &str) -> Result<Module, PortkitError> {
    let mut sections = split_sections(text);
    let mut take = |key: &str| sections.remove(key).unwrap_or_default();

    let status = take("Status")
        .split_whitespace()
        .next()
        .map_or(ModuleStatus::Normal, ModuleStatus::from_word);

    let applicability_text = take("Applicability");
    let applicability = match applicability_text.trim() {
        "" => Applicability::default_for(name),
        value => Applicability::parse(value).ok_or_else(|| PortkitError::InvalidModule {
            name: name.to_string(),
            reason: format!("unknown applicability '{value}'"),
        })?,
    };

    let files: Vec<String> = take("Files")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    let mut dependencies = BTreeSet::new();
    for line in take("Depends-on").lines() {
        if let Some(dep) = parse_dependency(name, line)? {
            dependencies.insert(dep);
        }
    }

    let license_text = take("License");
    let licenses = normalize_licenses(&license_text);
    if license_text.trim().is_empty() {
        tracing::warn!(module = name, "module lacks a License; assuming {}", DEFAULT_LICENSE);
    }

    let snippets = Snippets {
        description: take("Description"),
        comment: take("Comment"),
        notice: take("Notice"),
        autoconf_early: take("configure.ac-early"),
        autoconf: take("configure.ac"),
        automake: take("Makefile.am"),
        include: take("Include"),
        link: take("Link"),
        maintainer: take("Maintainer"),
    };

    let mut module = Module::new(name)
        .with_status(status)
        .with_applicability(applicability)
        .with_files(files)
        .with_licenses(licenses)
        .with_snippets(snippets);
    for dep in dependencies {
        module = module.with_dependency(dep);
    }
    Ok(module)
}

/// Parse one Depends-on line: `name` or `name [condition]`.
fn parse_dependency(module: &str, line: &str) -> Result<Option<Dependency>, PortkitError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (dep, rest) = match line.split_once(char::is_whitespace) {
        Some((dep, rest)) => (dep, rest.trim()),
        None => (line, ""),
    };
    if rest.is_empty() {
        return Ok(Some(Dependency::new(dep)));
    }
    match rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        Some(condition) => Ok(Some(Dependency::conditional(dep, condition.trim()))),
        None => Err(PortkitError::InvalidModule {
            name: module.to_string(),
            reason: format!("malformed dependency line '{line}'"),
        }),
    }
}

/// Normalize a License section into its constituent licenses.
///
/// Combined strings such as `LGPLv3+ or GPLv2` are split on ` or `; the
/// legacy bare `LGPL` means `LGPLv2+`; an empty section yields the default.
#[must_use]
pub fn normalize_licenses(text: &str) -> BTreeSet<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return BTreeSet::from([DEFAULT_LICENSE.to_string()]);
    }
    text.split(" or ")
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| match l {
            "LGPL" => "LGPLv2+".to_string(),
            other => other.to_string(),
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
