//! # Innate Primitives
//!
//! Hardcoded constants for the portkit CORE.
//!
//! These are compiled into the binary and are immutable at runtime. They fix
//! the on-disk conventions shared by the canonical module tree, local override
//! trees and the consuming project.

/// Suffix that marks a module as the test companion of another module.
///
/// `foo-tests` is the tests module of `foo`.
pub const TESTS_MODULE_SUFFIX: &str = "-tests";

/// Suffix appended to a project file when it is backed up before an
/// overwrite or removal. Only the most recent backup is kept.
pub const BACKUP_SUFFIX: &str = "~";

/// Suffix of a local override that patches a canonical file instead of
/// replacing it.
pub const DIFF_SUFFIX: &str = ".diff";

/// Directory, relative to a source tree, holding module descriptions.
pub const MODULES_DIR: &str = "modules";

/// Name of the cache file written into the project's m4 base.
pub const CACHE_FILE_NAME: &str = "portkit-cache.m4";

/// Project-level configuration file name.
pub const CONFIG_FILE_NAME: &str = "portkit.toml";

/// Placement prefix for files that live in `lib/` in the source tree but are
/// installed into the project's tests directory.
pub const TESTS_LIB_PREFIX: &str = "tests=lib/";

/// Files the library itself contributes to every import.
pub const MANIFEST_FILES: &[&str] = &[
    "m4/00portkit.m4",
    "m4/portkit-common.m4",
    "m4/zzportkit.m4",
];

/// Entries of a `modules/` directory that are never module descriptions.
pub const NON_MODULE_ENTRIES: &[&str] = &[
    "CVS",
    "ChangeLog",
    "COPYING",
    "README",
    "TEMPLATE",
    "TEMPLATE-EXTENDED",
    "TEMPLATE-TESTS",
];

// =============================================================================
// LICENSES
// =============================================================================

/// License assumed when a module description has no License section.
pub const DEFAULT_LICENSE: &str = "GPL";

/// Licenses that never restrict the consumer.
///
/// A module under one of these is acceptable regardless of the license the
/// consumer asked for.
pub const IGNORED_LICENSES: &[&str] = &[
    "public domain",
    "unlimited",
    "unmodifiable license text",
    "GPLed build tool",
];

/// The LGPL family. The license audit only runs when the accepted set
/// intersects this list.
pub const LGPL_FAMILY: &[&str] = &["LGPLv2", "LGPLv2+", "LGPLv3", "LGPLv3+"];
