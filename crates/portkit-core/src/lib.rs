//! # portkit-core
//!
//! The module resolver and project reconciler for portkit - THE LOGIC.
//!
//! A consuming project names the library modules it wants. This crate works
//! out everything those modules transitively need, checks that the result is
//! usable under the license the project asked for, and brings the project's
//! copy of the module files in line with that result.
//!
//! ## Pipeline
//!
//! - `catalog` + `formats::module_desc`: module descriptions, read through
//!   the `overlay`
//! - `closure`: dependency closure with per-edge provenance
//! - `license`: LGPL audit of the main modules
//! - `fileset`: logical file names and their project placement
//! - `reconcile`: add / update / remove with backups
//! - `importer`: the end-to-end run, including the settings cache
//!
//! ## Constraints
//!
//! - Deterministic: `BTreeMap`/`BTreeSet` only, sorted output everywhere
//! - Synchronous: one invocation, one thread
//! - No partial results: every error aborts the invocation

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod closure;
pub mod fileset;
pub mod formats;
pub mod importer;
pub mod license;
pub mod overlay;
pub mod policy;
pub mod primitives;
pub mod process;
pub mod reconcile;
pub mod settings;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Applicability, Dependency, ErrorCategory, Module, ModuleStatus, PortkitError, Snippets,
};

// =============================================================================
// RE-EXPORTS: Resolution
// =============================================================================

pub use catalog::Catalog;
pub use closure::{ClosureResolver, ClosureResult, DependencyEdge, DependencyGraph};
pub use license::{LicenseAudit, audit};
pub use policy::{LgplVersion, Policy};

// =============================================================================
// RE-EXPORTS: Files and Reconciliation
// =============================================================================

pub use fileset::{DirLayout, FileSet, FileTable, LogicalName};
pub use overlay::{Origin, Overlay, ResolvedFile};
pub use process::PatchTool;
pub use reconcile::{ActionRecord, FileAction, LinkMode, LinkPolicy, Plan, Reconciler, Report};

// =============================================================================
// RE-EXPORTS: Import Pipeline
// =============================================================================

pub use importer::{CacheWrite, ImportOutcome, Importer};
pub use settings::{ImportMode, Settings, SettingsOverrides};
