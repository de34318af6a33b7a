//! # Policy
//!
//! The immutable set of flags deciding which conditional module classes may
//! be included, which licenses are acceptable, and how logical directories
//! map onto the consumer's layout.

use crate::fileset::DirLayout;
use crate::{Module, ModuleStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// LGPL REQUEST
// =============================================================================

/// The LGPL guarantee a consumer can ask for with `--lgpl[=...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LgplVersion {
    V2,
    V3,
    V3OrGplV2,
}

impl LgplVersion {
    /// Licenses a module may carry to be usable under this request.
    #[must_use]
    pub fn accepted_licenses(self) -> BTreeSet<String> {
        let names: &[&str] = match self {
            Self::V2 => &["LGPLv2+"],
            Self::V3 => &["LGPLv2+", "LGPLv3+"],
            Self::V3OrGplV2 => &["LGPLv2+", "GPLv2"],
        };
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V2 => "2",
            Self::V3 => "3",
            Self::V3OrGplV2 => "3orGPLv2",
        }
    }
}

impl fmt::Display for LgplVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LgplVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2" => Ok(Self::V2),
            "" | "yes" | "3" => Ok(Self::V3),
            "3orGPLv2" => Ok(Self::V3OrGplV2),
            other => Err(format!("invalid LGPL version: {other}")),
        }
    }
}

// =============================================================================
// POLICY
// =============================================================================

/// Inclusion and license policy for one resolver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    /// Pull in `<module>-tests` companions.
    pub tests: bool,
    pub obsolete: bool,
    pub cxx_tests: bool,
    pub longrunning_tests: bool,
    pub privileged_tests: bool,
    pub unportable_tests: bool,
    /// Licenses the consumer accepts. Empty means no license guarantee.
    pub accepted_licenses: BTreeSet<String>,
    /// Modules never to include, whoever depends on them.
    pub avoid: BTreeSet<String>,
    /// Directory remapping; only consumed by file-name rewriting.
    pub layout: DirLayout,
}

impl Policy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the licenses implied by an LGPL request.
    #[must_use]
    pub fn with_lgpl(mut self, lgpl: LgplVersion) -> Self {
        self.accepted_licenses = lgpl.accepted_licenses();
        self
    }

    #[must_use]
    pub fn avoiding<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.avoid.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Whether a module with `status` is allowed by the inclusion flags.
    #[must_use]
    pub const fn allows_status(&self, status: ModuleStatus) -> bool {
        match status {
            ModuleStatus::Normal => true,
            ModuleStatus::Obsolete => self.obsolete,
            ModuleStatus::CxxTest => self.cxx_tests,
            ModuleStatus::LongrunningTest => self.longrunning_tests,
            ModuleStatus::PrivilegedTest => self.privileged_tests,
            ModuleStatus::UnportableTest => self.unportable_tests,
        }
    }

    #[must_use]
    pub fn avoids(&self, name: &str) -> bool {
        self.avoid.contains(name)
    }

    /// The exclusion predicate: a candidate is excluded if its status needs
    /// a disabled flag or if it is avoided.
    #[must_use]
    pub fn excludes(&self, module: &Module) -> bool {
        !self.allows_status(module.status()) || self.avoids(module.name())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_excludes_gated_statuses() {
        let policy = Policy::new();
        assert!(!policy.excludes(&Module::new("a")));
        assert!(policy.excludes(&Module::new("b").with_status(ModuleStatus::Obsolete)));
        assert!(policy.excludes(&Module::new("c").with_status(ModuleStatus::CxxTest)));
    }

    #[test]
    fn flags_lift_exclusion() {
        let policy = Policy {
            obsolete: true,
            unportable_tests: true,
            ..Policy::default()
        };
        assert!(!policy.excludes(&Module::new("b").with_status(ModuleStatus::Obsolete)));
        assert!(!policy.excludes(&Module::new("u").with_status(ModuleStatus::UnportableTest)));
        assert!(policy.excludes(&Module::new("p").with_status(ModuleStatus::PrivilegedTest)));
    }

    #[test]
    fn avoid_excludes_normal_module() {
        let policy = Policy::new().avoiding(["d"]);
        assert!(policy.excludes(&Module::new("d")));
    }

    #[test]
    fn lgpl_parsing() {
        assert_eq!("".parse::<LgplVersion>(), Ok(LgplVersion::V3));
        assert_eq!("2".parse::<LgplVersion>(), Ok(LgplVersion::V2));
        assert_eq!("3orGPLv2".parse::<LgplVersion>(), Ok(LgplVersion::V3OrGplV2));
        assert!("4".parse::<LgplVersion>().is_err());
    }
}
