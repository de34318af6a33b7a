//! # License Auditor
//!
//! Checks that every main module is usable under the license the consumer
//! asked for. The audit only runs when the accepted licenses include a member
//! of the LGPL family; otherwise there is no guarantee to uphold.

use crate::primitives::{IGNORED_LICENSES, LGPL_FAMILY};
use crate::{Module, PortkitError, Policy};
use std::collections::BTreeSet;

/// Outcome of a license audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseAudit {
    /// No LGPL guarantee was requested.
    Skipped,
    Passed,
    /// Every offending module with its licenses, sorted by name.
    Failed(Vec<(String, BTreeSet<String>)>),
}

impl LicenseAudit {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Turn a failed audit into `IncompatibleLicenses`.
    pub fn into_result(self) -> Result<(), PortkitError> {
        match self {
            Self::Failed(offending) => Err(PortkitError::IncompatibleLicenses(offending)),
            Self::Skipped | Self::Passed => Ok(()),
        }
    }
}

/// Audit `main_modules` against `policy.accepted_licenses`.
pub fn audit<'a, I>(main_modules: I, policy: &Policy) -> LicenseAudit
where
    I: IntoIterator<Item = &'a Module>,
{
    let active = policy
        .accepted_licenses
        .iter()
        .any(|l| LGPL_FAMILY.contains(&l.as_str()));
    if !active {
        return LicenseAudit::Skipped;
    }

    let acceptable: BTreeSet<&str> = IGNORED_LICENSES
        .iter()
        .copied()
        .chain(policy.accepted_licenses.iter().map(String::as_str))
        .collect();

    let mut offending: Vec<(String, BTreeSet<String>)> = main_modules
        .into_iter()
        .filter(|m| !m.licenses().iter().any(|l| acceptable.contains(l.as_str())))
        .map(|m| (m.name().to_string(), m.licenses().clone()))
        .collect();
    offending.sort();

    if offending.is_empty() {
        LicenseAudit::Passed
    } else {
        tracing::debug!(count = offending.len(), "license audit failed");
        LicenseAudit::Failed(offending)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LgplVersion;

    fn lgpl3() -> Policy {
        Policy {
            accepted_licenses: BTreeSet::from(["LGPLv3+".to_string()]),
            ..Policy::default()
        }
    }

    #[test]
    fn gpl_module_fails_lgpl_audit() {
        let x = Module::new("x").with_licenses(["GPL"]);
        assert_eq!(
            audit([&x], &lgpl3()),
            LicenseAudit::Failed(vec![("x".to_string(), BTreeSet::from(["GPL".to_string()]))])
        );
    }

    #[test]
    fn ignored_license_passes() {
        let x = Module::new("x").with_licenses(["public domain"]);
        assert_eq!(audit([&x], &lgpl3()), LicenseAudit::Passed);
    }

    #[test]
    fn audit_is_skipped_without_lgpl_request() {
        let x = Module::new("x").with_licenses(["GPL"]);
        assert_eq!(audit([&x], &Policy::new()), LicenseAudit::Skipped);
        let gpl_only = Policy {
            accepted_licenses: BTreeSet::from(["GPLv3+".to_string()]),
            ..Policy::default()
        };
        assert_eq!(audit([&x], &gpl_only), LicenseAudit::Skipped);
    }

    #[test]
    fn all_offenders_are_reported() {
        let modules = [
            Module::new("b").with_licenses(["GPLv3+"]),
            Module::new("ok").with_licenses(["LGPLv2+"]),
            Module::new("a").with_licenses(["GPL"]),
        ];
        let policy = Policy::new().with_lgpl(LgplVersion::V3);
        assert_eq!(
            audit(&modules, &policy),
            LicenseAudit::Failed(vec![
                ("a".to_string(), BTreeSet::from(["GPL".to_string()])),
                ("b".to_string(), BTreeSet::from(["GPLv3+".to_string()])),
            ])
        );
    }

    #[test]
    fn dual_licensed_module_satisfies_3_or_gplv2() {
        let policy = Policy::new().with_lgpl(LgplVersion::V3OrGplV2);
        let dual = Module::new("dual").with_licenses(["LGPLv3+", "GPLv2"]);
        let v3_only = Module::new("v3").with_licenses(["LGPLv3+"]);
        assert_eq!(audit([&dual], &policy), LicenseAudit::Passed);
        assert!(!audit([&v3_only], &policy).is_ok());
    }

    #[test]
    fn lgpl2_request_rejects_v3_only_module() {
        let policy = Policy::new().with_lgpl(LgplVersion::V2);
        let v2 = Module::new("v2").with_licenses(["LGPLv2+"]);
        let v3 = Module::new("v3").with_licenses(["LGPLv3+"]);
        assert_eq!(audit([&v2], &policy), LicenseAudit::Passed);
        assert!(audit([&v3], &policy).into_result().is_err());
    }
}
