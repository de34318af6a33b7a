//! # Closure Resolver
//!
//! Computes the dependency closure of a requested module set under a policy.
//!
//! The output is an edge set, not just a module set: every edge records who
//! demanded a module and under which build-time condition, because build-file
//! generation needs that provenance. Two passes are run, one without and one
//! with tests companions; the difference between them classifies modules as
//! test-only.
//!
//! The exclusion predicate is applied to a candidate at the moment it would
//! be added. Expansion only walks modules already in the edge set, so an
//! excluded module's own dependencies are never reached through it; they may
//! still arrive through another path. A module admitted once stays admitted
//! (first arrival wins).

use crate::{Applicability, Catalog, PortkitError, Policy};
use serde::Serialize;
use std::collections::BTreeSet;

// =============================================================================
// EDGES
// =============================================================================

/// One resolution-time edge: `module` was pulled in by `demander`
/// (`None` for requested modules and tests companions) under `condition`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DependencyEdge {
    pub module: String,
    pub demander: Option<String>,
    pub condition: Option<String>,
}

impl DependencyEdge {
    #[must_use]
    pub fn root(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            demander: None,
            condition: None,
        }
    }
}

/// A set of dependency edges. Uses `BTreeSet` exclusively for deterministic
/// ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: BTreeSet<DependencyEdge>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge. Returns true if it was new.
    pub fn insert(&mut self, edge: DependencyEdge) -> bool {
        self.edges.insert(edge)
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter()
    }

    /// Every module that is the target of at least one edge.
    #[must_use]
    pub fn modules(&self) -> BTreeSet<String> {
        self.edges.iter().map(|e| e.module.clone()).collect()
    }

    #[must_use]
    pub fn contains_module(&self, name: &str) -> bool {
        self.edges.iter().any(|e| e.module == name)
    }

    /// Edges that brought `module` in.
    pub fn demanders_of<'a>(&'a self, module: &'a str) -> impl Iterator<Item = &'a DependencyEdge> {
        self.edges.iter().filter(move |e| e.module == module)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// Outcome of a two-pass resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClosureResult {
    /// Edges of the pass without tests companions.
    pub base_edges: DependencyGraph,
    /// Edges of the pass with tests companions (equal to `base_edges` when
    /// tests were not requested).
    pub full_edges: DependencyGraph,
    /// Modules of the base pass.
    pub main: BTreeSet<String>,
    /// Modules of the full pass.
    pub full: BTreeSet<String>,
    /// Modules whose membership changes when tests are brought in, ignoring
    /// modules of applicability `all`.
    pub test_only: BTreeSet<String>,
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolves module closures against a catalog under a policy.
#[derive(Debug, Clone, Copy)]
pub struct ClosureResolver<'a> {
    catalog: &'a Catalog,
    policy: &'a Policy,
}

impl<'a> ClosureResolver<'a> {
    #[must_use]
    pub const fn new(catalog: &'a Catalog, policy: &'a Policy) -> Self {
        Self { catalog, policy }
    }

    /// Run both passes and classify test-only modules.
    ///
    /// Fails with `UnknownModule` if a requested module or any encountered
    /// dependency is missing; no partial result is returned.
    pub fn resolve<I, S>(
        &self,
        requested: I,
        include_tests: bool,
    ) -> Result<ClosureResult, PortkitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: BTreeSet<String> = requested
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let base_edges = self.closure(&requested, false)?;
        let full_edges = if include_tests {
            self.closure(&requested, true)?
        } else {
            base_edges.clone()
        };

        let main = base_edges.modules();
        let full = full_edges.modules();
        let eligible_full = self.eligible(&full)?;
        let eligible_main = self.eligible(&main)?;
        let test_only = eligible_full
            .symmetric_difference(&eligible_main)
            .cloned()
            .collect();

        tracing::debug!(
            main = main.len(),
            full = full.len(),
            edges = full_edges.len(),
            "resolved module closure"
        );

        Ok(ClosureResult {
            base_edges,
            full_edges,
            main,
            full,
            test_only,
        })
    }

    /// One fixed-point pass.
    fn closure(
        &self,
        requested: &BTreeSet<String>,
        include_tests: bool,
    ) -> Result<DependencyGraph, PortkitError> {
        let mut graph = DependencyGraph::new();
        for name in requested {
            self.catalog.require(name)?;
            if self.policy.avoids(name) {
                tracing::debug!(module = %name, "requested module is avoided");
                continue;
            }
            graph.insert(DependencyEdge::root(name.as_str()));
        }

        let mut expanded: BTreeSet<String> = BTreeSet::new();
        loop {
            let pending: Vec<String> = graph
                .modules()
                .into_iter()
                .filter(|m| !expanded.contains(m))
                .collect();
            if pending.is_empty() {
                break;
            }

            for name in pending {
                let module = self.catalog.require(&name)?;

                if include_tests && !module.is_tests_module() {
                    if let Some(tests) = self.catalog.tests_module_of(&name) {
                        if self.policy.excludes(tests) {
                            tracing::debug!(
                                module = tests.name(),
                                "tests module excluded by policy"
                            );
                        } else {
                            graph.insert(DependencyEdge::root(tests.name()));
                        }
                    }
                }

                for dep in module.dependencies() {
                    let candidate = self.catalog.require(&dep.module)?;
                    if self.policy.excludes(candidate) {
                        tracing::debug!(
                            module = %dep.module,
                            demander = %name,
                            "dependency excluded by policy"
                        );
                        continue;
                    }
                    graph.insert(DependencyEdge {
                        module: dep.module.clone(),
                        demander: Some(name.clone()),
                        condition: dep.condition.clone(),
                    });
                }

                expanded.insert(name);
            }
        }
        Ok(graph)
    }

    /// Modules of `names` whose applicability is not `all`.
    fn eligible(&self, names: &BTreeSet<String>) -> Result<BTreeSet<String>, PortkitError> {
        let mut eligible = BTreeSet::new();
        for name in names {
            if self.catalog.require(name)?.applicability() != Applicability::All {
                eligible.insert(name.clone());
            }
        }
        Ok(eligible)
    }
}

/// Resolve `requested` against `catalog` under `policy`.
pub fn resolve<I, S>(
    requested: I,
    catalog: &Catalog,
    policy: &Policy,
    include_tests: bool,
) -> Result<ClosureResult, PortkitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ClosureResolver::new(catalog, policy).resolve(requested, include_tests)
}

// =============================================================================
// TESTS
// =============================================================================
