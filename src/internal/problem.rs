// SPDX-License-Identifier: MPL-2.0

//! Translation of a dependency graph plus top-level constraints into a
//! finite-domain problem.
//!
//! One variable is created per package reachable from the top-level
//! constraints. A variable's encoded values are `ABSENT` plus one value per
//! version of its package, ranked ascending by version, so that "newer" is
//! always "larger". Top-level constraints restrict the starting domains and
//! forbid `ABSENT`; every dependency `(p, version) -> (q, constraint)`
//! becomes a table entry listing which values of `q` support that version
//! of `p`.
//!
//! Reachability is computed breadth-first before solving, following edges
//! only from versions that survive the top-level restriction. This is a
//! conservative overestimate: variables that turn out to be unreachable in
//! the final assignment simply pin to `ABSENT`.

use std::collections::VecDeque;

use crate::constraint::VersionConstraint;
use crate::graph::{DependencyGraph, PackageId, PackageVersionId};
use crate::internal::domain::Bitset;
use crate::type_aliases::{Map, Set};
use crate::version::Version;

/// One CSP variable and its value encoding. Whether a variable is top-level
/// is positional: the first [top_count](Problem::top_count) variables are.
pub(crate) struct Variable {
    /// The package this variable assigns.
    pub(crate) package: PackageId,
    /// Version entry indices ascending by version value; the encoded value
    /// `r + 1` selects `order[r]`.
    pub(crate) order: Vec<u32>,
}

/// A dependency table entry: choosing the owning `(variable, rank)` requires
/// `target` to take one of the `allowed` values. `ABSENT` is never allowed.
#[derive(Clone)]
pub(crate) struct DepEdge {
    pub(crate) target: u32,
    pub(crate) allowed: Bitset,
}

/// The compiled finite-domain problem. Variables 0..`top_count` are the
/// top-level packages in graph insertion order; the rest follow in
/// breadth-first discovery order.
pub(crate) struct Problem<'g> {
    pub(crate) graph: &'g DependencyGraph,
    pub(crate) vars: Vec<Variable>,
    pub(crate) top_count: usize,
    /// Starting domains, after top-level restriction and exclusions.
    pub(crate) initial: Vec<Bitset>,
    /// `deps[var][rank]` lists the table entries guarding that rank.
    pub(crate) deps: Vec<Vec<Vec<DepEdge>>>,
    /// `watchers[q]` lists every `(var, rank)` whose table mentions `q`.
    pub(crate) watchers: Vec<Vec<(u32, u32)>>,
}

impl<'g> Problem<'g> {
    /// Compiles the problem for `constraints` over `graph`. When `valid` is
    /// supplied, packages outside it may not appear in any solution:
    /// versions depending on an excluded package lose their rank up front.
    /// Top-level packages are always admissible.
    pub(crate) fn build(
        graph: &'g DependencyGraph,
        constraints: &[(PackageId, VersionConstraint)],
        valid: Option<&Set<PackageId>>,
    ) -> Self {
        let mut top_packages: Vec<PackageId> = Vec::new();
        for (package, _) in constraints {
            if !top_packages.contains(package) {
                top_packages.push(*package);
            }
        }
        // Top-level variable order is graph insertion order.
        top_packages.sort_unstable();
        let top_set: Set<PackageId> = top_packages.iter().copied().collect();

        let mut problem = Self {
            graph,
            vars: Vec::new(),
            top_count: top_packages.len(),
            initial: Vec::new(),
            deps: Vec::new(),
            watchers: Vec::new(),
        };
        let mut var_of: Map<PackageId, u32> = Map::default();

        for &package in &top_packages {
            let var = problem.push_var(package);
            var_of.insert(package, var);
            // Keep the ranks accepted by every top-level constraint on this
            // package; ABSENT stays out for top-level variables.
            let order = &problem.vars[var as usize].order;
            let mut domain = Bitset::empty(order.len() + 1);
            for (rank, &index) in order.iter().enumerate() {
                let version = version_of(graph, package, index);
                let accepted = constraints
                    .iter()
                    .filter(|(p, _)| *p == package)
                    .all(|(_, c)| c.contains(version));
                if accepted {
                    domain.insert(rank + 1);
                }
            }
            problem.initial[var as usize] = domain;
        }

        let admissible = |package: PackageId| {
            top_set.contains(&package) || valid.is_none_or(|set| set.contains(&package))
        };

        let mut queue: VecDeque<u32> = (0..problem.top_count as u32).collect();
        while let Some(var) = queue.pop_front() {
            let package = problem.vars[var as usize].package;
            let values: Vec<usize> = problem.initial[var as usize].iter().collect();
            for value in values {
                if value == 0 {
                    continue;
                }
                let rank = value - 1;
                let pv = PackageVersionId {
                    package,
                    index: problem.vars[var as usize].order[rank],
                };
                let dependencies = graph.dependencies(pv);
                if dependencies.iter().any(|dep| !admissible(dep.target)) {
                    // A dependency points outside the valid set, so this
                    // version can never be chosen.
                    problem.initial[var as usize].remove(value);
                    continue;
                }
                for dep in dependencies {
                    let target = match var_of.get(&dep.target) {
                        Some(&target) => target,
                        None => {
                            let target = problem.push_var(dep.target);
                            var_of.insert(dep.target, target);
                            let bits = problem.vars[target as usize].order.len() + 1;
                            problem.initial[target as usize] = Bitset::full(bits);
                            queue.push_back(target);
                            target
                        }
                    };
                    let allowed = problem.allowed_values(target, &dep.constraint);
                    problem.deps[var as usize][rank].push(DepEdge { target, allowed });
                    problem.watchers[target as usize].push((var, rank as u32));
                }
            }
        }

        problem
    }

    fn push_var(&mut self, package: PackageId) -> u32 {
        let order = self.graph.sorted_version_indices(package);
        let var = self.vars.len() as u32;
        self.initial.push(Bitset::empty(order.len() + 1));
        self.deps.push(vec![Vec::new(); order.len()]);
        self.watchers.push(Vec::new());
        self.vars.push(Variable { package, order });
        var
    }

    /// The values of `var` whose version satisfies `constraint`. `ABSENT`
    /// never satisfies a dependency.
    fn allowed_values(&self, var: u32, constraint: &VersionConstraint) -> Bitset {
        let variable = &self.vars[var as usize];
        let mut allowed = Bitset::empty(variable.order.len() + 1);
        for (rank, &index) in variable.order.iter().enumerate() {
            if constraint.contains(version_of(self.graph, variable.package, index)) {
                allowed.insert(rank + 1);
            }
        }
        allowed
    }

    pub(crate) fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// The largest encoded value of `var` (its newest version).
    pub(crate) fn max_value(&self, var: usize) -> usize {
        self.vars[var].order.len()
    }

    /// The version selected by encoded `value` (which must not be ABSENT).
    pub(crate) fn version_at(&self, var: usize, value: usize) -> &Version {
        let variable = &self.vars[var];
        version_of(self.graph, variable.package, variable.order[value - 1])
    }
}

fn version_of(graph: &DependencyGraph, package: PackageId, index: u32) -> &Version {
    graph.version(PackageVersionId { package, index })
}

// TESTS #######################################################################
