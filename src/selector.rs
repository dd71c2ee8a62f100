// SPDX-License-Identifier: MPL-2.0

//! The public entry point for solving.
//!
//! A [Selector] borrows a [DependencyGraph] and answers
//! [find_solution](Selector::find_solution) calls against it. The graph is
//! only read, so several selectors (or several calls) may share one graph;
//! each call owns its transient solver state.

use log::{debug, info};

use crate::constraint::VersionConstraint;
use crate::error::{InvalidSolutionConstraints, SelectorError};
use crate::graph::{DependencyGraph, PackageId};
use crate::internal::diagnose::diagnose;
use crate::internal::domain::ABSENT;
use crate::internal::problem::Problem;
use crate::internal::solve::{Budget, Outcome, Solver};
use crate::type_aliases::{Assignment, Set};

/// A top-level requirement: the named package must be present, at a version
/// accepted by the constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionConstraint {
    /// The required package.
    pub package: String,
    /// Accepted versions; defaults to any version.
    pub constraint: VersionConstraint,
}

impl SolutionConstraint {
    /// Requires the package at any version.
    pub fn any(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            constraint: VersionConstraint::any(),
        }
    }

    /// Requires the package at a version accepted by `constraint`.
    pub fn new(package: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            package: package.into(),
            constraint,
        }
    }
}

/// Knobs for one [find_solution](Selector::find_solution) call.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Wall-clock budget. Exhaustion yields
    /// [TimeBoundExceeded](SelectorError::TimeBoundExceeded).
    pub timeout_ms: Option<u32>,
    /// Backtrack budget, checked together with the wall clock.
    pub max_backtracks: Option<u64>,
    /// When supplied, only these packages (and the top-level-constrained
    /// ones) may appear in a solution. A version depending on an excluded
    /// package is itself unusable.
    pub valid_packages: Option<Vec<String>>,
}

/// Computes assignments of versions to packages over a fixed graph.
pub struct Selector<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> Selector<'g> {
    /// Creates a selector over the graph.
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Finds the best assignment satisfying every solution constraint, or
    /// explains why none exists.
    ///
    /// The returned mapping contains every package present in the solution
    /// (top-level packages first, then induced dependencies) and nothing
    /// else. Among all feasible assignments the result maximises top-level
    /// versions, then minimises how many induced packages are pulled in,
    /// then maximises induced versions; identical inputs always produce the
    /// identical result.
    ///
    /// # Errors
    ///
    /// [InvalidSolutionConstraints](SelectorError::InvalidSolutionConstraints)
    /// aggregates every constraint naming a non-existent package or matching
    /// zero versions, before any solving happens.
    /// [NoSolution](SelectorError::NoSolution) carries the diagnosis of an
    /// infeasible input, and
    /// [TimeBoundExceeded](SelectorError::TimeBoundExceeded) reports an
    /// exhausted budget.
    pub fn find_solution(
        &self,
        constraints: &[SolutionConstraint],
        options: &SolveOptions,
    ) -> Result<Assignment, SelectorError> {
        let resolved = self.validate(constraints)?;
        let valid: Option<Set<PackageId>> = options.valid_packages.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| self.graph.get(name))
                .collect()
        });

        let mut budget = Budget::new(options.timeout_ms, options.max_backtracks);
        let problem = Problem::build(self.graph, &resolved, valid.as_ref());
        info!(
            "solving {} constraints over {} reachable packages",
            resolved.len(),
            problem.var_count()
        );
        let mut solver = Solver::new(&problem);
        let outcome = solver
            .solve(&mut budget, false)
            .map_err(|_| SelectorError::TimeBoundExceeded)?;

        match outcome {
            Outcome::Sat(values) => {
                let mut assignment = Assignment::default();
                for (var, &value) in values.iter().enumerate() {
                    if value != ABSENT {
                        let name = self.graph.name(problem.vars[var].package).to_string();
                        assignment.insert(name, problem.version_at(var, value).clone());
                    }
                }
                debug!("solution with {} packages", assignment.len());
                Ok(assignment)
            }
            Outcome::Unsat => {
                info!("no solution, diagnosing");
                let diagnosis = diagnose(self.graph, &resolved, valid.as_ref(), &mut budget)
                    .map_err(|_| SelectorError::TimeBoundExceeded)?;
                Err(SelectorError::NoSolution(Box::new(diagnosis)))
            }
        }
    }

    /// Checks every constraint against the graph, aggregating all failures
    /// into one error. Runs before anything is solved.
    fn validate(
        &self,
        constraints: &[SolutionConstraint],
    ) -> Result<Vec<(PackageId, VersionConstraint)>, SelectorError> {
        let mut violations = InvalidSolutionConstraints::default();
        let mut resolved = Vec::with_capacity(constraints.len());
        for (index, sc) in constraints.iter().enumerate() {
            match self.graph.get(&sc.package).filter(|&p| self.graph.exists(p)) {
                None => violations.non_existent.push((index, sc.package.clone())),
                Some(package) => {
                    let satisfiable = self
                        .graph
                        .versions(package)
                        .any(|version| sc.constraint.contains(version));
                    if satisfiable {
                        resolved.push((package, sc.constraint.clone()));
                    } else {
                        violations.constrained_to_no_versions.push((
                            index,
                            sc.package.clone(),
                            sc.constraint.to_string(),
                        ));
                    }
                }
            }
        }
        if violations.is_empty() {
            Ok(resolved)
        } else {
            Err(SelectorError::InvalidSolutionConstraints(violations))
        }
    }
}
