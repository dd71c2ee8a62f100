// SPDX-License-Identifier: MPL-2.0

//! Explains why a problem has no solution.
//!
//! The diagnoser runs only after the solver has proven the full top-level
//! constraint list unsatisfiable. It answers three questions, each reusing
//! the same builder and solver machinery as the main solve:
//!
//! 1. Which constraint broke the problem? Binary probing finds the smallest
//!    prefix of the top-level list that is already unsatisfiable.
//! 2. Which package is most constrained? Constraints are re-added one at a
//!    time; every probe that flips to UNSAT contributes its domain wipe-out
//!    counts, and the package with the highest tally wins (ties go to the
//!    lexicographically smallest name).
//! 3. How does the conflict reach that package? All simple paths through
//!    the active dependency arcs from a top-level-constrained package to the
//!    most constrained one are enumerated and rendered.

use log::debug;

use crate::constraint::VersionConstraint;
use crate::error::NoSolutionExists;
use crate::graph::{DependencyGraph, PackageId, PackageVersionId};
use crate::internal::domain::ABSENT;
use crate::internal::problem::Problem;
use crate::internal::solve::{Budget, BudgetExhausted, Outcome, Solver};
use crate::report::{render_no_solution, ConstraintPath, PathStep};
use crate::type_aliases::{Map, Set};

/// Path enumeration stops after this many chains; a conflict rarely needs
/// more than a handful to be understood.
const MAX_PATHS: usize = 64;

/// Produces the full diagnosis for an unsatisfiable constraint list.
pub(crate) fn diagnose(
    graph: &DependencyGraph,
    constraints: &[(PackageId, VersionConstraint)],
    valid: Option<&Set<PackageId>>,
    budget: &mut Budget,
) -> Result<NoSolutionExists, BudgetExhausted> {
    debug_assert!(!constraints.is_empty());
    let total = constraints.len();

    // Smallest k with constraints[..k] unsatisfiable. The caller proved the
    // invariant for k = total; every probe is an independent solve that only
    // needs feasibility, not optimality.
    let mut lo = 1usize;
    let mut hi = total;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        debug!("diagnosis probe: prefix {mid} of {total}");
        if probe(graph, &constraints[..mid], valid, budget)? {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    let offending = hi;

    // Re-add constraints one at a time. Prefix minimality means only the
    // last add can flip to UNSAT, but the loop keeps the accounting honest
    // even if a future builder change breaks that assumption.
    let mut blame: Map<PackageId, u64> = Map::default();
    for len in 1..=offending {
        let problem = Problem::build(graph, &constraints[..len], valid);
        let mut solver = Solver::new(&problem);
        if let Outcome::Unsat = solver.solve(budget, true)? {
            for (var, &count) in solver.wipeouts.iter().enumerate() {
                if count > 0 {
                    *blame.entry(problem.vars[var].package).or_insert(0) += count;
                }
            }
        }
    }
    let most_constrained = blame
        .iter()
        .max_by(|a, b| {
            // Higher count wins; on equal counts the smaller name does.
            a.1.cmp(b.1)
                .then_with(|| graph.name(*b.0).cmp(graph.name(*a.0)))
        })
        .map(|(package, _)| *package)
        .unwrap_or(constraints[offending - 1].0);
    debug!(
        "most constrained package: {} ({} wipe-outs)",
        graph.name(most_constrained),
        blame.get(&most_constrained).copied().unwrap_or(0)
    );

    let prefix = &constraints[..offending];
    let problem = Problem::build(graph, prefix, valid);
    let paths = constraint_paths(graph, &problem, prefix, most_constrained);

    let (offending_package, offending_constraint) = &constraints[offending - 1];
    let message = render_no_solution(
        offending - 1,
        graph.name(*offending_package),
        &offending_constraint.to_string(),
        graph.name(most_constrained),
        graph.exists(most_constrained),
        &paths,
    );
    Ok(NoSolutionExists {
        offending_constraint_index: offending - 1,
        most_constrained_package: graph.name(most_constrained).to_string(),
        paths,
        message,
    })
}

/// One feasibility probe. True means the prefix is satisfiable.
fn probe(
    graph: &DependencyGraph,
    prefix: &[(PackageId, VersionConstraint)],
    valid: Option<&Set<PackageId>>,
    budget: &mut Budget,
) -> Result<bool, BudgetExhausted> {
    let problem = Problem::build(graph, prefix, valid);
    let mut solver = Solver::new(&problem);
    Ok(matches!(solver.solve(budget, true)?, Outcome::Sat(_)))
}

/// Enumerates simple paths from every top-level-constrained package to
/// `target` over the dependency arcs still active after the top-level
/// restriction of `prefix`.
fn constraint_paths(
    graph: &DependencyGraph,
    problem: &Problem<'_>,
    prefix: &[(PackageId, VersionConstraint)],
    target: PackageId,
) -> Vec<ConstraintPath> {
    let var_of: Map<PackageId, u32> = problem
        .vars
        .iter()
        .enumerate()
        .map(|(var, variable)| (variable.package, var as u32))
        .collect();
    let Some(&target_var) = var_of.get(&target) else {
        return Vec::new();
    };

    // Outgoing arcs per variable, deduplicated on (target, constraint).
    // Only versions surviving the top-level restriction contribute arcs.
    let mut arcs: Vec<Vec<(u32, &VersionConstraint)>> = Vec::with_capacity(problem.vars.len());
    for (var, variable) in problem.vars.iter().enumerate() {
        let mut out: Vec<(u32, &VersionConstraint)> = Vec::new();
        for value in problem.initial[var].iter() {
            if value == ABSENT {
                continue;
            }
            let pv = PackageVersionId {
                package: variable.package,
                index: variable.order[value - 1],
            };
            for dep in graph.dependencies(pv) {
                let Some(&dep_var) = var_of.get(&dep.target) else {
                    continue;
                };
                if !out
                    .iter()
                    .any(|(existing, constraint)| *existing == dep_var && **constraint == dep.constraint)
                {
                    out.push((dep_var, &dep.constraint));
                }
            }
        }
        arcs.push(out);
    }

    // Starting points in prefix order, each carrying the intersection of its
    // top-level constraints.
    let mut starts: Vec<(u32, VersionConstraint)> = Vec::new();
    for (package, _) in prefix {
        if !starts
            .iter()
            .any(|(var, _)| problem.vars[*var as usize].package == *package)
        {
            if let Some(&var) = var_of.get(package) {
                let combined = prefix
                    .iter()
                    .filter(|(p, _)| p == package)
                    .fold(VersionConstraint::any(), |acc, (_, c)| acc.intersect(c));
                starts.push((var, combined));
            }
        }
    }

    let mut paths = Vec::new();
    let mut terminals: Vec<VersionConstraint> = Vec::new();
    for (start, top_constraint) in &starts {
        let mut on_path = vec![false; problem.vars.len()];
        let mut steps = vec![PathStep {
            package: graph.name(problem.vars[*start as usize].package).to_string(),
            constraint: top_constraint.to_string(),
        }];
        walk(
            *start,
            target_var,
            top_constraint,
            graph,
            problem,
            &arcs,
            &mut on_path,
            &mut steps,
            &mut paths,
            &mut terminals,
        );
    }
    if paths.len() >= MAX_PATHS {
        debug!("path enumeration stopped at {MAX_PATHS} chains");
    }

    // The chains should jointly over-constrain the target: no version may
    // satisfy all terminal constraints at once. A target without versions
    // is over-constrained by definition.
    if graph.exists(target) {
        let over_constrained = !graph
            .versions(target)
            .any(|version| terminals.iter().all(|c| c.contains(version)));
        if !over_constrained {
            debug!("constraint chains do not pin the blame on their own");
        }
    }
    paths
}

/// Depth-first simple-path enumeration. `steps` always holds the chain up
/// to and including `var`; a chain is recorded the moment it reaches the
/// target.
#[allow(clippy::too_many_arguments)]
fn walk(
    var: u32,
    target_var: u32,
    incoming: &VersionConstraint,
    graph: &DependencyGraph,
    problem: &Problem<'_>,
    arcs: &[Vec<(u32, &VersionConstraint)>],
    on_path: &mut [bool],
    steps: &mut Vec<PathStep>,
    paths: &mut Vec<ConstraintPath>,
    terminals: &mut Vec<VersionConstraint>,
) {
    if paths.len() >= MAX_PATHS {
        return;
    }
    if var == target_var {
        paths.push(ConstraintPath {
            steps: steps.clone(),
        });
        terminals.push(incoming.clone());
        return;
    }
    on_path[var as usize] = true;
    for &(next, constraint) in &arcs[var as usize] {
        if on_path[next as usize] {
            continue;
        }
        steps.push(PathStep {
            package: graph
                .name(problem.vars[next as usize].package)
                .to_string(),
            constraint: constraint.to_string(),
        });
        walk(
            next, target_var, constraint, graph, problem, arcs, on_path, steps, paths, terminals,
        );
        steps.pop();
    }
    on_path[var as usize] = false;
}
