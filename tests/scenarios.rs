// SPDX-License-Identifier: MPL-2.0

use depselect::{
    Assignment, DependencyGraph, Selector, SelectorError, SolutionConstraint, SolveOptions,
    Version, VersionConstraint,
};

use log::LevelFilter;
use std::io::Write;

fn init_log() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Trace)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .is_test(true)
        .try_init();
}

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

fn c(s: &str) -> VersionConstraint {
    s.parse().unwrap()
}

/// The shared scenario graph:
/// `A:{1,2}`, `B:{1,2,3}`, `C:{1,2}`, `D:{1,2}` with
/// `A1->B=1, A1->D=2; A2->B>=2, A2->C=1; B3->D=1; C2->D=2`.
fn scenario_graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    graph.add_dependencies("A", v("1.0.0"), [("B", c("= 1")), ("D", c("= 2"))]);
    graph.add_dependencies("A", v("2.0.0"), [("B", c(">= 2")), ("C", c("= 1"))]);
    graph.add_dependencies("B", v("1.0.0"), []);
    graph.add_dependencies("B", v("2.0.0"), []);
    graph.add_dependencies("B", v("3.0.0"), [("D", c("= 1"))]);
    graph.add_dependencies("C", v("1.0.0"), []);
    graph.add_dependencies("C", v("2.0.0"), [("D", c("= 2"))]);
    graph.add_dependencies("D", v("1.0.0"), []);
    graph.add_dependencies("D", v("2.0.0"), []);
    graph
}

fn solve(
    graph: &DependencyGraph,
    constraints: &[SolutionConstraint],
) -> Result<Assignment, SelectorError> {
    Selector::new(graph).find_solution(constraints, &SolveOptions::default())
}

/// Every dependency of every chosen version must be chosen and satisfied,
/// and every top-level constraint must hold.
fn assert_sound(
    graph: &DependencyGraph,
    constraints: &[SolutionConstraint],
    assignment: &Assignment,
) {
    for sc in constraints {
        let version = assignment
            .get(&sc.package)
            .expect("top-level package missing from the assignment");
        assert!(
            sc.constraint.contains(version),
            "top-level constraint {} {{{}}} not satisfied by {version}",
            sc.package,
            sc.constraint
        );
    }
    for (name, version) in assignment {
        let package = graph.get(name).unwrap();
        let pv = graph.find_version(package, version).unwrap();
        for dep in graph.dependencies(pv) {
            let dep_name = graph.name(dep.target);
            let chosen = assignment
                .get(dep_name)
                .unwrap_or_else(|| panic!("dependency {dep_name} missing from the assignment"));
            assert!(
                dep.constraint.contains(chosen),
                "dependency {name} -> {dep_name} {{{}}} not satisfied by {chosen}",
                dep.constraint
            );
        }
    }
}

fn expect(pairs: &[(&str, &str)]) -> Assignment {
    pairs
        .iter()
        .map(|(name, version)| (name.to_string(), v(version)))
        .collect()
}

#[test]
fn pinning_b_excludes_the_newer_a() {
    init_log();
    let graph = scenario_graph();
    let constraints = [SolutionConstraint::any("A"), SolutionConstraint::new("B", c("= 1"))];
    let solution = solve(&graph, &constraints).unwrap();
    assert_sound(&graph, &constraints, &solution);
    assert_eq!(solution, expect(&[("A", "1.0.0"), ("B", "1.0.0"), ("D", "2.0.0")]));
}

#[test]
fn tightened_b_still_has_a_solution() {
    init_log();
    let graph = scenario_graph();
    let constraints = [
        SolutionConstraint::any("A"),
        SolutionConstraint::new("B", c(">= 2.1")),
    ];
    // B >= 2.1 forces B3, which forces D1; A1 wants B1 so A2 it is.
    let solution = solve(&graph, &constraints).unwrap();
    assert_sound(&graph, &constraints, &solution);
    assert_eq!(
        solution,
        expect(&[("A", "2.0.0"), ("B", "3.0.0"), ("D", "1.0.0"), ("C", "1.0.0")])
    );
}

#[test]
fn conflicting_demands_on_d_are_diagnosed() {
    init_log();
    let graph = scenario_graph();
    let constraints = [
        SolutionConstraint::new("B", c("= 3")),
        SolutionConstraint::new("C", c("= 2")),
    ];
    let error = solve(&graph, &constraints).unwrap_err();
    let diagnosis = match error {
        SelectorError::NoSolution(diagnosis) => diagnosis,
        other => panic!("expected NoSolution, got {other:?}"),
    };
    assert_eq!(diagnosis.offending_constraint_index, 1);
    assert_eq!(diagnosis.most_constrained_package, "D");
    let rendered: Vec<String> = diagnosis.paths.iter().map(|p| p.to_string()).collect();
    assert!(rendered.contains(&"B {= 3} -> D {= 1}".to_string()), "{rendered:?}");
    assert!(rendered.contains(&"C {= 2} -> D {= 2}".to_string()), "{rendered:?}");
    assert!(diagnosis.message.contains("D"));
}

#[test]
fn depending_on_a_versionless_package_blames_it() {
    init_log();
    let mut graph = DependencyGraph::new();
    graph.add_dependencies("depends_on_nosuch", v("1.0.0"), [("nosuch", c("*"))]);
    let constraints = [SolutionConstraint::any("depends_on_nosuch")];
    let error = solve(&graph, &constraints).unwrap_err();
    let diagnosis = match error {
        SelectorError::NoSolution(diagnosis) => diagnosis,
        other => panic!("expected NoSolution, got {other:?}"),
    };
    assert_eq!(diagnosis.most_constrained_package, "nosuch");
    assert!(diagnosis.message.contains("nosuch does not exist"));
}

#[test]
fn every_invalid_constraint_is_reported_at_once() {
    init_log();
    let graph = scenario_graph();
    let constraints = [
        SolutionConstraint::any("nosuch"),
        SolutionConstraint::any("nosuch2"),
        SolutionConstraint::new("A", c(">= 10")),
        SolutionConstraint::new("B", c(">= 50")),
    ];
    let error = solve(&graph, &constraints).unwrap_err();
    let violations = match error {
        SelectorError::InvalidSolutionConstraints(violations) => violations,
        other => panic!("expected InvalidSolutionConstraints, got {other:?}"),
    };
    assert_eq!(
        violations.non_existent,
        vec![(0, "nosuch".to_string()), (1, "nosuch2".to_string())]
    );
    assert_eq!(
        violations.constrained_to_no_versions,
        vec![
            (2, "A".to_string(), ">= 10".to_string()),
            (3, "B".to_string(), ">= 50".to_string()),
        ]
    );
}

#[test]
fn unconstrained_a_picks_newest_with_smallest_footprint() {
    init_log();
    let graph = scenario_graph();
    let constraints = [SolutionConstraint::any("A")];
    let solution = solve(&graph, &constraints).unwrap();
    assert_sound(&graph, &constraints, &solution);
    // A2 at its newest; B2 over B3 because B3 would drag D in; D stays out.
    assert_eq!(solution, expect(&[("A", "2.0.0"), ("B", "2.0.0"), ("C", "1.0.0")]));
}

#[test]
fn result_order_is_top_level_then_discovery() {
    init_log();
    let graph = scenario_graph();
    let solution = solve(
        &graph,
        &[SolutionConstraint::any("A"), SolutionConstraint::new("B", c("= 1"))],
    )
    .unwrap();
    let keys: Vec<&str> = solution.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["A", "B", "D"]);
}

#[test]
fn same_result_on_repeated_runs() {
    init_log();
    let graph = scenario_graph();
    let constraints = [SolutionConstraint::any("A")];
    let first = solve(&graph, &constraints).unwrap();
    for _ in 0..10 {
        assert_eq!(solve(&graph, &constraints).unwrap(), first);
    }
}

#[test]
fn disjoint_constraints_on_one_package_are_infeasible() {
    init_log();
    let graph = scenario_graph();
    let constraints = [
        SolutionConstraint::new("B", c("= 1")),
        SolutionConstraint::new("B", c("= 3")),
    ];
    // Each constraint alone matches a version, so validation passes; the
    // conjunction is what cannot be met.
    let error = solve(&graph, &constraints).unwrap_err();
    let diagnosis = match error {
        SelectorError::NoSolution(diagnosis) => diagnosis,
        other => panic!("expected NoSolution, got {other:?}"),
    };
    assert_eq!(diagnosis.offending_constraint_index, 1);
    assert_eq!(diagnosis.most_constrained_package, "B");
}

#[test]
fn dependency_cycles_resolve() {
    init_log();
    let mut graph = DependencyGraph::new();
    graph.add_dependencies("a", v("1.0.0"), [("b", c("*"))]);
    graph.add_dependencies("b", v("1.0.0"), [("a", c("*"))]);
    let constraints = [SolutionConstraint::any("a")];
    let solution = solve(&graph, &constraints).unwrap();
    assert_sound(&graph, &constraints, &solution);
    assert_eq!(solution, expect(&[("a", "1.0.0"), ("b", "1.0.0")]));
}

#[test]
fn valid_packages_fence_off_dependencies() {
    init_log();
    let mut graph = DependencyGraph::new();
    graph.add_dependencies("a", v("1.0.0"), []);
    graph.add_dependencies("a", v("2.0.0"), [("x", c("*"))]);
    graph.add_dependencies("x", v("1.0.0"), []);

    let constraints = [SolutionConstraint::any("a")];
    let unrestricted = solve(&graph, &constraints).unwrap();
    assert_eq!(unrestricted, expect(&[("a", "2.0.0"), ("x", "1.0.0")]));

    // With x fenced off, a2 is unusable and a1 wins.
    let options = SolveOptions {
        valid_packages: Some(vec!["a".to_string()]),
        ..SolveOptions::default()
    };
    let restricted = Selector::new(&graph)
        .find_solution(&constraints, &options)
        .unwrap();
    assert_eq!(restricted, expect(&[("a", "1.0.0")]));
}

#[test]
fn exhausted_backtrack_budget_is_not_unsat() {
    init_log();
    let graph = scenario_graph();
    let options = SolveOptions {
        max_backtracks: Some(0),
        ..SolveOptions::default()
    };
    let error = Selector::new(&graph)
        .find_solution(&[SolutionConstraint::any("A")], &options)
        .unwrap_err();
    assert!(matches!(error, SelectorError::TimeBoundExceeded));
}

#[test]
fn no_constraints_means_an_empty_solution() {
    init_log();
    let graph = scenario_graph();
    let solution = solve(&graph, &[]).unwrap();
    assert!(solution.is_empty());
}
