// SPDX-License-Identifier: MPL-2.0

//! Dependency selection with a finite-domain constraint solver.
//!
//! Given a universe of packages, each carrying versions and inter-version
//! dependencies, plus a set of top-level requirements, this crate computes a
//! concrete choice of one version per required package, pulling in whatever
//! transitive dependencies are needed, or explains why no such choice exists.
//!
//! # Building the graph
//!
//! A [DependencyGraph] maps names to packages; versions and their dependency
//! lists hang off each package. Dependencies may point at packages that were
//! never given versions, or even form cycles.
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use depselect::{DependencyGraph, Selector, SolutionConstraint, SolveOptions};
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_dependencies("app", "1.0.0".parse()?, [("lib", ">= 1.0".parse()?)]);
//! graph.add_dependencies("lib", "1.0.0".parse()?, []);
//! graph.add_dependencies("lib", "1.2.0".parse()?, []);
//!
//! let selector = Selector::new(&graph);
//! let solution =
//!     selector.find_solution(&[SolutionConstraint::any("app")], &SolveOptions::default())?;
//! assert_eq!(solution["app"].to_string(), "1.0.0");
//! assert_eq!(solution["lib"].to_string(), "1.2.0");
//! # Ok(())
//! # }
//! ```
//!
//! # Versions and constraints
//!
//! [Version] values are `major.minor.patch` triples with optional
//! pre-release and build tags; missing components default to zero and a
//! pre-release sorts below its release. [VersionConstraint] is a conjunction
//! of atoms over the operators `=`, `>`, `>=`, `<`, `<=` and the pessimistic
//! `~>` (`~> 1.2` caps below `2.0`, `~> 1.2.3` below `1.3`).
//!
//! # What the solver promises
//!
//! Every returned assignment satisfies all top-level constraints and every
//! dependency of every chosen version; packages not needed stay out of the
//! result. Among the feasible assignments the solver picks the best one:
//! newest versions for the top-level packages, then as few induced packages
//! as possible, then newest versions for those. Identical inputs always give
//! identical answers.
//!
//! # When there is no answer
//!
//! Invalid requests fail fast: constraints naming packages with no versions
//! at all, or matching none of the versions that do exist, are collected and
//! reported together as
//! [InvalidSolutionConstraints](SelectorError::InvalidSolutionConstraints)
//! before any search starts. An infeasible request instead yields
//! [NoSolution](SelectorError::NoSolution) carrying a [NoSolutionExists]
//! diagnosis: the first top-level constraint that made the problem
//! unsatisfiable, the package the conflict converges on, and rendered
//! constraint chains such as `B {= 3} -> D {= 1}` showing how each
//! requirement reaches it.

#![warn(missing_docs)]

mod constraint;
mod error;
mod graph;
mod report;
mod selector;
mod type_aliases;
mod version;

pub use constraint::{MalformedConstraint, Op, VersionConstraint};
pub use error::{InvalidSolutionConstraints, NoSolutionExists, SelectorError};
pub use graph::{Dependency, DependencyGraph, PackageId, PackageVersionId};
pub use report::{ConstraintPath, PathStep};
pub use selector::{Selector, SolutionConstraint, SolveOptions};
pub use type_aliases::{Assignment, Map, Set};
pub use version::{MalformedVersion, Version};

mod internal;
