// SPDX-License-Identifier: MPL-2.0

//! Handling selector errors.

use std::fmt::{self, Display};

use thiserror::Error;

use crate::constraint::MalformedConstraint;
use crate::report::ConstraintPath;
use crate::version::MalformedVersion;

/// Aggregate of every invalid top-level constraint, produced before any
/// solving starts. A single call reports all violations at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidSolutionConstraints {
    /// Constraints whose package has no versions in the graph, as
    /// `(constraint index, package name)`.
    pub non_existent: Vec<(usize, String)>,
    /// Constraints matching zero versions of an existing package, as
    /// `(constraint index, package name, rendered constraint)`.
    pub constrained_to_no_versions: Vec<(usize, String, String)>,
}

impl InvalidSolutionConstraints {
    pub(crate) fn is_empty(&self) -> bool {
        self.non_existent.is_empty() && self.constrained_to_no_versions.is_empty()
    }
}

impl Display for InvalidSolutionConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid solution constraints:")?;
        for (index, name) in &self.non_existent {
            write!(f, " [#{index}] package {name} does not exist;")?;
        }
        for (index, name, constraint) in &self.constrained_to_no_versions {
            write!(f, " [#{index}] no version of {name} matches {{{constraint}}};")?;
        }
        Ok(())
    }
}

/// Diagnosis of an infeasible problem: which top-level constraint first made
/// it unsatisfiable, which package the conflict centers on, and the
/// constraint chains leading there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoSolutionExists {
    /// Index into the top-level constraint list of the first constraint
    /// whose prefix is unsatisfiable.
    pub offending_constraint_index: usize,
    /// The package the conflicting constraint chains converge on.
    pub most_constrained_package: String,
    /// Chains of dependency arcs from top-level-constrained packages to the
    /// most constrained package.
    pub paths: Vec<ConstraintPath>,
    /// Rendered explanation, suitable as a CLI error.
    pub message: String,
}

/// Errors that may occur while selecting dependencies.
#[derive(Error, Debug)]
pub enum SelectorError {
    /// A version string failed to parse.
    #[error(transparent)]
    MalformedVersion(#[from] MalformedVersion),

    /// A constraint string failed to parse.
    #[error(transparent)]
    MalformedConstraint(#[from] MalformedConstraint),

    /// One or more top-level constraints were rejected before solving.
    #[error("{0}")]
    InvalidSolutionConstraints(InvalidSolutionConstraints),

    /// The problem is infeasible; the payload explains why.
    #[error("{}", .0.message)]
    NoSolution(Box<NoSolutionExists>),

    /// The time or backtrack budget ran out before the search finished.
    /// This is not a statement about feasibility.
    #[error("time bound exceeded before the search finished")]
    TimeBoundExceeded,

    /// Something unexpected happened.
    #[error("{0}")]
    Failure(String),
}
