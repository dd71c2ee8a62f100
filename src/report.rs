// SPDX-License-Identifier: MPL-2.0

//! Human-readable explanations of infeasible inputs.
//!
//! When no assignment exists, the diagnoser produces chains of dependency
//! arcs from a top-level-constrained package down to the most constrained
//! one. This module holds the path representation and turns a diagnosis into
//! the message carried by [NoSolutionExists](crate::NoSolutionExists).

use std::fmt::{self, Display, Write as _};

/// One node of a [ConstraintPath]: a package and the rendered constraint
/// applied to it on this path (the top-level constraint for the first step,
/// the incoming dependency constraint for every later step).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Package name.
    pub package: String,
    /// Rendered constraint narrowing this package on this path.
    pub constraint: String,
}

/// A chain of dependency arcs from a top-level-constrained package to the
/// most constrained package, rendered as
/// `top {constraint} -> dep {constraint} -> ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintPath {
    /// The steps of the chain, top-level package first.
    pub steps: Vec<PathStep>,
}

impl Display for ConstraintPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, step) in self.steps.iter().enumerate() {
            if idx > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{} {{{}}}", step.package, step.constraint)?;
        }
        Ok(())
    }
}

/// Renders the message of a [NoSolutionExists](crate::NoSolutionExists).
/// The result is suitable as a CLI error without further formatting.
pub(crate) fn render_no_solution(
    offending_index: usize,
    offending_package: &str,
    offending_constraint: &str,
    most_constrained: &str,
    package_exists: bool,
    paths: &[ConstraintPath],
) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "unable to satisfy solution constraint #{} ({} {{{}}})",
        offending_index, offending_package, offending_constraint
    );
    if package_exists {
        let _ = write!(
            out,
            ": no version of {} satisfies the combined constraints",
            most_constrained
        );
    } else {
        let _ = write!(out, ": package {} does not exist", most_constrained);
    }
    if !paths.is_empty() {
        let _ = write!(out, "\nconstraints on {}:", most_constrained);
        for path in paths {
            let _ = write!(out, "\n  {path}");
        }
    }
    out
}

// TESTS #######################################################################
