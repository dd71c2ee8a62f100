// SPDX-License-Identifier: MPL-2.0

//! Constraints are predicates selecting sets of versions.
//!
//! A [VersionConstraint] is a conjunction of atomic predicates, each one an
//! operator applied to a version. The text form is a whitespace-separated
//! list of atoms, `OP VERSION`, with operators `=`, `==`, `>`, `>=`, `<`,
//! `<=` and the pessimistic `~>`. A bare version is shorthand for `=`, and
//! the empty input (or `*`) is the default constraint accepting any version.
//!
//! The pessimistic operator `~> v` accepts `>= v` up to the "ceiling" of `v`:
//! `~> 1.2` means `>= 1.2, < 2.0` while `~> 1.2.3` means `>= 1.2.3, < 1.3.0`.
//! A single-component `~> 1` is rejected as malformed.

use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

use crate::version::{MalformedVersion, Version};

/// Error raised when a constraint string cannot be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedConstraint {
    /// The input does not match the `OP VERSION ...` grammar.
    #[error("malformed constraint `{input}`: {reason}")]
    Invalid {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// `~>` needs to know which component to bump, so a bare major
    /// component is not enough.
    #[error("pessimistic constraint `~> {version}` needs at least major and minor components")]
    PessimisticPrecision {
        /// The underconstrained version.
        version: Version,
    },

    /// A version inside the constraint failed to parse.
    #[error(transparent)]
    Version(#[from] MalformedVersion),
}

/// Atomic comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Op {
    /// `= v` (also written `== v` or as a bare version).
    Exact,
    /// `> v`
    Greater,
    /// `>= v`
    GreaterEq,
    /// `< v`
    Less,
    /// `<= v`
    LessEq,
    /// `~> v`, the pessimistic operator.
    Pessimistic,
}

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Pessimistic => "~>",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Atom {
    op: Op,
    version: Version,
}

impl Atom {
    fn matches(&self, v: &Version) -> bool {
        match self.op {
            Op::Exact => v == &self.version,
            Op::Greater => v > &self.version,
            Op::GreaterEq => v >= &self.version,
            Op::Less => v < &self.version,
            Op::LessEq => v <= &self.version,
            Op::Pessimistic => v >= &self.version && v < &pessimistic_ceiling(&self.version),
        }
    }
}

/// The smallest version excluded by `~> v`: `~> a.b` caps at `(a+1).0.0`,
/// `~> a.b.c` caps at `a.(b+1).0`.
fn pessimistic_ceiling(v: &Version) -> Version {
    if v.precision() <= 2 {
        Version::new(v.major() + 1, 0, 0)
    } else {
        Version::new(v.major(), v.minor() + 1, 0)
    }
}

/// A conjunction of atomic version predicates.
///
/// The default (empty) constraint accepts every version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionConstraint {
    atoms: Vec<Atom>,
}

impl VersionConstraint {
    /// The constraint accepting any version.
    pub fn any() -> Self {
        Self::default()
    }

    /// `= v`
    pub fn exactly(v: Version) -> Self {
        Self::atom(Op::Exact, v)
    }

    /// `> v`
    pub fn greater_than(v: Version) -> Self {
        Self::atom(Op::Greater, v)
    }

    /// `>= v`
    pub fn at_least(v: Version) -> Self {
        Self::atom(Op::GreaterEq, v)
    }

    /// `< v`
    pub fn less_than(v: Version) -> Self {
        Self::atom(Op::Less, v)
    }

    /// `<= v`
    pub fn at_most(v: Version) -> Self {
        Self::atom(Op::LessEq, v)
    }

    /// `~> v`. Fails unless `v` has at least major and minor components.
    pub fn pessimistic(v: Version) -> Result<Self, MalformedConstraint> {
        if v.precision() < 2 {
            return Err(MalformedConstraint::PessimisticPrecision { version: v });
        }
        Ok(Self::atom(Op::Pessimistic, v))
    }

    fn atom(op: Op, version: Version) -> Self {
        Self {
            atoms: vec![Atom { op, version }],
        }
    }

    /// True for the default constraint, which accepts any version.
    pub fn is_any(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns true if the version satisfies every atom of this constraint.
    pub fn contains(&self, v: &Version) -> bool {
        self.atoms.iter().all(|atom| atom.matches(v))
    }

    /// The conjunction of two constraints. The result may be unsatisfiable
    /// (accept no version at all); it is still a well-formed constraint.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut atoms = self.atoms.clone();
        for atom in &other.atoms {
            if !atoms.contains(atom) {
                atoms.push(atom.clone());
            }
        }
        Self { atoms }
    }

    /// The subset of `versions` accepted by this constraint, in input order.
    pub fn satisfying_versions<'a, I>(&self, versions: I) -> Vec<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().filter(|v| self.contains(v)).collect()
    }
}

impl FromStr for VersionConstraint {
    type Err = MalformedConstraint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| MalformedConstraint::Invalid {
            input: s.to_string(),
            reason,
        };

        let mut tokens = s.split_whitespace().peekable();
        if tokens.peek() == Some(&"*") {
            tokens.next();
            return match tokens.next() {
                None => Ok(Self::any()),
                Some(_) => Err(invalid("`*` cannot be combined with other atoms")),
            };
        }

        let mut atoms = Vec::new();
        while let Some(token) = tokens.next() {
            let (op, version_text) = split_operator(token);
            let version_text = match (op, version_text) {
                // Operator and version in one token, `>=1.0`.
                (Some(_), rest) if !rest.is_empty() => rest,
                // Operator alone, version is the next token.
                (Some(_), _) => tokens
                    .next()
                    .ok_or_else(|| invalid("operator without a version"))?,
                // Bare version, shorthand for `=`.
                (None, _) => token,
            };
            let op = op.unwrap_or(Op::Exact);
            let version: Version = version_text.parse()?;
            if op == Op::Pessimistic && version.precision() < 2 {
                return Err(MalformedConstraint::PessimisticPrecision { version });
            }
            atoms.push(Atom { op, version });
        }
        Ok(Self { atoms })
    }
}

/// Splits a leading operator off a token, longest spelling first so that
/// `>=` is not read as `>` followed by `=1.0`.
fn split_operator(token: &str) -> (Option<Op>, &str) {
    for (text, op) in [
        ("~>", Op::Pessimistic),
        (">=", Op::GreaterEq),
        ("<=", Op::LessEq),
        ("==", Op::Exact),
        ("=", Op::Exact),
        (">", Op::Greater),
        ("<", Op::Less),
    ] {
        if let Some(rest) = token.strip_prefix(text) {
            return (Some(op), rest);
        }
    }
    (None, token)
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.atoms.is_empty() {
            return f.write_str("*");
        }
        for (idx, atom) in self.atoms.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", atom.op, atom.version)?;
        }
        Ok(())
    }
}

// TESTS #######################################################################

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn c(s: &str) -> VersionConstraint {
        s.parse().unwrap()
    }

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn empty_input_accepts_everything() {
        for text in ["", "   ", "*"] {
            let any = c(text);
            assert!(any.is_any());
            assert!(any.contains(&v("0.0.1")));
            assert!(any.contains(&v("99.0.0-alpha")));
        }
    }

    #[test]
    fn bare_version_means_exact() {
        assert_eq!(c("1.2.3"), c("= 1.2.3"));
        assert_eq!(c("= 1.2.3"), c("== 1.2.3"));
        assert!(c("1.2.3").contains(&v("1.2.3")));
        assert!(!c("1.2.3").contains(&v("1.2.4")));
    }

    #[test]
    fn glued_and_spaced_operators_parse_alike() {
        assert_eq!(c(">=1.0"), c(">= 1.0"));
        assert_eq!(c("<2"), c("< 2"));
        assert_eq!(c("~>1.2"), c("~> 1.2"));
    }

    #[test]
    fn atoms_conjoin() {
        let range = c(">= 1.0 < 2.0");
        assert!(range.contains(&v("1.5.0")));
        assert!(!range.contains(&v("0.9.0")));
        assert!(!range.contains(&v("2.0.0")));
    }

    #[test]
    fn pessimistic_ceiling_depends_on_precision() {
        let minor = c("~> 1.2");
        assert!(minor.contains(&v("1.2.0")));
        assert!(minor.contains(&v("1.3.99")));
        assert!(!minor.contains(&v("2.0.0")));

        let patch = c("~> 1.2.3");
        assert!(patch.contains(&v("1.2.3")));
        assert!(patch.contains(&v("1.2.99")));
        assert!(!patch.contains(&v("1.3.0")));
    }

    #[test]
    fn pessimistic_needs_two_components() {
        assert!(matches!(
            "~> 1".parse::<VersionConstraint>(),
            Err(MalformedConstraint::PessimisticPrecision { .. })
        ));
        assert!(matches!(
            VersionConstraint::pessimistic(v("1")),
            Err(MalformedConstraint::PessimisticPrecision { .. })
        ));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        for s in [">=", "= =", "1.2.3 >", ">= x.y", "* >= 1.0"] {
            assert!(s.parse::<VersionConstraint>().is_err(), "{s:?} should not parse");
        }
    }

    #[test]
    fn intersect_is_conjunction() {
        let both = c(">= 1.0").intersect(&c("< 2.0"));
        assert_eq!(both, c(">= 1.0 < 2.0"));
        assert!(both.contains(&v("1.1.0")));
        assert!(!both.contains(&v("2.1.0")));

        // Unsatisfiable intersections are still well-formed constraints.
        let none = c("= 1.0").intersect(&c("= 2.0"));
        assert!(!none.contains(&v("1.0.0")));
        assert!(!none.contains(&v("2.0.0")));
    }

    #[test]
    fn satisfying_versions_preserves_order() {
        let versions: Vec<Version> = ["0.9.0", "1.0.0", "1.5.0", "2.0.0"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let picked = c(">= 1.0 < 2.0").satisfying_versions(&versions);
        assert_eq!(picked, [&versions[1], &versions[2]]);
    }

    prop_compose! {
        fn version_strat()(
            major in 0u64..50,
            minor in 0u64..50,
            patch in 0u64..50,
            precision in 1u8..=3,
            pre in prop::option::of("[0-9a-z]{1,4}(\\.[0-9a-z]{1,4})?"),
        ) -> Version {
            let text = match precision {
                1 => format!("{major}"),
                2 => format!("{major}.{minor}"),
                _ => format!("{major}.{minor}.{patch}"),
            };
            let text = match pre {
                Some(pre) => format!("{text}-{pre}"),
                None => text,
            };
            text.parse().unwrap()
        }
    }

    fn constraint_strat() -> impl Strategy<Value = VersionConstraint> {
        prop::collection::vec(
            (
                prop_oneof![
                    Just(Op::Exact),
                    Just(Op::Greater),
                    Just(Op::GreaterEq),
                    Just(Op::Less),
                    Just(Op::LessEq),
                    Just(Op::Pessimistic),
                ],
                version_strat(),
            ),
            0..4,
        )
        .prop_map(|pairs| {
            let atoms = pairs
                .into_iter()
                .map(|(op, mut version)| {
                    if op == Op::Pessimistic && version.precision() < 2 {
                        // `~>` needs a two-component spelling.
                        version = format!("{}.0", version.major()).parse().unwrap();
                    }
                    Atom { op, version }
                })
                .collect();
            VersionConstraint { atoms }
        })
    }

    proptest! {
        #[test]
        fn display_parse_round_trip(constraint in constraint_strat()) {
            let reparsed: VersionConstraint = constraint.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, constraint);
        }

        #[test]
        fn intersect_contains_both(
            a in constraint_strat(),
            b in constraint_strat(),
            version in version_strat(),
        ) {
            prop_assert_eq!(
                a.intersect(&b).contains(&version),
                a.contains(&version) && b.contains(&version)
            );
        }
    }
}
