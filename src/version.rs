// SPDX-License-Identifier: MPL-2.0

//! Totally ordered version values.
//!
//! A [Version] is a `major.minor.patch` triple with optional pre-release and
//! build tags, written `MAJOR[.MINOR[.PATCH[-PRE][+BUILD]]]`. Missing minor or
//! patch components default to 0. The order is lexicographic on the numeric
//! triple; a version carrying a pre-release tag sorts strictly below the same
//! triple without one. Build tags never participate in comparisons.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

/// Error raised when a version string does not match
/// `MAJOR[.MINOR[.PATCH[-PRE][+BUILD]]]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed version `{input}`: {reason}")]
pub struct MalformedVersion {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl MalformedVersion {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Type for semantic versions: `major.minor.patch` with optional tags.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Option<String>,
    build: Option<String>,
    // How many numeric components were written (1..=3). Display and the
    // pessimistic ceiling rule depend on it; comparisons do not.
    precision: u8,
}

// Constructors
impl Version {
    /// Create a version with "major", "minor" and "patch" values.
    /// `version = major.minor.patch`
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
            precision: 3,
        }
    }

    /// Version 0.0.0.
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Attach a pre-release tag. The tag must be non-empty and consist of
    /// ASCII alphanumerics, `.` and `-`.
    pub fn with_pre(mut self, pre: impl Into<String>) -> Self {
        self.pre = Some(pre.into());
        self
    }

    /// Attach a build tag. Build tags are carried along but ignored by
    /// equality and ordering.
    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }
}

// Accessors
impl Version {
    /// Major component.
    pub fn major(&self) -> u64 {
        self.major
    }

    /// Minor component (0 when omitted from the source text).
    pub fn minor(&self) -> u64 {
        self.minor
    }

    /// Patch component (0 when omitted from the source text).
    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// Pre-release tag, if any.
    pub fn pre(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    /// Build tag, if any.
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// How many numeric components were written: 1, 2 or 3.
    pub(crate) fn precision(&self) -> u8 {
        self.precision
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        // Build tags and written precision do not take part in equality.
        (self.major, self.minor, self.patch, &self.pre)
            == (other.major, other.minor, other.patch, &other.pre)
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch, &self.pre).hash(state)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                // A pre-release sorts below the plain version.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_pre(a, b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dot-separated pre-release identifiers: all-numeric identifiers compare
/// numerically and sort below alphanumeric ones; otherwise ASCII order.
/// A tag that is a strict prefix of another sorts first.
fn compare_pre(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(ln), Ok(rn)) => ln.cmp(&rn),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
}

impl FromStr for Version {
    type Err = MalformedVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(MalformedVersion::new(s, "empty input"));
        }

        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (s, None),
        };
        let (numeric, pre) = match rest.split_once('-') {
            Some((numeric, pre)) => (numeric, Some(pre)),
            None => (rest, None),
        };

        if let Some(pre) = pre {
            if !valid_tag(pre) {
                return Err(MalformedVersion::new(s, "invalid pre-release tag"));
            }
        }
        if let Some(build) = build {
            if !valid_tag(build) {
                return Err(MalformedVersion::new(s, "invalid build tag"));
            }
        }

        let mut components = [0u64; 3];
        let mut precision = 0u8;
        for component in numeric.split('.') {
            if precision == 3 {
                return Err(MalformedVersion::new(s, "more than three components"));
            }
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return Err(MalformedVersion::new(s, "component is not a number"));
            }
            components[precision as usize] = component
                .parse()
                .map_err(|_| MalformedVersion::new(s, "component out of range"))?;
            precision += 1;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            pre: pre.map(str::to_string),
            build: build.map(str::to_string),
            precision,
        })
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if self.precision >= 2 {
            write!(f, ".{}", self.minor)?;
        }
        if self.precision >= 3 {
            write!(f, ".{}", self.patch)?;
        }
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

// TESTS #######################################################################
