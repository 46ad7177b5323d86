//! Versions and version constraints.
//!
//! Versions are plain `semver::Version`s. Index data and user input often use
//! the shorter RubyGems forms (`1`, `1.0`), so [`parse_version`] pads missing
//! components before handing the string to `semver`.
//!
//! Constraints accept the RubyGems operator set (`=`, `!=`, `>`, `>=`, `<`,
//! `<=`, `~>`) as comma-separated clauses and are backed by a
//! `semver::VersionReq`.

use std::fmt;
use std::str::FromStr;

use semver::{Comparator, Op, Version, VersionReq};
use thiserror::Error;

/// Errors produced while parsing versions, constraints and requirements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("invalid version `{input}`: {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("invalid constraint `{input}`: {reason}")]
    InvalidConstraint { input: String, reason: String },

    #[error("invalid requirement `{input}`: {reason}")]
    InvalidRequirement { input: String, reason: String },
}

/// Parse a version, accepting `1`, `1.0`, `v1.2.3` and full semver strings.
pub fn parse_version(input: &str) -> Result<Version, ConstraintError> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(split);

    let padded = match core.split('.').count() {
        1 => format!("{core}.0.0{rest}"),
        2 => format!("{core}.0{rest}"),
        _ => trimmed.to_string(),
    };

    Version::parse(&padded).map_err(|e| ConstraintError::InvalidVersion {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Pessimistic,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Pessimistic => "~>",
        }
    }

    /// Split a clause into its operator and the remaining version text.
    /// A clause without an operator is an exact match.
    fn split(clause: &str) -> (Self, &str) {
        const OPERATORS: [(&str, Operator); 7] = [
            ("~>", Operator::Pessimistic),
            (">=", Operator::GtEq),
            ("<=", Operator::LtEq),
            ("!=", Operator::NotEq),
            ("=", Operator::Eq),
            (">", Operator::Gt),
            ("<", Operator::Lt),
        ];
        for (prefix, op) in OPERATORS {
            if let Some(rest) = clause.strip_prefix(prefix) {
                return (op, rest.trim());
            }
        }
        (Operator::Eq, clause)
    }
}

/// A predicate over versions, e.g. `>= 1.0, < 2.0` or `~> 3.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    req: VersionReq,
    excluded: Vec<Version>,
    clauses: Vec<String>,
}

impl Constraint {
    /// A constraint every release version satisfies.
    pub fn any() -> Self {
        Self {
            req: VersionReq::STAR,
            excluded: Vec::new(),
            clauses: Vec::new(),
        }
    }

    /// A constraint satisfied by exactly `version`.
    pub fn exact(version: &Version) -> Self {
        Self {
            req: VersionReq {
                comparators: vec![comparator(Op::Exact, version)],
            },
            excluded: Vec::new(),
            clauses: vec![format!("= {version}")],
        }
    }

    /// Parse a comma-separated list of clauses. An empty string, `*` or
    /// `>= 0` means "any version".
    pub fn parse(input: &str) -> Result<Self, ConstraintError> {
        let input = input.trim();
        if input.is_empty() || input == "*" {
            return Ok(Self::any());
        }

        let mut comparators = Vec::new();
        let mut excluded = Vec::new();
        let mut clauses = Vec::new();

        for clause in input.split(',').map(str::trim) {
            let (op, raw) = Operator::split(clause);
            if raw.is_empty() {
                return Err(ConstraintError::InvalidConstraint {
                    input: input.to_string(),
                    reason: format!("clause `{clause}` has no version"),
                });
            }
            let version = parse_version(raw).map_err(|e| ConstraintError::InvalidConstraint {
                input: input.to_string(),
                reason: e.to_string(),
            })?;

            match op {
                Operator::Eq => comparators.push(comparator(Op::Exact, &version)),
                Operator::NotEq => excluded.push(version),
                Operator::Gt => comparators.push(comparator(Op::Greater, &version)),
                Operator::GtEq => comparators.push(comparator(Op::GreaterEq, &version)),
                Operator::Lt => comparators.push(comparator(Op::Less, &version)),
                Operator::LtEq => comparators.push(comparator(Op::LessEq, &version)),
                Operator::Pessimistic => {
                    comparators.push(comparator(Op::GreaterEq, &version));
                    comparators.push(comparator(Op::Less, &pessimistic_ceiling(raw, &version)));
                }
            }
            clauses.push(format!("{} {}", op.as_str(), raw));
        }

        let floor = comparator(Op::GreaterEq, &Version::new(0, 0, 0));
        if excluded.is_empty() && comparators == [floor] {
            return Ok(Self::any());
        }

        Ok(Self {
            req: VersionReq { comparators },
            excluded,
            clauses,
        })
    }

    /// Whether `version` satisfies every clause.
    ///
    /// Pre-release versions only match when a clause names a pre-release of
    /// the same `major.minor.patch`, following `semver` rules.
    pub fn satisfied_by(&self, version: &Version) -> bool {
        self.req.matches(version) && !self.excluded.contains(version)
    }

    /// True when the constraint places no restriction on release versions.
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl Default for Constraint {
    fn default() -> Self {
        Self::any()
    }
}

impl FromStr for Constraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str(">= 0");
        }
        f.write_str(&self.clauses.join(", "))
    }
}

fn comparator(op: Op, version: &Version) -> Comparator {
    Comparator {
        op,
        major: version.major,
        minor: Some(version.minor),
        patch: Some(version.patch),
        pre: version.pre.clone(),
    }
}

/// Upper bound for `~> raw`: `~> 1` and `~> 1.2` stay below `2.0.0`,
/// `~> 1.2.3` stays below `1.3.0`.
fn pessimistic_ceiling(raw: &str, version: &Version) -> Version {
    let core = raw.split(['-', '+']).next().unwrap_or(raw);
    if core.split('.').count() >= 3 {
        Version::new(version.major, version.minor.saturating_add(1), 0)
    } else {
        Version::new(version.major.saturating_add(1), 0, 0)
    }
}
