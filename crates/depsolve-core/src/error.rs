//! Resolution failures and the log that collects them.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::spec::{Requirement, Specification};

/// A single reason a package could not be settled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// An already-activated specification does not satisfy a later requirement.
    #[error(
        "{package}: {activated} (required by {}) does not satisfy {conflicting} (required by {})",
        .activated.required_by(),
        .conflicting.required_by()
    )]
    VersionConflict {
        package: String,
        activated: Specification,
        conflicting: Requirement,
    },

    /// The index has no specification matching the requirement.
    #[error("{package}: no versions match {requirement} (required by {})", .requirement.required_by())]
    Unavailable {
        package: String,
        requirement: Requirement,
    },
}

impl ResolveError {
    pub fn package(&self) -> &str {
        match self {
            ResolveError::VersionConflict { package, .. } => package,
            ResolveError::Unavailable { package, .. } => package,
        }
    }
}

/// Diagnostics accumulated during one run, at most one per package.
///
/// An entry is dropped once the package later resolves cleanly on the same
/// branch, so what remains when the run fails are the conflicts that were
/// never explained away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorLog {
    entries: BTreeMap<String, ResolveError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `error`, replacing any earlier entry for the same package.
    pub fn record(&mut self, error: ResolveError) {
        self.entries.insert(error.package().to_string(), error);
    }

    pub fn clear(&mut self, package: &str) -> Option<ResolveError> {
        self.entries.remove(package)
    }

    pub fn get(&self, package: &str) -> Option<&ResolveError> {
        self.entries.get(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolveError> {
        self.entries.values()
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return f.write_str("no compatible set of versions found");
        }
        f.write_str("could not resolve dependencies:")?;
        for error in self.entries.values() {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorLog {}
