//! Package index: the query surface the resolver searches.
//!
//! [`MemoryIndex`] holds every known specification in memory and can be
//! built from JSON of the form
//!
//! ```json
//! {
//!   "rack": [
//!     { "version": "1.0", "dependencies": { "mime": ">= 0.5" },
//!       "development_dependencies": { "rspec": "~> 3.0" } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use semver::Version;
use serde::Deserialize;
use thiserror::Error;

use crate::spec::{Dependency, DependencyKind, Requirement, Specification};
use crate::version::{parse_version, Constraint, ConstraintError};

/// Returns the specifications matching a requirement, ascending by version.
///
/// Implementations must be deterministic and free of side effects for the
/// duration of one resolution run.
pub trait Index {
    fn search(&self, requirement: &Requirement) -> Vec<Specification>;
}

impl<T: Index + ?Sized> Index for &T {
    fn search(&self, requirement: &Requirement) -> Vec<Specification> {
        (**self).search(requirement)
    }
}

impl<T: Index + ?Sized> Index for Box<T> {
    fn search(&self, requirement: &Requirement) -> Vec<Specification> {
        (**self).search(requirement)
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to parse index: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{package}: {source}")]
    Version {
        package: String,
        source: ConstraintError,
    },

    #[error("{package} {version} depends on {dependency}: {source}")]
    Dependency {
        package: String,
        version: String,
        dependency: String,
        source: ConstraintError,
    },
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    development_dependencies: BTreeMap<String, String>,
}

/// In-memory index keyed by package name.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    packages: BTreeMap<String, Vec<Specification>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a list of specifications.
    pub fn from_specs(specs: impl IntoIterator<Item = Specification>) -> Self {
        let mut index = Self::new();
        for spec in specs {
            index.add(spec);
        }
        index
    }

    /// Parse the JSON index format described in the module docs.
    pub fn from_json_str(content: &str) -> Result<Self, IndexError> {
        let raw: BTreeMap<String, Vec<RawSpec>> = serde_json::from_str(content)?;
        let mut index = Self::new();

        for (name, entries) in raw {
            for entry in entries {
                let version = parse_version(&entry.version).map_err(|source| IndexError::Version {
                    package: name.clone(),
                    source,
                })?;

                let mut dependencies = Vec::new();
                let kinds = [
                    (&entry.dependencies, DependencyKind::Runtime),
                    (&entry.development_dependencies, DependencyKind::Development),
                ];
                for (deps, kind) in kinds {
                    for (dep_name, constraint) in deps {
                        let constraint =
                            Constraint::parse(constraint).map_err(|source| IndexError::Dependency {
                                package: name.clone(),
                                version: entry.version.clone(),
                                dependency: dep_name.clone(),
                                source,
                            })?;
                        dependencies.push(Dependency {
                            requirement: Requirement::new(dep_name.clone(), constraint),
                            kind,
                        });
                    }
                }

                index.add(Specification::new(name.clone(), version).with_dependencies(dependencies));
            }
        }

        log::debug!(
            "loaded index: {} packages, {} specifications",
            index.packages.len(),
            index.len()
        );
        Ok(index)
    }

    /// Insert a specification, replacing one with the same name and version.
    pub fn add(&mut self, spec: Specification) {
        let specs = self.packages.entry(spec.name.clone()).or_default();
        match specs.binary_search_by(|s| s.version.cmp(&spec.version)) {
            Ok(pos) => specs[pos] = spec,
            Err(pos) => specs.insert(pos, spec),
        }
    }

    /// All known versions of `name`, ascending.
    pub fn versions(&self, name: &str) -> Vec<&Version> {
        self.packages
            .get(name)
            .map(|specs| specs.iter().map(|s| &s.version).collect())
            .unwrap_or_default()
    }

    pub fn specs(&self, name: &str) -> &[Specification] {
        self.packages.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Number of specifications across all packages.
    pub fn len(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Index for MemoryIndex {
    fn search(&self, requirement: &Requirement) -> Vec<Specification> {
        self.specs(&requirement.name)
            .iter()
            .filter(|s| requirement.constraint.satisfied_by(&s.version))
            .cloned()
            .collect()
    }
}
