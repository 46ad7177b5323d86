//! Requirements, specifications and the causal chain that links them.

use std::fmt;
use std::rc::Rc;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::version::{Constraint, ConstraintError};

/// Ordered history of the requirements that led to a requirement or an
/// activated specification. The last element is the immediate requirer.
///
/// The chain is persistent: [`RequiredBy::push`] shares the existing links
/// instead of mutating them, so sibling branches can extend the same prefix
/// without observing each other.
#[derive(Clone, Default)]
pub struct RequiredBy {
    head: Option<Rc<Link>>,
    len: usize,
}

struct Link {
    requirement: Rc<Requirement>,
    parent: Option<Rc<Link>>,
}

impl RequiredBy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new chain ending in `requirement`.
    pub fn push(&self, requirement: Requirement) -> Self {
        Self {
            head: Some(Rc::new(Link {
                requirement: Rc::new(requirement),
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// The immediate requirer, if any.
    pub fn last(&self) -> Option<&Requirement> {
        self.head.as_deref().map(|link| link.requirement.as_ref())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Requirers from the most recent back to the root.
    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        let mut cursor = self.head.as_deref();
        std::iter::from_fn(move || {
            let link = cursor?;
            cursor = link.parent.as_deref();
            Some(link.requirement.as_ref())
        })
    }

    /// Requirer names, oldest first.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().map(|r| r.name.as_str()).collect();
        names.reverse();
        names
    }
}

impl PartialEq for RequiredBy {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Debug for RequiredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl fmt::Display for RequiredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("root");
        }
        f.write_str(&self.names().join(" -> "))
    }
}

/// A named package with an acceptable-version constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub name: String,
    pub constraint: Constraint,
    required_by: RequiredBy,
}

impl Requirement {
    /// A root requirement: nothing required it but the caller.
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            required_by: RequiredBy::new(),
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, Constraint::any())
    }

    /// Parse `name`, `name >= 1.0, < 2.0`, `name>=1.0` or `name (~> 1.2)`.
    pub fn parse(input: &str) -> Result<Self, ConstraintError> {
        let input = input.trim();
        let split = input
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '!' | '<' | '>' | '~' | '('))
            .unwrap_or(input.len());
        let (name, rest) = input.split_at(split);
        if name.is_empty() {
            return Err(ConstraintError::InvalidRequirement {
                input: input.to_string(),
                reason: "missing package name".to_string(),
            });
        }

        let rest = rest.trim();
        let rest = match rest.strip_prefix('(') {
            Some(inner) => inner.strip_suffix(')').ok_or_else(|| {
                ConstraintError::InvalidRequirement {
                    input: input.to_string(),
                    reason: "unbalanced parenthesis".to_string(),
                }
            })?,
            None => rest,
        };

        Ok(Self::new(name, Constraint::parse(rest)?))
    }

    pub fn required_by(&self) -> &RequiredBy {
        &self.required_by
    }

    /// A root requirement has an empty causal chain.
    pub fn is_root(&self) -> bool {
        self.required_by.is_empty()
    }

    /// Copy of this requirement carrying `chain` as its history.
    pub fn with_required_by(&self, chain: RequiredBy) -> Self {
        Self {
            name: self.name.clone(),
            constraint: self.constraint.clone(),
            required_by: chain,
        }
    }

    /// Copy of this requirement with its history cleared.
    pub fn into_root(mut self) -> Self {
        self.required_by = RequiredBy::new();
        self
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.constraint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Runtime,
    Development,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub requirement: Requirement,
    pub kind: DependencyKind,
}

/// One concrete candidate: a package version and what it depends on.
///
/// Specifications come from an [`Index`](crate::Index) untagged. The
/// resolver works on [`tagged`](Specification::tagged) copies so the causal
/// chain recorded for one branch never reaches the index or a sibling branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    pub name: String,
    pub version: Version,
    dependencies: Rc<[Dependency]>,
    required_by: RequiredBy,
}

impl Specification {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies: Rc::from(Vec::new()),
            required_by: RequiredBy::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = Rc::from(dependencies);
        self
    }

    /// Add a runtime dependency.
    pub fn depends_on(self, requirement: Requirement) -> Self {
        self.push_dependency(requirement, DependencyKind::Runtime)
    }

    /// Add a development dependency. The resolver never follows these.
    pub fn dev_depends_on(self, requirement: Requirement) -> Self {
        self.push_dependency(requirement, DependencyKind::Development)
    }

    fn push_dependency(mut self, requirement: Requirement, kind: DependencyKind) -> Self {
        let mut deps = self.dependencies.to_vec();
        deps.push(Dependency {
            requirement: requirement.into_root(),
            kind,
        });
        self.dependencies = Rc::from(deps);
        self
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn runtime_dependencies(&self) -> impl Iterator<Item = &Requirement> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Runtime)
            .map(|d| &d.requirement)
    }

    pub fn required_by(&self) -> &RequiredBy {
        &self.required_by
    }

    /// Branch-local copy carrying `chain`. The dependency list is shared.
    pub fn tagged(&self, chain: RequiredBy) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version.clone(),
            dependencies: Rc::clone(&self.dependencies),
            required_by: chain,
        }
    }

    /// `name-version`, as package files are named.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_requirement_forms() {
        let plain = Requirement::parse("rack").unwrap();
        assert_eq!(plain.name, "rack");
        assert!(plain.constraint.is_any());
        assert!(plain.is_root());

        let spaced = Requirement::parse("rack >= 1.0, < 2.0").unwrap();
        assert_eq!(spaced.name, "rack");
        assert_eq!(spaced.constraint.to_string(), ">= 1.0, < 2.0");

        let packed = Requirement::parse("rack>=1.0").unwrap();
        assert_eq!(packed.name, "rack");
        assert_eq!(packed.constraint.to_string(), ">= 1.0");

        let gem = Requirement::parse("rack (~> 1.2)").unwrap();
        assert_eq!(gem.to_string(), "rack (~> 1.2)");
    }

    #[test]
    fn parse_requirement_errors() {
        assert!(Requirement::parse(">= 1.0").is_err());
        assert!(Requirement::parse("rack (>= 1.0").is_err());
        assert!(Requirement::parse("rack >= x").is_err());
    }

    #[test]
    fn chain_is_shared_not_mutated() {
        let a = Requirement::any("a");
        let b = Requirement::any("b");
        let base = RequiredBy::new().push(a);
        let left = base.push(b.clone());
        let right = base.push(Requirement::any("c"));

        assert_eq!(base.names(), vec!["a"]);
        assert_eq!(left.names(), vec!["a", "b"]);
        assert_eq!(right.names(), vec!["a", "c"]);
        assert_eq!(left.last(), Some(&b));
        assert_eq!(left.to_string(), "a -> b");
        assert_eq!(RequiredBy::new().to_string(), "root");
    }

    #[test]
    fn tagging_leaves_original_untouched() {
        let spec = Specification::new("a", Version::new(1, 0, 0));
        let chain = RequiredBy::new().push(Requirement::any("x"));
        let tagged = spec.tagged(chain.clone());

        assert!(spec.required_by().is_empty());
        assert_eq!(tagged.required_by(), &chain);
        assert_eq!(tagged.full_name(), "a-1.0.0");
    }

    #[test]
    fn development_dependencies_are_not_runtime() {
        let spec = Specification::new("a", Version::new(1, 0, 0))
            .depends_on(Requirement::any("b"))
            .dev_depends_on(Requirement::any("rspec"));

        assert_eq!(spec.dependencies().len(), 2);
        let runtime: Vec<&str> = spec.runtime_dependencies().map(|r| r.name.as_str()).collect();
        assert_eq!(runtime, vec!["b"]);
    }
}
