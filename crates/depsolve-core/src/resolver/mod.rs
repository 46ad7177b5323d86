//! Depth-first dependency resolver with conflict-directed backjumping.
//!
//! Each step picks the most constrained pending requirement. If the package
//! is already activated on this branch the existing choice is checked;
//! otherwise every matching specification is tried, newest first, as a new
//! branch. Every candidate attempt opens a checkpoint labeled with the
//! requirement's package name.
//!
//! A version conflict does not simply return to the caller: it jumps to the
//! checkpoint of the package that introduced the conflicting requirement,
//! unwinding every attempt opened since then. Jumps travel as [`Escape`]
//! values through ordinary returns; the attempt whose checkpoint depth
//! matches absorbs the jump and moves on to its next candidate.

mod stack;

#[cfg(test)]
mod tests;

pub use stack::CheckpointStack;

use std::collections::BTreeMap;

use log::{debug, info, trace};
use serde::Serialize;

use crate::error::{ErrorLog, ResolveError};
use crate::index::Index;
use crate::spec::{Requirement, Specification};

/// The package name → specification assignment of one branch.
pub type Activated = BTreeMap<String, Specification>;

/// Non-local outcomes of a search step. `Ok(())` from a step means the
/// branch was exhausted without forcing a jump.
#[derive(Debug)]
enum Escape {
    /// Every requirement is settled; carries the final assignment.
    Solved(Activated),
    /// Unwind to the candidate attempt opened at `depth`.
    Backjump(Backjump),
    /// A jump target is no longer on the stack: nothing is left to try.
    Exhausted,
}

#[derive(Debug)]
struct Backjump {
    depth: usize,
    /// Deepest requirer of the specification that caused the conflict,
    /// reported to the absorbing attempt as its failure label.
    culprit: Option<String>,
}

type Flow<T> = Result<T, Escape>;

/// Counters for one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    pub steps: usize,
    pub activations: usize,
    pub conflicts: usize,
    pub backjumps: usize,
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// One specification per package, ordered by name.
    pub specs: Vec<Specification>,
    pub stats: ResolveStats,
}

impl Resolution {
    pub fn get(&self, name: &str) -> Option<&Specification> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn into_specs(self) -> Vec<Specification> {
        self.specs
    }
}

/// Resolve `requirements` against `index`.
///
/// On success returns every activated specification; on failure returns the
/// conflicts that were still unexplained when the search gave up.
pub fn resolve<I: Index + ?Sized>(
    requirements: Vec<Requirement>,
    index: &I,
) -> Result<Vec<Specification>, ErrorLog> {
    Resolver::new(index).run(requirements).map(Resolution::into_specs)
}

pub struct Resolver<'a, I: Index + ?Sized> {
    index: &'a I,
    stack: CheckpointStack,
    errors: ErrorLog,
    stats: ResolveStats,
}

impl<'a, I: Index + ?Sized> Resolver<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self {
            index,
            stack: CheckpointStack::new(),
            errors: ErrorLog::new(),
            stats: ResolveStats::default(),
        }
    }

    /// Run one resolution. Requirements passed in are treated as root
    /// requirements regardless of any history they carry.
    pub fn run(mut self, requirements: Vec<Requirement>) -> Result<Resolution, ErrorLog> {
        let roots: Vec<Requirement> = requirements.into_iter().map(Requirement::into_root).collect();
        info!("resolving {} root requirements", roots.len());

        match self.resolve(roots, &Activated::new()) {
            Err(Escape::Solved(activated)) => {
                info!(
                    "resolved {} packages in {} steps ({} backjumps)",
                    activated.len(),
                    self.stats.steps,
                    self.stats.backjumps
                );
                Ok(Resolution {
                    specs: activated.into_values().collect(),
                    stats: self.stats,
                })
            }
            outcome => {
                debug!("search ended without a solution: {:?}", outcome.err());
                info!("resolution failed with {} unexplained conflicts", self.errors.len());
                Err(self.errors)
            }
        }
    }

    /// One search step over the pending `requirements` of a branch.
    fn resolve(&mut self, mut requirements: Vec<Requirement>, activated: &Activated) -> Flow<()> {
        if requirements.is_empty() {
            return Err(Escape::Solved(activated.clone()));
        }
        self.stats.steps += 1;

        self.order(&mut requirements, activated);
        trace!("requirements: {}", join(&requirements));
        trace!("activated: {}", join(activated.values()));

        let current = requirements.remove(0);
        debug!("attempting {} (required by {})", current, current.required_by());

        if let Some(existing) = activated.get(&current.name) {
            if current.constraint.satisfied_by(&existing.version) {
                debug!("  existing {} satisfies {}", existing, current);
                self.errors.clear(&existing.name);
                return self.resolve(requirements, activated);
            }
            return self.conflict(existing, current);
        }

        let candidates = self.index.search(&current);
        if candidates.is_empty() {
            return self.unavailable(current);
        }

        let mut failures: Vec<String> = Vec::new();
        for spec in candidates.into_iter().rev() {
            let culprit = self.attempt(spec, &current, requirements.clone(), activated.clone())?;
            if let Some(culprit) = culprit {
                if !failures.contains(&culprit) {
                    failures.push(culprit);
                }
            }
        }

        // Every candidate for a root requirement failed. Retrying here cannot
        // help, so go back to the nearest open attempt that was blamed.
        if current.is_root() && !failures.is_empty() {
            return match self.stack.nearest_of(&failures) {
                Some(depth) => {
                    debug!("  root {} exhausted; backjump to {}", current.name, self.stack.labels()[depth]);
                    self.jump(depth, None)
                }
                None => {
                    debug!("  root {} exhausted; no blamed checkpoint left", current.name);
                    Err(Escape::Exhausted)
                }
            };
        }

        Ok(())
    }

    /// Try `candidate` for `requirement` on a branch of its own.
    ///
    /// Returns the failure label of a backjump aimed at this attempt, `None`
    /// if the subtree was exhausted quietly, and passes every other escape
    /// through.
    fn attempt(
        &mut self,
        candidate: Specification,
        requirement: &Requirement,
        mut requirements: Vec<Requirement>,
        mut activated: Activated,
    ) -> Flow<Option<String>> {
        let spec = candidate.tagged(requirement.required_by().clone());
        debug!("  activating {}", spec);

        let chain = requirement.required_by().push(requirement.clone());
        for dep in spec.runtime_dependencies() {
            trace!("    requires {}", dep);
            requirements.push(dep.with_required_by(chain.clone()));
        }
        activated.insert(spec.name.clone(), spec);
        self.stats.activations += 1;

        let depth = self.stack.push(&requirement.name);
        trace!("  savepoint {} at depth {}", requirement.name, depth);
        let outcome = self.resolve(requirements, &activated);
        self.stack.truncate(depth);

        match outcome {
            Ok(()) => Ok(None),
            Err(Escape::Backjump(jump)) if jump.depth == depth => Ok(jump.culprit),
            Err(escape) => Err(escape),
        }
    }

    /// `current` cannot be met by the already-activated `existing`.
    fn conflict(&mut self, existing: &Specification, current: Requirement) -> Flow<()> {
        self.stats.conflicts += 1;
        debug!("  existing {} conflicts with {}", existing, current);

        let culprit = existing.required_by().last().map(|r| r.name.clone());
        // Two root requirements disagree: the only decision to undo is the
        // activation of `existing` itself.
        let target = current
            .required_by()
            .last()
            .or_else(|| existing.required_by().last())
            .map(|r| r.name.clone())
            .unwrap_or_else(|| existing.name.clone());

        self.errors.record(ResolveError::VersionConflict {
            package: existing.name.clone(),
            activated: existing.clone(),
            conflicting: current,
        });

        match self.stack.position_of(&target) {
            Some(depth) => {
                debug!("  backtrack to {}", target);
                self.jump(depth, culprit)
            }
            None => Err(Escape::Exhausted),
        }
    }

    /// Nothing in the index matches `current`. No other decision changes
    /// that, so a root requirement ends the run and a derived one rejects
    /// the parent candidate that introduced it.
    ///
    /// The rejection carries no failure label: the parent's checkpoint is
    /// already popped when its requirement tallies failures.
    fn unavailable(&mut self, current: Requirement) -> Flow<()> {
        debug!("  no candidates for {}", current);
        let parent = current.required_by().last().map(|r| r.name.clone());
        self.errors.record(ResolveError::Unavailable {
            package: current.name.clone(),
            requirement: current,
        });

        let Some(parent) = parent else {
            return Err(Escape::Exhausted);
        };
        match self.stack.position_of(&parent) {
            Some(depth) => self.jump(depth, None),
            None => Err(Escape::Exhausted),
        }
    }

    fn jump(&mut self, depth: usize, culprit: Option<String>) -> Flow<()> {
        self.stats.backjumps += 1;
        Err(Escape::Backjump(Backjump { depth, culprit }))
    }

    /// Already-activated packages first, then fewest candidates first.
    /// The sort is stable, so ties keep their original order.
    fn order(&self, requirements: &mut [Requirement], activated: &Activated) {
        requirements.sort_by_cached_key(|req| {
            if activated.contains_key(&req.name) {
                0
            } else {
                self.index.search(req).len()
            }
        });
    }
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
