//! Tests for the backjumping resolver

use super::*;
use crate::index::MemoryIndex;
use crate::spec::RequiredBy;
use crate::version::{parse_version, Constraint};
use std::collections::HashSet;

fn req(input: &str) -> Requirement {
    Requirement::parse(input).unwrap()
}

fn spec(name: &str, version: &str, deps: &[&str]) -> Specification {
    deps.iter().fold(
        Specification::new(name, parse_version(version).unwrap()),
        |s, d| s.depends_on(req(d)),
    )
}

fn version_of(specs: &[Specification], name: &str) -> Option<String> {
    specs
        .iter()
        .find(|s| s.name == name)
        .map(|s| s.version.to_string())
}

/// Every root requirement and every runtime dependency of every chosen
/// specification is met by the assignment, and names are unique.
fn assert_consistent(roots: &[Requirement], specs: &[Specification]) {
    let names: HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), specs.len(), "duplicate package in {specs:?}");

    let chosen = |r: &Requirement| specs.iter().find(|s| s.name == r.name);
    let derived = specs.iter().flat_map(|s| s.runtime_dependencies());
    for r in roots.iter().chain(derived) {
        let s = chosen(r).unwrap_or_else(|| panic!("{r} not resolved"));
        assert!(r.constraint.satisfied_by(&s.version), "{s} does not satisfy {r}");
    }
}

#[test]
fn picks_highest_satisfying_version() {
    let index = MemoryIndex::from_specs([spec("A", "1.0", &[]), spec("A", "2.0", &[])]);
    let roots = vec![req("A >= 1.0")];

    let specs = resolve(roots.clone(), &index).unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(version_of(&specs, "A").as_deref(), Some("2.0.0"));
    assert_consistent(&roots, &specs);
}

#[test]
fn diamond_shares_one_dependency() {
    let index = MemoryIndex::from_specs([
        spec("A", "1.0", &["C >= 1.0"]),
        spec("B", "1.0", &["C >= 1.0"]),
        spec("C", "1.0", &[]),
    ]);
    let roots = vec![req("A"), req("B")];

    let specs = resolve(roots.clone(), &index).unwrap();
    assert_eq!(specs.len(), 3);
    assert_eq!(version_of(&specs, "C").as_deref(), Some("1.0.0"));
    assert_consistent(&roots, &specs);
}

#[test]
fn conflicting_root_requirements_fail() {
    let index = MemoryIndex::from_specs([spec("X", "1.5", &[]), spec("X", "2.5", &[])]);

    let errors = resolve(vec![req("X >= 2.0"), req("X < 2.0")], &index).unwrap_err();
    match errors.get("X") {
        Some(ResolveError::VersionConflict {
            activated,
            conflicting,
            ..
        }) => {
            assert_eq!(activated.version.to_string(), "2.5.0");
            assert_eq!(conflicting.to_string(), "X (< 2.0)");
        }
        other => panic!("expected a version conflict for X, got {other:?}"),
    }
}

#[test]
fn backjumps_past_unrelated_branch() {
    // A 2.0 pulls in D >= 2.0 through C, but B only works with D < 2.0.
    let index = MemoryIndex::from_specs([
        spec("A", "1.0", &[]),
        spec("A", "2.0", &["C >= 1.0"]),
        spec("C", "1.0", &["D >= 2.0"]),
        spec("B", "1.0", &["D < 2.0"]),
        spec("D", "1.5", &[]),
        spec("D", "2.5", &[]),
    ]);
    let roots = vec![req("A"), req("B")];

    let resolution = Resolver::new(&index).run(roots.clone()).unwrap();
    let specs = &resolution.specs;
    assert_eq!(version_of(specs, "A").as_deref(), Some("1.0.0"));
    assert_eq!(version_of(specs, "B").as_deref(), Some("1.0.0"));
    assert_eq!(version_of(specs, "D").as_deref(), Some("1.5.0"));
    assert!(resolution.get("C").is_none());
    assert_consistent(&roots, specs);

    // B and D are activated once; only A is retried.
    assert_eq!(resolution.stats.activations, 5);
    assert_eq!(resolution.stats.conflicts, 1);
    assert_eq!(resolution.stats.backjumps, 1);
}

#[test]
fn root_exhaustion_reports_conflict() {
    let index = MemoryIndex::from_specs([
        spec("A", "1.0", &["D >= 2.0"]),
        spec("B", "1.0", &["D < 2.0"]),
        spec("D", "1.5", &[]),
        spec("D", "2.5", &[]),
    ]);

    let errors = resolve(vec![req("A"), req("B")], &index).unwrap_err();
    assert!(!errors.is_empty());
    assert!(matches!(
        errors.get("D"),
        Some(ResolveError::VersionConflict { .. })
    ));
}

#[test]
fn every_candidate_conflicting_exhausts() {
    let index = MemoryIndex::from_specs([
        spec("A", "1.0", &["D = 1.0"]),
        spec("A", "2.0", &["D = 2.0"]),
        spec("B", "1.0", &["D = 3.0"]),
        spec("D", "1.0", &[]),
        spec("D", "2.0", &[]),
        spec("D", "3.0", &[]),
    ]);

    // B pins D 3.0 first; both A candidates conflict on D, and the forced
    // jump from the exhausted root A unwinds to B's checkpoint.
    let mut resolver = Resolver::new(&index);
    let outcome = resolver.resolve(vec![req("A"), req("B")], &Activated::new());
    assert!(matches!(outcome, Ok(())));
    assert_eq!(resolver.stats.conflicts, 2);
    assert_eq!(resolver.stats.backjumps, 3);
    assert!(resolver.stack.is_empty());
    match resolver.errors.get("D") {
        Some(ResolveError::VersionConflict {
            activated,
            conflicting,
            ..
        }) => {
            assert_eq!(activated.version.to_string(), "3.0.0");
            assert_eq!(conflicting.to_string(), "D (= 1.0)");
            assert_eq!(conflicting.required_by().names(), vec!["A"]);
        }
        other => panic!("expected a version conflict for D, got {other:?}"),
    }

    assert!(resolve(vec![req("A"), req("B")], &index).is_err());
}

#[test]
fn orders_activated_then_fewest_candidates() {
    let index = MemoryIndex::from_specs([
        spec("W", "1.0", &[]),
        spec("W", "2.0", &[]),
        spec("X", "1.0", &[]),
        spec("X", "2.0", &[]),
        spec("X", "3.0", &[]),
        spec("Y", "1.0", &[]),
        spec("Z", "1.0", &[]),
    ]);
    let mut activated = Activated::new();
    activated.insert("X".to_string(), spec("X", "3.0", &[]));

    let resolver = Resolver::new(&index);
    let mut requirements = vec![req("W"), req("X"), req("Y"), req("Z"), req("W >= 2.0")];
    resolver.order(&mut requirements, &activated);

    let order: Vec<String> = requirements.iter().map(|r| r.to_string()).collect();
    assert_eq!(
        order,
        vec!["X (>= 0)", "Y (>= 0)", "Z (>= 0)", "W (>= 2.0)", "W (>= 0)"]
    );
}

#[test]
fn missing_dependency_does_not_end_the_search() {
    // Q 2.0 needs a package the index lacks; that must only reject Q 2.0,
    // leaving B 1.0 to be tried after B 2.0 fails through C.
    let index = MemoryIndex::from_specs([
        spec("B", "1.0", &["D = 1.0"]),
        spec("B", "2.0", &["D = 2.0"]),
        spec("Q", "1.0", &["C"]),
        spec("Q", "2.0", &["gone"]),
        spec("C", "1.0", &["D = 1.0"]),
        spec("D", "1.0", &[]),
        spec("D", "2.0", &[]),
    ]);
    let roots = vec![req("B"), req("Q")];

    let specs = resolve(roots.clone(), &index).unwrap();
    assert_eq!(version_of(&specs, "B").as_deref(), Some("1.0.0"));
    assert_eq!(version_of(&specs, "Q").as_deref(), Some("1.0.0"));
    assert_eq!(version_of(&specs, "C").as_deref(), Some("1.0.0"));
    assert_eq!(version_of(&specs, "D").as_deref(), Some("1.0.0"));
    assert!(version_of(&specs, "gone").is_none());
    assert_consistent(&roots, &specs);
}

#[test]
fn deterministic_across_runs() {
    let index = MemoryIndex::from_specs([
        spec("A", "1.0", &["X ~> 1.0"]),
        spec("A", "1.1", &["X ~> 1.0", "Y"]),
        spec("X", "1.0", &[]),
        spec("X", "1.4", &[]),
        spec("Y", "0.1", &["X < 1.4"]),
        spec("Y", "0.2", &[]),
    ]);
    let roots = vec![req("A"), req("Y")];

    let first = resolve(roots.clone(), &index).unwrap();
    let second = resolve(roots.clone(), &index).unwrap();
    assert_eq!(first, second);
    assert_consistent(&roots, &first);
}

#[test]
fn development_dependencies_are_ignored() {
    let index = MemoryIndex::from_specs([Specification::new("A", parse_version("1.0").unwrap())
        .dev_depends_on(req("rspec >= 3.0"))]);

    let specs = resolve(vec![req("A")], &index).unwrap();
    assert_eq!(specs.len(), 1);
}

#[test]
fn missing_root_package_fails_immediately() {
    let index = MemoryIndex::from_specs([spec("A", "1.0", &[])]);

    let errors = resolve(vec![req("A"), req("nope >= 1.0")], &index).unwrap_err();
    assert!(matches!(
        errors.get("nope"),
        Some(ResolveError::Unavailable { .. })
    ));
}

#[test]
fn missing_dependency_rejects_parent_candidate() {
    let index = MemoryIndex::from_specs([
        spec("A", "1.0", &[]),
        spec("A", "2.0", &["gone"]),
    ]);

    let specs = resolve(vec![req("A")], &index).unwrap();
    assert_eq!(version_of(&specs, "A").as_deref(), Some("1.0.0"));
}

#[test]
fn missing_dependency_everywhere_fails() {
    let index = MemoryIndex::from_specs([spec("A", "1.0", &["gone"]), spec("A", "2.0", &["gone"])]);

    let errors = resolve(vec![req("A")], &index).unwrap_err();
    match errors.get("gone") {
        Some(ResolveError::Unavailable { requirement, .. }) => {
            assert_eq!(requirement.required_by().names(), vec!["A"]);
        }
        other => panic!("expected gone to be unavailable, got {other:?}"),
    }
}

#[test]
fn causal_chain_is_branch_local() {
    let index = MemoryIndex::from_specs([
        spec("app", "1.0", &["web"]),
        spec("web", "1.0", &["log >= 1.0"]),
        spec("log", "1.0", &[]),
    ]);

    let specs = resolve(vec![req("app")], &index).unwrap();
    let log = specs.iter().find(|s| s.name == "log").unwrap();
    assert_eq!(log.required_by().names(), vec!["app", "web"]);

    let app = specs.iter().find(|s| s.name == "app").unwrap();
    assert!(app.required_by().is_empty());

    // The index still hands out untagged specifications.
    assert!(index.specs("log")[0].required_by().is_empty());
}

#[test]
fn conflicts_are_cleared_once_explained() {
    // A 2.0 drags in D >= 2.0 and conflicts on D; A 1.0 then asks for
    // D >= 1.0, which the activated D 1.5 satisfies, clearing the entry.
    let index = MemoryIndex::from_specs([
        spec("A", "1.0", &["D >= 1.0"]),
        spec("A", "2.0", &["C >= 1.0"]),
        spec("C", "1.0", &["D >= 2.0"]),
        spec("B", "1.0", &["D < 2.0"]),
        spec("D", "1.5", &[]),
        spec("D", "2.5", &[]),
    ]);

    let mut resolver = Resolver::new(&index);
    let outcome = resolver.resolve(vec![req("A"), req("B")], &Activated::new());
    assert!(matches!(outcome, Err(Escape::Solved(_))));
    assert_eq!(resolver.stats.conflicts, 1);
    assert!(resolver.errors.is_empty());
    assert!(resolver.stack.is_empty());
}

#[test]
fn root_history_is_discarded() {
    let index = MemoryIndex::from_specs([spec("A", "1.0", &[])]);
    let chain = RequiredBy::new().push(req("elsewhere"));
    let derived = Requirement::new("A", Constraint::any()).with_required_by(chain);

    let specs = resolve(vec![derived], &index).unwrap();
    assert!(specs[0].required_by().is_empty());
}

#[test]
fn empty_requirements_resolve_to_nothing() {
    let index = MemoryIndex::new();
    let resolution = Resolver::new(&index).run(Vec::new()).unwrap();
    assert!(resolution.specs.is_empty());
    assert_eq!(resolution.stats, ResolveStats::default());
}
