//! Rendering of resolution results for the terminal and for `--json`.

use colored::Colorize;
use depsolve_core::{DependencyKind, ErrorLog, MemoryIndex, Resolution, ResolveStats};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    pub required_by: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub ok: bool,
    pub packages: Vec<ResolvedPackage>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ResolveStats>,
}

impl Report {
    pub fn success(resolution: &Resolution) -> Self {
        let packages = resolution
            .specs
            .iter()
            .map(|spec| ResolvedPackage {
                name: spec.name.clone(),
                version: spec.version.to_string(),
                required_by: spec
                    .required_by()
                    .names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
            .collect();
        Self {
            ok: true,
            packages,
            errors: Vec::new(),
            stats: Some(resolution.stats.clone()),
        }
    }

    pub fn failure(errors: &ErrorLog) -> Self {
        Self {
            ok: false,
            packages: Vec::new(),
            errors: errors.iter().map(|e| e.to_string()).collect(),
            stats: None,
        }
    }
}

pub fn print_resolution(resolution: &Resolution) {
    println!(
        "{}",
        format!("Resolved {} package(s)", resolution.specs.len()).green()
    );
    for spec in &resolution.specs {
        let via = if spec.required_by().is_empty() {
            String::new()
        } else {
            format!(" (via {})", spec.required_by())
        };
        println!("  {} {}{}", spec.name.bold(), spec.version, via.dimmed());
    }
}

pub fn print_errors(errors: &ErrorLog) {
    eprintln!("{}", "Could not resolve dependencies.".red());
    if errors.is_empty() {
        eprintln!("  {}", "no compatible set of versions found".dimmed());
    }
    for error in errors.iter() {
        eprintln!("  - {}", error);
    }
}

pub fn print_versions(index: &MemoryIndex, name: &str) -> bool {
    let specs = index.specs(name);
    if specs.is_empty() {
        return false;
    }
    println!("{}", format!("{} ({} version(s))", name, specs.len()).cyan());
    for spec in specs.iter().rev() {
        println!("  {}", spec.version);
        for dep in spec.dependencies() {
            let kind = match dep.kind {
                DependencyKind::Runtime => "runtime",
                DependencyKind::Development => "development",
            };
            println!("{}", format!("    {} [{}]", dep.requirement, kind).dimmed());
        }
    }
    true
}
