//! Core library for depsolve: versions, constraints, the package index and
//! the backjumping resolver. Used by the CLI binary; performs no I/O beyond
//! reading the optional config file.

pub mod config;
pub mod error;
pub mod index;
pub mod resolver;
pub mod spec;
pub mod version;

pub use config::{load_config, Config};
pub use error::{ErrorLog, ResolveError};
pub use index::{Index, IndexError, MemoryIndex};
pub use resolver::{resolve, Activated, Resolution, ResolveStats, Resolver};
pub use spec::{Dependency, DependencyKind, RequiredBy, Requirement, Specification};
pub use version::{parse_version, Constraint, ConstraintError};

pub use semver::Version;
