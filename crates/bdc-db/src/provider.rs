//! Entry-point discovery for provider packages.
//!
//! Independently linked crates contribute models, namespaces, trigger and
//! script directories, JSON Schemas and migration branches by submitting
//! [`EntryPoint`] values to a link-time index. The extension walks that
//! index at initialization and aggregates every contribution into its
//! runtime registries.
//!
//! A provider crate registers itself like this:
//!
//! ```ignore
//! use bdc_db::{group, Contribution, EntryPoint};
//!
//! fn namespace() -> bdc_db::Result<Contribution> {
//!     Ok(Contribution::Namespace(Some("myapp".to_string())))
//! }
//!
//! inventory::submit! {
//!     EntryPoint { name: "demo_app", group: group::NAMESPACES, load: namespace }
//! }
//! ```

use crate::error::Result;
use crate::metadata::Metadata;
use std::path::PathBuf;

/// Well-known entry-point groups.
pub mod group {
    /// Model registration functions.
    pub const MODELS: &str = "bdc_db.models";
    /// Database namespace (schema) names.
    pub const NAMESPACES: &str = "bdc_db.namespaces";
    /// Directories scanned for trigger `.sql` files.
    pub const TRIGGERS: &str = "bdc_db.triggers";
    /// Directories scanned for script `.sql` files.
    pub const SCRIPTS: &str = "bdc_db.scripts";
    /// Directories scanned for JSON Schema documents.
    pub const SCHEMAS: &str = "bdc_db.schemas";
    /// Migration branch locations.
    pub const MIGRATIONS: &str = "bdc_db.migrations";
}

/// A single value contributed by a provider under one entry-point group.
#[derive(Debug)]
pub enum Contribution {
    /// A function that registers the provider's models into the shared
    /// metadata.
    Models(fn(&mut Metadata)),

    /// A namespace (database schema) name. `None` and empty strings are
    /// configuration errors.
    Namespace(Option<String>),

    /// A directory whose immediate `.sql` files are registered as trigger
    /// or script artifacts.
    SqlDir(PathBuf),

    /// A directory scanned recursively for `.json` schema documents.
    Schemas(PathBuf),

    /// A labelled directory of versioned migration scripts.
    MigrationBranch { label: String, path: PathBuf },
}

/// A provider registration: a named, grouped, lazily-loaded contribution.
///
/// Loading may run arbitrary provider code and can fail; the failure is
/// fatal for whatever operation triggered the scan.
pub struct EntryPoint {
    /// Provider package name.
    pub name: &'static str,
    /// Entry-point group this contribution belongs to.
    pub group: &'static str,
    /// Produce the contribution.
    pub load: fn() -> Result<Contribution>,
}

impl EntryPoint {
    /// Load the contribution declared by this entry point.
    pub fn load(&self) -> Result<Contribution> {
        (self.load)()
    }
}

inventory::collect!(EntryPoint);

/// An iterable view over a set of entry points, queryable by group.
///
/// [`EntryPointIndex::installed`] wraps the process-wide link-time index;
/// tests build one from explicit fixtures.
pub struct EntryPointIndex<'a> {
    entries: Vec<&'a EntryPoint>,
}

impl EntryPointIndex<'static> {
    /// The index of every entry point registered by a linked crate.
    ///
    /// Iteration order within a group is whatever the link-time collector
    /// produced; callers must not depend on it.
    pub fn installed() -> Self {
        Self {
            entries: inventory::iter::<EntryPoint>.into_iter().collect(),
        }
    }
}

impl<'a> EntryPointIndex<'a> {
    /// Build an index from an explicit set of entry points.
    pub fn from_entries(entries: &'a [EntryPoint]) -> Self {
        Self {
            entries: entries.iter().collect(),
        }
    }

    /// All entry points registered under `group`, in index order.
    ///
    /// Returns an empty iterator when the group has no registrants.
    pub fn group(&self, group: &str) -> impl Iterator<Item = &'a EntryPoint> + '_ {
        let group = group.to_string();
        self.entries
            .iter()
            .copied()
            .filter(move |entry| entry.group == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    fn ns_myapp() -> Result<Contribution> {
        Ok(Contribution::Namespace(Some("myapp".to_string())))
    }

    fn ns_other() -> Result<Contribution> {
        Ok(Contribution::Namespace(Some("other".to_string())))
    }

    fn broken() -> Result<Contribution> {
        Err(DbError::provider("broken_app", "import failed"))
    }

    const FIXTURES: &[EntryPoint] = &[
        EntryPoint {
            name: "demo_app",
            group: group::NAMESPACES,
            load: ns_myapp,
        },
        EntryPoint {
            name: "other_app",
            group: group::NAMESPACES,
            load: ns_other,
        },
        EntryPoint {
            name: "broken_app",
            group: group::SCRIPTS,
            load: broken,
        },
    ];

    #[test]
    fn test_group_filters_and_preserves_order() {
        let index = EntryPointIndex::from_entries(FIXTURES);
        let names: Vec<_> = index.group(group::NAMESPACES).map(|e| e.name).collect();
        assert_eq!(names, ["demo_app", "other_app"]);
    }

    #[test]
    fn test_unknown_group_is_empty() {
        let index = EntryPointIndex::from_entries(FIXTURES);
        assert_eq!(index.group("bdc_db.unknown").count(), 0);
    }

    #[test]
    fn test_load_failure_propagates() {
        let index = EntryPointIndex::from_entries(FIXTURES);
        let entry = index.group(group::SCRIPTS).next().unwrap();
        let err = entry.load().unwrap_err();
        assert!(matches!(err, DbError::Provider { .. }));
        assert!(err.to_string().contains("broken_app"));
    }

    #[test]
    fn test_installed_index_contains_core_models() {
        // The library itself contributes the spatial_ref_sys model.
        let index = EntryPointIndex::installed();
        assert!(index.group(group::MODELS).any(|e| e.name == "bdc-db"));
    }
}
