//! Configuration handed to the schema-migration tooling.
//!
//! The migration engine itself is an external collaborator; this module
//! only assembles its inputs: the core script location, one versioned
//! branch per provider, and the predicate that keeps externally-owned
//! tables out of autogeneration sweeps.

use crate::config::Settings;
use std::path::PathBuf;
use tracing::debug;

/// Branch label used by the core package itself.
pub const CORE_BRANCH: &str = "bdc-db";

/// Kinds of schema objects the autogeneration sweep may consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Column,
    Index,
    UniqueConstraint,
    ForeignKeyConstraint,
}

/// A labelled directory of versioned migration scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchLocation {
    pub label: String,
    pub path: PathBuf,
}

/// Settings object consumed by the migration tool.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    /// Directory of the core package's own migration scripts.
    pub script_location: PathBuf,
    /// One versioned branch per contributing provider.
    pub version_locations: Vec<BranchLocation>,
    /// Compare column types during autogeneration.
    pub compare_type: bool,
    /// Include non-default namespaces in the sweep.
    pub include_schemas: bool,
    /// Tables excluded from autogeneration (owned by database extensions).
    pub exclude_tables: Vec<String>,
}

impl MigrationSettings {
    /// Defaults for the configured migration directory: no provider
    /// branches yet, PostGIS's `spatial_ref_sys` excluded.
    pub fn new(settings: &Settings) -> Self {
        Self {
            script_location: settings.migrations_dir.clone(),
            version_locations: Vec::new(),
            compare_type: true,
            include_schemas: true,
            exclude_tables: vec!["spatial_ref_sys".to_string()],
        }
    }

    /// Register a provider's migration branch.
    ///
    /// A provider that redundantly re-registers the core package's own
    /// script location is skipped; anything else is kept as-is, including
    /// duplicate labels.
    pub fn add_branch(&mut self, label: impl Into<String>, path: impl Into<PathBuf>) {
        let branch = BranchLocation {
            label: label.into(),
            path: path.into(),
        };
        if branch.label == CORE_BRANCH && branch.path == self.script_location {
            debug!(label = %branch.label, "skipping redundant core migration branch");
            return;
        }
        self.version_locations.push(branch);
    }

    /// Whether `name` should be considered by the autogeneration sweep.
    pub fn include_object(&self, name: &str, kind: ObjectKind) -> bool {
        !(kind == ObjectKind::Table && self.exclude_tables.iter().any(|t| t == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_exclude_spatial_ref_sys() {
        let migrations = MigrationSettings::new(&Settings::default());
        assert!(!migrations.include_object("spatial_ref_sys", ObjectKind::Table));
        assert!(migrations.include_object("collections", ObjectKind::Table));
        // Only tables are filtered.
        assert!(migrations.include_object("spatial_ref_sys", ObjectKind::Column));
    }

    #[test]
    fn test_add_branch_keeps_provider_paths() {
        let mut migrations = MigrationSettings::new(&Settings::default());
        migrations.add_branch("demo_app", "/opt/demo_app/migrations");
        migrations.add_branch("other_app", "/opt/other_app/migrations");
        assert_eq!(migrations.version_locations.len(), 2);
        assert_eq!(migrations.version_locations[0].label, "demo_app");
    }

    #[test]
    fn test_add_branch_drops_core_self_duplicate() {
        let settings = Settings::default();
        let mut migrations = MigrationSettings::new(&settings);
        migrations.add_branch(CORE_BRANCH, settings.migrations_dir.clone());
        assert!(migrations.version_locations.is_empty());

        // Same label under a different path is a legitimate branch.
        migrations.add_branch(CORE_BRANCH, "/elsewhere/migrations");
        assert_eq!(migrations.version_locations.len(), 1);
    }
}
