//! The database-management extension.
//!
//! [`BrazilDataCubeDb`] is constructed once per application, walks the
//! entry-point index, and aggregates every provider contribution into its
//! registries: models, namespaces, trigger and script artifacts, JSON
//! Schemas and migration branches. Command handlers receive it by
//! reference and only read it.

use crate::config::Settings;
use crate::error::{DbError, Result};
use crate::metadata::Metadata;
use crate::migrations::MigrationSettings;
use crate::provider::{group, Contribution, EntryPoint, EntryPointIndex};
use crate::schemas::SchemaRegistry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registered SQL artifacts: provider name to artifact stem to file path.
pub type ArtifactMap = BTreeMap<String, BTreeMap<String, PathBuf>>;

/// Database management extension for Brazil Data Cube applications and
/// services.
#[derive(Debug)]
pub struct BrazilDataCubeDb {
    settings: Settings,
    metadata: Metadata,
    namespaces: Vec<String>,
    triggers: ArtifactMap,
    scripts: ArtifactMap,
    schemas: Arc<SchemaRegistry>,
    migrations: MigrationSettings,
}

impl BrazilDataCubeDb {
    /// Initialize the extension from every entry point registered by a
    /// linked crate.
    ///
    /// Fails fast: a provider whose contribution cannot be loaded, or one
    /// that contributes an empty namespace, aborts initialization.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_index(settings, &EntryPointIndex::installed())
    }

    /// Initialize the extension from an explicit entry-point index.
    pub fn with_index(settings: Settings, index: &EntryPointIndex<'_>) -> Result<Self> {
        info!(
            sql_echo = settings.sql_echo,
            track_modifications = settings.track_modifications,
            "initializing database extension"
        );

        let mut schemas = SchemaRegistry::new(&settings);
        for entry in index.group(group::SCHEMAS) {
            match entry.load()? {
                Contribution::Schemas(dir) => schemas.register_dir(entry.name, &dir)?,
                _ => return Err(kind_mismatch(entry, "a schema directory")),
            }
        }

        let mut ext = Self {
            schemas: Arc::new(schemas),
            migrations: MigrationSettings::new(&settings),
            metadata: Metadata::new(),
            namespaces: Vec::new(),
            triggers: ArtifactMap::new(),
            scripts: ArtifactMap::new(),
            settings,
        };

        // Load every model module first, then wire inter-model
        // relationships exactly once.
        for entry in index.group(group::MODELS) {
            match entry.load()? {
                Contribution::Models(register) => register(&mut ext.metadata),
                _ => return Err(kind_mismatch(entry, "a model registration")),
            }
        }
        ext.metadata.configure_relationships()?;

        for entry in index.group(group::NAMESPACES) {
            match entry.load()? {
                Contribution::Namespace(value) => ext.add_namespace(entry.name, value)?,
                _ => return Err(kind_mismatch(entry, "a namespace name")),
            }
        }

        for entry in index.group(group::TRIGGERS) {
            match entry.load()? {
                Contribution::SqlDir(dir) => ext.load_trigger_dir(entry.name, &dir)?,
                _ => return Err(kind_mismatch(entry, "a trigger directory")),
            }
        }

        for entry in index.group(group::SCRIPTS) {
            match entry.load()? {
                Contribution::SqlDir(dir) => ext.load_script_dir(entry.name, &dir)?,
                _ => return Err(kind_mismatch(entry, "a script directory")),
            }
        }

        for entry in index.group(group::MIGRATIONS) {
            match entry.load()? {
                Contribution::MigrationBranch { label, path } => {
                    ext.migrations.add_branch(label, path)
                }
                _ => return Err(kind_mismatch(entry, "a migration branch")),
            }
        }

        info!(
            models = ext.metadata.tables().len(),
            namespaces = ext.namespaces.len(),
            trigger_providers = ext.triggers.len(),
            script_providers = ext.scripts.len(),
            "database extension initialized"
        );

        Ok(ext)
    }

    /// Append a namespace contributed by `provider`.
    ///
    /// An absent or empty value is a fatal configuration error; a value
    /// already registered by another provider is skipped with a warning.
    pub fn add_namespace(&mut self, provider: &str, value: Option<String>) -> Result<()> {
        let namespace = match value {
            Some(ns) if !ns.is_empty() => ns,
            _ => {
                return Err(DbError::Config(format!(
                    "provider '{}' contributed an empty namespace",
                    provider
                )))
            }
        };

        if self.namespaces.contains(&namespace) {
            warn!(provider, %namespace, "namespace already registered, skipping");
            return Ok(());
        }

        debug!(provider, %namespace, "registering namespace");
        self.namespaces.push(namespace);
        Ok(())
    }

    /// Register every `.sql` file directly inside `dir` as a trigger of
    /// `provider`.
    pub fn load_trigger_dir(&mut self, provider: &str, dir: &Path) -> Result<()> {
        let artifacts = scan_sql_dir(provider, dir)?;
        self.triggers
            .entry(provider.to_string())
            .or_default()
            .extend(artifacts);
        Ok(())
    }

    /// Register every `.sql` file directly inside `dir` as a script of
    /// `provider`.
    pub fn load_script_dir(&mut self, provider: &str, dir: &Path) -> Result<()> {
        let artifacts = scan_sql_dir(provider, dir)?;
        self.scripts
            .entry(provider.to_string())
            .or_default()
            .extend(artifacts);
        Ok(())
    }

    /// Insert or overwrite a single trigger artifact.
    pub fn register_trigger(
        &mut self,
        provider: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) {
        self.triggers
            .entry(provider.into())
            .or_default()
            .insert(name.into(), path.into());
    }

    /// Insert or overwrite a single script artifact.
    pub fn register_script(
        &mut self,
        provider: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) {
        self.scripts
            .entry(provider.into())
            .or_default()
            .insert(name.into(), path.into());
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Registered namespaces, in first-seen order.
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn triggers(&self) -> &ArtifactMap {
        &self.triggers
    }

    pub fn scripts(&self) -> &ArtifactMap {
        &self.scripts
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    pub fn migrations(&self) -> &MigrationSettings {
        &self.migrations
    }
}

fn kind_mismatch(entry: &EntryPoint, expected: &str) -> DbError {
    DbError::provider(
        entry.name,
        format!(
            "contribution under group '{}' is not {}",
            entry.group, expected
        ),
    )
}

/// List the immediate `.sql` files of a provider directory, keyed by file
/// stem.
///
/// Two files with the same stem cannot collide within one directory, but a
/// provider contributing several directories overwrites earlier stems with
/// later ones; registration is insert-or-overwrite by key.
fn scan_sql_dir(provider: &str, dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    if !dir.is_dir() {
        return Err(DbError::provider(
            provider,
            format!("SQL directory does not exist: {}", dir.display()),
        ));
    }

    let mut artifacts = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().map(|e| e != "sql").unwrap_or(true) {
            continue;
        }
        let stem = path
            .file_stem()
            .expect("file with .sql extension has a stem")
            .to_string_lossy()
            .to_string();
        debug!(provider, artifact = %stem, path = %path.display(), "registering SQL artifact");
        artifacts.insert(stem, path);
    }

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ext() -> BrazilDataCubeDb {
        BrazilDataCubeDb::with_index(
            Settings::default(),
            &EntryPointIndex::from_entries(&[]),
        )
        .unwrap()
    }

    #[test]
    fn test_namespaces_first_seen_order_and_duplicates() {
        let mut ext = ext();
        ext.add_namespace("demo_app", Some("myapp".into())).unwrap();
        ext.add_namespace("other_app", Some("cube".into())).unwrap();
        // Shared namespace declared twice: skipped, not an error.
        ext.add_namespace("third_app", Some("myapp".into())).unwrap();

        assert_eq!(ext.namespaces(), ["myapp", "cube"]);
    }

    #[test]
    fn test_empty_namespace_is_fatal() {
        let mut ext = ext();
        let err = ext.add_namespace("demo_app", None).unwrap_err();
        assert!(err.to_string().contains("demo_app"));

        let err = ext.add_namespace("demo_app", Some(String::new())).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_scan_registers_sql_files_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dummy.sql"), "SELECT 1;").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/deep.sql"), "ignored").unwrap();

        let mut ext = ext();
        ext.load_trigger_dir("demo_app", dir.path()).unwrap();

        let triggers = &ext.triggers()["demo_app"];
        assert_eq!(triggers.len(), 1);
        assert!(triggers["dummy"].ends_with("dummy.sql"));
    }

    #[test]
    fn test_missing_sql_dir_is_fatal() {
        let mut ext = ext();
        let err = ext
            .load_script_dir("demo_app", Path::new("/nonexistent/scripts"))
            .unwrap_err();
        assert!(matches!(err, DbError::Provider { .. }));
    }

    #[test]
    fn test_duplicate_stem_overwrites() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("dummy.sql"), "SELECT 1;").unwrap();
        fs::write(second.path().join("dummy.sql"), "SELECT 2;").unwrap();

        let mut ext = ext();
        ext.load_trigger_dir("demo_app", first.path()).unwrap();
        ext.load_trigger_dir("demo_app", second.path()).unwrap();

        let triggers = &ext.triggers()["demo_app"];
        assert_eq!(triggers.len(), 1);
        assert!(triggers["dummy"].starts_with(second.path()));
    }

    #[test]
    fn test_register_trigger_is_insert_or_overwrite() {
        let mut ext = ext();
        ext.register_trigger("demo_app", "dummy", "/a/dummy.sql");
        ext.register_trigger("demo_app", "dummy", "/b/dummy.sql");
        assert_eq!(
            ext.triggers()["demo_app"]["dummy"],
            PathBuf::from("/b/dummy.sql")
        );
    }

    #[test]
    fn test_with_index_loads_namespace_providers() {
        fn ns() -> Result<Contribution> {
            Ok(Contribution::Namespace(Some("myapp".into())))
        }
        fn invalid() -> Result<Contribution> {
            Ok(Contribution::Namespace(None))
        }

        let entries = [EntryPoint {
            name: "demo_app",
            group: group::NAMESPACES,
            load: ns,
        }];
        let ext = BrazilDataCubeDb::with_index(
            Settings::default(),
            &EntryPointIndex::from_entries(&entries),
        )
        .unwrap();
        assert_eq!(ext.namespaces(), ["myapp"]);

        // A provider contributing a null namespace aborts initialization.
        let entries = [EntryPoint {
            name: "demo_app",
            group: group::NAMESPACES,
            load: invalid,
        }];
        let err = BrazilDataCubeDb::with_index(
            Settings::default(),
            &EntryPointIndex::from_entries(&entries),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_with_index_rejects_kind_mismatch() {
        fn wrong() -> Result<Contribution> {
            Ok(Contribution::Namespace(Some("myapp".into())))
        }

        let entries = [EntryPoint {
            name: "demo_app",
            group: group::TRIGGERS,
            load: wrong,
        }];
        let err = BrazilDataCubeDb::with_index(
            Settings::default(),
            &EntryPointIndex::from_entries(&entries),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::Provider { .. }));
    }

    #[test]
    fn test_installed_index_registers_core_model() {
        let ext = BrazilDataCubeDb::new(Settings::default()).unwrap();
        assert!(ext
            .metadata()
            .tables()
            .iter()
            .any(|t| t.name == "spatial_ref_sys"));
    }
}
