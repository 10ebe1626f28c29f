//! Registry of provider-contributed JSON Schema documents.

use crate::config::Settings;
use crate::error::{DbError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Process-wide index of JSON Schema documents, keyed by the path of each
/// document relative to the directory its provider contributed.
#[derive(Debug)]
pub struct SchemaRegistry {
    host: String,
    schemas: BTreeMap<String, Value>,
}

impl SchemaRegistry {
    /// Create an empty registry publishing under the configured host.
    pub fn new(settings: &Settings) -> Self {
        Self {
            host: settings.jsonschemas_host.clone(),
            schemas: BTreeMap::new(),
        }
    }

    /// Register every `.json` document below `root`, recursively.
    ///
    /// A missing directory is a fatal error for the contributing provider.
    pub fn register_dir(&mut self, provider: &str, root: &Path) -> Result<()> {
        if !root.is_dir() {
            return Err(DbError::provider(
                provider,
                format!("schema directory does not exist: {}", root.display()),
            ));
        }
        self.scan(provider, root, root)
    }

    fn scan(&mut self, provider: &str, root: &Path, dir: &Path) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.scan(provider, root, &path)?;
            } else if path.extension().is_some_and(|ext| ext == "json") {
                let key = path
                    .strip_prefix(root)
                    .expect("scan stays below root")
                    .to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "/");
                let document: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)
                    .map_err(|e| {
                        DbError::provider(
                            provider,
                            format!("invalid JSON Schema {}: {}", path.display(), e),
                        )
                    })?;
                self.register_schema(&key, document);
            }
        }
        Ok(())
    }

    /// Insert or overwrite a schema document under `key`.
    pub fn register_schema(&mut self, key: &str, document: Value) {
        if self.schemas.contains_key(key) {
            warn!(key, "schema key already registered, overwriting");
        }
        debug!(key, "registering JSON Schema");
        self.schemas.insert(key.to_string(), document);
    }

    /// Look up a schema document by key.
    pub fn get_schema(&self, key: &str) -> Result<&Value> {
        self.schemas
            .get(key)
            .ok_or_else(|| DbError::SchemaNotFound(key.to_string()))
    }

    /// Registered schema keys, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Public URL under which the schema is served.
    pub fn schema_url(&self, key: &str) -> String {
        format!("https://{}/{}", self.host, key)
    }

    /// Validate `instance` against the schema registered under `key`.
    ///
    /// Formats (`date-time`, `uri`, ...) are checked as well.
    pub fn validate(&self, key: &str, instance: &Value) -> Result<()> {
        let schema = self.get_schema(key)?;
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| DbError::Config(format!("schema '{}' cannot be compiled: {}", key, e)))?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DbError::Validation {
                schema: key.to_string(),
                message: errors.join("; "),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry_with(key: &str, document: Value) -> SchemaRegistry {
        let mut registry = SchemaRegistry::new(&Settings::default());
        registry.register_schema(key, document);
        registry
    }

    fn required_field_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"fieldStringRequired": {"type": "string"}},
            "required": ["fieldStringRequired"]
        })
    }

    #[test]
    fn test_get_schema_unknown_key() {
        let registry = SchemaRegistry::new(&Settings::default());
        let err = registry.get_schema("missing.json").unwrap_err();
        assert!(matches!(err, DbError::SchemaNotFound(_)));
    }

    #[test]
    fn test_validate_accepts_matching_value() {
        let registry = registry_with("dummy-jsonschema.json", required_field_schema());
        registry
            .validate("dummy-jsonschema.json", &json!({"fieldStringRequired": "x"}))
            .unwrap();
    }

    #[test]
    fn test_validate_reports_missing_required_property() {
        let registry = registry_with("dummy-jsonschema.json", required_field_schema());
        let err = registry
            .validate("dummy-jsonschema.json", &json!({}))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("fieldStringRequired"));
        assert!(message.contains("is a required property"));
    }

    #[test]
    fn test_register_dir_scans_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("collection.json"), "{\"type\": \"object\"}").unwrap();
        std::fs::create_dir(dir.path().join("items")).unwrap();
        std::fs::write(dir.path().join("items/item.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut registry = SchemaRegistry::new(&Settings::default());
        registry.register_dir("demo_app", dir.path()).unwrap();

        let keys: Vec<_> = registry.keys().collect();
        assert_eq!(keys, ["collection.json", "items/item.json"]);
    }

    #[test]
    fn test_register_dir_missing_directory_is_fatal() {
        let mut registry = SchemaRegistry::new(&Settings::default());
        let err = registry
            .register_dir("demo_app", Path::new("/nonexistent/schemas"))
            .unwrap_err();
        assert!(matches!(err, DbError::Provider { .. }));
    }

    #[test]
    fn test_schema_url_uses_configured_host() {
        let registry = SchemaRegistry::new(&Settings::default());
        assert_eq!(
            registry.schema_url("collection.json"),
            "https://brazildatacube.org/collection.json"
        );
    }
}
