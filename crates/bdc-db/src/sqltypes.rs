//! Schema-validated JSON column binding.
//!
//! [`ValidatedJson`] wraps a `jsonb` value bound for writing: non-null
//! values are validated against a named schema from the extension's
//! [`SchemaRegistry`] inside [`ToSql::to_sql`], so a mismatch surfaces as
//! the driver's own statement conversion error and aborts the statement
//! before anything reaches the server. Null values bypass validation, and
//! reading is the plain `Json<serde_json::Value>` path.

use crate::schemas::SchemaRegistry;
use bytes::BytesMut;
use serde_json::Value;
use std::sync::Arc;
use tokio_postgres::types::{to_sql_checked, IsNull, Json, ToSql, Type};

/// A JSON value paired with the schema it must satisfy on write.
#[derive(Debug, Clone)]
pub struct ValidatedJson {
    schema_key: String,
    value: Option<Value>,
    registry: Arc<SchemaRegistry>,
}

impl ValidatedJson {
    /// Bind `value` to be validated against `schema_key` when the statement
    /// parameters are encoded.
    ///
    /// The schema is resolved at bind time, so the registry must already be
    /// populated by the initialization phase.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        schema_key: impl Into<String>,
        value: Option<Value>,
    ) -> Self {
        Self {
            schema_key: schema_key.into(),
            value,
            registry,
        }
    }

    /// The wrapped value.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The schema key this value is validated against.
    pub fn schema_key(&self) -> &str {
        &self.schema_key
    }
}

impl ToSql for ValidatedJson {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match &self.value {
            Some(value) => {
                self.registry.validate(&self.schema_key, value)?;
                Json(value).to_sql(ty, out)
            }
            None => Ok(IsNull::Yes),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <Json<Value> as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;

    fn registry() -> Arc<SchemaRegistry> {
        let mut registry = SchemaRegistry::new(&Settings::default());
        registry.register_schema(
            "dummy-jsonschema.json",
            json!({
                "type": "object",
                "properties": {"fieldStringRequired": {"type": "string"}},
                "required": ["fieldStringRequired"]
            }),
        );
        Arc::new(registry)
    }

    fn bind(value: Option<Value>) -> std::result::Result<IsNull, String> {
        let wrapped = ValidatedJson::new(registry(), "dummy-jsonschema.json", value);
        let mut buf = BytesMut::new();
        wrapped
            .to_sql(&Type::JSONB, &mut buf)
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_valid_value_binds() {
        let result = bind(Some(json!({"fieldStringRequired": "x"}))).unwrap();
        assert!(matches!(result, IsNull::No));
    }

    #[test]
    fn test_invalid_value_fails_with_required_property() {
        let message = bind(Some(json!({}))).err().unwrap();
        assert!(message.contains("fieldStringRequired"));
        assert!(message.contains("is a required property"));
    }

    #[test]
    fn test_null_bypasses_validation() {
        let result = bind(None).unwrap();
        assert!(matches!(result, IsNull::Yes));
    }

    #[test]
    fn test_accessors() {
        let wrapped = ValidatedJson::new(registry(), "dummy-jsonschema.json", None);
        assert_eq!(wrapped.schema_key(), "dummy-jsonschema.json");
        assert!(wrapped.value().is_none());
    }

    #[test]
    fn test_unknown_schema_key_fails_at_bind_time() {
        let wrapped = ValidatedJson::new(registry(), "missing.json", Some(json!({})));
        let mut buf = BytesMut::new();
        let err = wrapped.to_sql(&Type::JSONB, &mut buf).err().unwrap();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_accepts_json_types() {
        assert!(<ValidatedJson as ToSql>::accepts(&Type::JSONB));
        assert!(<ValidatedJson as ToSql>::accepts(&Type::JSON));
        assert!(!<ValidatedJson as ToSql>::accepts(&Type::TEXT));
    }
}
