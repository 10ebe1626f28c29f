//! Identifier validation and quoting for dynamically built SQL.
//!
//! Table, schema and trigger names cannot be bound as statement parameters,
//! so every identifier that ends up in generated DDL goes through a single
//! validate-then-quote path.

use crate::error::{DbError, Result};

/// PostgreSQL truncates identifiers at 63 bytes.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validate an identifier before it is interpolated into SQL.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers exceeding the PostgreSQL length limit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DbError::Config("Identifier cannot be empty".to_string()));
    }

    if name.contains('\0') {
        return Err(DbError::Config(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DbError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier.
///
/// Escapes embedded double quotes by doubling them and wraps the result in
/// double quotes.
pub fn quote(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Qualify a table name with an optional namespace, quoting both parts.
pub fn qualify(namespace: Option<&str>, table: &str) -> Result<String> {
    match namespace {
        Some(ns) => Ok(format!("{}.{}", quote(ns)?, quote(table)?)),
        None => quote(table),
    }
}
