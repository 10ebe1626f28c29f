//! Model metadata contributed by providers.
//!
//! Providers register [`TableDef`]s into a shared [`Metadata`] during
//! initialization. Once every provider has run, the inter-table
//! relationships are wired exactly once and the table set can be walked in
//! foreign-key dependency order to generate `CREATE`/`DROP` statements.

use crate::error::{DbError, Result};
use crate::ident;
use std::collections::HashSet;
use tracing::debug;

/// Column data types mapped to their PostgreSQL rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    SmallInteger,
    Integer,
    BigInteger,
    Float,
    Double,
    Numeric { precision: u8, scale: u8 },
    Boolean,
    /// Unbounded text.
    Text,
    /// `varchar`, optionally length-limited.
    String(Option<u32>),
    Date,
    Timestamp { with_time_zone: bool },
    Uuid,
    /// Binary JSON. Schema validation happens at bind time, not in DDL.
    Jsonb,
}

impl ColumnType {
    /// PostgreSQL type name for this column.
    pub fn sql(&self) -> String {
        match self {
            ColumnType::SmallInteger => "smallint".to_string(),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::BigInteger => "bigint".to_string(),
            ColumnType::Float => "real".to_string(),
            ColumnType::Double => "double precision".to_string(),
            ColumnType::Numeric { precision, scale } => {
                format!("numeric({},{})", precision, scale)
            }
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Text => "text".to_string(),
            ColumnType::String(Some(len)) => format!("varchar({})", len),
            ColumnType::String(None) => "varchar".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::Timestamp {
                with_time_zone: true,
            } => "timestamptz".to_string(),
            ColumnType::Timestamp {
                with_time_zone: false,
            } => "timestamp".to_string(),
            ColumnType::Uuid => "uuid".to_string(),
            ColumnType::Jsonb => "jsonb".to_string(),
        }
    }
}

/// A column definition.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// Generated identity column (`GENERATED BY DEFAULT AS IDENTITY`).
    pub identity: bool,
    /// Literal SQL default expression.
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            primary_key: false,
            unique: false,
            identity: false,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// A foreign-key reference to another registered table.
#[derive(Debug, Clone)]
pub struct ForeignKeyDef {
    pub columns: Vec<String>,
    pub ref_namespace: Option<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: Option<String>,
}

impl ForeignKeyDef {
    pub fn new(
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            columns: vec![column.into()],
            ref_namespace: None,
            ref_table: ref_table.into(),
            ref_columns: vec![ref_column.into()],
            on_delete: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.ref_namespace = Some(namespace.into());
        self
    }

    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = Some(action.into());
        self
    }
}

/// A table definition registered by a provider.
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: String,
    pub namespace: Option<String>,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Namespace-qualified key used for dependency resolution.
    pub fn qualified_name(&self) -> String {
        qualified_key(self.namespace.as_deref(), &self.name)
    }

    /// Quoted, namespace-qualified name for SQL.
    pub fn sql_name(&self) -> Result<String> {
        ident::qualify(self.namespace.as_deref(), &self.name)
    }

    /// Generate a `CREATE TABLE IF NOT EXISTS` statement.
    pub fn create_sql(&self) -> Result<String> {
        let mut lines = Vec::new();

        for col in &self.columns {
            let mut line = format!("  {} {}", ident::quote(&col.name)?, col.ty.sql());
            if col.identity {
                line.push_str(" GENERATED BY DEFAULT AS IDENTITY");
            }
            if !col.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &col.default {
                line.push_str(&format!(" DEFAULT {}", default));
            }
            lines.push(line);
        }

        let pk_cols: Vec<&ColumnDef> = self.columns.iter().filter(|c| c.primary_key).collect();
        if !pk_cols.is_empty() {
            let cols = pk_cols
                .iter()
                .map(|c| ident::quote(&c.name))
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            lines.push(format!(
                "  CONSTRAINT {} PRIMARY KEY ({})",
                ident::quote(&pk_name(&self.name))?,
                cols
            ));
        }

        for col in self.columns.iter().filter(|c| c.unique) {
            lines.push(format!(
                "  CONSTRAINT {} UNIQUE ({})",
                ident::quote(&uq_name(&self.name, &col.name))?,
                ident::quote(&col.name)?
            ));
        }

        for fk in &self.foreign_keys {
            let cols = fk
                .columns
                .iter()
                .map(|c| ident::quote(c))
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            let ref_cols = fk
                .ref_columns
                .iter()
                .map(|c| ident::quote(c))
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            let mut line = format!(
                "  CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                ident::quote(&fk_name(&self.name, &fk.columns[0], &fk.ref_table))?,
                cols,
                ident::qualify(fk.ref_namespace.as_deref(), &fk.ref_table)?,
                ref_cols
            );
            if let Some(action) = &fk.on_delete {
                line.push_str(&format!(" ON DELETE {}", action));
            }
            lines.push(line);
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.sql_name()?,
            lines.join(",\n")
        ))
    }

    /// Generate a `DROP TABLE IF EXISTS` statement.
    pub fn drop_sql(&self) -> Result<String> {
        Ok(format!("DROP TABLE IF EXISTS {}", self.sql_name()?))
    }
}

fn qualified_key(namespace: Option<&str>, table: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, table),
        None => table.to_string(),
    }
}

// Constraint naming convention shared with the migration tooling.

fn pk_name(table: &str) -> String {
    format!("{}_pkey", table)
}

fn uq_name(table: &str, column: &str) -> String {
    format!("{}_{}_key", table, column)
}

fn fk_name(table: &str, column: &str, ref_table: &str) -> String {
    format!("{}_{}_{}_fkey", table, column, ref_table)
}

/// The shared registry of every table contributed by providers.
#[derive(Debug, Default)]
pub struct Metadata {
    tables: Vec<TableDef>,
    configured: bool,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table.
    pub fn add_table(&mut self, table: TableDef) {
        debug!(table = %table.qualified_name(), "registering model");
        self.tables.push(table);
    }

    /// Tables in registration order.
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Wire inter-table relationships after every model is known.
    ///
    /// Resolves each foreign key against the registered table set and fails
    /// on references to unknown tables. Runs once; later calls are no-ops.
    pub fn configure_relationships(&mut self) -> Result<()> {
        if self.configured {
            return Ok(());
        }

        let known: HashSet<String> = self.tables.iter().map(|t| t.qualified_name()).collect();

        for table in &self.tables {
            for fk in &table.foreign_keys {
                let target = qualified_key(fk.ref_namespace.as_deref(), &fk.ref_table);
                // A table may reference itself.
                if target != table.qualified_name() && !known.contains(&target) {
                    return Err(DbError::Config(format!(
                        "table '{}' references unknown table '{}'",
                        table.qualified_name(),
                        target
                    )));
                }
            }
        }

        self.configured = true;
        debug!(tables = self.tables.len(), "relationships configured");
        Ok(())
    }

    /// Tables topologically sorted by foreign-key dependency: a referenced
    /// table always precedes its referrers. Registration order is preserved
    /// among independent tables.
    pub fn sorted_tables(&self) -> Vec<&TableDef> {
        let keys: Vec<String> = self.tables.iter().map(|t| t.qualified_name()).collect();

        let mut remaining: Vec<usize> = (0..self.tables.len()).collect();
        let mut emitted: HashSet<String> = HashSet::new();
        let mut sorted = Vec::with_capacity(self.tables.len());

        while !remaining.is_empty() {
            let mut progressed = false;

            remaining.retain(|&i| {
                let table = &self.tables[i];
                let ready = table.foreign_keys.iter().all(|fk| {
                    let target = qualified_key(fk.ref_namespace.as_deref(), &fk.ref_table);
                    target == keys[i] || emitted.contains(&target)
                });
                if ready {
                    emitted.insert(keys[i].clone());
                    sorted.push(table);
                    progressed = true;
                }
                !ready
            });

            if !progressed {
                // Dependency cycle: emit the remainder in registration order
                // rather than looping forever.
                for &i in &remaining {
                    sorted.push(&self.tables[i]);
                }
                break;
            }
        }

        sorted
    }
}
