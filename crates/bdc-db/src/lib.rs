//! # bdc-db
//!
//! Database management for Brazil Data Cube applications and services.
//!
//! Independently linked provider crates contribute data models, database
//! namespaces, SQL trigger and script files, JSON Schemas and migration
//! branches through a link-time entry-point index. At initialization the
//! [`BrazilDataCubeDb`] extension aggregates every contribution into one
//! runtime configuration; the command-line operations in [`ops`] then
//! materialize that configuration into a live PostgreSQL database.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bdc_db::{BrazilDataCubeDb, Db, Settings};
//!
//! #[tokio::main]
//! async fn main() -> bdc_db::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let ext = BrazilDataCubeDb::new(settings.clone())?;
//!
//!     let db = Db::connect(&settings).await?;
//!     bdc_db::ops::create_schema(&db, &ext).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod ext;
pub mod ident;
pub mod metadata;
pub mod migrations;
pub mod models;
pub mod ops;
pub mod provider;
pub mod schemas;
pub mod sqltypes;
pub mod triggers;

// Re-exports for convenient access
pub use config::Settings;
pub use db::Db;
pub use error::{DbError, Result};
pub use ext::BrazilDataCubeDb;
pub use metadata::{ColumnDef, ColumnType, ForeignKeyDef, Metadata, TableDef};
pub use migrations::{BranchLocation, MigrationSettings, ObjectKind};
pub use provider::{group, Contribution, EntryPoint, EntryPointIndex};
pub use schemas::SchemaRegistry;
pub use sqltypes::ValidatedJson;
pub use triggers::TriggerRecord;
