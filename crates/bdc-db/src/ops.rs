//! Apply and teardown operations.
//!
//! Each operation is a standalone unit of work invoked explicitly from the
//! command line. Multi-statement operations run inside one transaction: any
//! statement failure rolls the whole operation back and surfaces the
//! database error; there is no statement-level retry.

use crate::db::{self, Db};
use crate::error::Result;
use crate::ext::{ArtifactMap, BrazilDataCubeDb};
use crate::ident;
use crate::triggers::{self, TriggerRecord};
use std::path::{Path, PathBuf};
use tokio_postgres::Client;
use tracing::{info, warn};

/// An executed SQL artifact: the provider it came from and its file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedArtifact {
    pub provider: String,
    pub path: PathBuf,
}

/// Create the configured database if it does not exist yet.
///
/// Returns `false` when the database was already present.
pub async fn init(ext: &BrazilDataCubeDb) -> Result<bool> {
    if db::database_exists(ext.settings()).await? {
        return Ok(false);
    }
    db::create_database(ext.settings()).await?;
    Ok(true)
}

/// Drop the configured database. Confirmation is the caller's concern.
pub async fn destroy(ext: &BrazilDataCubeDb) -> Result<()> {
    db::drop_database(ext.settings()).await
}

/// Create every known table, in foreign-key dependency order, with
/// create-if-not-exists semantics. Returns the table names in creation
/// order.
pub async fn create_schema(db: &Db, ext: &BrazilDataCubeDb) -> Result<Vec<String>> {
    let mut conn = db.client().await?;
    let pg: &mut Client = &mut conn;
    let tx = pg.transaction().await?;

    let mut created = Vec::new();
    for table in ext.metadata().sorted_tables() {
        let statement = table.create_sql()?;
        db.echo_sql(&statement);
        tx.batch_execute(&statement).await?;
        created.push(table.qualified_name());
    }

    tx.commit().await?;
    info!(tables = created.len(), "database schema created");
    Ok(created)
}

/// Drop every known table in reverse dependency order. Returns the table
/// names in drop order.
pub async fn drop_schema(db: &Db, ext: &BrazilDataCubeDb) -> Result<Vec<String>> {
    let mut conn = db.client().await?;
    let pg: &mut Client = &mut conn;
    let tx = pg.transaction().await?;

    let mut dropped = Vec::new();
    for table in ext.metadata().sorted_tables().into_iter().rev() {
        let statement = table.drop_sql()?;
        db.echo_sql(&statement);
        tx.batch_execute(&statement).await?;
        dropped.push(table.qualified_name());
    }

    tx.commit().await?;
    info!(tables = dropped.len(), "database schema dropped");
    Ok(dropped)
}

/// Create every registered namespace that is not already present.
pub async fn create_namespaces(db: &Db, ext: &BrazilDataCubeDb) -> Result<Vec<String>> {
    let mut conn = db.client().await?;
    let pg: &mut Client = &mut conn;
    let tx = pg.transaction().await?;

    for namespace in ext.namespaces() {
        let statement = format!("CREATE SCHEMA IF NOT EXISTS {}", ident::quote(namespace)?);
        db.echo_sql(&statement);
        tx.batch_execute(&statement).await?;
    }

    tx.commit().await?;
    info!(namespaces = ext.namespaces().len(), "namespaces created");
    Ok(ext.namespaces().to_vec())
}

/// Enable the PostGIS extension if it is not already enabled.
pub async fn create_extension_postgis(db: &Db) -> Result<()> {
    let mut conn = db.client().await?;
    let pg: &mut Client = &mut conn;
    let tx = pg.transaction().await?;

    let statement = "CREATE EXTENSION IF NOT EXISTS postgis";
    db.echo_sql(statement);
    tx.batch_execute(statement).await?;
    tx.commit().await?;
    info!("postgis extension enabled");
    Ok(())
}

/// Execute every registered trigger file, provider by provider, within one
/// transaction.
///
/// Re-running re-executes the raw SQL: a trigger file is only safely
/// re-runnable when its own statements use `CREATE OR REPLACE` /
/// `IF NOT EXISTS`.
pub async fn create_triggers(db: &Db, ext: &BrazilDataCubeDb) -> Result<Vec<AppliedArtifact>> {
    execute_artifacts(db, ext.triggers(), "trigger").await
}

/// Execute every registered script file, provider by provider, within one
/// transaction.
pub async fn load_scripts(db: &Db, ext: &BrazilDataCubeDb) -> Result<Vec<AppliedArtifact>> {
    execute_artifacts(db, ext.scripts(), "script").await
}

async fn execute_artifacts(
    db: &Db,
    artifacts: &ArtifactMap,
    kind: &str,
) -> Result<Vec<AppliedArtifact>> {
    let mut conn = db.client().await?;
    let pg: &mut Client = &mut conn;
    let tx = pg.transaction().await?;

    let mut applied = Vec::new();
    for (provider, entries) in artifacts {
        info!(%provider, kind, files = entries.len(), "executing SQL artifacts");
        for path in entries.values() {
            let content = std::fs::read_to_string(path)?;
            db.echo_sql(&content);
            tx.batch_execute(&content).await?;
            applied.push(AppliedArtifact {
                provider: provider.clone(),
                path: path.clone(),
            });
        }
    }

    tx.commit().await?;
    Ok(applied)
}

/// Drop every live trigger whose name occurs in a registered trigger file.
///
/// The match is textual (trigger name as substring of the local SQL text),
/// so an overlapping name can select an unrelated trigger. With `preview`
/// the matches are returned without dropping anything.
pub async fn drop_triggers(
    db: &Db,
    ext: &BrazilDataCubeDb,
    preview: bool,
) -> Result<Vec<TriggerRecord>> {
    let mut sql_texts = Vec::new();
    for entries in ext.triggers().values() {
        for path in entries.values() {
            sql_texts.push(std::fs::read_to_string(path)?);
        }
    }

    let mut conn = db.client().await?;
    let pg: &mut Client = &mut conn;

    let live = triggers::list_triggers(&*pg).await?;
    let matched: Vec<TriggerRecord> = triggers::match_triggers(&live, &sql_texts)
        .into_iter()
        .cloned()
        .collect();

    if preview {
        return Ok(matched);
    }

    let tx = pg.transaction().await?;
    for trigger in &matched {
        triggers::delete_trigger(
            &tx,
            &trigger.trigger_name,
            &trigger.table_name,
            Some(&trigger.schema),
        )
        .await?;
        warn!(trigger = %trigger.trigger_name, table = %trigger.table_name, "trigger removed");
    }
    tx.commit().await?;

    Ok(matched)
}

/// Execute an arbitrary SQL file as one transaction.
pub async fn load_file(db: &Db, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)?;

    let mut conn = db.client().await?;
    let pg: &mut Client = &mut conn;
    let tx = pg.transaction().await?;
    db.echo_sql(&content);
    tx.batch_execute(&content).await?;
    tx.commit().await?;

    info!(file = %path.display(), "file executed");
    Ok(())
}
