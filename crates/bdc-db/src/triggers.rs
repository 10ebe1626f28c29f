//! Queries over the database's live trigger catalog.

use crate::error::Result;
use crate::ident;
use tokio_postgres::GenericClient;

/// A trigger as reported by `information_schema.triggers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRecord {
    pub schema: String,
    pub table_name: String,
    pub trigger_schema: String,
    pub trigger_name: String,
    /// Comma-joined event manipulations (`INSERT,UPDATE,...`).
    pub event: String,
    pub definition: String,
}

/// List all triggers defined in the connected database.
pub async fn list_triggers(client: &impl GenericClient) -> Result<Vec<TriggerRecord>> {
    let rows = client
        .query(
            "SELECT event_object_schema::text AS schema, \
                    event_object_table::text AS table_name, \
                    trigger_schema::text, \
                    trigger_name::text, \
                    string_agg(event_manipulation::text, ',') AS event, \
                    action_statement::text AS definition \
               FROM information_schema.triggers \
              GROUP BY 1, 2, 3, 4, 6 \
              ORDER BY schema, table_name",
            &[],
        )
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| TriggerRecord {
            schema: row.get("schema"),
            table_name: row.get("table_name"),
            trigger_schema: row.get("trigger_schema"),
            trigger_name: row.get("trigger_name"),
            event: row.get("event"),
            definition: row.get("definition"),
        })
        .collect())
}

/// Drop a trigger from its table, if it exists.
pub async fn delete_trigger(
    client: &impl GenericClient,
    name: &str,
    table: &str,
    schema: Option<&str>,
) -> Result<()> {
    let statement = format!(
        "DROP TRIGGER IF EXISTS {} ON {}",
        ident::quote(name)?,
        ident::qualify(schema.or(Some("public")), table)?
    );
    client.execute(&statement, &[]).await?;
    Ok(())
}

/// Select the live triggers whose name occurs in any of the given SQL texts.
///
/// This is a textual match: a live trigger is selected when its name appears
/// as a substring of a registered trigger file, not when the definitions are
/// semantically equal. A trigger name that happens to be contained in an
/// unrelated file's text will match as well.
pub fn match_triggers<'a>(
    live: &'a [TriggerRecord],
    sql_texts: &[String],
) -> Vec<&'a TriggerRecord> {
    live.iter()
        .filter(|trigger| {
            sql_texts
                .iter()
                .any(|sql| sql.contains(&trigger.trigger_name))
        })
        .collect()
}
