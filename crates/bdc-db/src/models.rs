//! Models shipped with the core package.

use crate::error::Result;
use crate::metadata::{ColumnDef, ColumnType, Metadata, TableDef};
use crate::provider::{group, Contribution, EntryPoint};

/// Auxiliary model mirroring the PostGIS `spatial_ref_sys` table.
///
/// The table is owned by the PostGIS extension; it is registered here so
/// the metadata knows about it, and excluded from migration autogeneration
/// through [`crate::migrations::MigrationSettings`].
pub fn spatial_ref_sys() -> TableDef {
    TableDef::new("spatial_ref_sys")
        .in_namespace("public")
        .column(ColumnDef::new("srid", ColumnType::Integer).primary_key())
        .column(ColumnDef::new("auth_name", ColumnType::String(None)))
        .column(ColumnDef::new("auth_srid", ColumnType::String(None)))
        .column(ColumnDef::new("srtext", ColumnType::String(None)))
        .column(ColumnDef::new("proj4text", ColumnType::String(None)))
}

/// Register the core models into the shared metadata.
pub fn register_models(metadata: &mut Metadata) {
    metadata.add_table(spatial_ref_sys());
}

fn load_models() -> Result<Contribution> {
    Ok(Contribution::Models(register_models))
}

inventory::submit! {
    EntryPoint {
        name: "bdc-db",
        group: group::MODELS,
        load: load_models,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_ref_sys_shape() {
        let table = spatial_ref_sys();
        assert_eq!(table.qualified_name(), "public.spatial_ref_sys");
        let pk: Vec<_> = table
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(pk, ["srid"]);
    }

    #[test]
    fn test_register_models() {
        let mut metadata = Metadata::new();
        register_models(&mut metadata);
        metadata.configure_relationships().unwrap();
        assert_eq!(metadata.tables().len(), 1);
    }
}
