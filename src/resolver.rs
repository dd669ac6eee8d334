//! Administrative hierarchy resolution for a matched place.
//!
//! Each level is looked up by its composite key. A missing key falls back to the raw
//! code on the record; that is a soft condition, never an error.

use tracing::debug;

use crate::models::{AdminCode, AdminHierarchy, AdminLevel, AdminTable, PlaceRecord, ResolvedAdmin};
use crate::store::RecordStore;

/// Resolve admin1, admin2 and admin3 of `record` against the given tables.
///
/// Tables are only read; the raw code behind each resolved entry is returned in
/// `original_code`, so resolving the same record again gives the same result.
pub fn resolve(
    record: &PlaceRecord,
    admin1: &AdminTable,
    admin2: &AdminTable,
    admin3: &AdminTable,
) -> AdminHierarchy {
    resolve_with(record, |level| match level {
        AdminLevel::Region => admin1,
        AdminLevel::County => admin2,
        AdminLevel::Municipality => admin3,
    })
}

/// Resolve `record` against the tables of `store`
pub fn resolve_in(record: &PlaceRecord, store: &RecordStore) -> AdminHierarchy {
    resolve_with(record, |level| store.admin_table(level))
}

fn resolve_with<'t, F>(record: &PlaceRecord, table_for: F) -> AdminHierarchy
where
    F: Fn(AdminLevel) -> &'t AdminTable,
{
    let mut hierarchy = AdminHierarchy::default();
    for &level in AdminLevel::all() {
        hierarchy.set(level, resolve_level(record, level, table_for(level)));
    }
    hierarchy
}

fn resolve_level(record: &PlaceRecord, level: AdminLevel, table: &AdminTable) -> AdminCode {
    let code = level.code_of(record);
    let key = level.key_for(record);

    match table.get(&key) {
        Some(entry) => AdminCode::Resolved(ResolvedAdmin {
            entry: entry.clone(),
            original_code: code.to_string(),
        }),
        None => {
            debug!(
                "ResolutionFallback: {} key '{}' not found for place {}, using raw code",
                level.field_name(),
                key,
                record.geoname_id
            );
            AdminCode::Raw(code.to_string())
        }
    }
}
