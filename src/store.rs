//! Immutable in-memory gazetteer: place records plus one admin table per level.

use std::sync::Arc;
use tracing::info;

use crate::models::{AdminCodeEntry, AdminLevel, AdminTable, PlaceRecord};

/// Where a [`RecordStore`] comes from.
///
/// Loading may be slow (proportional to dataset size); it is always called from a blocking
/// context. Any `Fn() -> anyhow::Result<RecordStore>` closure is a source.
pub trait RecordSource: Send + Sync + 'static {
    fn load(&self) -> anyhow::Result<RecordStore>;
}

impl<F> RecordSource for F
where
    F: Fn() -> anyhow::Result<RecordStore> + Send + Sync + 'static,
{
    fn load(&self) -> anyhow::Result<RecordStore> {
        self()
    }
}

/// Place records and administrative lookup tables, read-only once built
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    places: Vec<Arc<PlaceRecord>>,
    admin1: AdminTable,
    admin2: AdminTable,
    admin3: AdminTable,
}

impl RecordStore {
    /// Assemble a store.
    ///
    /// `admin_features` are the records of the country file; those with feature code
    /// `ADM3` or `ADM4` populate the admin3 table.
    pub fn new(
        places: Vec<PlaceRecord>,
        admin1: Vec<AdminCodeEntry>,
        admin2: Vec<AdminCodeEntry>,
        admin_features: &[PlaceRecord],
    ) -> Self {
        let store = Self {
            places: places.into_iter().map(Arc::new).collect(),
            admin1: AdminTable::from_entries(admin1),
            admin2: AdminTable::from_entries(admin2),
            admin3: AdminTable::from_admin_features(admin_features),
        };

        info!(
            "Record store: {} places, {} admin1, {} admin2, {} admin3 codes",
            store.places.len(),
            store.admin1.len(),
            store.admin2.len(),
            store.admin3.len()
        );

        store
    }

    pub fn places(&self) -> &[Arc<PlaceRecord>] {
        &self.places
    }

    /// Lookup table for an admin level
    pub fn admin_table(&self, level: AdminLevel) -> &AdminTable {
        match level {
            AdminLevel::Region => &self.admin1,
            AdminLevel::County => &self.admin2,
            AdminLevel::Municipality => &self.admin3,
        }
    }
}
