//! GeoNames dump files as a record source.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use super::reader::{read_admin_codes, read_places};
use crate::config::DataConfig;
use crate::store::{RecordSource, RecordStore};

/// The four dump files a record store is built from
#[derive(Debug, Clone)]
pub struct GeonamesDataset {
    /// Places to index (e.g. cities500.txt)
    pub cities: PathBuf,
    /// Country dump providing ADM3/ADM4 features (e.g. GR.txt)
    pub country: PathBuf,
    pub admin1: PathBuf,
    pub admin2: PathBuf,
}

impl GeonamesDataset {
    pub fn from_config(config: &DataConfig) -> Self {
        Self {
            cities: config.path(&config.cities),
            country: config.path(&config.country),
            admin1: config.path(&config.admin1),
            admin2: config.path(&config.admin2),
        }
    }
}

impl RecordSource for GeonamesDataset {
    fn load(&self) -> Result<RecordStore> {
        let started = Instant::now();

        // The files are independent; read them in parallel and join before building
        let ((cities, country), (admin1, admin2)) = rayon::join(
            || rayon::join(|| read_places(&self.cities), || read_places(&self.country)),
            || {
                rayon::join(
                    || read_admin_codes(&self.admin1),
                    || read_admin_codes(&self.admin2),
                )
            },
        );

        let cities = cities.context("Failed to load places")?;
        let country = country.context("Failed to load country features")?;
        let admin1 = admin1.context("Failed to load admin1 codes")?;
        let admin2 = admin2.context("Failed to load admin2 codes")?;

        let store = RecordStore::new(cities, admin1, admin2, &country);
        info!("GeoNames dataset loaded in {:?}", started.elapsed());

        Ok(store)
    }
}
