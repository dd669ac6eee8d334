//! GeoNames gazetteer dumps.
//!
//! Reads the tab-separated dump files (https://download.geonames.org/export/dump/)
//! into place records and admin code tables.

mod dataset;
mod reader;

pub use dataset::GeonamesDataset;
pub use reader::{parse_admin_code, parse_place, read_admin_codes, read_places};
