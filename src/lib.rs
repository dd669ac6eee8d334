//! geoloc - offline reverse geocoding over a GeoNames gazetteer
//!
//! This library provides the spatial index, admin code resolution and the
//! geocoder shared by the query and locate binaries.

pub mod config;
pub mod error;
pub mod geocoder;
pub mod geonames;
pub mod models;
pub mod resolver;
pub mod spatial;
pub mod store;

pub use error::GeolocError;
pub use geocoder::{Geocoder, ReverseGeocodeResult, Status};
pub use models::{AdminCode, Coordinate, PlaceRecord};
pub use store::{RecordSource, RecordStore};
