//! Core data models for the geocoding system.

pub mod admin;
pub mod place;

pub use admin::{
    admin_key, AdminCode, AdminCodeEntry, AdminHierarchy, AdminLevel, AdminTable, ResolvedAdmin,
};
pub use place::{Coordinate, PlaceRecord};
