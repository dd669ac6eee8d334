//! Gazetteer place records.

use serde::{Deserialize, Serialize};

/// Geographic point (lat/lon, decimal degrees WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside [-90, 90] x [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One gazetteer entry.
///
/// Admin codes are kept as raw strings; a code missing from the source row is the empty
/// string, which is still a valid component of an admin lookup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// GeoNames id
    pub geoname_id: u64,

    pub name: String,

    pub ascii_name: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Single letter class, e.g. "P" (populated place) or "A" (admin division)
    pub feature_class: String,

    /// e.g. "PPLC", "ADM3"
    pub feature_code: String,

    /// ISO-3166 2-letter country code
    pub country_code: String,

    pub admin1_code: String,
    pub admin2_code: String,
    pub admin3_code: String,
    pub admin4_code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<i32>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub timezone: String,
}

impl PlaceRecord {
    /// Create a record with the fields the geocoder needs; everything else is empty
    pub fn new(
        geoname_id: u64,
        name: &str,
        latitude: f64,
        longitude: f64,
        country_code: &str,
    ) -> Self {
        Self {
            geoname_id,
            name: name.to_string(),
            ascii_name: name.to_string(),
            latitude,
            longitude,
            feature_class: String::new(),
            feature_code: String::new(),
            country_code: country_code.to_string(),
            admin1_code: String::new(),
            admin2_code: String::new(),
            admin3_code: String::new(),
            admin4_code: String::new(),
            population: None,
            elevation: None,
            timezone: String::new(),
        }
    }

    /// Set admin codes, outermost first. Missing trailing levels stay empty.
    pub fn with_admin_codes(mut self, codes: &[&str]) -> Self {
        let slots = [
            &mut self.admin1_code,
            &mut self.admin2_code,
            &mut self.admin3_code,
            &mut self.admin4_code,
        ];
        for (slot, code) in slots.into_iter().zip(codes) {
            *slot = code.to_string();
        }
        self
    }

    pub fn with_feature(mut self, class: &str, code: &str) -> Self {
        self.feature_class = class.to_string();
        self.feature_code = code.to_string();
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Whether this record may enter the spatial index
    pub fn has_valid_coordinates(&self) -> bool {
        self.coordinate().is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(90.0, -180.0).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 180.1).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_with_admin_codes_partial() {
        let record = PlaceRecord::new(1, "Athens", 37.9838, 23.7275, "GR")
            .with_admin_codes(&["ESYE31", "01"]);
        assert_eq!(record.admin1_code, "ESYE31");
        assert_eq!(record.admin2_code, "01");
        assert_eq!(record.admin3_code, "");
        assert_eq!(record.admin4_code, "");
    }
}
