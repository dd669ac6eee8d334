//! Administrative division types for hierarchical code resolution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::PlaceRecord;

/// GeoNames administrative levels resolved for a matched place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// Region / periphery (admin1)
    Region,
    /// County / regional unit (admin2)
    County,
    /// Municipality (admin3)
    Municipality,
}

impl AdminLevel {
    /// Get all admin levels in hierarchical order (outermost first)
    pub fn all() -> &'static [AdminLevel] {
        &[
            AdminLevel::Region,
            AdminLevel::County,
            AdminLevel::Municipality,
        ]
    }

    /// Number of codes (after the country code) that make up a key at this level
    pub fn depth(&self) -> usize {
        match self {
            AdminLevel::Region => 1,
            AdminLevel::County => 2,
            AdminLevel::Municipality => 3,
        }
    }

    /// Get the field name for this level
    pub fn field_name(&self) -> &'static str {
        match self {
            AdminLevel::Region => "admin1",
            AdminLevel::County => "admin2",
            AdminLevel::Municipality => "admin3",
        }
    }

    /// Raw code the record carries for this level
    pub fn code_of<'a>(&self, record: &'a PlaceRecord) -> &'a str {
        match self {
            AdminLevel::Region => &record.admin1_code,
            AdminLevel::County => &record.admin2_code,
            AdminLevel::Municipality => &record.admin3_code,
        }
    }

    /// Composite lookup key for `record` at this level, e.g. "GR.ESYE31.01"
    pub fn key_for(&self, record: &PlaceRecord) -> String {
        let codes = [
            record.admin1_code.as_str(),
            record.admin2_code.as_str(),
            record.admin3_code.as_str(),
        ];
        admin_key(&record.country_code, &codes[..self.depth()])
    }
}

/// Join a country code and its chain of parent codes with ".".
///
/// Empty codes are kept: `admin_key("GR", &[""])` is `"GR."`.
pub fn admin_key(country_code: &str, codes: &[&str]) -> String {
    let mut key = String::with_capacity(country_code.len() + codes.len() * 8);
    key.push_str(country_code);
    for code in codes {
        key.push('.');
        key.push_str(code);
    }
    key
}

/// One administrative-division descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminCodeEntry {
    /// Composite key: "{country}.{admin1}[.{admin2}[.{admin3}]]"
    pub key: String,

    pub name: String,

    pub ascii_name: String,

    /// GeoNames id of the division
    pub source_id: String,
}

/// Read-only mapping from composite key to descriptor, one per admin level
#[derive(Debug, Clone, Default)]
pub struct AdminTable {
    entries: HashMap<String, AdminCodeEntry>,
}

impl AdminTable {
    /// Build from entries. The first entry for a key wins.
    pub fn from_entries<I: IntoIterator<Item = AdminCodeEntry>>(entries: I) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert_first(entry);
        }
        table
    }

    /// Derive the municipality table from admin feature records (`ADM3` / `ADM4`).
    ///
    /// Both feature codes are keyed by their admin3 chain. On a collision an ADM3 entry beats
    /// an ADM4 entry; otherwise the first record wins. This is not file order: a later ADM3
    /// row replaces an earlier ADM4 row, and a later row of the same kind is ignored.
    pub fn from_admin_features<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a PlaceRecord>,
    {
        let mut table = Self::default();
        let mut adm4 = Vec::new();

        for record in records {
            match record.feature_code.as_str() {
                "ADM3" => table.insert_first(Self::municipality_entry(record)),
                "ADM4" => adm4.push(record),
                _ => {}
            }
        }
        for record in adm4 {
            table.insert_first(Self::municipality_entry(record));
        }

        table
    }

    fn municipality_entry(record: &PlaceRecord) -> AdminCodeEntry {
        AdminCodeEntry {
            key: AdminLevel::Municipality.key_for(record),
            name: record.name.clone(),
            ascii_name: record.ascii_name.clone(),
            source_id: record.geoname_id.to_string(),
        }
    }

    fn insert_first(&mut self, entry: AdminCodeEntry) {
        if !self.entries.contains_key(&entry.key) {
            self.entries.insert(entry.key.clone(), entry);
        }
    }

    pub fn get(&self, key: &str) -> Option<&AdminCodeEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A descriptor found in an admin table, together with the raw code that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAdmin {
    #[serde(flatten)]
    pub entry: AdminCodeEntry,

    /// Raw code from the place record
    pub original_code: String,
}

/// Outcome of resolving one level: a descriptor, or the raw code if none exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdminCode {
    Resolved(ResolvedAdmin),
    Raw(String),
}

impl AdminCode {
    /// Display name when resolved
    pub fn name(&self) -> Option<&str> {
        match self {
            AdminCode::Resolved(resolved) => Some(&resolved.entry.name),
            AdminCode::Raw(_) => None,
        }
    }

    /// The raw source code, whether or not it resolved
    pub fn code(&self) -> &str {
        match self {
            AdminCode::Resolved(resolved) => &resolved.original_code,
            AdminCode::Raw(code) => code,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, AdminCode::Resolved(_))
    }
}

impl Default for AdminCode {
    fn default() -> Self {
        AdminCode::Raw(String::new())
    }
}

/// Resolved admin1/admin2/admin3 for one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminHierarchy {
    pub admin1: AdminCode,
    pub admin2: AdminCode,
    pub admin3: AdminCode,
}

impl AdminHierarchy {
    /// Get the value for a given level
    pub fn get(&self, level: AdminLevel) -> &AdminCode {
        match level {
            AdminLevel::Region => &self.admin1,
            AdminLevel::County => &self.admin2,
            AdminLevel::Municipality => &self.admin3,
        }
    }

    /// Set the value for a given level
    pub fn set(&mut self, level: AdminLevel, value: AdminCode) {
        match level {
            AdminLevel::Region => self.admin1 = value,
            AdminLevel::County => self.admin2 = value,
            AdminLevel::Municipality => self.admin3 = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(id: u64, name: &str, code: &str, admin3: &str) -> PlaceRecord {
        PlaceRecord::new(id, name, 38.0, 23.7, "GR")
            .with_feature("A", code)
            .with_admin_codes(&["ESYE31", "01", admin3])
    }

    #[test]
    fn test_admin_key_keeps_empty_components() {
        assert_eq!(admin_key("GR", &["A1"]), "GR.A1");
        assert_eq!(admin_key("GR", &[""]), "GR.");
        assert_eq!(admin_key("GR", &["A1", "", "9"]), "GR.A1..9");
        assert_ne!(admin_key("GR", &[""]), admin_key("GR", &[]));
    }

    #[test]
    fn test_key_for_levels() {
        let record = PlaceRecord::new(1, "Athens", 37.98, 23.72, "GR")
            .with_admin_codes(&["ESYE31", "45", "9186"]);
        assert_eq!(AdminLevel::Region.key_for(&record), "GR.ESYE31");
        assert_eq!(AdminLevel::County.key_for(&record), "GR.ESYE31.45");
        assert_eq!(AdminLevel::Municipality.key_for(&record), "GR.ESYE31.45.9186");
    }

    #[test]
    fn test_first_entry_wins() {
        let entry = |name: &str| AdminCodeEntry {
            key: "GR.A1".to_string(),
            name: name.to_string(),
            ascii_name: name.to_string(),
            source_id: "1".to_string(),
        };
        let table = AdminTable::from_entries(vec![entry("First"), entry("Second")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("GR.A1").unwrap().name, "First");
    }

    #[test]
    fn test_admin_features_prefer_adm3() {
        let records = vec![
            feature(10, "Village", "ADM4", "9186"),
            feature(11, "Municipality", "ADM3", "9186"),
            feature(12, "Other village", "ADM4", "9187"),
            feature(13, "Town", "PPL", "9188"),
            feature(14, "Later municipality", "ADM3", "9186"),
        ];
        let table = AdminTable::from_admin_features(&records);

        assert_eq!(table.len(), 2);
        let entry = table.get("GR.ESYE31.01.9186").unwrap();
        assert_eq!(entry.name, "Municipality");
        assert_eq!(entry.source_id, "11");
        assert_eq!(table.get("GR.ESYE31.01.9187").unwrap().name, "Other village");
        assert!(table.get("GR.ESYE31.01.9188").is_none());
    }

    #[test]
    fn test_admin_code_serializes_untagged() {
        let raw = AdminCode::Raw("A1".to_string());
        assert_eq!(serde_json::to_value(&raw).unwrap(), serde_json::json!("A1"));

        let resolved = AdminCode::Resolved(ResolvedAdmin {
            entry: AdminCodeEntry {
                key: "GR.A1".to_string(),
                name: "Attica".to_string(),
                ascii_name: "Attica".to_string(),
                source_id: "6692632".to_string(),
            },
            original_code: "A1".to_string(),
        });
        let value = serde_json::to_value(&resolved).unwrap();
        assert_eq!(value["name"], "Attica");
        assert_eq!(value["original_code"], "A1");
    }
}
