//! Tab-separated GeoNames dump readers.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::models::{AdminCodeEntry, PlaceRecord};

// Columns of the geoname table (cities500.txt, GR.txt, ...)
//
//geonameid  name  asciiname  alternatenames  latitude  longitude  feature class  feature code
//country code  cc2  admin1 code  admin2 code  admin3 code  admin4 code  population  elevation
//dem  timezone  modification date
const GEONAME_ID: usize = 0;
const NAME: usize = 1;
const ASCII_NAME: usize = 2;
const LATITUDE: usize = 4;
const LONGITUDE: usize = 5;
const FEATURE_CLASS: usize = 6;
const FEATURE_CODE: usize = 7;
const COUNTRY_CODE: usize = 8;
const ADMIN1_CODE: usize = 10;
const ADMIN2_CODE: usize = 11;
const ADMIN3_CODE: usize = 12;
const ADMIN4_CODE: usize = 13;
const POPULATION: usize = 14;
const ELEVATION: usize = 15;
const TIMEZONE: usize = 17;

// Columns of admin1CodesASCII.txt / admin2Codes.txt
//
//concatenated codes  name  asciiname  geonameid
const ADMIN_KEY: usize = 0;
const ADMIN_NAME: usize = 1;
const ADMIN_ASCII_NAME: usize = 2;
const ADMIN_GEONAME_ID: usize = 3;

/// Open a dump, decompressing `.gz` files on the fly
fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// GeoNames dumps have no header and no quoting; names may contain '"'
fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(reader)
}

fn text(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_string()
}

fn number<T: std::str::FromStr>(record: &StringRecord, index: usize) -> Option<T> {
    record.get(index).and_then(|v| v.trim().parse().ok())
}

/// Decode one geoname row. Rows without a numeric id are rejected; an unparseable
/// coordinate becomes NaN so the spatial index leaves the record out.
pub fn parse_place(record: &StringRecord) -> Option<PlaceRecord> {
    let geoname_id = number(record, GEONAME_ID)?;
    Some(PlaceRecord {
        geoname_id,
        name: text(record, NAME),
        ascii_name: text(record, ASCII_NAME),
        latitude: number(record, LATITUDE).unwrap_or(f64::NAN),
        longitude: number(record, LONGITUDE).unwrap_or(f64::NAN),
        feature_class: text(record, FEATURE_CLASS),
        feature_code: text(record, FEATURE_CODE),
        country_code: text(record, COUNTRY_CODE),
        admin1_code: text(record, ADMIN1_CODE),
        admin2_code: text(record, ADMIN2_CODE),
        admin3_code: text(record, ADMIN3_CODE),
        admin4_code: text(record, ADMIN4_CODE),
        population: number(record, POPULATION),
        elevation: number(record, ELEVATION),
        timezone: text(record, TIMEZONE),
    })
}

/// Decode one admin code row. Rows with an empty key are rejected.
pub fn parse_admin_code(record: &StringRecord) -> Option<AdminCodeEntry> {
    let key = text(record, ADMIN_KEY);
    if key.is_empty() {
        return None;
    }
    Some(AdminCodeEntry {
        key,
        name: text(record, ADMIN_NAME),
        ascii_name: text(record, ADMIN_ASCII_NAME),
        source_id: text(record, ADMIN_GEONAME_ID),
    })
}

/// Parse every row of `path` with `parse`, skipping rows it rejects
fn read_rows<T, F>(path: &Path, parse: F) -> Result<Vec<T>>
where
    F: Fn(&StringRecord) -> Option<T>,
{
    info!("Started parsing {} (this may take a while)", path.display());

    let mut reader = tsv_reader(open(path)?);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            // Undecodable rows are dropped; the reader resumes at the next line
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                debug!("Skipping undecodable row {} of {}: {}", index + 1, path.display(), e);
                skipped += 1;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read {} at row {}", path.display(), index + 1)
                })
            }
        };
        match parse(&record) {
            Some(row) => rows.push(row),
            None => {
                debug!("Skipping malformed row {} of {}", index + 1, path.display());
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows in {}", skipped, path.display());
    }
    info!("Finished parsing {}: {} rows", path.display(), rows.len());

    Ok(rows)
}

/// Load a geoname table
pub fn read_places(path: &Path) -> Result<Vec<PlaceRecord>> {
    read_rows(path, parse_place)
}

/// Load an admin code table
pub fn read_admin_codes(path: &Path) -> Result<Vec<AdminCodeEntry>> {
    read_rows(path, parse_admin_code)
}
