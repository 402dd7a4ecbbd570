//! Reads the restaurant table from delimited text.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{RecsError, Result};
use crate::record::RawRecord;

pub const NAME_COLUMN: &str = "Restaurant Name";
pub const ADDRESS_COLUMN: &str = "Restaurant Address";
pub const LATITUDE_COLUMN: &str = "Restaurant Latitude";
pub const LONGITUDE_COLUMN: &str = "Restaurant Longitude";
pub const PRICE_COLUMN: &str = "Restaurant Price Range";
pub const CATEGORY_COLUMN: &str = "Category";

/// Cell values read as missing.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// The raw table handed to the feature builder.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    records: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<RawRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<RawRecord> for RawTable {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

struct ColumnLayout {
    name: usize,
    address: usize,
    latitude: usize,
    longitude: usize,
    price_range: usize,
    category: usize,
    extra: Vec<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| RecsError::MissingColumn(column.to_string()))
        };

        let mut layout = Self {
            name: find(NAME_COLUMN)?,
            address: find(ADDRESS_COLUMN)?,
            latitude: find(LATITUDE_COLUMN)?,
            longitude: find(LONGITUDE_COLUMN)?,
            price_range: find(PRICE_COLUMN)?,
            category: find(CATEGORY_COLUMN)?,
            extra: Vec::new(),
        };
        let known = [
            layout.name,
            layout.address,
            layout.latitude,
            layout.longitude,
            layout.price_range,
            layout.category,
        ];
        layout.extra = (0..headers.len()).filter(|i| !known.contains(i)).collect();
        Ok(layout)
    }
}

/// Opens `path` and reads it as a delimited table with a header row.
pub fn read_csv<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<RawTable> {
    let path = path.as_ref();
    debug!("Reading dataset from {}", path.display());
    let file = File::open(path)?;
    read_table(BufReader::new(file), delimiter)
}

/// Reads a delimited table with a header row from any reader.
pub fn read_table<R: Read>(reader: R, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let layout = ColumnLayout::from_headers(&headers)?;

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result?;
        let cell = |i: usize| row.get(i).filter(|v| !is_missing(v)).map(str::to_string);
        let coordinate = |i: usize, column: &str| {
            let value = cell(i)?;
            match value.trim().parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => Some(parsed),
                _ => {
                    warn!(
                        "Row {}: {} value '{}' is not a number, treating as missing",
                        line + 1,
                        column,
                        value
                    );
                    None
                }
            }
        };

        records.push(RawRecord {
            name: cell(layout.name),
            address: cell(layout.address),
            latitude: coordinate(layout.latitude, LATITUDE_COLUMN),
            longitude: coordinate(layout.longitude, LONGITUDE_COLUMN),
            price_range: cell(layout.price_range),
            category: cell(layout.category),
            extra: layout.extra.iter().map(|&i| cell(i)).collect(),
        });
    }

    if records.is_empty() {
        return Err(RecsError::EmptyDataset);
    }

    debug!("Read {} rows", records.len());
    Ok(RawTable::new(records))
}

fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}
