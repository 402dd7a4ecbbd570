//! Cleans the raw restaurant table and encodes every surviving row as a
//! numeric feature vector.
//!
//! The pipeline runs in a fixed order, each step consuming the previous
//! step's output:
//!
//! 1. drop exact duplicate rows
//! 2. drop rows without address, latitude or longitude
//! 3. impute, normalize and ordinal-encode the price tier
//! 4. one-hot encode the trimmed category
//! 5. min-max scale latitude and longitude over the cleaned rows
//! 6. assemble `[price_tier, lat_scaled, lon_scaled, cat_*...]` per row
//!
//! Row `i` of [`FeatureSpace::records`] always corresponds to row `i` of
//! [`FeatureSpace::matrix`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::RawTable;
use crate::error::{RecsError, Result};
use crate::feature::FeatureMatrix;
use crate::record::{CleanedRecord, RawRecord};

/// Text used for values that were missing before being coerced to strings.
pub const MISSING_TEXT: &str = "nan";

pub const PRICE_TIER_COLUMN: &str = "price_tier";
pub const LATITUDE_SCALED_COLUMN: &str = "lat_scaled";
pub const LONGITUDE_SCALED_COLUMN: &str = "lon_scaled";
pub const CATEGORY_COLUMN_PREFIX: &str = "cat_";

/// Ordered price tiers and the shorthand symbols that map onto them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriceTiers {
    /// Canonical labels, cheapest first. A label's position is its ordinal.
    pub tiers: Vec<String>,
    /// Ordinal used when neither a row's label nor the modal label is a tier.
    pub fallback_tier: usize,
    /// Shorthand such as `$$` mapped to a canonical label.
    pub symbols: BTreeMap<String, String>,
}

impl Default for PriceTiers {
    fn default() -> Self {
        let tiers = ["Under $10", "$11-30", "$31-60", "Above $61"];
        let symbols = ["$", "$$", "$$$", "$$$$"];
        Self {
            tiers: tiers.iter().map(|t| t.to_string()).collect(),
            fallback_tier: 1,
            symbols: symbols
                .iter()
                .zip(tiers.iter())
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
        }
    }
}

impl PriceTiers {
    /// Ordinal of a canonical label.
    pub fn ordinal(&self, label: &str) -> Option<usize> {
        self.tiers.iter().position(|t| t == label)
    }

    /// Trims `raw` and replaces a known symbol with its label. Anything else
    /// passes through trimmed.
    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        self.symbols
            .get(trimmed)
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }
}

/// Counts of what the pipeline dropped or imputed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub unlocated_removed: usize,
    pub prices_imputed: usize,
    pub prices_unmapped: usize,
    pub categories: usize,
    pub output_rows: usize,
}

/// Cleaned table and its aligned feature matrix.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    records: Vec<CleanedRecord>,
    matrix: FeatureMatrix,
    report: BuildReport,
}

impl FeatureSpace {
    /// Pairs a cleaned table with its matrix. Returns `None` when the row
    /// counts differ.
    pub fn new(
        records: Vec<CleanedRecord>,
        matrix: FeatureMatrix,
        report: BuildReport,
    ) -> Option<Self> {
        (records.len() == matrix.len()).then_some(Self {
            records,
            matrix,
            report,
        })
    }

    pub fn records(&self) -> &[CleanedRecord] {
        &self.records
    }

    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Category vocabulary in one-hot column order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.matrix
            .column_names()
            .iter()
            .filter_map(|c| c.strip_prefix(CATEGORY_COLUMN_PREFIX))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CleanedRecord, &[f64])> {
        self.records.iter().zip(self.matrix.rows())
    }
}

/// A row that has a complete location but is otherwise untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRecord {
    pub name: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price_range: Option<String>,
    pub category: Option<String>,
}

/// Removes rows equal in every field to an earlier row. Keeps first
/// occurrences in their original order.
pub fn deduplicate(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(records.len());
        records.iter().map(|r| seen.insert(r.dedup_key())).collect()
    };
    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}

/// Drops rows missing an address, latitude or longitude.
pub fn retain_located(records: Vec<RawRecord>) -> Vec<LocatedRecord> {
    records
        .into_iter()
        .filter_map(|r| {
            Some(LocatedRecord {
                address: r.address?,
                latitude: r.latitude?,
                longitude: r.longitude?,
                name: r.name,
                price_range: r.price_range,
                category: r.category,
            })
        })
        .collect()
}

/// Price column after imputation and encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPrices {
    pub labels: Vec<String>,
    pub ordinals: Vec<usize>,
    /// Rows whose price was missing and took the modal raw value.
    pub imputed: usize,
    /// Rows whose normalized label is not a tier and took the modal ordinal.
    pub unmapped: usize,
}

/// Fills, normalizes and ordinal-encodes a price column.
pub fn normalize_prices(raw: &[Option<String>], tiers: &PriceTiers) -> NormalizedPrices {
    let imputed = raw.iter().filter(|p| p.is_none()).count();
    let fill = if imputed > 0 {
        let fill = mode(raw.iter().flatten().map(String::as_str))
            .unwrap_or(MISSING_TEXT);
        debug!("Filling {} missing price values with '{}'", imputed, fill);
        fill
    } else {
        MISSING_TEXT
    };

    let labels: Vec<String> = raw
        .iter()
        .map(|p| tiers.normalize(p.as_deref().unwrap_or(fill)))
        .collect();

    let encoded: Vec<Option<usize>> = labels.iter().map(|l| tiers.ordinal(l)).collect();
    let unmapped = encoded.iter().filter(|o| o.is_none()).count();
    let fallback = if unmapped > 0 {
        let modal = mode(labels.iter().map(String::as_str));
        let ordinal = modal
            .and_then(|label| tiers.ordinal(label))
            .unwrap_or(tiers.fallback_tier);
        warn!(
            "{} price values are not a known tier, using tier {} (modal label {:?})",
            unmapped, ordinal, modal
        );
        ordinal
    } else {
        tiers.fallback_tier
    };

    NormalizedPrices {
        ordinals: encoded.into_iter().map(|o| o.unwrap_or(fallback)).collect(),
        labels,
        imputed,
        unmapped,
    }
}

/// Coerces missing categories to `"nan"` and trims surrounding whitespace.
pub fn normalize_categories(raw: &[Option<String>]) -> Vec<String> {
    raw.iter()
        .map(|c| c.as_deref().unwrap_or(MISSING_TEXT).trim().to_string())
        .collect()
}

/// Most frequent value; ties go to the value seen first.
fn mode<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, pa)), (_, (cb, pb))| ca.cmp(cb).then_with(|| pb.cmp(pa)))
        .map(|(value, _)| value)
}

/// One binary column per distinct category, in alphabetical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEncoder {
    vocabulary: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit(categories: &[String]) -> Self {
        let vocabulary: BTreeSet<&String> = categories.iter().collect();
        Self {
            vocabulary: vocabulary.into_iter().cloned().collect(),
        }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn width(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn column_index(&self, category: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|v| v.as_str().cmp(category))
            .ok()
    }

    /// Writes the one-hot block for `category` into `out`, which must be
    /// `width()` long and zeroed.
    pub fn encode_into(&self, category: &str, out: &mut [f64]) {
        if let Some(index) = self.column_index(category) {
            out[index] = 1.0;
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = String> + '_ {
        self.vocabulary
            .iter()
            .map(|v| format!("{CATEGORY_COLUMN_PREFIX}{v}"))
    }
}

/// Rescales one column linearly onto [0, 1] using its observed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    data_min: f64,
    data_max: f64,
}

impl MinMaxScaler {
    /// Returns `None` for an empty column.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let (data_min, data_max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self { data_min, data_max })
    }

    pub fn data_min(&self) -> f64 {
        self.data_min
    }

    pub fn data_max(&self) -> f64 {
        self.data_max
    }

    /// True when every fitted value was the same.
    pub fn is_degenerate(&self) -> bool {
        self.data_max - self.data_min < 10.0 * f64::EPSILON
    }

    /// Constant columns scale to 0.
    pub fn transform(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (value - self.data_min) / (self.data_max - self.data_min)
        }
    }
}

/// Runs the whole pipeline over `table`.
pub fn build(table: RawTable, tiers: &PriceTiers) -> Result<FeatureSpace> {
    if table.is_empty() {
        return Err(RecsError::EmptyDataset);
    }
    let mut report = BuildReport {
        input_rows: table.len(),
        ..BuildReport::default()
    };

    let records = deduplicate(table.into_records());
    report.duplicates_removed = report.input_rows - records.len();

    let before = records.len();
    let located = retain_located(records);
    report.unlocated_removed = before - located.len();
    info!(
        "Removed {} duplicate rows, dropped {} rows with missing location",
        report.duplicates_removed, report.unlocated_removed
    );

    let (Some(lat_scaler), Some(lon_scaler)) = (
        MinMaxScaler::fit(&located.iter().map(|r| r.latitude).collect::<Vec<_>>()),
        MinMaxScaler::fit(&located.iter().map(|r| r.longitude).collect::<Vec<_>>()),
    ) else {
        return Err(RecsError::NoUsableRows);
    };
    for (column, scaler) in [("latitude", &lat_scaler), ("longitude", &lon_scaler)] {
        if scaler.is_degenerate() {
            warn!("Every row has {} {}, scaling it to 0", column, scaler.data_min());
        } else {
            debug!(
                "Scaling {} over [{}, {}]",
                column,
                scaler.data_min(),
                scaler.data_max()
            );
        }
    }

    let raw_prices: Vec<Option<String>> = located
        .iter()
        .map(|r| r.price_range.clone())
        .collect();
    let prices = normalize_prices(&raw_prices, tiers);
    report.prices_imputed = prices.imputed;
    report.prices_unmapped = prices.unmapped;

    let raw_categories: Vec<Option<String>> =
        located.iter().map(|r| r.category.clone()).collect();
    let categories = normalize_categories(&raw_categories);
    let encoder = CategoryEncoder::fit(&categories);
    report.categories = encoder.width();
    debug!("Category vocabulary: {:?}", encoder.vocabulary());

    let columns = [PRICE_TIER_COLUMN, LATITUDE_SCALED_COLUMN, LONGITUDE_SCALED_COLUMN]
        .into_iter()
        .map(str::to_string)
        .chain(encoder.column_names())
        .collect();
    let mut matrix = FeatureMatrix::with_columns(columns);
    let mut cleaned = Vec::with_capacity(located.len());
    let mut row = vec![0.0; matrix.width()];

    let rows = located
        .into_iter()
        .zip(prices.labels)
        .zip(prices.ordinals)
        .zip(categories);
    for (((record, price_range), price_tier), category) in rows {
        row.fill(0.0);
        row[0] = price_tier as f64;
        row[1] = lat_scaler.transform(record.latitude);
        row[2] = lon_scaler.transform(record.longitude);
        encoder.encode_into(&category, &mut row[3..]);
        matrix.push_row(&row);

        cleaned.push(CleanedRecord {
            name: record.name,
            address: record.address,
            latitude: record.latitude,
            longitude: record.longitude,
            price_range,
            price_tier,
            category,
        });
    }

    report.output_rows = cleaned.len();
    info!(
        "Remaining rows: {}, categories encoded: {}",
        report.output_rows, report.categories
    );

    FeatureSpace::new(cleaned, matrix, report).ok_or(RecsError::NoUsableRows)
}
