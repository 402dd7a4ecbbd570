use serde::Serialize;

/// One row of the input table, as read. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price_range: Option<String>,
    pub category: Option<String>,
    /// Values of any non-contract columns, in header order. Only used for
    /// whole-row equality during deduplication.
    pub extra: Vec<Option<String>>,
}

impl RawRecord {
    pub fn new(
        name: &str,
        address: &str,
        latitude: f64,
        longitude: f64,
        price_range: &str,
        category: &str,
    ) -> Self {
        Self {
            name: Some(name.to_string()),
            address: Some(address.to_string()),
            latitude: Some(latitude),
            longitude: Some(longitude),
            price_range: Some(price_range.to_string()),
            category: Some(category.to_string()),
            extra: Vec::new(),
        }
    }

    pub(crate) fn dedup_key(&self) -> RowKey<'_> {
        RowKey {
            name: self.name.as_deref(),
            address: self.address.as_deref(),
            latitude: self.latitude.map(float_key),
            longitude: self.longitude.map(float_key),
            price_range: self.price_range.as_deref(),
            category: self.category.as_deref(),
            extra: self.extra.iter().map(Option::as_deref).collect(),
        }
    }
}

/// Hashable view of a [`RawRecord`] where equal rows produce equal keys.
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RowKey<'a> {
    name: Option<&'a str>,
    address: Option<&'a str>,
    latitude: Option<u64>,
    longitude: Option<u64>,
    price_range: Option<&'a str>,
    category: Option<&'a str>,
    extra: Vec<Option<&'a str>>,
}

fn float_key(value: f64) -> u64 {
    // -0.0 and 0.0 compare equal, so they must hash equal too
    if value == 0.0 {
        0.0_f64.to_bits()
    } else {
        value.to_bits()
    }
}

/// A row that survived cleaning. Location fields are guaranteed present and
/// the price label is normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedRecord {
    pub name: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price_range: String,
    pub price_tier: usize,
    pub category: String,
}

impl CleanedRecord {
    /// Name as shown to users; missing names render as `NaN`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("NaN")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_rows_share_a_key() {
        let a = RawRecord::new("A", "1 Main St", 43.6, -79.3, "$", "Cafe");
        let b = a.clone();
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn extra_columns_participate_in_key() {
        let mut a = RawRecord::new("A", "1 Main St", 43.6, -79.3, "$", "Cafe");
        let mut b = a.clone();
        a.extra = vec![Some("416-555-0100".to_string())];
        b.extra = vec![Some("416-555-0199".to_string())];
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn signed_zero_is_one_key() {
        let a = RawRecord::new("A", "x", 0.0, 1.0, "$", "Cafe");
        let b = RawRecord::new("A", "x", -0.0, 1.0, "$", "Cafe");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
