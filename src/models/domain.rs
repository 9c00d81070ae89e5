use serde::{Deserialize, Serialize};

/// One canonical row of a loaded sheet
///
/// Produced by the schema normalizer; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "name")]
    pub identifier: String,
    #[serde(default)]
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "outOfTown", default)]
    pub out_of_town: String,
    #[serde(rename = "locationLabel", default)]
    pub location_label: String,
}

impl Record {
    /// Record with only the required fields populated
    pub fn new(identifier: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            identifier: identifier.into(),
            code: String::new(),
            latitude,
            longitude,
            out_of_town: String::new(),
            location_label: String::new(),
        }
    }

    /// Value of the field selected for lookups
    pub fn key(&self, field: LookupField) -> &str {
        match field {
            LookupField::Identifier => &self.identifier,
            LookupField::Code => &self.code,
        }
    }
}

/// Table as handed over by a table source
///
/// Headers keep source order and spelling; each row is aligned with them and
/// may be shorter than the header list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Convenience constructor used heavily in tests
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }
}

/// Which record field a target key is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupField {
    #[default]
    #[serde(rename = "name", alias = "identifier")]
    Identifier,
    Code,
}

/// Role of an entry in a query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Center,
    Nearby,
}
