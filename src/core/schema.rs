use crate::models::{RawTable, Record};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Canonical fields a source column can be mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Identifier,
    Latitude,
    Longitude,
    Code,
    OutOfTown,
    LocationLabel,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Identifier,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
        CanonicalField::Code,
        CanonicalField::OutOfTown,
        CanonicalField::LocationLabel,
    ];

    /// Column name used for this field in exports and error messages
    pub fn column_name(&self) -> &'static str {
        match self {
            CanonicalField::Identifier => "Sub Name",
            CanonicalField::Latitude => "Lattitude",
            CanonicalField::Longitude => "Longitude",
            CanonicalField::Code => "Sub",
            CanonicalField::OutOfTown => "OT",
            CanonicalField::LocationLabel => "City/State",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            CanonicalField::Identifier | CanonicalField::Latitude | CanonicalField::Longitude
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Errors raised while mapping a raw table onto the canonical schema
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Missing required columns: {:?}. Found: {found:?}", column_names(.missing))]
    MissingColumns {
        missing: Vec<CanonicalField>,
        found: Vec<String>,
    },
}

fn column_names(fields: &[CanonicalField]) -> Vec<&'static str> {
    fields.iter().map(CanonicalField::column_name).collect()
}

/// How a candidate is compared against a (trimmed) source header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderPattern {
    /// Case-insensitive comparison
    Folded(String),
    /// Byte-for-byte comparison
    Exact(String),
}

impl HeaderPattern {
    pub fn folded(s: &str) -> Self {
        HeaderPattern::Folded(s.to_lowercase())
    }

    pub fn exact(s: &str) -> Self {
        HeaderPattern::Exact(s.to_string())
    }
}

/// Ordered candidates for one canonical field; first hit wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub field: CanonicalField,
    pub candidates: Vec<HeaderPattern>,
}

impl FieldRule {
    fn folded(field: CanonicalField, names: &[&str]) -> Self {
        Self {
            field,
            candidates: names.iter().map(|n| HeaderPattern::folded(n)).collect(),
        }
    }
}

/// Policy for a bare `Sub` column, which some sheets use as the name and
/// others as a short code next to a separate name column.
///
/// Under either policy `Sub` is the name when no better name column exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubColumn {
    #[default]
    Code,
    Identifier,
}

/// Declarative header-resolution table
///
/// Rules are evaluated in order and a column claimed by an earlier rule is
/// not available to later ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRules {
    pub rules: Vec<FieldRule>,
}

impl SchemaRules {
    /// `Sub` is the code when a name column was already resolved, otherwise
    /// the name
    pub fn sub_as_code() -> Self {
        Self::build(true)
    }

    /// `Sub` is only ever a last-resort name; no code column
    pub fn sub_as_identifier() -> Self {
        Self::build(false)
    }

    pub fn for_policy(policy: SubColumn) -> Self {
        match policy {
            SubColumn::Code => Self::sub_as_code(),
            SubColumn::Identifier => Self::sub_as_identifier(),
        }
    }

    fn build(with_code: bool) -> Self {
        let mut rules = vec![
            FieldRule::folded(CanonicalField::Identifier, &["sub name", "sub_name", "name", "sub"]),
            // Misspelled "lattitude" is deliberately first.
            FieldRule::folded(CanonicalField::Latitude, &["lattitude", "latitude", "lat"]),
            FieldRule::folded(CanonicalField::Longitude, &["longitude", "long", "lng", "lon"]),
        ];
        if with_code {
            rules.push(FieldRule {
                field: CanonicalField::Code,
                candidates: vec![HeaderPattern::exact("Sub")],
            });
        }
        rules.push(FieldRule {
            field: CanonicalField::OutOfTown,
            candidates: vec![HeaderPattern::folded("out of town"), HeaderPattern::exact("OT")],
        });
        rules.push(FieldRule {
            field: CanonicalField::LocationLabel,
            candidates: vec![HeaderPattern::exact("City/State")],
        });
        Self { rules }
    }
}

impl Default for SchemaRules {
    fn default() -> Self {
        Self::sub_as_code()
    }
}

/// Resolved canonical field -> source column index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<CanonicalField, usize>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }
}

/// Resolve source headers against the rule table
///
/// Fails with every missing required field and the trimmed headers found.
pub fn resolve_columns(headers: &[String], rules: &SchemaRules) -> Result<ColumnMap, SchemaError> {
    let trimmed: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    // Later duplicates shadow earlier ones, as a plain map insert would.
    let mut folded: HashMap<String, usize> = HashMap::with_capacity(trimmed.len());
    for (idx, header) in trimmed.iter().enumerate() {
        folded.insert(header.to_lowercase(), idx);
    }

    let mut map = ColumnMap::default();
    let mut claimed: Vec<usize> = Vec::new();

    for rule in &rules.rules {
        let hit = rule.candidates.iter().find_map(|candidate| {
            let idx = match candidate {
                HeaderPattern::Folded(name) => folded.get(name).copied(),
                HeaderPattern::Exact(name) => trimmed.iter().position(|h| h == name),
            }?;
            (!claimed.contains(&idx)).then_some(idx)
        });

        if let Some(idx) = hit {
            claimed.push(idx);
            map.columns.insert(rule.field, idx);
        }
    }

    let missing: Vec<CanonicalField> = CanonicalField::ALL
        .into_iter()
        .filter(|field| field.is_required() && map.get(*field).is_none())
        .collect();

    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns {
            missing,
            found: trimmed,
        });
    }

    Ok(map)
}

/// Normalize a raw table into canonical records
///
/// Rows with a blank name or coordinates that do not parse as finite numbers
/// are dropped; string fields are trimmed and optional fields default to "".
pub fn normalize(table: &RawTable, rules: &SchemaRules) -> Result<Vec<Record>, SchemaError> {
    let columns = resolve_columns(&table.headers, rules)?;

    let cell = |row: &[String], field: CanonicalField| -> String {
        columns
            .get(field)
            .and_then(|idx| row.get(idx))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mut dropped = 0usize;
    let records: Vec<Record> = table
        .rows
        .iter()
        .filter_map(|row| {
            let identifier = cell(row, CanonicalField::Identifier);
            let latitude = parse_coordinate(&cell(row, CanonicalField::Latitude));
            let longitude = parse_coordinate(&cell(row, CanonicalField::Longitude));

            match (identifier.is_empty(), latitude, longitude) {
                (false, Some(latitude), Some(longitude)) => Some(Record {
                    identifier,
                    code: cell(row, CanonicalField::Code),
                    latitude,
                    longitude,
                    out_of_town: cell(row, CanonicalField::OutOfTown),
                    location_label: cell(row, CanonicalField::LocationLabel),
                }),
                _ => {
                    dropped += 1;
                    None
                }
            }
        })
        .collect();

    tracing::debug!(
        "Normalized {} rows ({} kept, {} dropped)",
        table.rows.len(),
        records.len(),
        dropped
    );

    Ok(records)
}

#[inline]
fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
