use crate::core::query::{NearbyEntry, QueryResult};
use crate::models::Role;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Column order of the delimited export
pub const EXPORT_HEADERS: [&str; 7] = [
    "Sub Name",
    "Sub",
    "OT",
    "City/State",
    "Distance (mi)",
    "Lattitude",
    "Longitude",
];

/// Owned, presentation-ready copy of a result entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub name: String,
    pub code: String,
    #[serde(rename = "outOfTown")]
    pub out_of_town: String,
    #[serde(rename = "locationLabel")]
    pub location_label: String,
    #[serde(rename = "distanceMiles")]
    pub distance_miles: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub role: Role,
}

impl ResultRow {
    /// Replace an empty location label; a non-empty one always wins.
    pub fn fill_location_label(&mut self, label: String) {
        if self.location_label.is_empty() {
            self.location_label = label;
        }
    }

    fn csv_fields(&self) -> [String; 7] {
        [
            self.name.clone(),
            self.code.clone(),
            self.out_of_town.clone(),
            self.location_label.clone(),
            self.distance_miles.to_string(),
            self.latitude.to_string(),
            self.longitude.to_string(),
        ]
    }
}

impl From<&NearbyEntry<'_>> for ResultRow {
    fn from(entry: &NearbyEntry<'_>) -> Self {
        Self {
            name: entry.record.identifier.clone(),
            code: entry.record.code.clone(),
            out_of_town: entry.record.out_of_town.clone(),
            location_label: entry.record.location_label.clone(),
            distance_miles: entry.distance_miles,
            latitude: entry.record.latitude,
            longitude: entry.record.longitude,
            role: entry.role,
        }
    }
}

/// Ranked neighbors as owned rows, center excluded
pub fn ranked_rows(result: &QueryResult<'_>) -> Vec<ResultRow> {
    result.neighbors.iter().map(ResultRow::from).collect()
}

/// Write ranked rows as CSV with [`EXPORT_HEADERS`] as the header line
pub fn write_csv<W: Write>(rows: &[ResultRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(EXPORT_HEADERS)?;
    for row in rows {
        wtr.write_record(row.csv_fields())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render ranked rows to a CSV string
pub fn to_csv_string(rows: &[ResultRow]) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    // The writer only ever receives UTF-8 input.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Download file name, e.g. `nearby_Main_St_15mi.csv`
pub fn export_file_name(target: &str, radius_miles: f64) -> String {
    format!("nearby_{}_{}mi.csv", target.replace(' ', "_"), radius_miles)
}
