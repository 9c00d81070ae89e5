use crate::models::LookupField;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string for the nearby endpoints
///
/// `radius` falls back to the configured default when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NearbyQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "name", alias = "sub")]
    pub target: String,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub by: LookupField,
    #[serde(default)]
    pub enrich: bool,
}

/// Request to load a dataset from the server's filesystem
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadDatasetRequest {
    #[validate(length(min = 1))]
    pub path: String,
    #[serde(default)]
    pub sheet: Option<String>,
}

/// Query string accompanying an uploaded CSV or spreadsheet body
///
/// `name` labels a CSV body's single sheet; `sheet` picks a sheet from a
/// multi-sheet spreadsheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sheet: Option<String>,
}
