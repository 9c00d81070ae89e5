use crate::core::{MapPoint, ResultRow};
use serde::{Deserialize, Serialize};

/// Response for the nearby endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyResponse {
    pub target: String,
    #[serde(rename = "radiusMiles")]
    pub radius_miles: f64,
    pub found: bool,
    pub center: Option<ResultRow>,
    pub results: Vec<ResultRow>,
    pub count: usize,
}

/// Response for the map endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MapResponse {
    pub target: String,
    pub points: Vec<MapPoint>,
}

/// Description of the loaded dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub source: String,
    pub sheet: String,
    pub sheets: Vec<String>,
    pub rows: usize,
    #[serde(rename = "uniqueNames")]
    pub unique_names: usize,
    #[serde(rename = "loadedAt")]
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "datasetLoaded")]
    pub dataset_loaded: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
