// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{LookupField, RawTable, Record, Role};
pub use requests::{LoadDatasetRequest, NearbyQuery, UploadQuery};
pub use responses::{DatasetSummary, ErrorResponse, HealthResponse, MapResponse, NearbyResponse};
