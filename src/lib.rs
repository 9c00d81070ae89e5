//! Nearby Subs - radius lookup over facility location spreadsheets
//!
//! Normalizes loosely named spreadsheet columns onto a fixed schema and ranks
//! every other location by great-circle distance from a chosen one.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{find_nearby, haversine_miles, normalize, QueryResult, SchemaError, SchemaRules};
pub use crate::models::{LookupField, RawTable, Record, Role};
