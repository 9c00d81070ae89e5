// Core algorithm exports
pub mod distance;
pub mod export;
pub mod query;
pub mod schema;

pub use distance::{haversine_miles, EARTH_RADIUS_MILES};
pub use export::{export_file_name, ranked_rows, to_csv_string, write_csv, ResultRow, EXPORT_HEADERS};
pub use query::{find_nearby, MapPoint, NearbyEntry, QueryResult};
pub use schema::{normalize, resolve_columns, CanonicalField, ColumnMap, SchemaError, SchemaRules, SubColumn};
