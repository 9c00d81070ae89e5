// Service exports
pub mod geocoder;
pub mod session;
pub mod source;

pub use geocoder::{GeocodeError, ReverseGeocoder};
pub use session::{Dataset, LoadError, Session};
pub use source::{SourceError, Workbook, PREFERRED_SHEET};
