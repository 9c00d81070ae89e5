/// Earth's radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3958.7613;

/// Calculate the great-circle (haversine) distance between two points in miles
///
/// Uses the `0.5 - cos(dlat)/2 + ...` form of the haversine term. Rounding can
/// push that term just outside `[0, 1]` for coincident or antipodal points, so
/// it is clamped before the square root.
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in miles
#[inline]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p = std::f64::consts::PI / 180.0;
    let dlat = (lat2 - lat1) * p;
    let dlon = (lon2 - lon1) * p;

    let a = 0.5 - dlat.cos() / 2.0
        + (lat1 * p).cos() * (lat2 * p).cos() * (1.0 - dlon.cos()) / 2.0;

    2.0 * EARTH_RADIUS_MILES * a.clamp(0.0, 1.0).sqrt().asin()
}
