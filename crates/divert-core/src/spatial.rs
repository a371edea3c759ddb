//! Spatial math for great-circle distances and track projection.

/// Mean Earth radius used by every distance calculation in the crate.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters in one international nautical mile.
pub const METERS_PER_NM: f64 = 1_852.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Great-circle distance in nautical miles.
pub fn haversine_distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_distance(lat1, lon1, lat2, lon2) / METERS_PER_NM
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Offset a position by nautical miles along a bearing given in degrees.
pub fn offset_by_bearing_nm(lat: f64, lon: f64, distance_nm: f64, bearing_deg: f64) -> (f64, f64) {
    offset_by_bearing(lat, lon, distance_nm * METERS_PER_NM, bearing_deg.to_radians())
}

/// True when the pair is a usable WGS84 coordinate.
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}
