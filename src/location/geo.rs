use super::types::LocationData;

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Great-circle distance between two fixes
pub fn distance_meters(a: &LocationData, b: &LocationData) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// "lat, lon" with a fixed number of decimals
pub fn format_coordinates(location: &LocationData, precision: usize) -> String {
    format!(
        "{:.prec$}, {:.prec$}",
        location.latitude,
        location.longitude,
        prec = precision
    )
}
