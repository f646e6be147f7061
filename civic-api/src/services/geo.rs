//! Great-circle distance on the WGS84 mean-radius sphere.

use crate::models::Location;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(a: &Location, b: &Location) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    // Clamp guards against floating point drift pushing sqrt's argument past 1.
    let c = 2.0 * h.sqrt().clamp(0.0, 1.0).asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let p = Location::new(12.9716, 77.5946);
        assert_eq!(haversine_km(&p, &p), 0.0);
    }

    #[test]
    fn is_symmetric() {
        let a = Location::new(12.9716, 77.5946);
        let b = Location::new(13.0827, 80.2707);
        let ab = haversine_km(&a, &b);
        let ba = haversine_km(&b, &a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn bengaluru_to_chennai_is_about_290_km() {
        let bengaluru = Location::new(12.9716, 77.5946);
        let chennai = Location::new(13.0827, 80.2707);
        let d = haversine_km(&bengaluru, &chennai);
        assert!((d - 290.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn short_hop_within_city() {
        let a = Location::new(12.9716, 77.5946);
        let b = Location::new(12.9816, 77.5946);
        let d = haversine_km(&a, &b);
        // One hundredth of a degree of latitude is roughly 1.11 km.
        assert!((d - 1.11).abs() < 0.05, "got {d}");
    }

    #[test]
    fn antimeridian_crossing() {
        let a = Location::new(0.0, 179.5);
        let b = Location::new(0.0, -179.5);
        let d = haversine_km(&a, &b);
        assert!(d < 120.0, "got {d}");
    }
}
