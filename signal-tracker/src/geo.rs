//! Great-circle distance

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two lat/lng pairs given in degrees
///
/// `a` is clamped to [0, 1] so rounding near antipodal points never feeds a
/// negative value into the square roots.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_coincident_points() {
        assert_eq!(haversine_m(12.9716, 77.5946, 12.9716, 77.5946), 0.0);
        assert_eq!(haversine_m(-90.0, 0.0, -90.0, 0.0), 0.0);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            (12.9716, 77.5946, 12.9800, 77.6050),
            (51.5074, -0.1278, 40.7128, -74.0060),
            (-33.8688, 151.2093, 35.6762, 139.6503),
        ];
        for (lat1, lon1, lat2, lon2) in pairs {
            let ab = haversine_m(lat1, lon1, lat2, lon2);
            let ba = haversine_m(lat2, lon2, lat1, lon1);
            assert!((ab - ba).abs() < 1e-6, "{} vs {}", ab, ba);
        }
    }

    #[test]
    fn test_meridian_distance() {
        let dlat = (200.0 / EARTH_RADIUS_M).to_degrees();
        let d = haversine_m(12.9716, 77.5946, 12.9716 + dlat, 77.5946);
        assert!((d - 200.0).abs() < 1e-3, "got {}", d);
    }

    #[test]
    fn test_antipodal_points() {
        let d = haversine_m(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - PI * EARTH_RADIUS_M).abs() < 1e-3);

        let d = haversine_m(90.0, 0.0, -90.0, 0.0);
        assert!((d - PI * EARTH_RADIUS_M).abs() < 1e-3);
    }

    #[test]
    fn test_known_city_distance() {
        // London to Paris is roughly 344 km
        let d = haversine_m(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 343_500.0).abs() < 2_000.0, "got {}", d);
    }
}
