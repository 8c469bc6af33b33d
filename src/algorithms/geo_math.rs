//! Great-circle math on a spherical Earth
//!
//! The game operates at ranges well under a kilometre, where the spherical
//! model stays far inside GPS error. All functions are pure:
//! - Haversine distance
//! - Initial (forward azimuth) bearing
//! - Destination point from origin, bearing and distance
//! - Angle normalization helpers

use crate::core::{GeoPoint, EARTH_RADIUS_M};

/// Great-circle distance in meters (haversine)
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Initial bearing from `from` to `to`, degrees in [0, 360), 0 = north
///
/// Identical points have no defined bearing; 0 is returned.
pub fn bearing_degrees(from: &GeoPoint, to: &GeoPoint) -> f32 {
    if from.latitude == to.latitude && from.longitude == to.longitude {
        return 0.0;
    }

    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    heading_degrees(y.atan2(x).to_degrees())
}

/// Point reached by travelling `distance_m` along `bearing_deg` from `origin`
pub fn destination_point(origin: &GeoPoint, bearing_deg: f32, distance_m: f64) -> GeoPoint {
    let angular = distance_m / EARTH_RADIUS_M;
    let theta = (bearing_deg as f64).to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(lat2.to_degrees(), normalize_degrees_180(lon2.to_degrees()))
}

/// Wrap an angle into [0, 360)
pub fn normalize_degrees_360(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap into [0, 360) and narrow to `f32`
///
/// Values a hair below 360 round up to 360.0 when narrowed, so the
/// result is wrapped again after the cast.
pub fn heading_degrees(degrees: f64) -> f32 {
    let narrowed = normalize_degrees_360(degrees) as f32;
    if narrowed >= 360.0 {
        0.0
    } else {
        narrowed
    }
}

/// Wrap an angle into (-180, 180]
pub fn normalize_degrees_180(degrees: f64) -> f64 {
    let wrapped = normalize_degrees_360(degrees);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, degrees in (-180, 180]
pub fn angular_difference(from: f32, to: f32) -> f32 {
    let narrowed = normalize_degrees_180((to - from) as f64) as f32;
    if narrowed <= -180.0 {
        180.0
    } else {
        narrowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meters_to_lat_degrees(m: f64) -> f64 {
        (m / EARTH_RADIUS_M).to_degrees()
    }

    #[test]
    fn test_distance_along_meridian() {
        let a = GeoPoint::new(37.0, -122.0);
        let b = GeoPoint::new(37.0 + meters_to_lat_degrees(1000.0), -122.0);
        let d = distance_meters(&a, &b);
        assert!((d - 1000.0).abs() < 10.0, "distance {}", d);
    }

    #[test]
    fn test_distance_reference_pair() {
        // Big Ben to the Statue of Liberty
        let london = GeoPoint::new(51.5007, -0.1246);
        let new_york = GeoPoint::new(40.6892, -74.0445);
        let d = distance_meters(&london, &new_york);
        assert!((d - 5_574_840.0).abs() / 5_574_840.0 < 0.005, "distance {}", d);
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = GeoPoint::new(48.8584, 2.2945);
        assert_eq!(distance_meters(&p, &p), 0.0);
    }

    #[test]
    fn test_cardinal_bearings() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!((bearing_degrees(&origin, &GeoPoint::new(0.001, 0.0)) - 0.0).abs() < 1e-3);
        assert!((bearing_degrees(&origin, &GeoPoint::new(0.0, 0.001)) - 90.0).abs() < 1e-3);
        assert!((bearing_degrees(&origin, &GeoPoint::new(-0.001, 0.0)) - 180.0).abs() < 1e-3);
        assert!((bearing_degrees(&origin, &GeoPoint::new(0.0, -0.001)) - 270.0).abs() < 1e-3);
    }

    #[test]
    fn test_bearing_same_point_is_zero() {
        let p = GeoPoint::new(10.0, 20.0);
        assert_eq!(bearing_degrees(&p, &p), 0.0);
    }

    #[test]
    fn test_destination_point_round_trip() {
        let origin = GeoPoint::new(52.52, 13.405);
        for &(bearing, distance) in &[(0.0f32, 1.0f64), (45.0, 12.5), (137.0, 250.0), (300.0, 900.0)] {
            let dest = destination_point(&origin, bearing, distance);
            let d = distance_meters(&origin, &dest);
            let b = bearing_degrees(&origin, &dest);
            assert!((d - distance).abs() / distance < 1e-3, "distance {} vs {}", d, distance);
            assert!(angular_difference(b, bearing).abs() < 0.01, "bearing {} vs {}", b, bearing);
        }
    }

    #[test]
    fn test_destination_wraps_antimeridian() {
        let origin = GeoPoint::new(0.0, 179.9999);
        let dest = destination_point(&origin, 90.0, 100.0);
        assert!(dest.longitude < -179.0);
        assert!(dest.is_valid());
    }

    #[test]
    fn test_angle_normalization() {
        assert_eq!(normalize_degrees_360(-90.0), 270.0);
        assert_eq!(normalize_degrees_360(720.0), 0.0);
        assert_eq!(normalize_degrees_180(180.0), 180.0);
        assert_eq!(normalize_degrees_180(-180.0), 180.0);
        assert_eq!(normalize_degrees_180(190.0), -170.0);
        assert_eq!(angular_difference(350.0, 10.0), 20.0);
        assert_eq!(angular_difference(10.0, 350.0), -20.0);
    }

    #[test]
    fn test_bearing_just_west_of_north_stays_below_360() {
        let origin = GeoPoint::new(0.0, 0.0);
        let b = bearing_degrees(&origin, &GeoPoint::new(1.0, -1e-12));
        assert!((0.0..360.0).contains(&b), "bearing {}", b);

        assert_eq!(heading_degrees(360.0 - 1e-10), 0.0);
        assert_eq!(heading_degrees(-1e-10), 0.0);
        assert!((0.0..360.0).contains(&heading_degrees(359.9)));
    }
}
