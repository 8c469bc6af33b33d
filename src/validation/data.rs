//! Invariant checks for externally supplied sensor data
//!
//! Invalid input is never applied. Callers log the rejection and keep
//! their last-good state.

use crate::core::{GeoPoint, LocationFix};
use crate::validation::error::InputError;

/// Check that a coordinate is finite and inside the WGS84 ranges
pub fn validate_point(point: &GeoPoint) -> Result<(), InputError> {
    if !point.latitude.is_finite() || !point.longitude.is_finite() {
        return Err(InputError::NonFiniteCoordinate {
            latitude: point.latitude,
            longitude: point.longitude,
        });
    }
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(InputError::LatitudeOutOfRange(point.latitude));
    }
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(InputError::LongitudeOutOfRange(point.longitude));
    }
    Ok(())
}

/// Check a complete GPS fix
pub fn validate_fix(fix: &LocationFix) -> Result<(), InputError> {
    validate_point(&fix.coordinate)?;
    if !fix.horizontal_accuracy_m.is_finite() || fix.horizontal_accuracy_m < 0.0 {
        return Err(InputError::InvalidAccuracy(fix.horizontal_accuracy_m));
    }
    Ok(())
}

/// Filter a raw heading value, mapping NaN/inf to an error
pub fn validate_heading(degrees: f32, source_name: &'static str) -> Result<f32, InputError> {
    if degrees.is_finite() {
        Ok(degrees)
    } else {
        Err(InputError::NonFiniteHeading { source_name })
    }
}
