use thiserror::Error;

/// Rejection reasons for sensor input that violates a data-model invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Non-finite coordinate: lat={latitude}, lon={longitude}")]
    NonFiniteCoordinate { latitude: f64, longitude: f64 },

    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Invalid horizontal accuracy: {0} m")]
    InvalidAccuracy(f32),

    #[error("Non-finite heading value from {source_name}")]
    NonFiniteHeading { source_name: &'static str },
}

impl InputError {
    /// Stable short name used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            InputError::NonFiniteCoordinate { .. } => "non_finite_coordinate",
            InputError::LatitudeOutOfRange(_) => "latitude_out_of_range",
            InputError::LongitudeOutOfRange(_) => "longitude_out_of_range",
            InputError::InvalidAccuracy(_) => "invalid_accuracy",
            InputError::NonFiniteHeading { .. } => "non_finite_heading",
        }
    }
}
