//! Geographic math and smoothing primitives

pub mod geo_math;
pub mod smoothing;

pub use geo_math::{
    angular_difference, bearing_degrees, destination_point, distance_meters,
    heading_degrees, normalize_degrees_180, normalize_degrees_360,
};
pub use smoothing::{AngleSmoother, SmoothDamp};
