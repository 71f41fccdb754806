//! Snapping coordinates onto the native spacing of gridded datasets.

use crate::{error::ClimateError, prelude::*};

/// Rounds `value` to the nearest multiple of `resolution`.
///
/// Halfway cases go to the even multiple.
pub fn round_to_grid(value: f64, resolution: f64) -> Result<f64, ClimateError> {
    if resolution == 0.0 || !resolution.is_finite() {
        return Err(ClimateError::InvalidResolution { resolution });
    }
    Ok((value / resolution).round_ties_even() * resolution)
}

/// Geographic bounding box in degrees.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Single grid cell whose north-west corner is the snapped `(longitude, latitude)`.
    pub fn single_cell(longitude: f64, latitude: f64, step: f64) -> Result<Self, ClimateError> {
        let north = round_to_grid(latitude, step)?;
        let west = round_to_grid(longitude, step)?;
        Ok(Self { north, west, south: north - step, east: west + step })
    }

    /// Order expected by the archive `area` keyword.
    #[must_use]
    pub const fn to_area(self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }
}
