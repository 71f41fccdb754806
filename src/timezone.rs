//! Geographic timezone resolution.

use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::{error::ClimateError, prelude::*};

/// Maps a location onto its IANA timezone.
pub trait TimezoneLookup {
    fn timezone_at(&self, longitude: f64, latitude: f64) -> Result<Tz, ClimateError>;
}

/// Polygon-based lookup backed by the bundled timezone boundary database.
pub struct GeoTimezoneFinder(DefaultFinder);

impl GeoTimezoneFinder {
    #[must_use]
    pub fn new() -> Self {
        Self(DefaultFinder::new())
    }
}

impl Default for GeoTimezoneFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneLookup for GeoTimezoneFinder {
    #[instrument(skip_all, level = Level::DEBUG, fields(longitude = longitude, latitude = latitude))]
    fn timezone_at(&self, longitude: f64, latitude: f64) -> Result<Tz, ClimateError> {
        let name = self.0.get_tz_name(longitude, latitude);
        debug!(name, "resolved");
        name.parse::<Tz>().map_err(|_| ClimateError::TimezoneResolution { longitude, latitude })
    }
}

/// Always answers with the same timezone, regardless of the location.
#[derive(Copy, Clone)]
pub struct FixedTimezone(pub Tz);

impl TimezoneLookup for FixedTimezone {
    fn timezone_at(&self, _longitude: f64, _latitude: f64) -> Result<Tz, ClimateError> {
        Ok(self.0)
    }
}
