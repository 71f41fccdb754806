//! Canonical climate data: an hourly table of irradiance, humidity and temperature
//! plus wind speeds, tied to a location.

mod record;
mod time_index;
mod wind;

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

pub use self::{
    record::{ClimateRecord, Column},
    time_index::{TimeIndex, hours_in_year},
    wind::WindSpeeds,
};
use crate::{error::ClimateError, prelude::*};

/// Climate time series of a single location.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimateDataset {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
    pub climate_record: ClimateRecord,
    pub wind_speed_by_height: WindSpeeds,
}

impl ClimateDataset {
    pub fn try_new(
        longitude: f64,
        latitude: f64,
        altitude: f64,
        climate_record: ClimateRecord,
        wind_speed_by_height: WindSpeeds,
    ) -> Result<Self, ClimateError> {
        let dataset =
            Self { longitude, latitude, altitude, climate_record, wind_speed_by_height };
        dataset.validate()?;
        Ok(dataset)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.climate_record.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.climate_record.is_empty()
    }

    pub const fn index(&self) -> &TimeIndex {
        self.climate_record.index()
    }

    /// Checks that the wind speeds line up with the climate table.
    pub fn validate(&self) -> Result<(), ClimateError> {
        let n_wind_speeds = self.wind_speed_by_height.nominal().len();
        if n_wind_speeds == self.len() {
            Ok(())
        } else {
            Err(ClimateError::malformed(format!(
                "{n_wind_speeds} wind speeds for {} climate rows",
                self.len(),
            )))
        }
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result {
        let json = serde_json::to_string(self)?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("failed to write `{}`", path.as_ref().display()))?;
        info!(len = self.len(), "saved");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read `{}`", path.as_ref().display()))?;
        let dataset: Self = serde_json::from_str(&json)
            .with_context(|| format!("`{}` is not a valid climate dataset", path.as_ref().display()))?;
        dataset.validate()?;
        info!(len = dataset.len(), "loaded");
        Ok(dataset)
    }
}
