use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{error::ClimateError, prelude::*};

/// Wind speed series keyed by `ws<height in metres>`.
///
/// The nominal `ws10` series is always present.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, derive_more::Deref)]
#[serde(try_from = "BTreeMap<String, Vec<f64>>", into = "BTreeMap<String, Vec<f64>>")]
pub struct WindSpeeds(BTreeMap<String, Vec<f64>>);

impl WindSpeeds {
    /// Height of the series every dataset carries, m.
    pub const NOMINAL_HEIGHT: u32 = 10;

    /// Hellmann exponent for open terrain.
    pub const DEFAULT_SHEAR_EXPONENT: f64 = 1.0 / 7.0;

    pub fn new(nominal: Vec<f64>) -> Self {
        Self(BTreeMap::from([(Self::key(Self::NOMINAL_HEIGHT), nominal)]))
    }

    #[must_use]
    pub fn key(height: u32) -> String {
        format!("ws{height}")
    }

    /// Adds or replaces the series measured at `height` metres.
    pub fn insert(&mut self, height: u32, series: Vec<f64>) -> Result<(), ClimateError> {
        let expected = self.nominal().len();
        if series.len() != expected {
            return Err(ClimateError::malformed(format!(
                "wind speed at {height} m has {} values, expected {expected}",
                series.len(),
            )));
        }
        self.0.insert(Self::key(height), series);
        Ok(())
    }

    #[must_use]
    pub fn at(&self, height: u32) -> Option<&[f64]> {
        self.0.get(&Self::key(height)).map(Vec::as_slice)
    }

    #[must_use]
    pub fn nominal(&self) -> &[f64] {
        self.at(Self::NOMINAL_HEIGHT).unwrap_or_default()
    }

    /// Scales the nominal series to `hub_height` with the power law `(h / 10) ^ alpha`.
    #[must_use]
    pub fn extrapolate(&self, hub_height: f64, alpha: f64) -> Vec<f64> {
        let factor = (hub_height / f64::from(Self::NOMINAL_HEIGHT)).powf(alpha);
        self.nominal().iter().map(|speed| speed * factor).collect()
    }
}

impl TryFrom<BTreeMap<String, Vec<f64>>> for WindSpeeds {
    type Error = ClimateError;

    fn try_from(series: BTreeMap<String, Vec<f64>>) -> Result<Self, Self::Error> {
        let nominal_key = Self::key(Self::NOMINAL_HEIGHT);
        let Some(nominal) = series.get(&nominal_key) else {
            return Err(ClimateError::malformed(format!("`{nominal_key}` is missing")));
        };
        if let Some((key, _)) = series.iter().find(|(_, values)| values.len() != nominal.len()) {
            return Err(ClimateError::malformed(format!(
                "`{key}` length differs from `{nominal_key}`"
            )));
        }
        Ok(Self(series))
    }
}

impl From<WindSpeeds> for BTreeMap<String, Vec<f64>> {
    fn from(speeds: WindSpeeds) -> Self {
        speeds.0
    }
}
