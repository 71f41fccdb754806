//! Technologies installed at the nodes and their climate-driven performance.

use serde::Deserialize;

use crate::{
    climate::{ClimateDataset, Column, WindSpeeds},
    prelude::*,
};

/// Air temperature at which a heat storage loses nothing, °C.
const STORAGE_REFERENCE_TEMPERATURE: f64 = 65.0;

/// Temperature span the storage `theta` is normalized to, °C.
const STORAGE_TEMPERATURE_SPAN: f64 = 90.0 - STORAGE_REFERENCE_TEMPERATURE;

/// Spacing of the power curve points, m/s.
const POWER_CURVE_STEP: f64 = 0.5;

#[must_use]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Technology {
    /// Storage with temperature-dependent standing losses.
    Storage {
        /// Loss coefficient at the full temperature span.
        theta: f64,
    },

    WindTurbine {
        #[serde(rename = "rated_power_kw")]
        rated_power: f64,

        /// Height the nominal wind speed is extrapolated to, m; `0` keeps 10 m.
        #[serde(default = "default_hub_height")]
        hub_height: f64,

        /// Output in kilowatts at 0, 0.5, 1.0, … m/s.
        #[serde(rename = "power_curve_kw")]
        power_curve: Vec<f64>,
    },
}

const fn default_hub_height() -> f64 {
    120.0
}

impl Technology {
    pub fn validate(&self) -> Result {
        match self {
            Self::Storage { theta } => {
                ensure!(theta.is_finite(), "storage `theta` must be finite");
            }
            Self::WindTurbine { rated_power, hub_height, power_curve } => {
                ensure!(*rated_power > 0.0, "wind turbine rated power must be positive");
                ensure!(*hub_height >= 0.0, "wind turbine hub height must not be negative");
                ensure!(power_curve.len() >= 2, "wind turbine power curve needs at least two points");
            }
        }
        Ok(())
    }

    /// Derives the hourly performance from the node's climate.
    pub fn fit(&self, climate: &ClimateDataset) -> TechnologyFit {
        match self {
            Self::Storage { theta } => TechnologyFit::Storage {
                ambient_loss_factor: climate
                    .climate_record
                    .column(Column::TempAir)
                    .iter()
                    .map(|temperature| {
                        (STORAGE_REFERENCE_TEMPERATURE - temperature) / STORAGE_TEMPERATURE_SPAN
                            * theta
                    })
                    .collect(),
            },
            Self::WindTurbine { rated_power, hub_height, power_curve } => {
                let speeds = if *hub_height > 0.0 {
                    climate
                        .wind_speed_by_height
                        .extrapolate(*hub_height, WindSpeeds::DEFAULT_SHEAR_EXPONENT)
                } else {
                    climate.wind_speed_by_height.nominal().to_vec()
                };
                TechnologyFit::WindTurbine {
                    capacity_factor: speeds
                        .into_iter()
                        .map(|speed| interpolate_power(power_curve, speed) / rated_power)
                        .collect(),
                    rated_power_mw: rated_power / 1000.0,
                }
            }
        }
    }
}

/// Performance parameters fitted to a node's climate, one value per time step.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub enum TechnologyFit {
    Storage { ambient_loss_factor: Vec<f64> },
    WindTurbine { capacity_factor: Vec<f64>, rated_power_mw: f64 },
}

impl TechnologyFit {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Storage { ambient_loss_factor } => ambient_loss_factor.len(),
            Self::WindTurbine { capacity_factor, .. } => capacity_factor.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Linear interpolation on the power curve, speeds past its end take the last point.
fn interpolate_power(power_curve: &[f64], speed: f64) -> f64 {
    let position = speed.max(0.0) / POWER_CURVE_STEP;
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lower = position.floor() as usize;
    match (power_curve.get(lower), power_curve.get(lower + 1)) {
        (Some(lower_power), Some(upper_power)) => {
            #[expect(clippy::cast_precision_loss)]
            let fraction = position - lower as f64;
            lower_power + (upper_power - lower_power) * fraction
        }
        _ => power_curve.last().copied().unwrap_or_default(),
    }
}
