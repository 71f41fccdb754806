//! ERA5 bulk download for the grid cell around a location.

use std::path::Path;

use serde::Serialize;

use crate::{error::ClimateError, grid::BoundingBox, prelude::*};

/// Native spacing of the ERA5 single-levels grid, degrees.
pub const GRID_RESOLUTION: f64 = 0.25;

pub const DATASET: &str = "reanalysis-era5-single-levels";

/// Where the GRIB file lands unless told otherwise.
pub const DEFAULT_TARGET: &str = "download.grib";

pub const VARIABLES: [&str; 10] = [
    "100m_u_component_of_wind",
    "100m_v_component_of_wind",
    "forecast_surface_roughness",
    "surface_pressure",
    "total_sky_direct_solar_radiation_at_surface",
    "surface_solar_radiation_downwards",
    "2m_temperature",
    "2m_dewpoint_temperature",
    "10m_u_component_of_wind",
    "10m_v_component_of_wind",
];

/// Archive that fulfils retrieval requests by writing a file.
pub trait ArchiveService {
    /// Blocks until `target` has been written.
    fn retrieve(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
        target: &Path,
    ) -> Result<(), ClimateError>;
}

/// Retrieval request keywords.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievalRequest {
    pub product_type: Vec<String>,
    pub data_format: String,
    pub variable: Vec<String>,
    pub year: Vec<String>,
    pub month: Vec<String>,
    pub day: Vec<String>,
    pub time: Vec<String>,

    /// North, west, south, east.
    pub area: [f64; 4],
}

impl RetrievalRequest {
    /// Every hour of `year` for [`VARIABLES`] within `bbox`, in GRIB.
    pub fn hourly_year(year: i32, bbox: BoundingBox) -> Self {
        Self {
            product_type: vec!["reanalysis".to_owned()],
            data_format: "grib".to_owned(),
            variable: VARIABLES.iter().map(ToString::to_string).collect(),
            year: vec![year.to_string()],
            month: (1..=12).map(|month| format!("{month:02}")).collect(),
            day: (1..=31).map(|day| format!("{day:02}")).collect(),
            time: (0..24).map(|hour| format!("{hour:02}:00")).collect(),
            area: bbox.to_area(),
        }
    }
}

/// Downloads a year of ERA5 data for the grid cell that contains the location.
#[instrument(skip_all, fields(longitude = longitude, latitude = latitude, year = year))]
pub fn import_reanalysis(
    archive: &impl ArchiveService,
    longitude: f64,
    latitude: f64,
    year: i32,
    target: &Path,
) -> Result<(), ClimateError> {
    let bbox = BoundingBox::single_cell(longitude, latitude, GRID_RESOLUTION)?;
    info!(?bbox, target = %target.display(), "retrieving…");
    archive.retrieve(DATASET, &RetrievalRequest::hourly_year(year, bbox), target)?;
    info!("retrieved");
    Ok(())
}
