use std::path::PathBuf;

use chrono_tz::Tz;
use clap::Parser;

use crate::{
    cli::{LocationArgs, PvgisArgs},
    climate::{ClimateDataset, WindSpeeds},
    prelude::*,
    tables::build_climate_table,
    timezone::{FixedTimezone, GeoTimezoneFinder, TimezoneLookup},
};

#[derive(Parser)]
pub struct ImportArgs {
    #[clap(flatten)]
    pub location: LocationArgs,

    /// Altitude in metres.
    #[clap(long, default_value = "0", allow_hyphen_values = true)]
    pub altitude: f64,

    /// Calendar year to import, the typical year when omitted.
    #[clap(long)]
    pub year: Option<i32>,

    /// IANA timezone overriding the one found at the location.
    #[clap(long)]
    pub timezone: Option<Tz>,

    /// Also store the wind speed extrapolated to this hub height, metres.
    #[clap(long)]
    pub hub_height: Option<u32>,

    /// Save the dataset as JSON.
    #[clap(long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub pvgis: PvgisArgs,
}

impl ImportArgs {
    pub fn run(self) -> Result {
        let mut dataset = match self.timezone {
            Some(timezone) => self.import(FixedTimezone(timezone))?,
            None => self.import(GeoTimezoneFinder::new())?,
        };
        if let Some(hub_height) = self.hub_height {
            let speeds = dataset
                .wind_speed_by_height
                .extrapolate(f64::from(hub_height), WindSpeeds::DEFAULT_SHEAR_EXPONENT);
            dataset.wind_speed_by_height.insert(hub_height, speeds)?;
            info!(hub_height, "extrapolated the wind speed");
        }
        println!("{}", build_climate_table([("-", &dataset)]));
        if let Some(output) = &self.output {
            dataset.save(output)?;
        }
        Ok(())
    }

    fn import(&self, timezones: impl TimezoneLookup) -> Result<ClimateDataset> {
        let dataset = self.pvgis.importer(timezones).import_climate(
            self.location.longitude,
            self.location.latitude,
            self.year,
            self.altitude,
        )?;
        Ok(dataset)
    }
}
