mod import;
mod reanalysis;
mod topology;

use clap::{Parser, Subcommand};
use ureq::Agent;

use crate::{
    api::pvgis::{self, HttpErrorPolicy},
    cli::{import::ImportArgs, reanalysis::ReanalysisArgs, topology::TopologyArgs},
    importer::ClimateImporter,
    prelude::*,
    timezone::TimezoneLookup,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn run(self) -> Result {
        match self.command {
            Command::Import(args) => args.run(),
            Command::Topology(args) => args.run(),
            Command::Reanalysis(args) => args.run(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Import the typical or a historical year for a single location.
    #[clap(name = "import")]
    Import(Box<ImportArgs>),

    /// Import climate data for every node of a topology.
    #[clap(name = "topology")]
    Topology(Box<TopologyArgs>),

    /// Download the hourly ERA5 reanalysis of a year as GRIB.
    #[clap(name = "reanalysis")]
    Reanalysis(Box<ReanalysisArgs>),
}

#[derive(Copy, Clone, Parser)]
pub struct LocationArgs {
    /// Longitude in degrees, east is positive.
    #[clap(long, allow_hyphen_values = true)]
    pub longitude: f64,

    /// Latitude in degrees, north is positive.
    #[clap(long, allow_hyphen_values = true)]
    pub latitude: f64,
}

#[derive(Parser)]
pub struct PvgisArgs {
    #[clap(long = "pvgis-url", env = "PVGIS_URL", default_value = pvgis::DEFAULT_URL)]
    pub url: String,

    /// Fail on a non-success HTTP status instead of parsing the body anyway.
    #[clap(long)]
    pub abort_on_http_error: bool,
}

impl PvgisArgs {
    pub fn importer<L: TimezoneLookup>(&self, timezones: L) -> ClimateImporter<Agent, L> {
        let policy = if self.abort_on_http_error {
            HttpErrorPolicy::Abort
        } else {
            HttpErrorPolicy::LogAndParse
        };
        ClimateImporter::with(pvgis::Api::new().with_url(&self.url), timezones)
            .with_http_error_policy(policy)
    }
}
