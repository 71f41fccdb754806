use std::{
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
};

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::{
    api::cds,
    cli::LocationArgs,
    prelude::*,
    reanalysis::{DEFAULT_TARGET, import_reanalysis},
};

#[derive(Parser)]
pub struct ReanalysisArgs {
    #[clap(flatten)]
    pub location: LocationArgs,

    #[clap(long)]
    pub year: i32,

    /// GRIB file to write.
    #[clap(long, default_value = DEFAULT_TARGET)]
    pub target: PathBuf,

    #[clap(long = "cds-url", env = "CDSAPI_URL", default_value = cds::DEFAULT_URL)]
    pub cds_url: String,

    /// Climate Data Store personal access token.
    #[clap(long = "cds-key", env = "CDSAPI_KEY", hide_env_values = true)]
    pub cds_key: String,

    /// Upper bound of the job status polling interval.
    #[clap(long, env = "CDS_MAX_POLL_INTERVAL", default_value = "2min")]
    pub max_poll_interval: humantime::Duration,
}

impl ReanalysisArgs {
    pub fn run(self) -> Result {
        let should_terminate = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(SIGINT, Arc::clone(&should_terminate))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&should_terminate))?;

        let client = cds::Client::builder()
            .url(self.cds_url)
            .key(self.cds_key)
            .max_poll_interval(self.max_poll_interval.into())
            .cancellation(should_terminate)
            .build();
        info!("Ctrl-C cancels the job at the next status poll or download chunk");
        import_reanalysis(
            &client,
            self.location.longitude,
            self.location.latitude,
            self.year,
            &self.target,
        )?;
        Ok(())
    }
}
