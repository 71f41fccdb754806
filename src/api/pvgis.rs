//! JRC PVGIS typical-meteorological-year API.

use std::time::Duration;

use serde::Deserialize;
use ureq::Agent;

use crate::{error::ClimateError, prelude::*};

pub const DEFAULT_URL: &str = "https://re.jrc.ec.europa.eu/api/tmy";

/// What to do when the API answers with a non-success status.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum HttpErrorPolicy {
    /// Log a warning and parse the body anyway.
    #[default]
    LogAndParse,

    /// Fail with [`ClimateError::UnsuccessfulStatus`].
    Abort,
}

/// Raw HTTP answer: status code and the whole body.
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        200 <= self.status && self.status < 300
    }
}

/// Blocking HTTP GET.
pub trait Transport {
    fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<Reply, ClimateError>;
}

impl Transport for Agent {
    fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<Reply, ClimateError> {
        let transport_error = |source| ClimateError::Transport { url: url.to_owned(), source };
        let mut response = self
            .get(url)
            .query_pairs(query.iter().map(|(key, value)| (*key, value.as_str())))
            .call()
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().map_err(transport_error)?;
        Ok(Reply { status, body })
    }
}

/// Agent that hands non-success responses back instead of failing on them.
#[must_use]
pub fn new_agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(60)))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Which series to request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Period {
    TypicalYear,
    Year(i32),
}

impl From<Option<i32>> for Period {
    fn from(year: Option<i32>) -> Self {
        year.map_or(Self::TypicalYear, Self::Year)
    }
}

pub struct Api<T> {
    transport: T,
    url: String,
    on_http_error: HttpErrorPolicy,
}

impl Api<Agent> {
    pub fn new() -> Self {
        Self::with_transport(new_agent())
    }
}

impl Default for Api<Agent> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Api<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport, url: DEFAULT_URL.to_owned(), on_http_error: HttpErrorPolicy::default() }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub const fn with_http_error_policy(mut self, on_http_error: HttpErrorPolicy) -> Self {
        self.on_http_error = on_http_error;
        self
    }

    /// Fetches the hourly records for the location.
    #[instrument(skip_all, fields(longitude = longitude, latitude = latitude, period = ?period))]
    pub fn get_hourly(
        &self,
        longitude: f64,
        latitude: f64,
        period: Period,
    ) -> Result<Vec<HourlyRecord>, ClimateError> {
        let query = Self::build_query(longitude, latitude, period);
        info!("importing climate data…");
        let reply = self.transport.fetch(&self.url, &query)?;
        if reply.is_success() {
            info!("imported climate data");
        } else {
            match self.on_http_error {
                HttpErrorPolicy::LogAndParse => {
                    warn!(status = reply.status, "the API responded with an error, parsing anyway");
                }
                HttpErrorPolicy::Abort => {
                    return Err(ClimateError::UnsuccessfulStatus {
                        url: self.url.clone(),
                        status: reply.status,
                    });
                }
            }
        }
        let response: Response = serde_json::from_str(&reply.body)
            .map_err(|error| ClimateError::malformed(error.to_string()))?;
        debug!(n_records = response.outputs.hourly.len(), "parsed");
        Ok(response.outputs.hourly)
    }

    fn build_query(longitude: f64, latitude: f64, period: Period) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("lon", longitude.to_string()),
            ("lat", latitude.to_string()),
            ("outputformat", "json".to_owned()),
        ];
        match period {
            Period::TypicalYear => query.push(("usehorizon", "1".to_owned())),
            Period::Year(year) => query.push(("year", year.to_string())),
        }
        query
    }
}

#[derive(Deserialize)]
struct Response {
    outputs: Outputs,
}

#[derive(Deserialize)]
struct Outputs {
    #[serde(rename = "tmy_hourly")]
    hourly: Vec<HourlyRecord>,
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct HourlyRecord {
    #[serde(rename = "G(h)")]
    pub ghi: f64,

    #[serde(rename = "Gb(n)")]
    pub dni: f64,

    #[serde(rename = "Gd(h)")]
    pub dhi: f64,

    #[serde(rename = "RH")]
    pub rh: f64,

    #[serde(rename = "T2m")]
    pub temp_air: f64,

    #[serde(rename = "WS10m")]
    pub ws10: f64,
}
