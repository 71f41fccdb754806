use std::path::PathBuf;

/// Failures of the climate importers.
///
/// Every variant propagates to the immediate caller, nothing is retried.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ClimateError {
    #[display("no timezone found at longitude {longitude}, latitude {latitude}")]
    TimezoneResolution { longitude: f64, latitude: f64 },

    #[display("cannot build the time index: {reason}")]
    InvalidTimeIndex { reason: String },

    #[display("grid resolution must be finite and non-zero, got {resolution}")]
    InvalidResolution { resolution: f64 },

    #[display("failed to call `{url}`")]
    Transport { url: String, source: ureq::Error },

    #[display("`{url}` responded with HTTP {status}")]
    UnsuccessfulStatus { url: String, status: u16 },

    #[display("malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[display("archive retrieval failed: {reason}")]
    ArchiveRetrieval { reason: String },

    #[display("I/O error on `{}`", path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

impl ClimateError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse { reason: reason.into() }
    }

    pub fn archive(reason: impl Into<String>) -> Self {
        Self::ArchiveRetrieval { reason: reason.into() }
    }
}
