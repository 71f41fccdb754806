//! Typical-year and historical climate import for a single location.

use itertools::multiunzip;
use ureq::Agent;

use crate::{
    api::pvgis::{self, HourlyRecord, HttpErrorPolicy, Period, Transport},
    climate::{ClimateDataset, ClimateRecord, TimeIndex, WindSpeeds},
    error::ClimateError,
    prelude::*,
    timezone::{GeoTimezoneFinder, TimezoneLookup},
};

/// Imports climate data from the weather API and normalizes it into a [`ClimateDataset`].
pub struct ClimateImporter<T, L> {
    api: pvgis::Api<T>,
    timezones: L,
}

impl ClimateImporter<Agent, GeoTimezoneFinder> {
    pub fn new() -> Self {
        Self::with(pvgis::Api::new(), GeoTimezoneFinder::new())
    }
}

impl Default for ClimateImporter<Agent, GeoTimezoneFinder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport, L: TimezoneLookup> ClimateImporter<T, L> {
    pub const fn with(api: pvgis::Api<T>, timezones: L) -> Self {
        Self { api, timezones }
    }

    pub fn with_http_error_policy(self, on_http_error: HttpErrorPolicy) -> Self {
        Self { api: self.api.with_http_error_policy(on_http_error), ..self }
    }

    /// Imports the typical year when `year` is [`None`], or the given calendar year.
    #[instrument(skip_all, fields(longitude = longitude, latitude = latitude, year = ?year))]
    pub fn import_climate(
        &self,
        longitude: f64,
        latitude: f64,
        year: Option<i32>,
        altitude: f64,
    ) -> Result<ClimateDataset, ClimateError> {
        let timezone = self.timezones.timezone_at(longitude, latitude)?;
        let index = TimeIndex::for_year(year, timezone)?;
        debug!(timezone = timezone.name(), len = index.len(), "built the time index");

        let records = self.api.get_hourly(longitude, latitude, Period::from(year))?;
        if records.len() != index.len() {
            return Err(ClimateError::malformed(format!(
                "received {} hourly records for {} time steps",
                records.len(),
                index.len(),
            )));
        }

        let (ghi, dni, dhi, rh, temp_air, ws10): (Vec<_>, Vec<_>, Vec<_>, Vec<_>, Vec<_>, Vec<_>) =
            multiunzip(records.into_iter().map(|record: HourlyRecord| {
                (record.ghi, record.dni, record.dhi, record.rh, record.temp_air, record.ws10)
            }));
        let climate_record = ClimateRecord::try_new(index, [ghi, dni, dhi, rh, temp_air])?;
        ClimateDataset::try_new(
            longitude,
            latitude,
            altitude,
            climate_record,
            WindSpeeds::new(ws10),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use chrono_tz::Tz;

    use super::*;
    use crate::{
        api::pvgis::Reply,
        climate::Column,
        timezone::FixedTimezone,
    };

    struct Stub {
        status: u16,
        body: String,
    }

    impl Transport for Stub {
        fn fetch(&self, _url: &str, _query: &[(&str, String)]) -> Result<Reply, ClimateError> {
            Ok(Reply { status: self.status, body: self.body.clone() })
        }
    }

    struct Unresolvable;

    impl TimezoneLookup for Unresolvable {
        fn timezone_at(&self, longitude: f64, latitude: f64) -> Result<Tz, ClimateError> {
            Err(ClimateError::TimezoneResolution { longitude, latitude })
        }
    }

    fn body(n_records: usize) -> String {
        let mut records = String::new();
        for i in 0..n_records {
            if i != 0 {
                records.push(',');
            }
            write!(
                records,
                r#"{{"T2m": 10.5, "RH": 80.0, "G(h)": 100.0, "Gb(n)": 200.0, "Gd(h)": 50.0, "WS10m": {i}.0}}"#,
            )
            .unwrap();
        }
        format!(r#"{{"outputs": {{"tmy_hourly": [{records}]}}}}"#)
    }

    fn importer(status: u16, body: String, timezone: Tz) -> ClimateImporter<Stub, FixedTimezone> {
        ClimateImporter::with(
            pvgis::Api::with_transport(Stub { status, body }),
            FixedTimezone(timezone),
        )
    }

    #[test]
    #[expect(clippy::float_cmp)]
    fn import_typical_year_ok() -> Result {
        let dataset =
            importer(200, body(8760), Tz::Europe__Amsterdam).import_climate(5.16, 52.0, None, 0.0)?;
        assert_eq!(dataset.longitude, 5.16);
        assert_eq!(dataset.latitude, 52.0);
        assert_eq!(dataset.altitude, 0.0);
        assert_eq!(dataset.len(), 8760);
        assert_eq!(dataset.index().len(), 8760);
        assert_eq!(
            dataset.index().first().unwrap().naive_local().to_string(),
            "2001-01-01 00:00:00"
        );
        for column in Column::ALL {
            assert_eq!(dataset.climate_record.column(column).len(), 8760);
        }
        let (_, row) = dataset.climate_record.rows().next().unwrap();
        assert_eq!(row, [100.0, 200.0, 50.0, 80.0, 10.5]);
        let ws10 = dataset.wind_speed_by_height.get("ws10").unwrap();
        assert_eq!(ws10.len(), 8760);
        assert_eq!(ws10[42], 42.0);
        Ok(())
    }

    #[test]
    fn import_leap_year_ok() -> Result {
        let dataset = importer(200, body(8784), Tz::UTC).import_climate(5.16, 52.0, Some(2020), 10.0)?;
        assert_eq!(dataset.len(), 8784);
        assert_eq!(dataset.index().last().unwrap().naive_local().to_string(), "2020-12-31 23:00:00");
        assert_eq!(dataset.wind_speed_by_height.nominal().len(), 8784);
        Ok(())
    }

    #[test]
    fn import_year_with_offset_change_ok() -> Result {
        let dataset = importer(200, body(8760), Tz::Europe__Moscow)
            .import_climate(37.62, 55.75, Some(2014), 150.0)?;
        assert_eq!(dataset.len(), 8760);
        Ok(())
    }

    #[test]
    fn record_count_mismatch_is_malformed() {
        let error =
            importer(200, body(8760), Tz::UTC).import_climate(5.16, 52.0, Some(2020), 0.0).unwrap_err();
        assert!(matches!(error, ClimateError::MalformedResponse { .. }), "{error}");
    }

    #[test]
    fn error_status_with_empty_body_is_malformed() {
        let error =
            importer(500, String::new(), Tz::UTC).import_climate(5.16, 52.0, None, 0.0).unwrap_err();
        assert!(matches!(error, ClimateError::MalformedResponse { .. }), "{error}");
    }

    #[test]
    fn unresolved_timezone_propagates() {
        let importer = ClimateImporter::with(
            pvgis::Api::with_transport(Stub { status: 200, body: body(8760) }),
            Unresolvable,
        );
        let error = importer.import_climate(0.0, 0.0, None, 0.0).unwrap_err();
        assert!(matches!(error, ClimateError::TimezoneResolution { .. }));
    }

    #[test]
    #[ignore = "makes the API request"]
    fn import_typical_year_online() -> Result {
        let dataset = ClimateImporter::new().import_climate(5.16, 52.0, None, 0.0)?;
        assert_eq!(dataset.len(), 8760);
        assert_eq!(dataset.index().timezone(), Tz::Europe__Amsterdam);
        Ok(())
    }
}
