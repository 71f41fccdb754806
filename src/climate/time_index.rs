use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{error::ClimateError, prelude::*};

/// Hourly time index localized to a timezone.
///
/// Entries are exactly one hour apart in absolute time.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeIndex {
    timezone: Tz,

    /// First entry.
    start: DateTime<Utc>,

    len: u32,
}

impl TimeIndex {
    /// Placeholder year of a typical meteorological year.
    pub const TYPICAL_YEAR: i32 = 2001;

    /// Number of hours in a typical meteorological year.
    pub const TYPICAL_YEAR_HOURS: u32 = 8760;

    /// 8760 hours starting at the local midnight of January 1st of the placeholder year.
    pub fn typical_year(timezone: Tz) -> Result<Self, ClimateError> {
        let start = localize(timezone, Self::TYPICAL_YEAR, 1, 1, 0)?;
        Ok(Self { timezone, start, len: Self::TYPICAL_YEAR_HOURS })
    }

    /// Every hour of the year, starting at local January 1st 00:00.
    ///
    /// The length always matches [`hours_in_year`], even when the timezone changes its offset.
    pub fn calendar_year(year: i32, timezone: Tz) -> Result<Self, ClimateError> {
        let start = localize(timezone, year, 1, 1, 0)?;
        Ok(Self { timezone, start, len: n_hours(Some(year)) })
    }

    pub fn for_year(year: Option<i32>, timezone: Tz) -> Result<Self, ClimateError> {
        match year {
            Some(year) => Self::calendar_year(year, timezone),
            None => Self::typical_year(timezone),
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    #[must_use]
    pub fn first(&self) -> Option<DateTime<Tz>> {
        self.get(0)
    }

    #[must_use]
    pub fn last(&self) -> Option<DateTime<Tz>> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<DateTime<Tz>> {
        let index = u32::try_from(index).ok().filter(|index| *index < self.len)?;
        Some(self.at(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = DateTime<Tz>> + '_ {
        (0..self.len).map(|index| self.at(index))
    }

    fn at(&self, index: u32) -> DateTime<Tz> {
        (self.start + TimeDelta::hours(i64::from(index))).with_timezone(&self.timezone)
    }
}

/// Hours of the year as the importer would index it.
#[must_use]
pub fn hours_in_year(year: Option<i32>) -> usize {
    n_hours(year) as usize
}

fn n_hours(year: Option<i32>) -> u32 {
    match year {
        Some(year) if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 8784,
        _ => TimeIndex::TYPICAL_YEAR_HOURS,
    }
}

fn localize(
    timezone: Tz,
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
) -> Result<DateTime<Utc>, ClimateError> {
    let naive: NaiveDateTime = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .ok_or_else(|| ClimateError::InvalidTimeIndex {
            reason: format!("{year}-{month:02}-{day:02} {hour:02}:00 is not a valid date"),
        })?;
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .map(|date_time| date_time.with_timezone(&Utc))
        .ok_or_else(|| ClimateError::InvalidTimeIndex {
            reason: format!("{naive} does not exist in {}", timezone.name()),
        })
}
