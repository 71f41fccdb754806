use average::Mean;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{climate::TimeIndex, error::ClimateError, prelude::*};

/// Columns of a climate record, in their fixed order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum Column {
    /// Global horizontal irradiance, W/m².
    #[display("ghi")]
    Ghi,

    /// Direct normal irradiance, W/m².
    #[display("dni")]
    Dni,

    /// Diffuse horizontal irradiance, W/m².
    #[display("dhi")]
    Dhi,

    /// Relative humidity, %.
    #[display("rh")]
    Rh,

    /// Air temperature at 2 m, °C.
    #[display("temp_air")]
    TempAir,
}

impl Column {
    pub const ALL: [Self; 5] = [Self::Ghi, Self::Dni, Self::Dhi, Self::Rh, Self::TempAir];
}

/// Hourly climate table keyed by a [`TimeIndex`].
///
/// Every column holds exactly one value per index entry.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedClimateRecord")]
pub struct ClimateRecord {
    index: TimeIndex,
    ghi: Vec<f64>,
    dni: Vec<f64>,
    dhi: Vec<f64>,
    rh: Vec<f64>,
    temp_air: Vec<f64>,
}

impl ClimateRecord {
    /// Assembles the table from columns given in [`Column::ALL`] order.
    pub fn try_new(index: TimeIndex, columns: [Vec<f64>; 5]) -> Result<Self, ClimateError> {
        for (column, values) in Column::ALL.iter().zip(&columns) {
            if values.len() != index.len() {
                return Err(ClimateError::malformed(format!(
                    "column `{column}` has {} rows while the time index has {}",
                    values.len(),
                    index.len(),
                )));
            }
        }
        let [ghi, dni, dhi, rh, temp_air] = columns;
        Ok(Self { index, ghi, dni, dhi, rh, temp_air })
    }

    pub const fn index(&self) -> &TimeIndex {
        &self.index
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn column(&self, column: Column) -> &[f64] {
        match column {
            Column::Ghi => &self.ghi,
            Column::Dni => &self.dni,
            Column::Dhi => &self.dhi,
            Column::Rh => &self.rh,
            Column::TempAir => &self.temp_air,
        }
    }

    /// Rows with the values in [`Column::ALL`] order.
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Tz>, [f64; 5])> + '_ {
        self.index.iter().enumerate().map(|(row, time)| {
            (time, Column::ALL.map(|column| self.column(column)[row]))
        })
    }

    #[must_use]
    pub fn mean(&self, column: Column) -> Option<f64> {
        let estimate: Mean = self.column(column).iter().copied().collect();
        if estimate.is_empty() { None } else { Some(estimate.mean()) }
    }
}

#[derive(Deserialize)]
struct UncheckedClimateRecord {
    index: TimeIndex,
    ghi: Vec<f64>,
    dni: Vec<f64>,
    dhi: Vec<f64>,
    rh: Vec<f64>,
    temp_air: Vec<f64>,
}

impl TryFrom<UncheckedClimateRecord> for ClimateRecord {
    type Error = ClimateError;

    fn try_from(record: UncheckedClimateRecord) -> Result<Self, Self::Error> {
        Self::try_new(
            record.index,
            [record.ghi, record.dni, record.dhi, record.rh, record.temp_air],
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn index() -> Result<TimeIndex, ClimateError> {
        TimeIndex::typical_year(Tz::UTC)
    }

    #[test]
    fn column_order_ok() {
        let names = Column::ALL.map(|column| column.to_string());
        assert_eq!(names, ["ghi", "dni", "dhi", "rh", "temp_air"]);
    }

    #[test]
    fn try_new_ok() -> Result {
        let columns = [0.0, 1.0, 2.0, 3.0, 4.0].map(|value| vec![value; 8760]);
        let record = ClimateRecord::try_new(index()?, columns)?;
        assert_eq!(record.len(), 8760);
        let (time, row) = record.rows().nth(1).unwrap();
        assert_eq!(time.naive_local().to_string(), "2001-01-01 01:00:00");
        assert_eq!(row, [0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_abs_diff_eq!(record.mean(Column::TempAir).unwrap(), 4.0);
        Ok(())
    }

    #[test]
    fn try_new_length_mismatch() -> Result {
        let mut columns = [0.0; 5].map(|value| vec![value; 8760]);
        columns[3].pop();
        let error = ClimateRecord::try_new(index()?, columns).unwrap_err();
        assert!(matches!(error, ClimateError::MalformedResponse { .. }));
        assert!(error.to_string().contains("`rh`"));
        Ok(())
    }

    #[test]
    fn deserialize_checks_lengths() -> Result {
        let record = ClimateRecord::try_new(index()?, [0.0; 5].map(|value| vec![value; 8760]))?;
        let mut json = serde_json::to_value(&record)?;
        json["ghi"] = serde_json::json!([1.0, 2.0]);
        assert!(serde_json::from_value::<ClimateRecord>(json).is_err());
        Ok(())
    }
}
