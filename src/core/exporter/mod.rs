pub mod meters;
pub mod sensors;

use crate::core::columns::ColumnDef;
use crate::errors::ExportError;
use indexmap::IndexMap;
use serde::Serialize;
use std::str::FromStr;

/// Formatting applied to bucket keys in Exact mode, second precision.
pub(crate) const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bucketing granularity for an export.
///
/// The string forms ("Exact" | "Month" | "Year") are the API-boundary
/// vocabulary; anything else fails at parse time, before any readings are
/// touched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadingInterval {
    Exact,
    Month,
    Year,
}

impl FromStr for ReadingInterval {
    type Err = ExportError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "Exact" => Ok(Self::Exact),
            "Month" => Ok(Self::Month),
            "Year" => Ok(Self::Year),
            other => Err(ExportError::UnknownInterval(other.to_string())),
        }
    }
}

/// One cell of an aggregated row.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Integer(i32),
}

/// One output record per bucket: field name to value, led by the bucket's own
/// key field ("start_time"/"end_time", "timestamp", "month" or "year").
pub type ReadingRow = IndexMap<String, CellValue>;

/// The result of one export call.
#[derive(Debug, Serialize)]
pub struct ReadingsExport {
    pub readings: Vec<ReadingRow>,
    pub column_defs: Vec<ColumnDef>,
}

/// Rounds a running bucket total to 2 decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
