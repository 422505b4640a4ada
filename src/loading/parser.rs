use std::io::Read;

use crate::Error;

/// Deserialize one CSV table. Unlike telemetry, static network rows are
/// never skipped silently: a malformed row fails the whole load.
pub fn deserialize_csv<T, R>(reader: R, table: &str) -> Result<Vec<T>, Error>
where
    T: for<'de> serde::Deserialize<'de>,
    R: Read,
{
    csv::Reader::from_reader(reader)
        .deserialize()
        .enumerate()
        .map(|(row, record)| {
            record.map_err(|e| Error::InvalidData(format!("{table} row {}: {e}", row + 1)))
        })
        .collect()
}

/// Parse a required numeric field.
pub fn parse_f64(value: &str, field: &str, context: &str) -> Result<f64, Error> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidData(format!("{context}: invalid {field} '{value}'")))
}
