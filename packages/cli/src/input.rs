//! CSV customer export loader.

use std::io::Read;
use std::path::Path;

use sales_map_customer_models::{CustomerRow, GeoPoint, MeasureName};
use serde::Deserialize;

/// Errors from loading a customer CSV.
#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    /// The file could not be opened or read.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A row could not be decoded.
    #[error("{path} line {line}: {source}")]
    Row {
        /// Path to the CSV file.
        path: String,
        /// 1-based line of the offending record.
        line: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },
}

/// One line of a customer export. Every column but `customer_id` may be
/// blank.
#[derive(Debug, Deserialize)]
struct CustomerRecord {
    customer_id: String,
    longitude: Option<f64>,
    latitude: Option<f64>,
    #[serde(default)]
    route: Option<String>,
    #[serde(default)]
    rep: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    units: Option<f64>,
    #[serde(default)]
    revenue: Option<f64>,
    #[serde(default)]
    documents: Option<f64>,
}

impl CustomerRecord {
    /// Converts to a [`CustomerRow`], or `None` if the geocode is missing
    /// or invalid.
    fn into_row(self) -> Option<CustomerRow> {
        let point = GeoPoint::new(self.longitude?, self.latitude?);
        if !point.is_valid() {
            return None;
        }

        let mut row = CustomerRow::new(self.customer_id.trim(), point);
        if let Some(route) = &self.route {
            row = row.with_route(route);
        }
        if let Some(rep) = &self.rep {
            row = row.with_rep(rep);
        }
        if let Some(branch) = &self.branch {
            row = row.with_branch(branch);
        }

        for (measure, value) in [
            (MeasureName::Units, self.units),
            (MeasureName::Revenue, self.revenue),
            (MeasureName::Documents, self.documents),
        ] {
            if let Some(value) = value {
                row = row.with_measure(measure, value);
            }
        }

        Some(row)
    }
}

/// Loads customer rows from a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row is malformed.
pub fn load_customers(path: &Path) -> Result<Vec<CustomerRow>, CsvLoadError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|e| CsvLoadError::Csv {
        path: label.clone(),
        source: csv::Error::from(e),
    })?;

    let rows = read_customers(file, &label)?;
    log::info!("Loaded {} geocoded customers from {label}", rows.len());
    Ok(rows)
}

/// Reads customer rows from any CSV source with a header line.
///
/// # Errors
///
/// Returns an error if a row is malformed.
pub fn read_customers(source: impl Read, label: &str) -> Result<Vec<CustomerRow>, CsvLoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    read_records(reader, label)
}

fn read_records<R: Read>(
    mut reader: csv::Reader<R>,
    label: &str,
) -> Result<Vec<CustomerRow>, CsvLoadError> {
    let mut rows = Vec::new();
    let mut dropped = 0_u64;

    for result in reader.deserialize::<CustomerRecord>() {
        let record = result.map_err(|e| CsvLoadError::Row {
            path: label.to_string(),
            line: e.position().map_or(0, csv::Position::line),
            source: e,
        })?;

        match record.into_row() {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::debug!("{label}: dropped {dropped} rows without a valid geocode");
    }

    Ok(rows)
}
