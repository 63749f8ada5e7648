use crate::types::MeasurementRecord;
use crate::util::{parse_date_safe, parse_f64_safe};
use csv::ReaderBuilder;
use std::io::Read;
use thiserror::Error;

// Required columns of the consolidated export, matched against headers that
// have been trimmed and lowercased.
const COL_DATE: &str = "medição";
const COL_MEASURED: &str = "volume medido (m³)";
const COL_BILLED: &str = "volume faturado (m³)";
const COL_AMOUNT: &str = "valor";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub dated_rows: usize,
    pub bad_dates: usize,
    pub bad_values: usize,
}

struct Columns {
    date: usize,
    measured: usize,
    billed: usize,
    amount: usize,
}

/// Resolve the required columns from the header row. Header names are trimmed
/// and lowercased before lookup; a missing column is fatal.
fn resolve_columns(headers: &csv::StringRecord) -> Result<Columns, LoadError> {
    let find = |name: &'static str| -> Result<usize, LoadError> {
        headers
            .iter()
            .position(|h| h.trim().to_lowercase() == name)
            .ok_or(LoadError::MissingColumn(name))
    };
    Ok(Columns {
        date: find(COL_DATE)?,
        measured: find(COL_MEASURED)?,
        billed: find(COL_BILLED)?,
        amount: find(COL_AMOUNT)?,
    })
}

/// Load and normalize the measurement table from any reader.
///
/// Every data row yields exactly one record: per-field parse failures become
/// `None` (and are counted in the report), they never drop the row or abort
/// the load. Only a bad schema or an unreadable stream is fatal.
pub fn load_from_reader<R: Read>(
    reader: R,
) -> Result<(Vec<MeasurementRecord>, LoadReport), LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let cols = resolve_columns(rdr.headers()?)?;

    let mut records: Vec<MeasurementRecord> = Vec::new();
    let mut bad_dates = 0usize;
    let mut bad_values = 0usize;

    for result in rdr.records() {
        let row = result?;
        let date = parse_date_safe(row.get(cols.date));
        if date.is_none() {
            bad_dates += 1;
        }
        let measured = parse_f64_safe(row.get(cols.measured));
        let billed = parse_f64_safe(row.get(cols.billed));
        let amount = parse_f64_safe(row.get(cols.amount));
        bad_values += [measured, billed, amount]
            .iter()
            .filter(|v| v.is_none())
            .count();
        records.push(MeasurementRecord::new(date, measured, billed, amount));
    }

    let report = LoadReport {
        total_rows: records.len(),
        dated_rows: records.iter().filter(|r| r.measured_at.is_some()).count(),
        bad_dates,
        bad_values,
    };
    Ok((records, report))
}

pub fn load_from_path(path: &str) -> Result<(Vec<MeasurementRecord>, LoadReport), LoadError> {
    let file = std::fs::File::open(path)?;
    load_from_reader(file)
}
