//! Curve file ingest.
//!
//! A curve file is comma-delimited text:
//! - the first two lines are headers and are skipped
//! - each following row is `X, Y[, E[, DX]]`
//!
//! Design goals:
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (samples keep file order)
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{Curve, Sample};
use crate::error::{AppError, EXIT_CONFIG};

/// Header lines at the top of every curve file.
pub const HEADER_LINES: usize = 2;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output for one file.
#[derive(Debug, Clone)]
pub struct IngestedCurve {
    pub curve: Curve,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Read one curve file. The curve identifier is the path as given.
pub fn read_curve_file(path: &Path) -> Result<IngestedCurve, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to open curve file '{}': {e}", path.display())))?;
    let ingested = read_curve(&path.display().to_string(), file)?;

    for err in &ingested.row_errors {
        warn!(file = %path.display(), line = err.line, "skipped row: {}", err.message);
    }
    debug!(
        file = %path.display(),
        rows_read = ingested.rows_read,
        rows_used = ingested.curve.len(),
        "loaded curve"
    );
    Ok(ingested)
}

/// Load every file in `ids`, in order. The first failure aborts the load.
pub fn load_curves(ids: &[String]) -> Result<Vec<Curve>, AppError> {
    ids.par_iter()
        .map(|id| read_curve_file(Path::new(id)).map(|c| c.curve))
        .collect()
}

/// Parse curve rows from any reader.
pub fn read_curve<R: Read>(id: &str, reader: R) -> Result<IngestedCurve, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate().skip(HEADER_LINES) {
        let line = idx + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                rows_read += 1;
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows_read += 1;

        match parse_row(&record) {
            Ok(sample) => samples.push(sample),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if samples.is_empty() {
        return Err(AppError::new(
            EXIT_CONFIG,
            format!("Curve file '{id}' has no valid rows after the {HEADER_LINES} header lines."),
        ));
    }

    Ok(IngestedCurve {
        curve: Curve::new(id, samples),
        row_errors,
        rows_read,
    })
}

fn parse_row(record: &StringRecord) -> Result<Sample, String> {
    let x = parse_required(record, 0, "X")?;
    let y = parse_required(record, 1, "Y")?;
    Ok(Sample {
        x,
        y,
        e: parse_opt_f64(record.get(2)),
        dx: parse_opt_f64(record.get(3)),
    })
}

fn parse_required(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing `{name}` value."))?;
    parse_opt_f64(Some(raw)).ok_or_else(|| format!("Invalid `{name}` value '{raw}'."))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
