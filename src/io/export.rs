//! Export scaled curves (CSV) and the run summary (JSON).
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::domain::{Curve, Domain, SummaryRow};
use crate::error::{AppError, EXIT_CONFIG};

/// Suffix replacing the input extension for scaled curve files.
pub const SCALED_SUFFIX: &str = "_scaled.csv";

/// `<dir>/<stem>_scaled.csv` for an input path.
pub fn scaled_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    input.with_file_name(format!("{stem}{SCALED_SUFFIX}"))
}

/// Write a curve with its derived columns next to the input file.
///
/// Returns the written path.
pub fn write_scaled_csv(curve: &Curve) -> Result<PathBuf, AppError> {
    let path = scaled_path(Path::new(&curve.id));
    let file = File::create(&path)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to create scaled CSV '{}': {e}", path.display())))?;
    write_scaled(curve, file)?;
    debug!(file = %path.display(), "scaled curve saved");
    Ok(path)
}

fn write_scaled<W: std::io::Write>(curve: &Curve, out: W) -> Result<(), AppError> {
    let write_err = |e: csv::Error| AppError::new(EXIT_CONFIG, format!("Failed to write scaled CSV: {e}"));
    let mut w = csv::Writer::from_writer(out);

    w.write_record(["X", "Y", "E", "DX", "q_range", "y_range_fit", "y_fit"])
        .map_err(write_err)?;

    let derived = curve.derived.clone().unwrap_or_default();
    let column = |v: &[f64], i: usize| v.get(i).map(f64::to_string).unwrap_or_default();
    for (i, s) in curve.samples.iter().enumerate() {
        w.write_record([
            s.x.to_string(),
            s.y.to_string(),
            s.e.map(|v| v.to_string()).unwrap_or_default(),
            s.dx.map(|v| v.to_string()).unwrap_or_default(),
            column(&derived.q_range, i),
            column(&derived.y_range_fit, i),
            column(&derived.y_fit, i),
        ])
        .map_err(write_err)?;
    }

    w.flush()
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to flush scaled CSV: {e}")))?;
    Ok(())
}

/// Portable summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryFile<'a> {
    pub tool: &'static str,
    pub generated: DateTime<Local>,
    pub model: &'static str,
    pub reference: &'a str,
    pub domain: Domain,
    pub rows: &'a [SummaryRow],
}

/// Write the summary rows as pretty JSON.
pub fn write_summary_json(path: &Path, rows: &[SummaryRow], reference: &str, domain: Domain) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to create summary JSON '{}': {e}", path.display())))?;

    let summary = SummaryFile {
        tool: "superimpose",
        generated: Local::now(),
        model: "K*I(Q) - b",
        reference,
        domain,
        rows,
    };

    serde_json::to_writer_pretty(file, &summary)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DerivedSeries, Sample};

    #[test]
    fn scaled_path_replaces_extension() {
        assert_eq!(scaled_path(Path::new("/data/run1.csv")), PathBuf::from("/data/run1_scaled.csv"));
        assert_eq!(scaled_path(Path::new("run2")), PathBuf::from("run2_scaled.csv"));
    }

    #[test]
    fn scaled_csv_has_input_and_derived_columns() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("c.csv");
        let mut curve = Curve::new(
            input.display().to_string(),
            vec![
                Sample { x: 1.0, y: 2.0, e: Some(0.1), dx: None },
                Sample::new(2.0, 4.0),
            ],
        );
        curve.derived = Some(DerivedSeries {
            q_range: vec![1.0, 2.0],
            y_range_fit: vec![1.5, 3.5],
            y_fit: vec![1.0, 3.0],
        });

        let path = write_scaled_csv(&curve).unwrap();
        assert_eq!(path, dir.path().join("c_scaled.csv"));
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            text,
            "X,Y,E,DX,q_range,y_range_fit,y_fit\n1,2,0.1,,1,1.5,1\n2,4,,,2,3.5,3\n"
        );
    }

    #[test]
    fn summary_json_carries_rows_and_domain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let rows = vec![SummaryRow {
            id: "b.csv".to_string(),
            k: Some(2.0),
            k_err: None,
            b: Some(0.5),
            b_err: Some(0.01),
        }];
        write_summary_json(&path, &rows, "a.csv", Domain { x_min: 0.5, x_max: 4.0 }).unwrap();

        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["reference"], "a.csv");
        assert_eq!(v["domain"]["x_max"], 4.0);
        assert_eq!(v["rows"][0]["k"], 2.0);
        assert!(v["rows"][0]["k_err"].is_null());
        assert!(v["generated"].is_string());
    }
}
