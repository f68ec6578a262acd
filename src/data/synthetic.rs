//! Synthetic demonstration curves.
//!
//! The reference is `y = exp(x / 5)` sampled on an even grid. Each copy is
//!
//! ```text
//! y = factor * (exp(x / 5) + noise) + offset,    noise ~ N(0, σ)
//! ```
//!
//! so superimposing it back onto the reference should give
//! `K ≈ 1 / factor` and `b ≈ offset / factor`.

use std::fs::File;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::domain::{Curve, Domain, Sample};
use crate::error::{AppError, EXIT_CONFIG};

/// One scaled/offset copy of the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopySpec {
    pub factor: f64,
    pub offset: f64,
}

impl CopySpec {
    /// The `(K, b)` that maps this copy back onto the reference.
    pub fn expected_params(&self) -> (f64, f64) {
        (1.0 / self.factor, self.offset / self.factor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthSpec {
    pub points: usize,
    pub domain: Domain,
    /// Standard deviation of the noise added before scaling.
    pub noise: f64,
    pub seed: u64,
    pub copies: Vec<CopySpec>,
}

/// Generate the reference followed by one curve per copy.
///
/// Same spec, same curves.
pub fn generate_curves(spec: &SynthSpec) -> Result<Vec<Curve>, AppError> {
    if spec.points < 2 {
        return Err(AppError::new(EXIT_CONFIG, "Synthetic curves need at least 2 points."));
    }
    if !(spec.domain.x_min.is_finite() && spec.domain.x_max.is_finite() && spec.domain.x_max > spec.domain.x_min) {
        return Err(AppError::new(EXIT_CONFIG, "Invalid X range for synthetic curves."));
    }
    if spec.copies.iter().any(|c| !c.factor.is_finite() || c.factor == 0.0 || !c.offset.is_finite()) {
        return Err(AppError::new(EXIT_CONFIG, "Synthetic copy factors must be finite and non-zero."));
    }

    let normal = Normal::new(0.0, spec.noise)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Noise distribution error: {e}")))?;
    let mut rng = StdRng::seed_from_u64(spec.seed);

    let xs = spec.domain.linspace(spec.points);
    let base: Vec<f64> = xs.iter().map(|&x| reference_value(x)).collect();

    let mut curves = Vec::with_capacity(spec.copies.len() + 1);
    curves.push(Curve::from_xy("reference", &xs, &base));

    for (i, copy) in spec.copies.iter().enumerate() {
        let samples = xs
            .iter()
            .zip(&base)
            .map(|(&x, &y)| {
                let y = copy.factor * (y + normal.sample(&mut rng)) + copy.offset;
                Sample {
                    x,
                    y,
                    e: Some(spec.noise * copy.factor.abs()),
                    dx: None,
                }
            })
            .collect();
        curves.push(Curve::new(format!("copy_{}", i + 1), samples));
    }
    Ok(curves)
}

/// Write generated curves as `<dir>/<id>.csv` in the ingest format.
///
/// Returns the written paths, reference first.
pub fn write_synthetic(dir: &Path, spec: &SynthSpec) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to create '{}': {e}", dir.display())))?;

    let curves = generate_curves(spec)?;
    let mut paths = Vec::with_capacity(curves.len());
    for (i, curve) in curves.iter().enumerate() {
        let path = dir.join(format!("{}.csv", curve.id));
        let title = match i.checked_sub(1).and_then(|j| spec.copies.get(j)) {
            None => "synthetic reference y = exp(x/5)".to_string(),
            Some(copy) => {
                let (k, b) = copy.expected_params();
                info!(file = %path.display(), expected_k = k, expected_b = b, "synthetic copy");
                format!("synthetic copy factor={} offset={}", copy.factor, copy.offset)
            }
        };
        write_curve_file(&path, &title, curve)?;
        paths.push(path);
    }
    Ok(paths)
}

fn write_curve_file(path: &Path, title: &str, curve: &Curve) -> Result<(), AppError> {
    let write_err = |e: csv::Error| AppError::new(EXIT_CONFIG, format!("Failed to write '{}': {e}", path.display()));
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to create '{}': {e}", path.display())))?;
    let mut w = csv::WriterBuilder::new().flexible(true).from_writer(file);

    w.write_record([title]).map_err(write_err)?;
    w.write_record(["X", "Y", "E", "DX"]).map_err(write_err)?;
    for s in &curve.samples {
        w.write_record([
            s.x.to_string(),
            s.y.to_string(),
            s.e.map(|v| v.to_string()).unwrap_or_default(),
            s.dx.map(|v| v.to_string()).unwrap_or_default(),
        ])
        .map_err(write_err)?;
    }
    w.flush()
        .map_err(|e| AppError::new(EXIT_CONFIG, format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(())
}

fn reference_value(x: f64) -> f64 {
    (x / 5.0).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_curve_file;

    fn spec() -> SynthSpec {
        SynthSpec {
            points: 100,
            domain: Domain { x_min: 1.0, x_max: 10.0 },
            noise: 0.1,
            seed: 7,
            copies: vec![
                CopySpec { factor: 2.2, offset: 0.0 },
                CopySpec { factor: 0.5, offset: 1.0 },
            ],
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate_curves(&spec()).unwrap();
        let b = generate_curves(&spec()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].ys()[0], (0.2f64).exp());
    }

    #[test]
    fn expected_params_invert_the_copy() {
        let copy = CopySpec { factor: 0.5, offset: 1.0 };
        assert_eq!(copy.expected_params(), (2.0, 2.0));
    }

    #[test]
    fn written_files_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_synthetic(dir.path(), &spec()).unwrap();
        assert_eq!(paths.len(), 3);

        let reference = read_curve_file(&paths[0]).unwrap();
        assert!(reference.row_errors.is_empty());
        assert_eq!(reference.curve.len(), 100);
        let copy = read_curve_file(&paths[1]).unwrap().curve;
        assert_eq!(copy.samples[0].e, Some(0.1 * 2.2));
    }

    #[test]
    fn zero_factor_is_rejected() {
        let mut s = spec();
        s.copies[0].factor = 0.0;
        assert!(generate_curves(&s).is_err());
    }
}
