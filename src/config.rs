//! Layered run settings.
//!
//! Precedence, lowest first:
//! 1. built-in defaults
//! 2. `superimpose.toml` in the working directory
//! 3. `~/.superimpose.toml`
//! 4. CLI flags (applied by `app`)
//!
//! Every key is optional in every file; a later layer only overrides the keys
//! it sets.
//!
//! ```toml
//! [general]
//! qmin = 0.01
//! qmax = 0.3
//! discard_points_begin = 0
//! discard_points_end = 0
//! save_scaled_files = true
//!
//! [solver]
//! max_iterations = 200
//! ftol = 1.49012e-8
//! xtol = 1.49012e-8
//! gtol = 0.0
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, EXIT_CONFIG};
use crate::math::LmOptions;

/// Settings file looked up in the working directory.
pub const LOCAL_SETTINGS_FILE: &str = "superimpose.toml";
/// Settings file looked up in the home directory.
pub const HOME_SETTINGS_FILE: &str = ".superimpose.toml";

/// Resolved settings before CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub qmin: Option<f64>,
    pub qmax: Option<f64>,
    pub discard_begin: usize,
    pub discard_end: usize,
    pub save_scaled: bool,
    pub solver: LmOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            qmin: None,
            qmax: None,
            discard_begin: 0,
            discard_end: 0,
            save_scaled: true,
            solver: LmOptions::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsLayer {
    general: GeneralLayer,
    solver: SolverLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GeneralLayer {
    qmin: Option<f64>,
    qmax: Option<f64>,
    discard_points_begin: Option<usize>,
    discard_points_end: Option<usize>,
    save_scaled_files: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SolverLayer {
    max_iterations: Option<usize>,
    ftol: Option<f64>,
    xtol: Option<f64>,
    gtol: Option<f64>,
}

impl Settings {
    /// Load defaults plus every settings file that exists on the standard paths.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(&default_paths())
    }

    /// Load defaults plus each existing file in `paths`, later files winning.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self, AppError> {
        let mut settings = Settings::default();
        for path in paths {
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(path).map_err(|e| {
                AppError::new(EXIT_CONFIG, format!("Failed to read settings '{}': {e}", path.display()))
            })?;
            settings.apply_toml(&text, path)?;
            debug!(file = %path.display(), "applied settings file");
        }
        Ok(settings)
    }

    /// Overlay one TOML document on top of `self`.
    pub fn apply_toml(&mut self, text: &str, origin: &Path) -> Result<(), AppError> {
        let layer: SettingsLayer = toml::from_str(text)
            .map_err(|e| AppError::new(EXIT_CONFIG, format!("Invalid settings file '{}': {e}", origin.display())))?;

        let g = layer.general;
        if g.qmin.is_some() {
            self.qmin = g.qmin;
        }
        if g.qmax.is_some() {
            self.qmax = g.qmax;
        }
        self.discard_begin = g.discard_points_begin.unwrap_or(self.discard_begin);
        self.discard_end = g.discard_points_end.unwrap_or(self.discard_end);
        self.save_scaled = g.save_scaled_files.unwrap_or(self.save_scaled);

        let s = layer.solver;
        self.solver.max_iterations = s.max_iterations.unwrap_or(self.solver.max_iterations);
        self.solver.ftol = s.ftol.unwrap_or(self.solver.ftol);
        self.solver.xtol = s.xtol.unwrap_or(self.solver.xtol);
        self.solver.gtol = s.gtol.unwrap_or(self.solver.gtol);
        Ok(())
    }
}

/// Working-directory file first, then the home file.
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_SETTINGS_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(HOME_SETTINGS_FILE));
    }
    paths
}
