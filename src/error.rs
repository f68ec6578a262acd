use thiserror::Error;

/// Exit code for configuration, settings and I/O failures.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code when no usable curve data remains.
pub const EXIT_NO_DATA: u8 = 3;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised by the fitting core.
///
/// Configuration variants abort the whole run. Data variants concern a single
/// curve and are recorded against it while the other curves keep going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("No curves to superimpose.")]
    EmptyInput,

    #[error("Reference curve '{0}' is not part of the working set.")]
    ReferenceNotFound(String),

    #[error("Curve '{0}' has no sample with Y > 0; cannot compute the common domain.")]
    NoPositiveSamples(String),

    #[error("No curves overlap in the requested range: x_min={x_min} > x_max={x_max}.")]
    EmptyDomain { x_min: f64, x_max: f64 },

    #[error("The {symbol} list is empty.")]
    EmptyCycle { symbol: &'static str },

    #[error("Reference curve '{id}' is unusable: {reason}")]
    BadReference { id: String, reason: String },

    #[error("Cannot interpolate curve '{id}': {reason}")]
    Interpolation { id: String, reason: String },

    #[error("Curve '{id}' covers [{native_min}, {native_max}] which does not contain the domain [{x_min}, {x_max}].")]
    DomainNotCovered {
        id: String,
        native_min: f64,
        native_max: f64,
        x_min: f64,
        x_max: f64,
    },
}

impl FitError {
    /// Whether this error only affects one curve.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            FitError::Interpolation { .. } | FitError::DomainNotCovered { .. }
        )
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = match err {
            FitError::EmptyInput => EXIT_NO_DATA,
            _ => EXIT_CONFIG,
        };
        AppError::new(code, err.to_string())
    }
}
