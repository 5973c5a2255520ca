//! Error types for the gradient transform.

use thiserror::Error;

/// Errors that can occur during a gradient-infill rewrite.
#[derive(Error, Debug)]
pub enum GradientError {
    /// Invalid gradient parameters.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// No slicer profile could be resolved for the input.
    #[error("no slicer profile could be resolved from the file header")]
    MissingProfile,

    /// The G-code stream itself could not be processed.
    #[error(transparent)]
    Gcode(#[from] gradfill_gcode::GcodeError),
}

/// Result type for gradient transform operations.
pub type Result<T> = std::result::Result<T, GradientError>;
