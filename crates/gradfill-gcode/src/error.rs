//! Error types for G-code parsing.

use thiserror::Error;

/// Errors that can occur while reading a G-code stream.
///
/// Both variants carry the 1-based line number and the raw line text so the
/// caller can report exactly where the input went wrong.
#[derive(Error, Debug)]
pub enum GcodeError {
    /// A move-pattern line had no parseable X or Y coordinate.
    #[error("G-code parsing error at line {line}: {text:?}")]
    MalformedMove {
        /// 1-based line number in the input stream.
        line: usize,
        /// Raw text of the offending line.
        text: String,
    },

    /// An arc motion command was encountered.
    #[error("unsupported arc motion (G2/G3) at line {line}: {text:?}")]
    UnsupportedArc {
        /// 1-based line number in the input stream.
        line: usize,
        /// Raw text of the offending line.
        text: String,
    },
}

/// Result type for G-code parsing operations.
pub type Result<T> = std::result::Result<T, GcodeError>;
