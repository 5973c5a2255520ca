//! Parsing and formatting of individual G-code lines.
//!
//! Only the constructs the rewriter cares about are modelled: `G0`/`G1`
//! moves with `X`/`Y` targets and optional `E`/`F` words, and `G2`/`G3`
//! arcs (which are recognized only so the caller can reject them). All
//! other lines are opaque to this module.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GcodeError, Result};

static MOVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^G[0-1].*X.*Y").expect("move pattern"));
static EXTRUSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^G1.*X.*Y.*E").expect("extrusion pattern"));
static ARC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^G[23]\b").expect("arc pattern"));
static FEED_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^G1\b.*F").expect("feed line pattern"));
static X_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"X(-?\d*\.?\d+)").expect("X pattern"));
static Y_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Y(-?\d*\.?\d+)").expect("Y pattern"));
static F_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"F(-?\d*\.?\d+)").expect("F pattern"));

/// Is this a linear move with X and Y targets (`G0` or `G1`)?
pub fn is_move(line: &str) -> bool {
    MOVE_RE.is_match(line)
}

/// Is this a printing move (`G1` with X, Y and E words)?
pub fn is_extrusion_move(line: &str) -> bool {
    EXTRUSION_RE.is_match(line)
}

/// Is this an arc motion command (`G2`/`G3`)?
pub fn is_arc(line: &str) -> bool {
    ARC_RE.is_match(line)
}

/// Is this a `G1` line carrying a feedrate word?
pub fn has_feed(line: &str) -> bool {
    FEED_LINE_RE.is_match(line)
}

/// Extract the X/Y target of a move line.
///
/// Returns [`GcodeError::MalformedMove`] with the given line context when
/// either coordinate is missing or not a number.
pub fn parse_xy(line: &str, line_no: usize) -> Result<(f64, f64)> {
    let x = X_RE
        .captures(line)
        .and_then(|c| c[1].parse::<f64>().ok());
    let y = Y_RE
        .captures(line)
        .and_then(|c| c[1].parse::<f64>().ok());
    match (x, y) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(GcodeError::MalformedMove {
            line: line_no,
            text: line.trim_end().to_string(),
        }),
    }
}

/// Extract the extrusion length (E word) of a move line.
///
/// The E value is found by scanning whitespace-delimited words for one
/// beginning with `E`; comments and checksums never reach this function
/// because the caller only hands over recognized extrusion moves.
pub fn extrusion_length(line: &str) -> Option<f64> {
    line.split_whitespace()
        .find_map(|word| word.strip_prefix('E'))
        .and_then(|rest| rest.parse::<f64>().ok())
}

/// Extract the feedrate (F word) of a line.
pub fn feedrate(line: &str) -> Option<f64> {
    F_RE.captures(line).and_then(|c| c[1].parse::<f64>().ok())
}

/// Format a printing move with the target rounded to 3 decimals and the
/// extrusion to 5.
pub fn format_move(x: f64, y: f64, e: f64) -> String {
    format!("G1 X{:.3} Y{:.3} E{:.5}", x, y, e)
}

/// Format a standalone feedrate command.
///
/// The feed is rounded to 3 decimals and trailing zeros are trimmed, so a
/// feed captured from an `F1200` word is re-emitted as `F1200`.
pub fn format_feed(f: f64) -> String {
    format!("G1 F{}", trim_number(f, 3))
}

/// Render a number rounded to `decimals` places without trailing zeros.
fn trim_number(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_classification() {
        assert!(is_move("G0 X1.0 Y2.0"));
        assert!(is_move("G1 X1.0 Y2.0 E0.5"));
        assert!(!is_move("G1 F1200"));
        assert!(!is_move("G28 X0 Y0"));
        assert!(!is_move(";TYPE:Sparse infill"));

        assert!(is_extrusion_move("G1 X1.0 Y2.0 E0.5"));
        assert!(!is_extrusion_move("G0 X1.0 Y2.0"));
        assert!(!is_extrusion_move("G1 X1.0 Y2.0"));
    }

    #[test]
    fn test_arc_detection() {
        assert!(is_arc("G2 X10 Y5 I2 J0"));
        assert!(is_arc("G3 X10 Y5 I2 J0"));
        assert!(!is_arc("G28"));
        assert!(!is_arc("G1 X10 Y5"));
    }

    #[test]
    fn test_parse_xy() {
        let (x, y) = parse_xy("G1 X12.345 Y-6.7 E0.1", 1).unwrap();
        assert_eq!(x, 12.345);
        assert_eq!(y, -6.7);

        let err = parse_xy("G1 X Y2.0", 42).unwrap_err();
        match err {
            GcodeError::MalformedMove { line, .. } => assert_eq!(line, 42),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_word_extraction() {
        assert_eq!(extrusion_length("G1 X1 Y2 E0.04321"), Some(0.04321));
        assert_eq!(extrusion_length("G1 X1 Y2 E-1.5"), Some(-1.5));
        assert_eq!(extrusion_length("G1 X1 Y2"), None);
        assert_eq!(feedrate("G1 F1200"), Some(1200.0));
        assert_eq!(feedrate("G1 X1 Y2 F900.5 E0.1"), Some(900.5));
        assert_eq!(feedrate("G1 X1 Y2"), None);
    }

    #[test]
    fn test_feed_line() {
        assert!(has_feed("G1 F1200"));
        assert!(has_feed("G1 X1 Y2 F900 E0.1"));
        assert!(!has_feed("G0 F1200"));
        assert!(!has_feed("G1 X1 Y2 E0.1"));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_move(1.23456, 2.0, 5.0), "G1 X1.235 Y2.000 E5.00000");
        assert_eq!(format_feed(1200.0), "G1 F1200");
        assert_eq!(format_feed(99.77916), "G1 F99.779");
    }
}
