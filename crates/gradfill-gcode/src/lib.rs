#![warn(missing_docs)]

//! G-code line codec and slicer marker profiles for the gradfill rewriter.
//!
//! This crate knows how to read and write the handful of G-code constructs
//! the gradient-infill transform cares about (linear moves and their X/Y/E/F
//! words) and how to recognize the comment markers each supported slicer
//! uses to label layers and toolpath features.
//!
//! # Example
//!
//! ```
//! use gradfill_gcode::{line, Marker, SlicerProfile};
//!
//! let profile = SlicerProfile::orca();
//! assert_eq!(profile.classify(";TYPE:Sparse infill"), Some(Marker::InfillBegin));
//!
//! let (x, y) = line::parse_xy("G1 X10.0 Y5.0 E0.5", 1).unwrap();
//! assert_eq!((x, y), (10.0, 5.0));
//! ```

pub mod error;
pub mod line;
pub mod profile;

pub use error::{GcodeError, Result};
pub use profile::{Marker, SlicerProfile};
