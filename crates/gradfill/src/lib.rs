#![warn(missing_docs)]

//! Gradient infill transform for sliced G-code.
//!
//! This crate rewrites a slicer's output so that infill extrusion flow
//! ramps from `max_flow` right at the perimeter walls down to `min_flow`
//! at `gradient_thickness` mm away from the nearest wall, giving parts a
//! dense shell-adjacent region without paying for dense infill throughout.
//! A feed controller keeps every rewritten move under the hotend's
//! volumetric flow ceiling.
//!
//! # Example
//!
//! ```ignore
//! use gradfill::{process_gcode, GradientConfig};
//! use gradfill_gcode::SlicerProfile;
//!
//! let input = std::fs::read_to_string("plate_1.gcode")?;
//! let profile = gradfill::detect_profile(&input)?;
//! let output = process_gcode(&input, &profile, &GradientConfig::default())?;
//!
//! println!("rewrote {} moves", output.stats.edited_moves);
//! std::fs::write("plate_1.gcode", output.gcode)?;
//! ```

pub mod detect;
pub mod error;
mod flow;
pub mod geometry;
mod rewrite;

pub use detect::{detect_settings, DetectedSettings};
pub use error::{GradientError, Result};
pub use gradfill_gcode::{Marker, SlicerProfile};

use serde::{Deserialize, Serialize};

/// Infill geometry family, which decides the gradient strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfillPattern {
    /// Small-segment infill (gyroid, honeycomb): each move is short enough
    /// to be scaled as a whole.
    #[default]
    SmallSegments,
    /// Linear infill (rectilinear, triangles): long strokes are subdivided
    /// so the gradient can vary along them.
    Linear,
}

/// Parameters for one gradient rewrite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientConfig {
    /// Extrusion flow at the wall, percent of the slicer's value.
    pub max_flow: f64,
    /// Extrusion flow at and beyond the gradient edge, percent.
    pub min_flow: f64,
    /// Width of the gradient zone (mm).
    pub gradient_thickness: f64,
    /// Sub-segments per gradient thickness (linear pattern only).
    pub gradient_discretization: f64,
    /// Hotend volumetric flow ceiling (mm³/s).
    pub hotend_max_flow: f64,
    /// Filament diameter (mm).
    pub filament_diameter: f64,
    /// Reduce infill beyond the gradient zone to `min_flow` instead of
    /// leaving it untouched (small-segments pattern only).
    pub thin_inner_core: bool,
    /// Infill pattern family.
    pub infill_pattern: InfillPattern,
    /// Sparse-infill line width (mm), used by the collinearity guard.
    pub infill_line_width: f64,
    /// Inner-wall line width (mm), used by the collinearity guard.
    pub wall_line_width: f64,
    /// Keep full flow on strokes running parallel and adjacent to a wall.
    pub collinearity_guard: bool,
    /// Drop the slicer banner line when the profile declares one.
    pub strip_banner: bool,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            max_flow: 350.0,
            min_flow: 50.0,
            gradient_thickness: 6.0,
            gradient_discretization: 4.0,
            hotend_max_flow: 20.0,
            filament_diameter: 1.75,
            thin_inner_core: true,
            infill_pattern: InfillPattern::SmallSegments,
            infill_line_width: 0.45,
            wall_line_width: 0.45,
            collinearity_guard: false,
            strip_banner: true,
        }
    }
}

impl GradientConfig {
    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        if self.max_flow <= 0.0 {
            return Err(GradientError::InvalidSettings(
                "max_flow must be positive".into(),
            ));
        }
        if self.min_flow < 0.0 || self.min_flow > self.max_flow {
            return Err(GradientError::InvalidSettings(
                "min_flow must be between 0 and max_flow".into(),
            ));
        }
        if self.gradient_thickness <= 0.0 {
            return Err(GradientError::InvalidSettings(
                "gradient_thickness must be positive".into(),
            ));
        }
        if self.gradient_discretization < 1.0 {
            return Err(GradientError::InvalidSettings(
                "gradient_discretization must be at least 1".into(),
            ));
        }
        if self.hotend_max_flow <= 0.0 {
            return Err(GradientError::InvalidSettings(
                "hotend_max_flow must be positive".into(),
            ));
        }
        if self.filament_diameter <= 0.0 {
            return Err(GradientError::InvalidSettings(
                "filament_diameter must be positive".into(),
            ));
        }
        if self.collinearity_guard
            && (self.infill_line_width <= 0.0 || self.wall_line_width <= 0.0)
        {
            return Err(GradientError::InvalidSettings(
                "line widths must be positive when the collinearity guard is on".into(),
            ));
        }
        Ok(())
    }

    /// Distance below which a wall-parallel stroke keeps full flow.
    pub fn critical_distance(&self) -> f64 {
        (self.infill_line_width + self.wall_line_width) * 1.4 / 2.0
    }
}

/// Counters describing one rewrite run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteStats {
    /// Lines read from the input.
    pub input_lines: usize,
    /// Lines written to the output.
    pub output_lines: usize,
    /// Input move lines that were rewritten.
    pub edited_moves: usize,
    /// Feed commands injected ahead of rewritten moves.
    pub injected_feeds: usize,
    /// Layer-change markers seen.
    pub layers: usize,
    /// Whether the transform changed anything at all. False strongly
    /// suggests a profile or pattern mismatch.
    pub changed: bool,
}

/// Result of a gradient rewrite: the output stream plus its counters.
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    /// The rewritten G-code.
    pub gcode: String,
    /// Run counters.
    pub stats: RewriteStats,
}

/// Rewrite a G-code stream with a gradient infill transform.
///
/// This is the main entry point. The profile must already be resolved
/// (see [`detect_profile`]); the input is processed in one strictly
/// sequential pass and nothing is written anywhere on error.
pub fn process_gcode(
    input: &str,
    profile: &SlicerProfile,
    config: &GradientConfig,
) -> Result<RewriteOutput> {
    config.validate()?;
    rewrite::rewrite(input, profile, config)
}

/// Resolve the slicer profile from the file's banner comments.
///
/// Fails with [`GradientError::MissingProfile`] when no known banner is
/// present, before any infill is touched.
pub fn detect_profile(input: &str) -> Result<SlicerProfile> {
    SlicerProfile::detect(input.lines()).ok_or(GradientError::MissingProfile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_settings() {
        let config = GradientConfig {
            gradient_thickness: -1.0,
            ..GradientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GradientConfig {
            min_flow: 400.0,
            max_flow: 350.0,
            ..GradientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_critical_distance() {
        let config = GradientConfig {
            infill_line_width: 0.45,
            wall_line_width: 0.45,
            ..GradientConfig::default()
        };
        assert!((config.critical_distance() - 0.63).abs() < 1e-12);
    }

    #[test]
    fn test_detect_profile_missing() {
        assert!(matches!(
            detect_profile("G28\nG1 X0 Y0\n"),
            Err(GradientError::MissingProfile)
        ));
        assert!(detect_profile("; generated by OrcaSlicer\n").is_ok());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = GradientConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: GradientConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.max_flow, config.max_flow);
        assert_eq!(back.infill_pattern, config.infill_pattern);
    }
}
