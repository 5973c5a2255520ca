//! Auto-detection of gradient parameters from slicer metadata.
//!
//! PrusaSlicer, OrcaSlicer and Bambu Studio append their full settings as
//! `; key = value` comments at the end of the file. Scanning that block
//! backwards recovers the values the transform would otherwise need to be
//! told: the filament's volumetric ceiling, the filament diameter, the
//! infill pattern family and the line widths used by the collinearity
//! guard. Detection is a pure function; the caller decides what wins.

use crate::{GradientConfig, InfillPattern};

/// Gradient parameters recovered from slicer metadata comments.
///
/// Every field is optional: absent keys simply leave the configured value
/// in place when applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedSettings {
    /// Filament maximum volumetric speed (mm³/s).
    pub hotend_max_flow: Option<f64>,
    /// Filament diameter (mm).
    pub filament_diameter: Option<f64>,
    /// Infill pattern family implied by the slicer's pattern name.
    pub infill_pattern: Option<InfillPattern>,
    /// Sparse-infill line width (mm).
    pub infill_line_width: Option<f64>,
    /// Inner-wall line width (mm).
    pub wall_line_width: Option<f64>,
}

impl DetectedSettings {
    /// Overwrite the corresponding config fields with every detected value.
    pub fn apply_to(&self, config: &mut GradientConfig) {
        if let Some(flow) = self.hotend_max_flow {
            config.hotend_max_flow = flow;
        }
        if let Some(diameter) = self.filament_diameter {
            config.filament_diameter = diameter;
        }
        if let Some(pattern) = self.infill_pattern {
            config.infill_pattern = pattern;
        }
        if let Some(width) = self.infill_line_width {
            config.infill_line_width = width;
        }
        if let Some(width) = self.wall_line_width {
            config.wall_line_width = width;
        }
    }
}

/// Scan slicer settings comments for gradient parameters.
///
/// The scan runs backwards because the settings block sits at the end of
/// the file; the occurrence closest to the end wins.
pub fn detect_settings(input: &str) -> DetectedSettings {
    let mut detected = DetectedSettings::default();
    for line in input.lines().rev() {
        let Some((key, value)) = split_setting(line) else {
            continue;
        };
        match key {
            "filament_max_volumetric_speed" => {
                fill(&mut detected.hotend_max_flow, parse_positive(value));
            }
            "filament_diameter" => {
                fill(&mut detected.filament_diameter, parse_positive(value));
            }
            "sparse_infill_pattern" | "fill_pattern" => {
                fill(&mut detected.infill_pattern, classify_pattern(value));
            }
            "sparse_infill_line_width" | "infill_extrusion_width" => {
                fill(&mut detected.infill_line_width, parse_positive(value));
            }
            "inner_wall_line_width" | "perimeter_extrusion_width" => {
                fill(&mut detected.wall_line_width, parse_positive(value));
            }
            _ => {}
        }
    }
    detected
}

/// Split a `; key = value` comment into its parts.
fn split_setting(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix(';')?;
    let (key, value) = rest.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Parse a positive scalar, taking the first entry of a comma-separated
/// per-extruder list. Zero means "auto" in slicer configs and percentage
/// values depend on unavailable context; both count as absent.
fn parse_positive(value: &str) -> Option<f64> {
    let first = value.split(',').next()?.trim();
    if first.ends_with('%') {
        return None;
    }
    match first.parse::<f64>() {
        Ok(v) if v > 0.0 => Some(v),
        _ => None,
    }
}

/// Map a slicer infill pattern name onto a gradient strategy.
fn classify_pattern(name: &str) -> Option<InfillPattern> {
    match name.to_ascii_lowercase().as_str() {
        "gyroid" | "honeycomb" | "3dhoneycomb" | "hilbertcurve" | "archimedeanchords"
        | "octagramspiral" | "concentric" => Some(InfillPattern::SmallSegments),
        "rectilinear" | "alignedrectilinear" | "monotonic" | "monotonicline" | "grid"
        | "triangles" | "stars" | "cubic" | "line" | "zig-zag" => Some(InfillPattern::Linear),
        _ => None,
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        if let Some(v) = value {
            *slot = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_orca_settings_block() {
        let input = "G28\n\
                     G1 X0 Y0\n\
                     ; sparse_infill_pattern = gyroid\n\
                     ; sparse_infill_line_width = 0.45\n\
                     ; inner_wall_line_width = 0.42\n\
                     ; filament_diameter = 1.75\n\
                     ; filament_max_volumetric_speed = 12\n";
        let detected = detect_settings(input);
        assert_eq!(detected.hotend_max_flow, Some(12.0));
        assert_eq!(detected.filament_diameter, Some(1.75));
        assert_eq!(detected.infill_pattern, Some(InfillPattern::SmallSegments));
        assert_eq!(detected.infill_line_width, Some(0.45));
        assert_eq!(detected.wall_line_width, Some(0.42));
    }

    #[test]
    fn test_detect_prusa_keys_and_lists() {
        let input = "; fill_pattern = rectilinear\n\
                     ; filament_diameter = 1.75,1.75\n\
                     ; infill_extrusion_width = 0\n";
        let detected = detect_settings(input);
        assert_eq!(detected.infill_pattern, Some(InfillPattern::Linear));
        assert_eq!(detected.filament_diameter, Some(1.75));
        // Zero means "auto"; not usable as a width.
        assert_eq!(detected.infill_line_width, None);
    }

    #[test]
    fn test_detect_nothing() {
        let detected = detect_settings("G28\nG1 X0 Y0 E1\n");
        assert_eq!(detected, DetectedSettings::default());
    }

    #[test]
    fn test_last_occurrence_wins() {
        // A stale value earlier in the file loses to the settings block.
        let input = "; filament_diameter = 2.85\n\
                     G28\n\
                     ; filament_diameter = 1.75\n";
        let detected = detect_settings(input);
        assert_eq!(detected.filament_diameter, Some(1.75));
    }

    #[test]
    fn test_apply_to_config() {
        let mut config = GradientConfig::default();
        let detected = DetectedSettings {
            hotend_max_flow: Some(11.0),
            infill_pattern: Some(InfillPattern::Linear),
            ..DetectedSettings::default()
        };
        detected.apply_to(&mut config);
        assert_eq!(config.hotend_max_flow, 11.0);
        assert_eq!(config.infill_pattern, InfillPattern::Linear);
        // Untouched fields keep their configured values.
        assert_eq!(config.filament_diameter, 1.75);
    }
}
