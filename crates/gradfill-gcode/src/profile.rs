//! Slicer marker profiles.
//!
//! Every supported slicer annotates its G-code with comment markers for
//! layer changes and toolpath feature types, but each uses its own
//! vocabulary. A [`SlicerProfile`] captures that vocabulary as data so the
//! rewriter never has to branch on "which slicer" itself: it is resolved
//! once, either by explicit choice or by sniffing the header banner, and
//! passed in.

use serde::{Deserialize, Serialize};

/// Marker category of a comment line, as classified by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Start of a new layer. Not a feature-type line; the rewriter resets
    /// its per-layer wall geometry and otherwise passes the line through.
    LayerChange,
    /// Start of an inner-wall (perimeter) block.
    InnerWallBegin,
    /// End of the inner-wall block (in practice: start of the outer wall).
    InnerWallEnd,
    /// Start of a sparse-infill block.
    InfillBegin,
    /// Start of custom start/end G-code; positions reported inside are
    /// meaningless and must not be tracked.
    StartGcode,
    /// A feature-type line of no further interest (skirt, bridge, ...).
    OtherType,
}

/// Marker vocabulary and per-slicer policies for one slicer family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicerProfile {
    /// Human-readable profile name.
    pub name: String,
    /// Prefix shared by all feature-type lines (`;TYPE:` or `; FEATURE:`).
    pub type_prefix: String,
    /// Layer-change marker prefix.
    pub layer_change: String,
    /// Inner-wall block start prefix.
    pub inner_wall_begin: String,
    /// Inner-wall block end prefix.
    pub inner_wall_end: String,
    /// Sparse-infill block start prefix.
    pub infill_begin: String,
    /// Custom start/end G-code prefix, when the slicer emits one.
    pub start_gcode: Option<String>,
    /// First-line banner this slicer writes, used for auto-detection.
    pub banner: String,
    /// Whether the banner line should be dropped from the output when
    /// banner removal is enabled (works around broken G-code previews).
    pub strip_banner: bool,
    /// Whether the inner-wall-end marker leaves the state machine in the
    /// wall section. PrusaSlicer forks keep collecting through the
    /// external-perimeter block; the other slicers return to neutral.
    pub wall_end_keeps_section: bool,
}

impl SlicerProfile {
    /// OrcaSlicer profile.
    pub fn orca() -> Self {
        Self {
            name: "OrcaSlicer".into(),
            type_prefix: ";TYPE:".into(),
            layer_change: ";LAYER_CHANGE".into(),
            inner_wall_begin: ";TYPE:Inner wall".into(),
            inner_wall_end: ";TYPE:Outer wall".into(),
            infill_begin: ";TYPE:Sparse infill".into(),
            start_gcode: Some(";TYPE:Custom".into()),
            banner: "; generated by OrcaSlicer".into(),
            strip_banner: true,
            wall_end_keeps_section: false,
        }
    }

    /// PrusaSlicer profile.
    pub fn prusa() -> Self {
        Self {
            name: "PrusaSlicer".into(),
            type_prefix: ";TYPE:".into(),
            layer_change: ";LAYER_CHANGE".into(),
            inner_wall_begin: ";TYPE:Perimeter".into(),
            inner_wall_end: ";TYPE:External perimeter".into(),
            infill_begin: ";TYPE:Internal infill".into(),
            start_gcode: Some(";TYPE:Custom".into()),
            banner: "; generated by PrusaSlicer".into(),
            strip_banner: true,
            wall_end_keeps_section: true,
        }
    }

    /// Bambu Studio profile (also OrcaSlicer targeting a Bambu printer).
    pub fn bambu() -> Self {
        Self {
            name: "Bambu Studio".into(),
            type_prefix: "; FEATURE:".into(),
            layer_change: "; CHANGE_LAYER".into(),
            inner_wall_begin: "; FEATURE: Inner wall".into(),
            inner_wall_end: "; FEATURE: Outer wall".into(),
            infill_begin: "; FEATURE: Sparse infill".into(),
            start_gcode: Some("; FEATURE: Custom".into()),
            banner: "; BambuStudio".into(),
            strip_banner: false,
            wall_end_keeps_section: false,
        }
    }

    /// Cura profile.
    pub fn cura() -> Self {
        Self {
            name: "Cura".into(),
            type_prefix: ";TYPE:".into(),
            layer_change: ";LAYER:".into(),
            inner_wall_begin: ";TYPE:WALL-INNER".into(),
            inner_wall_end: ";TYPE:WALL-OUTER".into(),
            infill_begin: ";TYPE:FILL".into(),
            start_gcode: None,
            banner: ";Generated with Cura_SteamEngine".into(),
            strip_banner: false,
            wall_end_keeps_section: false,
        }
    }

    /// All built-in profiles, in detection order.
    pub fn all_profiles() -> Vec<Self> {
        vec![Self::orca(), Self::prusa(), Self::bambu(), Self::cura()]
    }

    /// Classify a line against this profile's marker vocabulary.
    ///
    /// Returns `None` for lines that are neither a layer change nor a
    /// feature-type marker.
    pub fn classify(&self, line: &str) -> Option<Marker> {
        if line.starts_with(self.layer_change.as_str()) {
            return Some(Marker::LayerChange);
        }
        if !line.starts_with(self.type_prefix.as_str()) {
            return None;
        }
        if let Some(start) = &self.start_gcode {
            if line.starts_with(start.as_str()) {
                return Some(Marker::StartGcode);
            }
        }
        if line.starts_with(self.inner_wall_begin.as_str()) {
            Some(Marker::InnerWallBegin)
        } else if line.starts_with(self.inner_wall_end.as_str()) {
            Some(Marker::InnerWallEnd)
        } else if line.starts_with(self.infill_begin.as_str()) {
            Some(Marker::InfillBegin)
        } else {
            Some(Marker::OtherType)
        }
    }

    /// Resolve a profile by sniffing the slicer banner in the file.
    ///
    /// OrcaSlicer output driving a Bambu printer carries Bambu-style
    /// `; FEATURE:` markers, so an Orca banner is promoted to the Bambu
    /// profile when a `; printer_model = Bambu` comment is present.
    pub fn detect<'a, I>(lines: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut found: Option<Self> = None;
        let mut bambu_printer = false;
        for line in lines {
            if found.is_none() {
                for profile in Self::all_profiles() {
                    if line.starts_with(profile.banner.as_str()) {
                        found = Some(profile);
                        break;
                    }
                }
            }
            if line.starts_with("; printer_model = Bambu") {
                bambu_printer = true;
            }
        }
        match found {
            Some(profile) if profile.name == "OrcaSlicer" && bambu_printer => {
                Some(Self::bambu())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_orca() {
        let p = SlicerProfile::orca();
        assert_eq!(p.classify(";LAYER_CHANGE"), Some(Marker::LayerChange));
        assert_eq!(p.classify(";TYPE:Inner wall"), Some(Marker::InnerWallBegin));
        assert_eq!(p.classify(";TYPE:Outer wall"), Some(Marker::InnerWallEnd));
        assert_eq!(p.classify(";TYPE:Sparse infill"), Some(Marker::InfillBegin));
        assert_eq!(p.classify(";TYPE:Custom"), Some(Marker::StartGcode));
        assert_eq!(p.classify(";TYPE:Bridge"), Some(Marker::OtherType));
        assert_eq!(p.classify("G1 X1 Y2 E0.1"), None);
        assert_eq!(p.classify("; some comment"), None);
    }

    #[test]
    fn test_classify_prusa_perimeter_prefixes() {
        // ";TYPE:Perimeter" and ";TYPE:External perimeter" must not shadow
        // each other.
        let p = SlicerProfile::prusa();
        assert_eq!(p.classify(";TYPE:Perimeter"), Some(Marker::InnerWallBegin));
        assert_eq!(
            p.classify(";TYPE:External perimeter"),
            Some(Marker::InnerWallEnd)
        );
        assert!(p.wall_end_keeps_section);
    }

    #[test]
    fn test_classify_cura_layer_prefix() {
        let p = SlicerProfile::cura();
        assert_eq!(p.classify(";LAYER:12"), Some(Marker::LayerChange));
        // ;LAYER_COUNT must not be mistaken for a layer change.
        assert_eq!(p.classify(";LAYER_COUNT:100"), None);
    }

    #[test]
    fn test_detect_banner() {
        let lines = ["; generated by PrusaSlicer 2.7.0 on 2024-01-01", "G28"];
        let p = SlicerProfile::detect(lines).unwrap();
        assert_eq!(p.name, "PrusaSlicer");

        assert!(SlicerProfile::detect(["G28", "G1 X0 Y0"]).is_none());
    }

    #[test]
    fn test_detect_orca_bambu_promotion() {
        let lines = [
            "; generated by OrcaSlicer 2.0.0",
            "; printer_model = Bambu Lab P1S",
        ];
        let p = SlicerProfile::detect(lines).unwrap();
        assert_eq!(p.name, "Bambu Studio");
    }
}
