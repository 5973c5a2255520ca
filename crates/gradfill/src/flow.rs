//! Flow gradient mapping and hotend flow-rate control.
//!
//! The gradient mapper turns a wall distance into an extrusion multiplier.
//! The [`FeedController`] decides, per emitted move, whether a feed command
//! must precede it: a computed override when the scaled move would exceed
//! the hotend's volumetric ceiling, the slicer's original feed when the
//! feed state is stale, or nothing at all.

use std::f64::consts::PI;

use log::warn;

use crate::GradientConfig;

/// Extrusion multiplier for a move at `distance` mm from the nearest wall.
///
/// Inside the gradient zone the factor falls linearly from
/// `max_flow / 100` at the wall to `min_flow / 100` at
/// `gradient_thickness`. Beyond the zone there is no gradient value;
/// callers decide between the thin-inner-core clamp and passing the move
/// through untouched.
pub(crate) fn gradient_factor(distance: f64, config: &GradientConfig) -> Option<f64> {
    if distance < config.gradient_thickness {
        let max = config.max_flow / 100.0;
        let min = config.min_flow / 100.0;
        Some(max + distance * (min - max) / config.gradient_thickness)
    } else {
        None
    }
}

/// Volumetric flow (mm³/s) implied by a feed, an extrusion length and a
/// travel length.
pub(crate) fn volumetric_flow(feed: f64, extrusion: f64, length: f64, filament_diameter: f64) -> f64 {
    feed * filament_diameter * filament_diameter * PI * extrusion / (4.0 * length * 60.0)
}

/// Feedrate (mm/min) that keeps a move of `length` mm extruding
/// `scaled_extrusion` mm of filament exactly at `hotend_max_flow`.
/// Rounded to 3 decimals.
pub(crate) fn flow_limit_feed(
    hotend_max_flow: f64,
    scaled_extrusion: f64,
    length: f64,
    filament_diameter: f64,
) -> f64 {
    let feed = hotend_max_flow * length * 60.0 * 4.0
        / (scaled_extrusion * filament_diameter * filament_diameter * PI);
    (feed * 1000.0).round() / 1000.0
}

/// Feed command to emit immediately before a rewritten move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FeedCommand {
    /// Computed override that pins the move to the hotend flow ceiling.
    Limit(f64),
    /// The slicer's own feed, re-established after it went stale.
    Restore(f64),
}

/// Feed and nominal-flow bookkeeping for one pass.
///
/// Tracks the slicer's active feedrate, the nominal volumetric flow of the
/// current infill run, and whether the printer's feed state still matches
/// the slicer's choice.
#[derive(Debug, Default)]
pub(crate) struct FeedController {
    slicer_feed: Option<f64>,
    nominal_flow: Option<f64>,
    feed_is_current: bool,
}

impl FeedController {
    /// Reset per-run state at the start of a contiguous infill run.
    pub(crate) fn begin_run(&mut self) {
        self.nominal_flow = None;
        self.feed_is_current = false;
    }

    /// Record a feed value set by the slicer inside the infill run.
    pub(crate) fn capture_feed(&mut self, feed: f64) {
        self.slicer_feed = Some(feed);
        self.feed_is_current = false;
    }

    /// Nominal volumetric flow of the run, computed once from the first
    /// feed + extrusion pair (the slicer's own numbers, before scaling).
    ///
    /// Warns when the slicer already demands more flow than the configured
    /// hotend ceiling; the per-move limiter clamps it downstream.
    pub(crate) fn observe_move(&mut self, extrusion: f64, length: f64, config: &GradientConfig) {
        if self.nominal_flow.is_some() || length <= 0.0 {
            return;
        }
        if let Some(feed) = self.slicer_feed {
            let nominal = volumetric_flow(feed, extrusion, length, config.filament_diameter);
            if nominal > config.hotend_max_flow {
                warn!(
                    "slicer infill flow {:.2} mm^3/s exceeds hotend limit {:.2} mm^3/s; \
                     feed will be capped per move",
                    nominal, config.hotend_max_flow
                );
            }
            self.nominal_flow = Some(nominal);
        }
    }

    /// Decide the feed command for one scaled move.
    ///
    /// Over the flow ceiling: an override feed, and the slicer feed becomes
    /// stale. Within the ceiling: the slicer's feed exactly once after it
    /// went stale, nothing otherwise.
    pub(crate) fn plan_feed(
        &mut self,
        flow_factor: f64,
        scaled_extrusion: f64,
        length: f64,
        config: &GradientConfig,
    ) -> Option<FeedCommand> {
        let current_flow = self.nominal_flow.unwrap_or(0.0) * flow_factor;
        if current_flow > config.hotend_max_flow {
            self.feed_is_current = false;
            Some(FeedCommand::Limit(flow_limit_feed(
                config.hotend_max_flow,
                scaled_extrusion,
                length,
                config.filament_diameter,
            )))
        } else if self.feed_is_current {
            None
        } else {
            self.feed_is_current = true;
            self.slicer_feed.map(FeedCommand::Restore)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> GradientConfig {
        GradientConfig {
            max_flow: 550.0,
            min_flow: 50.0,
            gradient_thickness: 20.0,
            ..GradientConfig::default()
        }
    }

    #[test]
    fn test_gradient_factor_endpoints() {
        let cfg = config();
        assert_relative_eq!(gradient_factor(0.0, &cfg).unwrap(), 5.5);
        // Scenario: d=2, T=20, 550% -> 50% gives a factor of exactly 5.
        assert_relative_eq!(gradient_factor(2.0, &cfg).unwrap(), 5.0);
        // At and beyond the gradient thickness there is no gradient value.
        assert!(gradient_factor(20.0, &cfg).is_none());
        assert!(gradient_factor(25.0, &cfg).is_none());
    }

    #[test]
    fn test_gradient_factor_monotonic() {
        let cfg = config();
        let mut previous = f64::INFINITY;
        for i in 0..=200 {
            let d = cfg.gradient_thickness * i as f64 / 200.0;
            if let Some(factor) = gradient_factor(d, &cfg) {
                assert!(factor <= previous);
                previous = factor;
            }
        }
        // The interpolation reaches min_flow exactly at the zone edge.
        let edge = gradient_factor(cfg.gradient_thickness - 1e-12, &cfg).unwrap();
        assert_relative_eq!(edge, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_volumetric_flow_round_trip() {
        // A feed computed by the limiter must reproduce the limit flow.
        let feed = flow_limit_feed(20.0, 5.0, 1.0, 1.75);
        let flow = volumetric_flow(feed, 5.0, 1.0, 1.75);
        assert_relative_eq!(flow, 20.0, epsilon = 1e-3);
    }

    #[test]
    fn test_flow_limit_feed_value() {
        // F = 20 * 1 * 60 * 4 / (5 * 1.75^2 * pi), rounded to 3 decimals.
        let expected = (20.0 * 1.0 * 60.0 * 4.0 / (5.0 * 1.75 * 1.75 * PI) * 1000.0).round() / 1000.0;
        assert_eq!(flow_limit_feed(20.0, 5.0, 1.0, 1.75), expected);
    }

    #[test]
    fn test_feed_controller_dedup() {
        let cfg = config();
        let mut ctl = FeedController::default();
        ctl.begin_run();
        ctl.capture_feed(1200.0);
        ctl.observe_move(0.1, 10.0, &cfg);

        // First move restores the slicer feed, the next two stay silent.
        assert_eq!(
            ctl.plan_feed(1.0, 0.1, 10.0, &cfg),
            Some(FeedCommand::Restore(1200.0))
        );
        assert_eq!(ctl.plan_feed(1.0, 0.1, 10.0, &cfg), None);
        assert_eq!(ctl.plan_feed(1.0, 0.1, 10.0, &cfg), None);
    }

    #[test]
    fn test_feed_controller_limit_then_restore() {
        let cfg = config();
        let mut ctl = FeedController::default();
        ctl.begin_run();
        ctl.capture_feed(3600.0);
        // 3600 mm/min at E/L = 1 -> 144.3 mm^3/s nominal, far over the
        // 20 mm^3/s ceiling.
        ctl.observe_move(1.0, 1.0, &cfg);

        match ctl.plan_feed(1.0, 1.0, 1.0, &cfg) {
            Some(FeedCommand::Limit(feed)) => {
                assert!(feed < 3600.0);
            }
            other => panic!("expected a limit feed, got {other:?}"),
        }
        // A subsequent in-limit move must re-establish the slicer feed.
        assert_eq!(
            ctl.plan_feed(0.05, 0.05, 1.0, &cfg),
            Some(FeedCommand::Restore(3600.0))
        );
    }
}
