//! The gradient rewrite pass.
//!
//! A single forward pass over the G-code stream. Marker lines drive the
//! section state machine; wall moves feed the per-layer wall geometry;
//! infill moves are rescaled (and, for linear infill, subdivided) according
//! to their distance from the nearest wall. Everything else passes through
//! byte-identical.

use gradfill_gcode::{line, GcodeError, Marker, SlicerProfile};
use log::{debug, warn};

use crate::flow::{gradient_factor, FeedCommand, FeedController};
use crate::geometry::{nearest_wall, points_distance, Point2, Segment, Vec2};
use crate::{GradientConfig, InfillPattern, Result, RewriteOutput, RewriteStats};

/// Where in the toolpath the cursor currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Nothing,
    InnerWall,
    Infill,
}

/// Wall-parallel strokes closer than the critical distance and within this
/// angle of the wall direction keep full flow (collinearity guard).
const COLLINEAR_MAX_ANGLE_DEG: f64 = 15.0;

/// Position sentinel used before the first tracked move.
const NO_POSITION: (f64, f64) = (-10000.0, -10000.0);

pub(crate) fn rewrite(
    input: &str,
    profile: &SlicerProfile,
    config: &GradientConfig,
) -> Result<RewriteOutput> {
    let mut rewriter = Rewriter::new(profile, config);
    for raw in input.split_inclusive('\n') {
        rewriter.process_line(raw)?;
    }
    Ok(rewriter.finish())
}

struct Rewriter<'a> {
    profile: &'a SlicerProfile,
    config: &'a GradientConfig,
    section: Section,
    last_pos: Point2,
    /// True while positions are meaningless (inside custom start G-code).
    ignore_position: bool,
    /// Wall geometry of the current layer only.
    walls: Vec<Segment>,
    feed: FeedController,
    out: String,
    stats: RewriteStats,
    line_no: usize,
}

impl<'a> Rewriter<'a> {
    fn new(profile: &'a SlicerProfile, config: &'a GradientConfig) -> Self {
        Self {
            profile,
            config,
            section: Section::Nothing,
            last_pos: Point2::new(NO_POSITION.0, NO_POSITION.1),
            ignore_position: true,
            walls: Vec::new(),
            feed: FeedController::default(),
            out: String::new(),
            stats: RewriteStats::default(),
            line_no: 0,
        }
    }

    fn process_line(&mut self, raw: &str) -> Result<()> {
        self.line_no += 1;
        self.stats.input_lines += 1;
        let line = raw.trim_end_matches(['\r', '\n']);

        // Slicer banner removal works around broken G-code previews that
        // trip over the rewritten file still claiming the original stats.
        if self.line_no == 1
            && self.config.strip_banner
            && self.profile.strip_banner
            && line.starts_with(self.profile.banner.as_str())
        {
            return Ok(());
        }

        if line::is_arc(line) {
            return Err(GcodeError::UnsupportedArc {
                line: self.line_no,
                text: line.to_string(),
            }
            .into());
        }

        match self.profile.classify(line) {
            Some(Marker::LayerChange) => {
                self.walls.clear();
                self.stats.layers += 1;
                debug!("layer {} at line {}", self.stats.layers, self.line_no);
                // Not a feature-type line; falls through to pass-through.
            }
            Some(marker) => {
                self.ignore_position = marker == Marker::StartGcode;
                self.section = match marker {
                    Marker::InnerWallBegin => Section::InnerWall,
                    Marker::InnerWallEnd if self.profile.wall_end_keeps_section => {
                        Section::InnerWall
                    }
                    Marker::InfillBegin => {
                        self.feed.begin_run();
                        Section::Infill
                    }
                    _ => Section::Nothing,
                };
                self.emit_raw(raw);
                return Ok(());
            }
            None => {}
        }

        let mut edited = false;

        if self.section == Section::InnerWall && line::is_extrusion_move(line) {
            let (x, y) = line::parse_xy(line, self.line_no)?;
            self.walls.push(Segment::new(Point2::new(x, y), self.last_pos));
        }

        if self.section == Section::Infill {
            if line::has_feed(line) {
                let feed = line::feedrate(line).ok_or_else(|| GcodeError::MalformedMove {
                    line: self.line_no,
                    text: line.to_string(),
                })?;
                self.feed.capture_feed(feed);
            }
            if line::is_extrusion_move(line) {
                edited = self.rewrite_infill_move(line)?;
            }
        }

        if line::is_move(line) && !self.ignore_position {
            let (x, y) = line::parse_xy(line, self.line_no)?;
            self.last_pos = Point2::new(x, y);
        }

        if edited {
            self.stats.edited_moves += 1;
        } else {
            self.emit_raw(raw);
        }
        Ok(())
    }

    fn rewrite_infill_move(&mut self, line: &str) -> Result<bool> {
        let (x, y) = line::parse_xy(line, self.line_no)?;
        let target = Point2::new(x, y);
        let extrusion =
            line::extrusion_length(line).ok_or_else(|| GcodeError::MalformedMove {
                line: self.line_no,
                text: line.to_string(),
            })?;
        let length = points_distance(&self.last_pos, &target);
        self.feed.observe_move(extrusion, length, self.config);

        match self.config.infill_pattern {
            InfillPattern::SmallSegments => Ok(self.rewrite_small_segments(target, extrusion, length)),
            InfillPattern::Linear => Ok(self.rewrite_linear(target, extrusion, length)),
        }
    }

    /// Per-move scaling for gyroid/honeycomb-style infill.
    fn rewrite_small_segments(&mut self, target: Point2, extrusion: f64, length: f64) -> bool {
        let query = Segment::new(self.last_pos, target);
        let Some((distance, wall)) = nearest_wall(&query, &self.walls) else {
            // No wall geometry collected yet this layer; nothing to grade
            // against, so the move stays untouched.
            return false;
        };
        if let Some(mut factor) = gradient_factor(distance, self.config) {
            if self.config.collinearity_guard
                && distance <= self.config.critical_distance()
                && query.angle_to(wall).to_degrees() < COLLINEAR_MAX_ANGLE_DEG
            {
                // A reduced stroke running along the wall leaves a visible
                // gap; keep it at full flow.
                factor = 1.0;
            }
            let scaled = extrusion * factor;
            self.emit_scaled_move(target, scaled, length, factor);
            true
        } else if self.config.thin_inner_core {
            // Far field: flow only drops, no limiter involvement.
            let scaled = extrusion * self.config.min_flow / 100.0;
            self.emit_line(&line::format_move(target.x, target.y, scaled));
            true
        } else {
            false
        }
    }

    /// Subdividing rewrite for rectilinear-style infill strokes.
    fn rewrite_linear(&mut self, target: Point2, extrusion: f64, length: f64) -> bool {
        let unit = self.config.gradient_thickness / self.config.gradient_discretization;
        let steps = length / unit;
        let far_factor = self.config.max_flow / 100.0;

        if steps < 2.0 {
            // Splitting below two units yields no visible gradient and
            // destabilizes the feed bookkeeping; emit one far-field move.
            let scaled = extrusion * far_factor;
            self.emit_scaled_move(target, scaled, length, far_factor);
            return true;
        }

        let count = steps as usize;
        let step_extrusion = extrusion / steps;
        let direction: Vec2 = (target - self.last_pos) / length * unit;
        for _ in 0..count {
            let step_end = self.last_pos + direction;
            let query = Segment::new(self.last_pos, step_end);
            let factor = nearest_wall(&query, &self.walls)
                .and_then(|(distance, _)| gradient_factor(distance, self.config))
                .unwrap_or(self.config.min_flow / 100.0);
            self.emit_scaled_move(step_end, step_extrusion * factor, unit, factor);
            self.last_pos = step_end;
        }

        // Remainder of the stroke, always at the far-field rate.
        let remainder = points_distance(&self.last_pos, &target);
        let scaled = remainder / length * extrusion * far_factor;
        self.emit_scaled_move(target, scaled, remainder, far_factor);
        true
    }

    fn emit_scaled_move(&mut self, target: Point2, scaled_extrusion: f64, length: f64, factor: f64) {
        if let Some(cmd) = self.feed.plan_feed(factor, scaled_extrusion, length, self.config) {
            let feed = match cmd {
                FeedCommand::Limit(f) | FeedCommand::Restore(f) => f,
            };
            self.emit_line(&line::format_feed(feed));
            self.stats.injected_feeds += 1;
        }
        self.emit_line(&line::format_move(target.x, target.y, scaled_extrusion));
    }

    fn emit_line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
        self.stats.output_lines += 1;
    }

    fn emit_raw(&mut self, raw: &str) {
        self.out.push_str(raw);
        self.stats.output_lines += 1;
    }

    fn finish(mut self) -> RewriteOutput {
        if self.stats.edited_moves == 0 {
            warn!(
                "no infill moves were rewritten; the slicer profile or the \
                 configured infill pattern likely does not match this file"
            );
        }
        self.stats.changed = self.stats.edited_moves > 0;
        RewriteOutput {
            gcode: self.out,
            stats: self.stats,
        }
    }
}
