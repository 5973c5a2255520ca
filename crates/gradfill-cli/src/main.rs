//! gradfill CLI - gradient infill post-processor
//!
//! Rewrites sliced G-code so infill flow ramps down with distance from the
//! perimeter walls. Designed to run standalone or as a slicer
//! post-processing script (in-place rewrite of the file the slicer hands
//! over).

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use gradfill::{
    detect_profile, detect_settings, process_gcode, GradientConfig, InfillPattern, SlicerProfile,
};

#[derive(Parser)]
#[command(name = "gradfill")]
#[command(about = "Add gradient infill to sliced G-code", long_about = None)]
struct Cli {
    /// Input G-code file
    input: PathBuf,

    /// Output file (default: rewrite the input in place)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with gradient parameters (flags below take precedence)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Slicer whose markers to expect
    #[arg(long, value_enum, default_value = "auto")]
    slicer: SlicerArg,

    /// Infill pattern family
    #[arg(long, value_enum)]
    pattern: Option<PatternArg>,

    /// Read hotend limit, pattern and line widths from the slicer's
    /// settings comments before applying flags
    #[arg(long)]
    auto: bool,

    /// Extrusion flow at the walls, percent
    #[arg(long)]
    max_flow: Option<f64>,

    /// Extrusion flow at the gradient edge, percent
    #[arg(long)]
    min_flow: Option<f64>,

    /// Gradient zone thickness, mm
    #[arg(long)]
    thickness: Option<f64>,

    /// Sub-segments per gradient thickness (linear pattern only)
    #[arg(long)]
    discretization: Option<f64>,

    /// Hotend volumetric flow ceiling, mm^3/s
    #[arg(long)]
    hotend_max_flow: Option<f64>,

    /// Filament diameter, mm
    #[arg(long)]
    filament_diameter: Option<f64>,

    /// Reduce infill beyond the gradient zone to the minimum flow
    #[arg(long)]
    thin_inner_core: Option<bool>,

    /// Keep full flow on strokes running parallel and adjacent to a wall
    #[arg(long)]
    collinearity_guard: bool,

    /// Keep the slicer banner line in the output
    #[arg(long)]
    keep_banner: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SlicerArg {
    /// Sniff the slicer from the file header
    Auto,
    Orca,
    Prusa,
    Bambu,
    Cura,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PatternArg {
    SmallSegments,
    Linear,
}

impl From<PatternArg> for InfillPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::SmallSegments => InfillPattern::SmallSegments,
            PatternArg::Linear => InfillPattern::Linear,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let input = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let profile = match cli.slicer {
        SlicerArg::Auto => detect_profile(&input)?,
        SlicerArg::Orca => SlicerProfile::orca(),
        SlicerArg::Prusa => SlicerProfile::prusa(),
        SlicerArg::Bambu => SlicerProfile::bambu(),
        SlicerArg::Cura => SlicerProfile::cura(),
    };

    let config = build_config(&cli, &input)?;
    let output = process_gcode(&input, &profile, &config)?;

    let dest = cli.output.as_deref().unwrap_or(&cli.input);
    write_replacing(dest, output.gcode.as_bytes())
        .with_context(|| format!("failed to write {}", dest.display()))?;

    let stats = output.stats;
    println!(
        "{}: {} -> {} lines, {} moves rewritten, {} feed commands injected, {} layers",
        profile.name,
        stats.input_lines,
        stats.output_lines,
        stats.edited_moves,
        stats.injected_feeds,
        stats.layers
    );
    if !stats.changed {
        eprintln!(
            "warning: no changes were made; is {} really {} G-code with {:?} infill?",
            cli.input.display(),
            profile.name,
            config.infill_pattern
        );
    }

    Ok(())
}

fn build_config(cli: &Cli, input: &str) -> Result<GradientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => GradientConfig::default(),
    };

    if cli.auto {
        detect_settings(input).apply_to(&mut config);
    }

    if let Some(v) = cli.max_flow {
        config.max_flow = v;
    }
    if let Some(v) = cli.min_flow {
        config.min_flow = v;
    }
    if let Some(v) = cli.thickness {
        config.gradient_thickness = v;
    }
    if let Some(v) = cli.discretization {
        config.gradient_discretization = v;
    }
    if let Some(v) = cli.hotend_max_flow {
        config.hotend_max_flow = v;
    }
    if let Some(v) = cli.filament_diameter {
        config.filament_diameter = v;
    }
    if let Some(v) = cli.thin_inner_core {
        config.thin_inner_core = v;
    }
    if let Some(pattern) = cli.pattern {
        config.infill_pattern = pattern.into();
    }
    if cli.collinearity_guard {
        config.collinearity_guard = true;
    }
    if cli.keep_banner {
        config.strip_banner = false;
    }

    Ok(config)
}

/// Write through a temporary file and rename over the destination, so a
/// failure mid-write can never truncate a file that already exists (the
/// usual invocation overwrites the slicer's own output in place).
fn write_replacing(dest: &Path, contents: &[u8]) -> Result<()> {
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("gradfill-output");
    let tmp = dest.with_file_name(format!(".{name}.tmp"));
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, dest) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
