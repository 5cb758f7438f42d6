//! dotgrid: fill lasso regions of images with dot lattices from the
//! command line.
//!
//! Two subcommands:
//!
//! - `fill` loads images, commits one lattice layer per `--polygon` on
//!   every image, adds freeform text and dots, and writes a zip archive of
//!   PNGs or a multi-page PDF.
//! - `report` splits a dot total across polygons by area.
//!
//! # Usage
//!
//! ```text
//! dotgrid fill photo.jpg --polygon "10,10 200,20 120,180" --count 150 -o out.zip
//! dotgrid report --count 100 --polygon "0,0 10,0 10,10" --polygon "0,0 5,0 5,5"
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod fonts;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dotgrid_core::allocate::shares_for_areas;
use dotgrid_core::geometry::polygon_area;
use dotgrid_core::{
    Color, EditorDefaults, EditorMode, InputFile, Jitter, LabelPosition, LabelStyle,
    LatticeParams, NumberingPatch, PageSelection, Point, Polygon, Session, ingest,
};
use dotgrid_export::{
    CancelToken, ExportArtifact, ExportContext, ExportFormat, ExportSink, ExportStatus, export,
};
use serde::{Deserialize, Serialize};

/// Fill image regions with dot lattices and export the annotated result.
#[derive(Parser)]
#[command(name = "dotgrid", version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate images and export them.
    Fill(FillArgs),
    /// Print each polygon's area share and dot allocation.
    Report(ReportArgs),
}

#[derive(Args)]
struct FillArgs {
    /// Input images (PNG, JPEG, BMP, WebP).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Lasso polygon as space-separated `x,y` pairs. Repeat for more layers.
    #[arg(long, required = true)]
    polygon: Vec<PolygonArg>,

    /// Output file.
    #[arg(short, long)]
    output: PathBuf,

    /// Output format. Defaults to pdf for a `.pdf` output, zip otherwise.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Maximum number of dots per layer.
    #[arg(long, default_value_t = DEFAULT_COUNT)]
    count: usize,

    /// Dot diameter in pixels.
    #[arg(long, default_value_t = EditorDefaults::DEFAULT_DOT_SIZE)]
    size: f64,

    /// Clear space between dots in pixels.
    #[arg(long, default_value_t = EditorDefaults::DEFAULT_GAP)]
    gap: f64,

    /// Minimum distance between dots and polygon edges.
    #[arg(long, default_value_t = EditorDefaults::DEFAULT_PADDING)]
    padding: f64,

    /// Lattice rotation in degrees.
    #[arg(long, default_value_t = EditorDefaults::DEFAULT_ROTATION)]
    rotation: f64,

    /// Randomly offset each dot.
    #[arg(long)]
    jitter: bool,

    /// Upper bound of the jitter offset in pixels.
    #[arg(long, default_value_t = EditorDefaults::DEFAULT_JITTER_MAGNITUDE)]
    jitter_magnitude: f64,

    /// Seed for jitter, for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Number the lattice dots.
    #[arg(long)]
    numbering: bool,

    /// Where labels sit relative to their dot.
    #[arg(long, value_enum)]
    label_position: Option<Position>,

    /// Label font size in pixels.
    #[arg(long)]
    label_font_size: Option<f64>,

    /// Gap between a dot's edge and its label in pixels.
    #[arg(long)]
    label_offset: Option<f64>,

    /// Label color (`#rgb`, `#rrggbb`, `#rrggbbaa`, `black`, `white`).
    #[arg(long)]
    label_color: Option<Color>,

    /// Freeform text as `X,Y,CONTENT`. Repeatable.
    #[arg(long)]
    text: Vec<TextArg>,

    /// Freeform dot centre as `X,Y`. Repeatable.
    #[arg(long)]
    dot: Vec<PointArg>,

    /// Font file used for text in families not found on the system, and
    /// for labels when no bold face is found.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font file for numbering labels.
    #[arg(long)]
    label_font: Option<PathBuf>,

    /// Full fill config as a JSON string.
    ///
    /// When provided, the lattice, numbering and style flags are ignored.
    /// The JSON must be a valid `FillConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct ReportArgs {
    /// Total number of dots to split.
    #[arg(long)]
    count: usize,

    /// Region polygon as space-separated `x,y` pairs. Repeatable.
    #[arg(long, required = true)]
    polygon: Vec<PolygonArg>,

    /// Output the report as JSON.
    #[arg(long)]
    json: bool,
}

const DEFAULT_COUNT: usize = 100;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Zip,
    Pdf,
}

/// Label position selection.
#[derive(Clone, Copy, ValueEnum)]
enum Position {
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

const fn position_to_core(p: Position) -> LabelPosition {
    match p {
        Position::Top => LabelPosition::Top,
        Position::TopRight => LabelPosition::TopRight,
        Position::Right => LabelPosition::Right,
        Position::BottomRight => LabelPosition::BottomRight,
        Position::Bottom => LabelPosition::Bottom,
        Position::BottomLeft => LabelPosition::BottomLeft,
        Position::Left => LabelPosition::Left,
        Position::TopLeft => LabelPosition::TopLeft,
    }
}

// ---------------------------------------------------------------------------
// Argument values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct PointArg(Point);

impl FromStr for PointArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
        Ok(Self(Point::new(coordinate(x)?, coordinate(y)?)))
    }
}

fn coordinate(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("bad coordinate {s:?}: {e}"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("bad coordinate {s:?}: not finite"))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PolygonArg(Vec<Point>);

impl FromStr for PolygonArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let points = s
            .split_whitespace()
            .map(|pair| pair.parse::<PointArg>().map(|p| p.0))
            .collect::<Result<Vec<_>, _>>()?;
        if points.len() < 3 {
            return Err(format!("a polygon needs at least 3 points, got {}", points.len()));
        }
        Ok(Self(points))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TextArg {
    at: Point,
    content: String,
}

impl FromStr for TextArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ',');
        let (Some(x), Some(y), Some(content)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("expected X,Y,CONTENT, got {s:?}"));
        };
        Ok(Self {
            at: Point::new(coordinate(x)?, coordinate(y)?),
            content: content.to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Everything `fill` needs besides inputs and placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct FillConfig {
    defaults: EditorDefaults,
    lattice: LatticeParams,
    /// Applied to every lattice layer after commit.
    numbering: NumberingPatch,
}

impl Default for FillConfig {
    fn default() -> Self {
        let defaults = EditorDefaults::default();
        let lattice = LatticeParams {
            size: defaults.dot_size,
            gap: defaults.gap,
            padding: defaults.padding,
            rotation: defaults.rotation,
            target_count: DEFAULT_COUNT,
            jitter: Jitter {
                enabled: false,
                magnitude: defaults.jitter_magnitude,
            },
        };
        Self {
            defaults,
            lattice,
            numbering: NumberingPatch::default(),
        }
    }
}

/// Build a [`FillConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(args: &FillArgs) -> Result<FillConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let defaults = EditorDefaults::default();
    Ok(FillConfig {
        lattice: LatticeParams {
            size: args.size,
            gap: args.gap,
            padding: args.padding,
            rotation: args.rotation,
            target_count: args.count,
            jitter: Jitter {
                enabled: args.jitter,
                magnitude: args.jitter_magnitude,
            },
        },
        numbering: NumberingPatch {
            enabled: args.numbering.then_some(true),
            style: LabelStyle {
                label_font_size: args.label_font_size,
                label_offset: args.label_offset,
                label_color: args.label_color,
                label_position: args.label_position.map(position_to_core),
            },
        },
        defaults,
    })
}

fn format_for(args: &FillArgs) -> ExportFormat {
    match args.format {
        Some(Format::Zip) => ExportFormat::Zip,
        Some(Format::Pdf) => ExportFormat::Pdf,
        None => {
            let is_pdf = args
                .output
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if is_pdf {
                ExportFormat::Pdf
            } else {
                ExportFormat::Zip
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Writes the artifact to a file path.
struct FileSink<'a> {
    path: &'a Path,
}

impl ExportSink for FileSink<'_> {
    fn deliver(&mut self, artifact: ExportArtifact) -> Result<(), String> {
        std::fs::write(self.path, &artifact.bytes).map_err(|e| e.to_string())?;
        eprintln!(
            "{} written to {} ({} bytes)",
            artifact.file_name,
            self.path.display(),
            artifact.bytes.len()
        );
        Ok(())
    }
}

fn run_fill(args: &FillArgs) -> Result<(), String> {
    let config = config_from_cli(args)?;
    let format = format_for(args);

    let mut files = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let bytes = std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_owned();
        files.push(InputFile::new(name, bytes));
    }
    let records = ingest(files, None, &PageSelection::All).map_err(|e| e.to_string())?;
    if records.is_empty() {
        return Err("No usable images among the inputs".to_owned());
    }

    let mut session = match args.seed {
        Some(seed) => Session::with_seed(config.defaults.clone(), seed),
        None => Session::new(config.defaults.clone()),
    };
    let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
    session.add_images(records);
    session.set_params(config.lattice);

    for id in &ids {
        annotate(&mut session, id, args, &config).map_err(|e| format!("{id}: {e}"))?;
    }

    let fonts = fonts::load_font_book(args.font.as_deref(), args.label_font.as_deref())?;
    let mut ctx = ExportContext::new(fonts, config.defaults);
    ctx.file_name = args
        .output
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned);

    let mut sink = FileSink { path: &args.output };
    export(
        &session.export_records(),
        format,
        &mut ctx,
        &CancelToken::new(),
        &mut log_status,
        &mut sink,
    )
    .map_err(|e| format!("Export failed: {e}"))?;

    for (index, share) in session.image_report(config.lattice.target_count).iter().enumerate() {
        log::info!(
            "image {}: {:.0} px², {}%, {} dots",
            index + 1,
            share.area,
            share.percentage,
            share.dots
        );
    }
    Ok(())
}

/// Commit one lattice layer per polygon on image `id`, then one layer with
/// the freeform text and dots.
fn annotate(
    session: &mut Session,
    id: &str,
    args: &FillArgs,
    config: &FillConfig,
) -> Result<(), dotgrid_core::SessionError> {
    session.select_image(id)?;

    session.set_mode(EditorMode::Lasso);
    for polygon in &args.polygon {
        session.set_polygon(polygon.0.clone());
        let index = session.commit_layer()?;
        if config.numbering != NumberingPatch::default() {
            session.patch_numbering(index, None, &config.numbering)?;
        }
    }

    if args.text.is_empty() && args.dot.is_empty() {
        return Ok(());
    }
    session.set_mode(EditorMode::Text);
    for text in &args.text {
        let text_id = session.place_text(text.at)?;
        session
            .texts_mut()
            .update(&text_id, |t| t.text.clone_from(&text.content));
    }
    session.set_mode(EditorMode::Dot);
    for dot in &args.dot {
        session.place_dot(dot.0)?;
    }
    session.commit_layer()?;
    Ok(())
}

fn log_status(status: &ExportStatus) {
    match status {
        ExportStatus::Processing { index, total, name } => {
            log::info!("[{:>3}%] processing {}/{total}: {name}", status.percent().unwrap_or(0), index + 1);
        }
        ExportStatus::Encoding | ExportStatus::Delivering => {
            log::info!("[{:>3}%] {status:?}", status.percent().unwrap_or(0));
        }
        ExportStatus::Completed { file_name } => log::info!("[100%] completed {file_name}"),
        ExportStatus::Error(_) | ExportStatus::Cancelled => {}
    }
}

fn run_report(args: &ReportArgs) -> Result<(), String> {
    let areas: Vec<f64> = args
        .polygon
        .iter()
        .map(|p| polygon_area(&Polygon::new(p.0.clone())))
        .collect();
    let shares = shares_for_areas(&areas, args.count);

    if args.json {
        let json = serde_json::to_string_pretty(&shares)
            .map_err(|e| format!("Error serializing report: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    println!("{:<8} {:>14} {:>8} {:>8}", "Region", "Area (px²)", "Share", "Dots");
    println!("{}", "-".repeat(41));
    for (index, share) in shares.iter().enumerate() {
        println!(
            "{:<8} {:>14.1} {:>7}% {:>8}",
            index + 1,
            share.area,
            share.percentage,
            share.dots
        );
    }
    println!("{}", "-".repeat(41));
    println!(
        "{:<8} {:>14.1} {:>8} {:>8}",
        "Total",
        areas.iter().sum::<f64>(),
        "",
        shares.iter().map(|s| s.dots).sum::<usize>()
    );
    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Command::Fill(args) => run_fill(args),
        Command::Report(args) => run_report(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
