//! kitcheck CLI: analyze toolkit photos and drive the check-in lifecycle.

use clap::{Args, Parser, Subcommand};
use kitcheck::analyze::{
    AnalysisPipeline, AnalysisStatus, RegistrationInfo, SlotVerdict, Summary,
};
use kitcheck::capture::{self, CaptureError};
use kitcheck::marker::Marker;
use kitcheck::state::{
    CheckInService, JsonFileStore, ServiceError, StoreError, TemplateStore,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to encode annotated image")]
    AnnotatedEncode,
}

#[derive(Parser)]
#[command(name = "kitcheck")]
#[command(about = "Verify toolkit completeness from photographs")]
#[command(version)]
struct Cli {
    /// Log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate corner fiducials in a photo (template-authoring preview).
    DetectMarkers(DetectMarkersArgs),

    /// Analyze a photo against a template definition file.
    Analyze(AnalyzeArgs),

    /// Register a new toolkit instance in the data directory.
    CreateToolkit(CreateToolkitArgs),

    /// Attach a reference image (and its marker layout) to a template.
    SetReference(SetReferenceArgs),

    /// Check a toolkit in from a photo.
    Checkin(CheckinArgs),

    /// Check a toolkit out.
    Checkout(CheckoutArgs),

    /// Show a toolkit's check-in history.
    History(HistoryArgs),
}

#[derive(Debug, Args)]
struct DetectMarkersArgs {
    /// Path to the input photo.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the marker report (JSON); stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Path to the template definition (JSON).
    #[arg(long)]
    template: PathBuf,

    /// Path to the input photo.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the analysis report (JSON); stdout when omitted.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Path to write the annotated review image (PNG).
    #[arg(long)]
    annotated: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CreateToolkitArgs {
    /// Data directory holding templates, toolkits and check-ins.
    #[arg(long)]
    data_dir: PathBuf,

    /// New toolkit id (e.g. MKA-001).
    #[arg(long)]
    toolkit: String,

    /// Template id the toolkit is an instance of.
    #[arg(long)]
    template: String,

    /// Display name.
    #[arg(long)]
    name: String,

    /// Initial location or assignee.
    #[arg(long)]
    location: Option<String>,
}

#[derive(Debug, Args)]
struct SetReferenceArgs {
    /// Data directory holding templates, toolkits and check-ins.
    #[arg(long)]
    data_dir: PathBuf,

    /// Template id to update.
    #[arg(long)]
    template: String,

    /// Path to the reference photo.
    #[arg(long)]
    image: PathBuf,
}

#[derive(Debug, Args)]
struct CheckinArgs {
    /// Data directory holding templates, toolkits and check-ins.
    #[arg(long)]
    data_dir: PathBuf,

    /// Toolkit id to check in.
    #[arg(long)]
    toolkit: String,

    /// Path to the check-in photo.
    #[arg(long)]
    image: PathBuf,

    /// Operator performing the check-in.
    #[arg(long)]
    by: Option<String>,

    /// Free-text note attached to the record.
    #[arg(long)]
    notes: Option<String>,

    /// Path to write the annotated review image (PNG).
    #[arg(long)]
    annotated: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Data directory holding templates, toolkits and check-ins.
    #[arg(long)]
    data_dir: PathBuf,

    /// Toolkit id to check out.
    #[arg(long)]
    toolkit: String,

    /// Destination location or assignee.
    #[arg(long)]
    location: Option<String>,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    /// Data directory holding templates, toolkits and check-ins.
    #[arg(long)]
    data_dir: PathBuf,

    /// Toolkit id to show history for.
    #[arg(long)]
    toolkit: String,

    /// Maximum number of records, most recent first.
    #[arg(long, default_value = "10")]
    limit: usize,
}

#[derive(Serialize)]
struct MarkerReport<'a> {
    image: String,
    count: usize,
    markers: &'a [Marker],
}

#[derive(Serialize)]
struct AnalyzeReport<'a> {
    template_id: &'a str,
    status: AnalysisStatus,
    summary: Summary,
    registration: &'a RegistrationInfo,
    per_slot: &'a [SlotVerdict],
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    let _ = kitcheck::core::init_with_level(level);

    match cli.command {
        Commands::DetectMarkers(args) => detect_markers(args),
        Commands::Analyze(args) => analyze(args),
        Commands::CreateToolkit(args) => create_toolkit(args),
        Commands::SetReference(args) => set_reference(args),
        Commands::Checkin(args) => checkin(args),
        Commands::Checkout(args) => checkout(args),
        Commands::History(args) => history(args),
    }
}

fn detect_markers(args: DetectMarkersArgs) -> Result<(), CliError> {
    let bytes = std::fs::read(&args.image)?;
    let markers = capture::locate_markers_in_bytes(&bytes)?;
    let report = MarkerReport {
        image: args.image.display().to_string(),
        count: markers.len(),
        markers: &markers,
    };
    emit_json(&report, args.out.as_deref())
}

fn analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let template = capture::load_template_json(&args.template)?;
    let bytes = std::fs::read(&args.image)?;

    let pipeline = AnalysisPipeline::default();
    let result = capture::analyze_image_bytes(&pipeline, &template, &bytes)?;

    if let Some(path) = &args.annotated {
        write_annotated(result.annotated.as_ref(), path)?;
    }

    let report = AnalyzeReport {
        template_id: &result.template_id,
        status: result.status,
        summary: result.summary,
        registration: &result.registration,
        per_slot: &result.per_slot,
    };
    emit_json(&report, args.report.as_deref())
}

fn create_toolkit(args: CreateToolkitArgs) -> Result<(), CliError> {
    let svc = open_service(&args.data_dir)?;
    let toolkit = svc.create_toolkit(
        &args.toolkit,
        &args.template,
        &args.name,
        args.location,
    )?;
    emit_json(&toolkit, None)
}

fn set_reference(args: SetReferenceArgs) -> Result<(), CliError> {
    let svc = open_service(&args.data_dir)?;
    let bytes = std::fs::read(&args.image)?;
    let rgb = capture::decode_rgb(&bytes)?;
    let markers = capture::locate_markers_in_bytes(&bytes)?;
    let layout = kitcheck::analyze::ReferenceMarkers::from_markers(&markers);

    let template = svc.set_reference_image(
        &args.template,
        &bytes,
        rgb.width(),
        rgb.height(),
        layout,
    )?;
    emit_json(&template, None)
}

fn checkin(args: CheckinArgs) -> Result<(), CliError> {
    let svc = open_service(&args.data_dir)?;
    let bytes = std::fs::read(&args.image)?;
    let rgb = capture::decode_rgb(&bytes)?;

    let outcome = svc.check_in(
        &args.toolkit,
        &capture::rgb_view(&rgb),
        args.by,
        args.notes,
    )?;

    if let Some(path) = &args.annotated {
        write_annotated(outcome.annotated.as_ref(), path)?;
    }
    emit_json(&outcome.record, None)
}

fn checkout(args: CheckoutArgs) -> Result<(), CliError> {
    let svc = open_service(&args.data_dir)?;
    let toolkit = svc.check_out(&args.toolkit, args.location)?;
    emit_json(&toolkit, None)
}

fn history(args: HistoryArgs) -> Result<(), CliError> {
    let svc = open_service(&args.data_dir)?;
    let records = svc.history(&args.toolkit, args.limit)?;
    emit_json(&records, None)
}

fn open_service(data_dir: &std::path::Path) -> Result<CheckInService<JsonFileStore>, CliError> {
    let store = JsonFileStore::open(data_dir)?;
    // fail early on an empty data dir rather than deep inside a check-in
    let _ = store.list_templates()?;
    Ok(CheckInService::new(store, AnalysisPipeline::default()))
}

fn write_annotated(
    annotated: Option<&kitcheck::core::RgbImage>,
    path: &std::path::Path,
) -> Result<(), CliError> {
    let Some(img) = annotated else {
        return Ok(());
    };
    let encoded = capture::to_image_rgb(img).ok_or(CliError::AnnotatedEncode)?;
    encoded
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(CaptureError::from)?;
    Ok(())
}

fn emit_json<T: Serialize>(value: &T, out: Option<&std::path::Path>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
