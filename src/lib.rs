//! openlabel-import: merge fragmented OpenLABEL annotations into per-media
//! label sets.
//!
//! OpenLABEL files describe objects, camera streams and frames as a graph
//! whose records may be split across frames and even across files. This
//! crate merges those fragments by object id, attaches them to the media
//! URIs they describe and emits typed, frame-relative labels (detections,
//! keypoints, polylines and instance masks).
//!
//! # Modules
//!
//! - [`openlabel`]: document parsing, object merging and label emission
//! - [`labels`]: typed geometry and label containers
//! - [`import`]: dataset discovery, media matching and the import report
//! - [`error`]: error types

pub mod error;
pub mod import;
pub mod labels;
pub mod openlabel;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

pub use error::OpenLabelError;
use import::{ImportOptions, ImportReport, ImportedSamples};
use openlabel::{
    parse_label_kinds, AnnotationStore, FlatAccumulator, FrameAccumulator, MediaKind,
    ObjectAccumulator, ObjectGroup,
};

/// The openlabel-import CLI application.
#[derive(Parser)]
#[command(name = "openlabel-import")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a dataset and write its samples as JSON.
    Import(ImportArgs),
    /// Summarize what label files contain, per media URI.
    Inspect(InspectArgs),
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Dataset root directory.
    #[arg(long, env = "OPENLABEL_DATASET_DIR")]
    dataset_dir: Option<PathBuf>,

    /// Media directory or JSON manifest (default: data.json or data/).
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Label file or directory of label files (default: labels.json or labels/).
    #[arg(long)]
    labels_path: Option<PathBuf>,

    /// Media type ('image' or 'video').
    #[arg(long, default_value = "image")]
    media: String,

    /// Label types to load, comma separated (default: all).
    #[arg(long, value_delimiter = ',')]
    label_types: Vec<String>,

    /// Emit segmentations as polylines instead of instance masks.
    #[arg(long)]
    use_polylines: bool,

    /// Write samples to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Label files to parse into one store.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Media type ('image' or 'video').
    #[arg(long, default_value = "image")]
    media: String,
}

/// Run the openlabel-import CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), OpenLabelError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Import(args)) => run_import(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        None => {
            println!("openlabel-import {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Merge OpenLABEL annotations into per-media label sets.");
            println!();
            println!("Run 'openlabel-import --help' for usage information.");
            Ok(())
        }
    }
}

fn run_import(args: ImportArgs) -> Result<(), OpenLabelError> {
    // Fail fast on bad options before touching the filesystem.
    let label_kinds = parse_label_kinds(&args.label_types)?;
    let media: MediaKind = args.media.parse()?;

    let options = ImportOptions {
        dataset_dir: args.dataset_dir,
        data_path: args.data_path,
        labels_path: args.labels_path,
        media,
        label_kinds,
        use_polylines: args.use_polylines,
    };

    let (samples, report) = import::import_dataset(&options)?;
    write_samples(&samples, args.output.as_deref())?;

    eprint!("{}", report);
    eprintln!("Imported {} {} sample(s)", samples.len(), media);

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(OpenLabelError::ImportFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn write_samples(samples: &ImportedSamples, output: Option<&Path>) -> Result<(), OpenLabelError> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, samples).map_err(|source| {
                OpenLabelError::OutputWrite {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            writeln!(writer)?;
            writer.flush()?;
        }
        None => {
            let json = serde_json::to_string_pretty(samples).map_err(|source| {
                OpenLabelError::OutputWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{json}");
        }
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), OpenLabelError> {
    match args.media.parse::<MediaKind>()? {
        MediaKind::Image => inspect_files::<FlatAccumulator>(&args.files),
        MediaKind::Video => inspect_files::<FrameAccumulator>(&args.files),
    }
}

fn inspect_files<A: ObjectAccumulator>(files: &[PathBuf]) -> Result<(), OpenLabelError> {
    let mut store = AnnotationStore::<A>::new();
    let mut report = ImportReport::new();
    import::parse_label_files(&mut store, Path::new("."), files, &mut report);

    for uri in store.uris() {
        let objects = store.get_objects(uri);
        let stream = store.get_stream(uri);
        match (stream.name.as_deref(), stream.frame_size()) {
            (Some(name), Some(size)) => {
                println!("{uri}: {} [stream {name}, {size}]", objects.describe())
            }
            (Some(name), None) => println!("{uri}: {} [stream {name}]", objects.describe()),
            (None, _) => println!("{uri}: {}", objects.describe()),
        }
    }

    if report.is_clean() {
        return Ok(());
    }
    eprint!("{report}");
    if report.error_count() > 0 {
        Err(OpenLabelError::ImportFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}
