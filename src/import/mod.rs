//! Dataset import: label discovery, media matching and sample assembly.
//!
//! A dataset is a media location (a directory or a JSON manifest) plus one
//! or more OpenLABEL files. [`OpenLabelImporter::setup`] parses every label
//! file into one [`AnnotationStore`] and keeps the filenames that match
//! known media; `samples` then resolves each of them to a media path, frame
//! dimensions and typed labels.

mod paths;
mod probe;
mod report;

pub use paths::{to_stem, validate_filenames, MediaPathMap};
pub use probe::{ImageSizeProbe, MediaProbe, NoProbe};
pub use report::{ImportIssue, ImportReport, IssueCode, IssueContext, Severity};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::OpenLabelError;
use crate::labels::{FrameSize, LabelSet};
use crate::openlabel::{
    AnnotationStore, FlatAccumulator, FrameAccumulator, FrameLabels, LabelKind, MediaKind,
    ObjectAccumulator, SegmentationStyle,
};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATA_MANIFEST: &str = "data.json";
const DEFAULT_LABELS_DIR: &str = "labels";
const DEFAULT_LABELS_FILE: &str = "labels.json";

/// Where to find a dataset and what to emit for it.
#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Root directory; relative `data_path`/`labels_path` resolve against it.
    pub dataset_dir: Option<PathBuf>,

    /// Media directory or JSON manifest. Defaults to `data.json` if that
    /// exists in `dataset_dir`, else `data/`.
    pub data_path: Option<PathBuf>,

    /// A single label file or a directory of them. Defaults to
    /// `labels.json`, else `labels/`, in `dataset_dir`.
    pub labels_path: Option<PathBuf>,

    pub media: MediaKind,

    /// Kinds to emit; empty means all.
    pub label_kinds: Vec<LabelKind>,

    /// Emit segmentations as polylines instead of instance masks.
    pub use_polylines: bool,
}

impl ImportOptions {
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.dataset_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// The media location after defaults are applied.
    pub fn resolved_data_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.data_path {
            return Some(self.resolve(path));
        }
        let dir = self.dataset_dir.as_ref()?;
        let manifest = dir.join(DEFAULT_DATA_MANIFEST);
        if manifest.is_file() {
            Some(manifest)
        } else {
            Some(dir.join(DEFAULT_DATA_DIR))
        }
    }

    /// Label files to parse, each paired with the base directory its
    /// relative path is taken against.
    pub fn label_files(&self) -> Result<(PathBuf, Vec<PathBuf>), OpenLabelError> {
        let (file, dir) = match (&self.labels_path, &self.dataset_dir) {
            (Some(path), _) => {
                let path = self.resolve(path);
                (path.clone(), path)
            }
            (None, Some(dir)) => (dir.join(DEFAULT_LABELS_FILE), dir.join(DEFAULT_LABELS_DIR)),
            (None, None) => return Ok((PathBuf::new(), Vec::new())),
        };

        if file.is_file() {
            let base = file.parent().map(Path::to_path_buf).unwrap_or_default();
            return Ok((base, vec![file]));
        }
        if dir.is_dir() {
            return Ok((dir.clone(), collect_label_files(&dir)?));
        }
        log::warn!("no label files found at {}", file.display());
        Ok((dir, Vec::new()))
    }
}

/// Recursively lists `*.json` files under `root`, sorted, as paths relative
/// to `root`.
fn collect_label_files(root: &Path) -> Result<Vec<PathBuf>, OpenLabelError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| OpenLabelError::Discovery {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        let is_json = entry.path().extension().and_then(|e| e.to_str()) == Some("json");
        if entry.file_type().is_file() && is_json {
            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// One imported image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageSample {
    /// The name the labels were matched under.
    pub filename: String,
    pub filepath: PathBuf,
    pub width: f64,
    pub height: f64,
    pub labels: LabelSet,
}

/// One imported video.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoSample {
    pub filename: String,
    pub filepath: PathBuf,
    pub frame_width: f64,
    pub frame_height: f64,
    pub frames: FrameLabels,
}

/// Drives one import run over a single annotation store.
pub struct OpenLabelImporter<A: ObjectAccumulator> {
    label_kinds: Vec<LabelKind>,
    style: SegmentationStyle,
    paths: MediaPathMap,
    annotations: AnnotationStore<A>,
    filenames: Vec<String>,
    report: ImportReport,
}

pub type ImageImporter = OpenLabelImporter<FlatAccumulator>;
pub type VideoImporter = OpenLabelImporter<FrameAccumulator>;

impl<A: ObjectAccumulator> OpenLabelImporter<A> {
    /// Loads the media map, parses every label file and validates the
    /// filenames they name.
    ///
    /// Unreadable label files are reported and skipped; only a missing
    /// input or a broken media location fails the whole setup.
    pub fn setup(options: &ImportOptions) -> Result<Self, OpenLabelError> {
        if options.dataset_dir.is_none()
            && options.data_path.is_none()
            && options.labels_path.is_none()
        {
            return Err(OpenLabelError::MissingInput);
        }

        let paths = match options.resolved_data_path() {
            Some(data_path) => MediaPathMap::load(&data_path)?,
            None => MediaPathMap::default(),
        };

        let mut annotations = AnnotationStore::<A>::new();
        let mut report = ImportReport::new();

        let (base_dir, label_files) = options.label_files()?;
        let potential = parse_label_files(&mut annotations, &base_dir, &label_files, &mut report);

        let filenames = validate_filenames(&potential, &paths);
        log::info!(
            "parsed {} label file(s); {} of {} candidate name(s) matched media",
            label_files.len(),
            filenames.len(),
            potential.len()
        );

        let label_kinds = if options.label_kinds.is_empty() {
            LabelKind::ALL.to_vec()
        } else {
            options.label_kinds.clone()
        };

        Ok(Self {
            label_kinds,
            style: SegmentationStyle::from_use_polylines(options.use_polylines),
            paths,
            annotations,
            filenames,
            report,
        })
    }

    /// Validated filenames, sorted.
    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    pub fn annotations(&self) -> &AnnotationStore<A> {
        &self.annotations
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    pub fn into_report(self) -> ImportReport {
        self.report
    }

    /// Groups the validated filenames by the media file they resolve to.
    ///
    /// Several filenames can name the same media file (the label file's own
    /// name and a stream URI, say). The media is imported once, under the
    /// first such filename whose stream declares dimensions, else the first
    /// one, and its labels are the merged objects of every alias.
    /// Dimensions come from the stream when declared and from `probe`
    /// otherwise; media with neither is reported and skipped.
    fn resolved_media(&mut self, probe: &dyn MediaProbe) -> Vec<ResolvedMedia> {
        let mut candidates: Vec<(ResolvedMedia, Option<FrameSize>)> = Vec::new();
        let mut by_path: BTreeMap<PathBuf, usize> = BTreeMap::new();

        for filename in &self.filenames {
            let Some(path) = self.paths.resolve(filename) else {
                log::debug!("no media path for {filename}");
                continue;
            };
            let declared = self
                .annotations
                .get_stream(filename)
                .frame_size()
                .filter(|size| size.width > 0.0 && size.height > 0.0);

            let Some(&index) = by_path.get(&path) else {
                by_path.insert(path.clone(), candidates.len());
                candidates.push((ResolvedMedia::new(filename, path), declared));
                continue;
            };
            let (media, size) = &mut candidates[index];
            log::debug!("{filename} also names {}", media.filepath.display());
            media.aliases.push(filename.clone());
            if size.is_none() && declared.is_some() {
                media.filename = filename.clone();
                *size = declared;
            }
        }

        let mut resolved = Vec::with_capacity(candidates.len());
        for (mut media, declared) in candidates {
            media.frame = match declared {
                Some(frame) => frame,
                None => match probe.frame_size(&media.filepath) {
                    Ok(frame) => frame,
                    Err(err) => {
                        log::warn!("skipping {}: {err}", media.filename);
                        self.report.add(ImportIssue::warning(
                            IssueCode::MissingDimensions,
                            err.to_string(),
                            IssueContext::Media {
                                filename: media.filename,
                            },
                        ));
                        continue;
                    }
                },
            };
            resolved.push(media);
        }

        resolved
    }
}

/// One media file and every validated filename that resolves to it.
struct ResolvedMedia {
    filename: String,
    filepath: PathBuf,
    frame: FrameSize,
    aliases: Vec<String>,
}

impl ResolvedMedia {
    fn new(filename: &str, filepath: PathBuf) -> Self {
        Self {
            filename: filename.to_string(),
            filepath,
            frame: FrameSize::new(0.0, 0.0),
            aliases: vec![filename.to_string()],
        }
    }
}

impl ImageImporter {
    pub fn samples(&mut self, probe: &dyn MediaProbe) -> Vec<ImageSample> {
        self.resolved_media(probe)
            .into_iter()
            .map(|media| {
                let objects = self.annotations.get_objects_for(media.aliases.as_slice());
                let labels = objects.to_labels(media.frame, &self.label_kinds, self.style);
                ImageSample {
                    filename: media.filename,
                    filepath: media.filepath,
                    width: media.frame.width,
                    height: media.frame.height,
                    labels,
                }
            })
            .collect()
    }
}

impl VideoImporter {
    pub fn samples(&mut self, probe: &dyn MediaProbe) -> Vec<VideoSample> {
        self.resolved_media(probe)
            .into_iter()
            .map(|media| {
                let objects = self.annotations.get_objects_for(media.aliases.as_slice());
                let frames = objects.to_labels(media.frame, &self.label_kinds, self.style);
                VideoSample {
                    filename: media.filename,
                    filepath: media.filepath,
                    frame_width: media.frame.width,
                    frame_height: media.frame.height,
                    frames,
                }
            })
            .collect()
    }
}

/// Parses every label file into `annotations` and returns the candidate
/// filenames they name.
///
/// Unreadable files are reported as errors and malformed ones as warnings;
/// neither stops the remaining files from being parsed.
pub fn parse_label_files<A: ObjectAccumulator>(
    annotations: &mut AnnotationStore<A>,
    base_dir: &Path,
    label_files: &[PathBuf],
    report: &mut ImportReport,
) -> Vec<String> {
    let mut potential = Vec::new();
    for label_path in label_files {
        match annotations.parse_labels(base_dir, label_path) {
            Ok(names) => potential.extend(names),
            Err(err) => {
                log::warn!("skipping label file {}: {err}", label_path.display());
                report.add(ImportIssue::error(
                    IssueCode::UnreadableLabelFile,
                    err.to_string(),
                    IssueContext::LabelFile {
                        path: label_path.display().to_string(),
                    },
                ));
            }
        }
    }
    for (label_id, message) in annotations.degraded_files() {
        report.add(ImportIssue::warning(
            IssueCode::MalformedLabelFile,
            format!("treated as empty: {message}"),
            IssueContext::LabelFile {
                path: label_id.to_string(),
            },
        ));
    }
    potential
}

/// Samples of either media kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImportedSamples {
    Images(Vec<ImageSample>),
    Videos(Vec<VideoSample>),
}

impl ImportedSamples {
    pub fn len(&self) -> usize {
        match self {
            Self::Images(samples) => samples.len(),
            Self::Videos(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs a complete import for `options.media`.
///
/// Images fall back to reading dimensions from file headers; videos rely on
/// their stream declarations.
pub fn import_dataset(
    options: &ImportOptions,
) -> Result<(ImportedSamples, ImportReport), OpenLabelError> {
    match options.media {
        MediaKind::Image => {
            let mut importer = ImageImporter::setup(options)?;
            let samples = importer.samples(&ImageSizeProbe);
            Ok((ImportedSamples::Images(samples), importer.into_report()))
        }
        MediaKind::Video => {
            let mut importer = VideoImporter::setup(options)?;
            let samples = importer.samples(&NoProbe);
            Ok((ImportedSamples::Videos(samples), importer.into_report()))
        }
    }
}
