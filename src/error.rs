use std::path::PathBuf;
use thiserror::Error;

use crate::import::ImportReport;

/// The main error type for openlabel-import operations.
#[derive(Debug, Error)]
pub enum OpenLabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read label file {path}: {source}")]
    LabelFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse data manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write output to {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed while traversing {path}: {message}")]
    Discovery { path: PathBuf, message: String },

    #[error("Failed to read media dimensions from {path}: {source}")]
    MediaProbe {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Cannot probe dimensions of {path}: {message}")]
    MediaProbeUnsupported { path: PathBuf, message: String },

    #[error("Unsupported label type '{value}'. Supported types are {supported}")]
    UnsupportedLabelKind { value: String, supported: String },

    #[error("Unsupported label types {values}. Supported types are {supported}")]
    UnsupportedLabelKinds { values: String, supported: String },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("At least one of `dataset_dir`, `data_path`, and `labels_path` must be provided")]
    MissingInput,

    #[error("Import finished with {error_count} error(s) and {warning_count} warning(s)")]
    ImportFailed {
        error_count: usize,
        warning_count: usize,
        report: ImportReport,
    },
}
