use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for the batch pipeline.
///
/// Only `Config` is fatal: it means the whole run would produce wrong output.
/// Everything else is isolated per file or per frame, counted in the run
/// summary, and never aborts the batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Header/metadata extraction failed; the file degrades to the unsorted
    /// bucket with modality UNKNOWN.
    #[error("unreadable DICOM file {path:?}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Pixel decode failed for one instance; its frame slots stay reserved.
    #[error("pixel decode failed for {path:?}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },

    /// Filesystem write failed for a frame, summary, or copied original.
    #[error("write failed for {path:?}: {reason}")]
    WriteFailure { path: PathBuf, reason: String },

    /// Malformed date range or invalid flag combination. Fatal.
    #[error("invalid configuration: {0}")]
    Config(String),
}
