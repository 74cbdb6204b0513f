//
// models.rs
// dicom-organizer
//
// Structures shared by the manifest builder, the pruner, and the end-of-run
// reporting. Manifest field order is the schema; keep it stable.
//

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Still vs animation, decided purely by exported frame count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Still,
    Animation,
}

/// One publishable series. `kept_frame_filenames` are paths relative to the
/// organized root, forward-slash separated on every platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub bucket: String,
    pub modality: String,
    pub series_id: String,
    pub classification: Classification,
    pub frame_count: usize,
    pub kept_frame_filenames: Vec<String>,
    pub preview_index: usize,
    pub info: BTreeMap<String, String>,
}

/// The document the viewer and the publishing steps consume. Serialized with
/// stable key order and no timestamps so identical trees produce identical
/// bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub root: String,
    pub series: Vec<ManifestEntry>,
}

/// End-of-run counters; per-item failures accumulate here instead of aborting
/// the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub total_files: usize,
    pub classified: usize,
    pub unreadable: usize,
    pub series_total: usize,
    pub series_with_frames: usize,
    pub frames_exported: usize,
    pub decode_failures: usize,
    pub write_failures: usize,
}
