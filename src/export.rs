//
// export.rs
// dicom-organizer
//
// Decodes each series member in its fixed order and writes zero-padded PNG
// frames. Decode failures leave their slots empty instead of renumbering, so
// the series-position/filename mapping survives partial failures and reruns.
//

use std::fs;
use std::path::{Path, PathBuf};

use dicom::object::open_file;
use dicom::pixeldata::PixelDecoder;
use tracing::warn;

use crate::error::PipelineError;
use crate::series::Series;

/// Per-series export tally, merged into the run summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOutcome {
    pub frames_written: usize,
    pub decode_failures: usize,
    pub write_failures: usize,
}

/// Folder for one series inside the organized tree.
pub fn series_dir(output_root: &Path, series: &Series) -> PathBuf {
    output_root
        .join(&series.bucket)
        .join(series.modality.as_str())
        .join(&series.series_id)
}

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:04}.png")
}

/// Exports every member of one series. Frame numbering is derived purely from
/// the assembler's member order and each member's declared frame count, so it
/// is already fixed before this function runs; per-series calls may therefore
/// run on the rayon pool.
pub fn export_series(series: &Series, output_root: &Path, copy_dicom: bool) -> ExportOutcome {
    let mut outcome = ExportOutcome::default();
    let dir = series_dir(output_root, series);
    if let Err(e) = fs::create_dir_all(&dir) {
        let err = PipelineError::WriteFailure {
            path: dir,
            reason: e.to_string(),
        };
        warn!(%err, "could not create series folder");
        outcome.write_failures += 1;
        return outcome;
    }

    let mut next_slot = 0usize;
    for member in &series.members {
        let reserved = member.number_of_frames as usize;
        let start = next_slot;
        next_slot += reserved;

        // Originals are retained even when the decode below fails; a broken
        // instance is the one a user will want to re-inspect.
        if copy_dicom {
            if let Err(e) = retain_original(&dir, &member.path) {
                let err = PipelineError::WriteFailure {
                    path: member.path.clone(),
                    reason: e.to_string(),
                };
                warn!(%err, "could not retain original");
                outcome.write_failures += 1;
            }
        }

        // The decoded pixel data borrows the object, so both live side by
        // side for the duration of this member's frames.
        let obj = match open_file(&member.path) {
            Ok(obj) => obj,
            Err(e) => {
                let err = PipelineError::DecodeFailure {
                    path: member.path.clone(),
                    reason: e.to_string(),
                };
                warn!(%err, "skipping frame slots for unreadable instance");
                outcome.decode_failures += 1;
                continue;
            }
        };
        let decoded = match obj.decode_pixel_data() {
            Ok(decoded) => decoded,
            Err(e) => {
                let err = PipelineError::DecodeFailure {
                    path: member.path.clone(),
                    reason: e.to_string(),
                };
                warn!(%err, "skipping frame slots for undecodable instance");
                outcome.decode_failures += 1;
                continue;
            }
        };

        // Header and decoder may disagree on the frame count; never spill
        // into the next member's reserved slots.
        let frames = (decoded.number_of_frames() as usize).min(reserved);
        for frame in 0..frames {
            let target = dir.join(frame_file_name(start + frame));
            let image = match decoded.to_dynamic_image(frame as u32) {
                Ok(image) => image,
                Err(e) => {
                    let err = PipelineError::DecodeFailure {
                        path: member.path.clone(),
                        reason: e.to_string(),
                    };
                    warn!(%err, frame, "frame conversion failed");
                    outcome.decode_failures += 1;
                    continue;
                }
            };
            match image.save(&target) {
                Ok(()) => outcome.frames_written += 1,
                Err(e) => {
                    let err = PipelineError::WriteFailure {
                        path: target,
                        reason: e.to_string(),
                    };
                    warn!(%err, "frame write failed");
                    outcome.write_failures += 1;
                }
            }
        }
    }

    outcome
}

/// Duplicates the source instance under `<series>/dcm/`, skipping files that
/// are already present so reruns stay idempotent.
fn retain_original(series_dir: &Path, source: &Path) -> std::io::Result<()> {
    let dcm_dir = series_dir.join("dcm");
    fs::create_dir_all(&dcm_dir)?;
    let name = source
        .file_name()
        .ok_or_else(|| std::io::Error::other("source file has no name"))?;
    let target = dcm_dir.join(name);
    if !target.exists() {
        fs::copy(source, &target)?;
    }
    Ok(())
}
