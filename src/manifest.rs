//
// manifest.rs
// dicom-organizer
//
// Walks the organized tree, classifies each series as still or animation, and
// emits the manifest plus the static viewer shell. The JSON is the contract
// with the viewer and publisher: stable key order, no timestamps, identical
// bytes for identical trees.
//

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::models::{Classification, Manifest, ManifestEntry};

/// Bundled single-page viewer that reads `manifest.json` next to itself.
const VIEWER_SHELL: &str = include_str!("../assets/viewer.html");

/// Builds the manifest for an organized tree. `max_frames == 0` references
/// every exported frame; a positive bound selects an evenly-spaced subsample.
pub fn build(root: &Path, max_frames: usize) -> Result<Manifest> {
    if !root.is_dir() {
        bail!("{:?} does not exist or is not a directory", root);
    }

    let mut entries = Vec::new();
    for (bucket, bucket_dir) in sorted_dirs(root)? {
        for (modality, modality_dir) in sorted_dirs(&bucket_dir)? {
            for (series_id, series_dir) in sorted_dirs(&modality_dir)? {
                if series_id == "dcm" {
                    continue;
                }
                let frames = frame_files(&series_dir)?;
                // A series with no exported frames is not publishable.
                if frames.is_empty() {
                    continue;
                }

                let indices = subsample_indices(frames.len(), max_frames);
                let kept: Vec<String> = indices
                    .iter()
                    .map(|&i| format!("{bucket}/{modality}/{series_id}/{}", frames[i]))
                    .collect();
                let preview_index = if kept.len() > 2 { kept.len() / 2 } else { 0 };

                entries.push(ManifestEntry {
                    bucket: bucket.clone(),
                    modality: modality.clone(),
                    series_id,
                    classification: if frames.len() > 1 {
                        Classification::Animation
                    } else {
                        Classification::Still
                    },
                    frame_count: frames.len(),
                    kept_frame_filenames: kept,
                    preview_index,
                    info: read_series_info(&series_dir),
                });
            }
        }
    }

    Ok(Manifest {
        root: root.to_string_lossy().into_owned(),
        series: entries,
    })
}

/// Builds the manifest and writes `manifest.json` + `index.html` into the
/// viewer directory.
pub fn write_viewer(root: &Path, viewer_dir: &Path, max_frames: usize) -> Result<()> {
    let manifest = build(root, max_frames)?;
    fs::create_dir_all(viewer_dir).context("Failed to create viewer directory")?;

    let manifest_path = viewer_dir.join("manifest.json");
    fs::write(&manifest_path, to_json_string(&manifest)?)
        .context("Failed to write manifest.json")?;
    let index_path = viewer_dir.join("index.html");
    fs::write(&index_path, VIEWER_SHELL).context("Failed to write index.html")?;

    println!(
        "Viewer ready: {:?} ({} series)",
        index_path,
        manifest.series.len()
    );
    Ok(())
}

/// Canonical serialized form, shared with the pruner so rewrites stay
/// byte-compatible.
pub fn to_json_string(manifest: &Manifest) -> Result<String> {
    let mut out =
        serde_json::to_string_pretty(manifest).context("Failed to serialize manifest")?;
    out.push('\n');
    Ok(out)
}

/// Evenly-spaced pick of `max_frames` positions out of `len`, always keeping
/// the first and last, strictly increasing. `0` means keep everything.
pub fn subsample_indices(len: usize, max_frames: usize) -> Vec<usize> {
    if max_frames == 0 || len <= max_frames {
        return (0..len).collect();
    }
    if max_frames == 1 {
        return vec![0];
    }
    (0..max_frames)
        .map(|i| i * (len - 1) / (max_frames - 1))
        .collect()
}

/// Immediate subdirectories, name-sorted for reproducible output.
fn sorted_dirs(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("Failed to read {path:?}"))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// `frame_NNNN.png` files of one series folder, name-sorted; zero padding
/// makes lexical order equal numeric order.
fn frame_files(series_dir: &Path) -> Result<Vec<String>> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(series_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_file()
            && name.starts_with("frame_")
            && name.ends_with(".png")
        {
            frames.push(name);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Parses the `Key: value` digest back into a map; a missing or mangled file
/// simply yields fewer keys.
fn read_series_info(series_dir: &Path) -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();
    let Ok(text) = fs::read_to_string(series_dir.join("series.info.txt")) else {
        return info;
    };
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim();
            if !value.is_empty() {
                info.insert(key.trim().to_string(), value.to_string());
            }
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsample_keeps_first_and_last_and_is_strictly_increasing() {
        let picked = subsample_indices(10, 3);
        assert_eq!(picked, [0, 4, 9]);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn subsample_zero_keeps_everything() {
        assert_eq!(subsample_indices(4, 0), [0, 1, 2, 3]);
    }

    #[test]
    fn subsample_never_exceeds_the_series_length() {
        assert_eq!(subsample_indices(2, 5), [0, 1]);
        assert_eq!(subsample_indices(1, 3), [0]);
    }

    #[test]
    fn subsample_of_one_is_the_first_frame() {
        assert_eq!(subsample_indices(10, 1), [0]);
    }

    #[test]
    fn large_subsamples_stay_strictly_increasing() {
        for len in 2..40 {
            for cap in 2..=len {
                let picked = subsample_indices(len, cap);
                assert_eq!(picked.len(), cap);
                assert_eq!(picked[0], 0);
                assert_eq!(*picked.last().unwrap(), len - 1);
                assert!(picked.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
