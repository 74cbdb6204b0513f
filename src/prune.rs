//
// prune.rs
// dicom-organizer
//
// Trims a published copy of the tree: animations keep every Nth frame (plus
// the last), stills stay intact, and the manifest is rewritten to match.
//

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::manifest;
use crate::models::Manifest;

/// Animations always keep at least this many frames.
const MIN_KEEP: usize = 2;

pub fn run_prune(docs: &Path, sample_rate: usize) -> Result<()> {
    let manifest_path = docs.join("manifest.json");
    let text = fs::read_to_string(&manifest_path)
        .with_context(|| format!("No manifest found at {manifest_path:?}"))?;
    let mut manifest: Manifest =
        serde_json::from_str(&text).context("Failed to parse manifest.json")?;

    let mut keep: HashSet<PathBuf> = HashSet::new();
    for entry in &mut manifest.series {
        if entry.frame_count > 1 {
            let sampled = sample_frames(&entry.kept_frame_filenames, sample_rate);
            entry.kept_frame_filenames = sampled;
            entry.frame_count = entry.kept_frame_filenames.len();
            entry.preview_index = entry
                .preview_index
                .min(entry.kept_frame_filenames.len().saturating_sub(1));
        }
        keep.extend(entry.kept_frame_filenames.iter().map(|f| docs.join(f)));
    }

    let removed = remove_unreferenced_frames(docs, &keep)?;
    remove_empty_dirs(docs)?;

    fs::write(&manifest_path, manifest::to_json_string(&manifest)?)
        .context("Failed to rewrite manifest.json")?;
    println!(
        "Pruned {} with sample rate {} ({} frames removed)",
        docs.display(),
        sample_rate,
        removed
    );
    Ok(())
}

/// Every Nth frame plus the last one; short sequences are left untouched.
pub fn sample_frames(frames: &[String], rate: usize) -> Vec<String> {
    if rate <= 1 || frames.len() <= MIN_KEEP {
        return frames.to_vec();
    }
    let mut sampled: Vec<String> = frames.iter().step_by(rate).cloned().collect();
    if sampled.last() != frames.last() {
        sampled.push(frames.last().cloned().unwrap_or_default());
    }
    sampled
}

fn remove_unreferenced_frames(docs: &Path, keep: &HashSet<PathBuf>) -> Result<usize> {
    let mut removed = 0;
    for entry in WalkDir::new(docs).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with("frame_") && name.ends_with(".png") && !keep.contains(entry.path()) {
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to delete {:?}", entry.path()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Deepest-first sweep so chains of newly-empty folders collapse.
fn remove_empty_dirs(docs: &Path) -> Result<()> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(docs)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    dirs.sort();
    for dir in dirs.into_iter().rev() {
        if fs::read_dir(&dir)?.next().is_none() {
            fs::remove_dir(&dir)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("frame_{i:04}.png")).collect()
    }

    #[test]
    fn rate_of_one_keeps_everything() {
        assert_eq!(sample_frames(&frames(5), 1), frames(5));
    }

    #[test]
    fn every_second_frame_plus_the_last_survives() {
        let sampled = sample_frames(&frames(5), 2);
        assert_eq!(
            sampled,
            [
                "frame_0000.png",
                "frame_0002.png",
                "frame_0004.png"
            ]
        );

        let sampled = sample_frames(&frames(6), 2);
        // frame_0005 is appended because the stride missed it.
        assert_eq!(
            sampled,
            [
                "frame_0000.png",
                "frame_0002.png",
                "frame_0004.png",
                "frame_0005.png"
            ]
        );
    }

    #[test]
    fn short_sequences_are_never_trimmed() {
        assert_eq!(sample_frames(&frames(2), 4), frames(2));
    }
}
