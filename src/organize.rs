//
// organize.rs
// dicom-organizer
//
// Batch driver: scan, extract, classify, assemble, export, summarize. All
// grouping state is owned by the run; only configuration errors abort it.
//

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;
use tracing::warn;
use walkdir::WalkDir;

use crate::classify::{self, ModalityGroup};
use crate::config::{OrganizeConfig, UNSORTED_BUCKET};
use crate::export::{self, ExportOutcome};
use crate::metadata::{self, SourceFile};
use crate::models::RunSummary;
use crate::series::{self, ClassifiedFile};
use crate::summary;

/// Runs one full organize pass and returns the end-of-run counters.
pub fn run(input: &Path, output: &Path, config: &OrganizeConfig) -> Result<RunSummary> {
    if !input.is_dir() {
        bail!("input directory {:?} does not exist", input);
    }
    std::fs::create_dir_all(output)?;

    let paths = scan_input(input);
    let mut run_summary = RunSummary {
        total_files: paths.len(),
        ..RunSummary::default()
    };

    let mut classified: Vec<ClassifiedFile> = Vec::with_capacity(paths.len());
    for path in &paths {
        match metadata::read_source_file(path) {
            Ok(meta) => {
                run_summary.classified += 1;
                classified.push(ClassifiedFile {
                    bucket: classify::classify(&meta, &config.rules),
                    modality: classify::modality_group(&meta),
                    series_id: series::series_id(&meta),
                    meta,
                });
            }
            Err(e) => {
                // Unreadable files still get a folder so input and output
                // counts stay reconcilable.
                warn!(error = %e, "routing unreadable file to the unsorted bucket");
                run_summary.unreadable += 1;
                classified.push(fallback_entry(path));
            }
        }
    }

    let all_series = series::assemble(classified);
    run_summary.series_total = all_series.len();

    // Frame numbering was fixed by the assembler's sort; the per-series
    // export work itself is independent and can fan out on the rayon pool.
    let outcomes: Vec<(usize, ExportOutcome)> = all_series
        .par_iter()
        .enumerate()
        .map(|(idx, s)| (idx, export::export_series(s, output, config.copy_dicom)))
        .collect();

    for (idx, outcome) in outcomes {
        let s = &all_series[idx];
        run_summary.frames_exported += outcome.frames_written;
        run_summary.decode_failures += outcome.decode_failures;
        run_summary.write_failures += outcome.write_failures;
        if outcome.frames_written > 0 {
            run_summary.series_with_frames += 1;
        }

        let dir = export::series_dir(output, s);
        if let Err(e) = summary::write_series_info(&dir, s, outcome.frames_written) {
            warn!(error = %e, "series digest write failed");
            run_summary.write_failures += 1;
        } else {
            println!(
                "{}/{}/{}  ({} PNG frames)",
                s.bucket,
                s.modality,
                s.series_id,
                outcome.frames_written
            );
        }
    }

    print_summary(&run_summary);
    Ok(run_summary)
}

/// Candidate files: `.dcm` extension or a DICM preamble. Sorted so the
/// first-seen bucket order is stable across reruns and filesystems.
fn scan_input(input: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_dcm_extension(p) || metadata::looks_like_dicom(p))
        .collect();
    paths.sort();
    paths
}

fn has_dcm_extension(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("dcm"))
}

fn fallback_entry(path: &Path) -> ClassifiedFile {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    ClassifiedFile {
        bucket: UNSORTED_BUCKET.to_string(),
        modality: ModalityGroup::Unknown,
        series_id: series::sanitize(&stem, "unreadable"),
        meta: SourceFile::fallback(path),
    }
}

fn print_summary(s: &RunSummary) {
    println!(
        "\nDone. Files: {} total, {} classified, {} unreadable",
        s.total_files, s.classified, s.unreadable
    );
    println!(
        "Series: {} assembled, {} with frames | Frames exported: {} | Decode failures: {} | Write failures: {}",
        s.series_total, s.series_with_frames, s.frames_exported, s.decode_failures, s.write_failures
    );
}
