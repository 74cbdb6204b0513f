use std::fs;
use std::path::Path;

use crate::error::PipelineError;
use crate::series::Series;

/// Writes the per-series `series.info.txt` digest: fixed `Key: value` lines
/// the manifest builder parses back on a later run. Values may be empty.
pub fn write_series_info(
    series_dir: &Path,
    series: &Series,
    frame_count: usize,
) -> Result<(), PipelineError> {
    let meta = series.digest_source();
    let lines = [
        ("Bucket", series.bucket.clone()),
        ("Modality", series.modality.as_str().to_string()),
        ("StudyDate", meta.study_date.clone().unwrap_or_default()),
        ("StudyTime", meta.study_time.clone().unwrap_or_default()),
        ("SeriesNumber", meta.series_number.clone().unwrap_or_default()),
        (
            "SeriesDescription",
            meta.series_description.clone().unwrap_or_default(),
        ),
        ("BodyPartExamined", meta.body_part.clone().unwrap_or_default()),
        ("FrameCount", frame_count.to_string()),
    ];
    let body: String = lines
        .iter()
        .map(|(k, v)| format!("{k}: {v}\n"))
        .collect();

    let path = series_dir.join("series.info.txt");
    fs::write(&path, body).map_err(|e| PipelineError::WriteFailure {
        path,
        reason: e.to_string(),
    })
}
