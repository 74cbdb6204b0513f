//
// series.rs
// dicom-organizer
//
// Groups classified files into ordered series and fixes the deterministic
// frame order that the exporter's numbering is derived from.
//

use std::collections::HashMap;
use std::time::SystemTime;

use crate::classify::ModalityGroup;
use crate::metadata::SourceFile;

/// One classified source file awaiting series assembly.
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    pub bucket: String,
    pub modality: ModalityGroup,
    pub series_id: String,
    pub meta: SourceFile,
}

/// One acquisition: ordered members sharing (bucket, modality, series id).
#[derive(Debug, Clone)]
pub struct Series {
    pub bucket: String,
    pub modality: ModalityGroup,
    pub series_id: String,
    pub members: Vec<SourceFile>,
}

impl Series {
    /// Representative member used for the human-readable digest. Assembly
    /// never produces an empty series.
    pub fn digest_source(&self) -> &SourceFile {
        &self.members[0]
    }
}

/// Replaces filesystem-hostile characters, collapses runs into single
/// underscores, and caps the length, mirroring the folder names other tooling
/// already expects.
pub fn sanitize(name: &str, default: &str) -> String {
    let mut out = String::new();
    let mut pending_sub = false;
    for c in name.trim().chars() {
        if c == '\0' {
            continue;
        }
        if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
            if pending_sub {
                out.push('_');
                pending_sub = false;
            }
            out.push(c);
        } else {
            pending_sub = true;
        }
    }
    let capped: String = out.chars().take(80).collect();
    if capped.is_empty() {
        default.to_string()
    } else {
        capped
    }
}

/// Series identifier: `{StudyDate}_S{SeriesNumber:03}_{description}`, unique
/// within a study and stable across reruns.
pub fn series_id(meta: &SourceFile) -> String {
    let date = meta.study_date.as_deref().unwrap_or("");
    let number = meta.series_number.as_deref().unwrap_or("0");
    let desc = sanitize(meta.series_description.as_deref().unwrap_or(""), "Series");
    format!("{date}_S{number:0>3}_{desc}")
}

/// Groups by (bucket, modality, series id), orders members inside each group,
/// and orders the series themselves by first-seen bucket, then modality, then
/// series id, so directory creation order is reproducible.
pub fn assemble(files: Vec<ClassifiedFile>) -> Vec<Series> {
    let mut bucket_rank: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<(String, ModalityGroup, String)> = Vec::new();
    let mut groups: HashMap<(String, ModalityGroup, String), Vec<SourceFile>> = HashMap::new();

    for file in files {
        let next_rank = bucket_rank.len();
        bucket_rank.entry(file.bucket.clone()).or_insert(next_rank);
        let key = (file.bucket, file.modality, file.series_id);
        match groups.get_mut(&key) {
            Some(members) => members.push(file.meta),
            None => {
                order.push(key.clone());
                groups.insert(key, vec![file.meta]);
            }
        }
    }

    order.sort_by(|a, b| {
        (bucket_rank[&a.0], a.1, &a.2).cmp(&(bucket_rank[&b.0], b.1, &b.2))
    });

    order
        .into_iter()
        .map(|key| {
            let mut members = groups.remove(&key).unwrap_or_default();
            sort_members(&mut members);
            let (bucket, modality, series_id) = key;
            Series {
                bucket,
                modality,
                series_id,
                members,
            }
        })
        .collect()
}

/// Instance-number order with a filename tie-break. If any member lacks an
/// instance number the whole group falls back to filename order with mtime as
/// the final tie-break, so index-based and name-based orders never interleave
/// within one series.
fn sort_members(members: &mut [SourceFile]) {
    let all_indexed = members.iter().all(|m| m.instance_number.is_some());
    if all_indexed {
        members.sort_by(|a, b| {
            (a.instance_number, a.file_name(), &a.path)
                .cmp(&(b.instance_number, b.file_name(), &b.path))
        });
    } else {
        members.sort_by(|a, b| {
            (a.file_name(), mtime_key(a), &a.path).cmp(&(b.file_name(), mtime_key(b), &b.path))
        });
    }
}

fn mtime_key(meta: &SourceFile) -> SystemTime {
    meta.modified.unwrap_or(SystemTime::UNIX_EPOCH)
}
