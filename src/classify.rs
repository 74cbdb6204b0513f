//
// classify.rs
// dicom-organizer
//
// Assigns each source file a clinical bucket and a display modality group.
// Precedence is explicit: configured date ranges first, then keyword groups,
// both strictly in rule order.
//

use std::fmt;

use crate::config::{BucketRule, UNSORTED_BUCKET};
use crate::metadata::SourceFile;

/// Closed set of display modality buckets. Raw codes that map nowhere land in
/// `Other`; `Unknown` is reserved for files whose header could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModalityGroup {
    Xray,
    Ct,
    Mri,
    Other,
    Unknown,
}

impl ModalityGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModalityGroup::Xray => "XRAY",
            ModalityGroup::Ct => "CT",
            ModalityGroup::Mri => "MRI",
            ModalityGroup::Other => "OTHER",
            ModalityGroup::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ModalityGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Projection-type codes that all render as X-ray for browsing purposes.
const XRAY_CODES: [&str; 7] = ["CR", "DX", "DR", "PX", "XA", "RF", "XR"];

/// Maps the raw modality code onto the display group, falling back to
/// descriptor keywords when the code is absent or unrecognized.
pub fn modality_group(meta: &SourceFile) -> ModalityGroup {
    let code = meta
        .modality
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_uppercase();
    if XRAY_CODES.contains(&code.as_str()) {
        return ModalityGroup::Xray;
    }
    match code.as_str() {
        "CT" => return ModalityGroup::Ct,
        "MR" => return ModalityGroup::Mri,
        _ => {}
    }

    let text = meta.descriptor_text();
    for (keyword, group) in [
        ("MRI", ModalityGroup::Mri),
        ("CT", ModalityGroup::Ct),
        ("XRAY", ModalityGroup::Xray),
    ] {
        if text.contains(keyword) {
            return group;
        }
    }
    ModalityGroup::Other
}

/// First match wins: every configured date range in rule order, then every
/// keyword group in rule order, then the unsorted bucket.
pub fn classify(meta: &SourceFile, rules: &[BucketRule]) -> String {
    if let Some(date) = meta.study_date_parsed() {
        for rule in rules {
            if let Some(range) = &rule.date_range {
                if range.contains(date) {
                    return rule.id.clone();
                }
            }
        }
    }

    let text = meta.descriptor_text();
    for rule in rules {
        if rule.keywords.iter().any(|k| text.contains(k)) {
            return rule.id.clone();
        }
    }

    UNSORTED_BUCKET.to_string()
}
