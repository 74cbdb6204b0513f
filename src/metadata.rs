use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDate;
use dicom::core::Tag;
use dicom::object::OpenFileOptions;

use crate::classify;
use crate::config::OrganizeConfig;
use crate::dicom_access::ElementAccess;
use crate::error::PipelineError;

const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// Identifying attributes of one acquired instance, read from the header only.
/// Immutable once extracted; the pixel data is not touched until export.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub modality: Option<String>,
    pub series_number: Option<String>,
    pub series_description: Option<String>,
    pub study_description: Option<String>,
    pub protocol_name: Option<String>,
    pub body_part: Option<String>,
    pub instance_number: Option<i64>,
    pub number_of_frames: u32,
    pub modified: Option<SystemTime>,
}

impl SourceFile {
    /// Degraded stand-in for a file whose header could not be read. It still
    /// flows through the pipeline as a single-member series so the total
    /// input count stays auditable against the output.
    pub fn fallback(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            study_date: None,
            study_time: None,
            modality: None,
            series_number: None,
            series_description: None,
            study_description: None,
            protocol_name: None,
            body_part: None,
            instance_number: None,
            number_of_frames: 1,
            modified: file_mtime(path),
        }
    }

    /// Joined free-text descriptors, upper-cased for keyword matching.
    pub fn descriptor_text(&self) -> String {
        [
            &self.study_description,
            &self.series_description,
            &self.protocol_name,
            &self.body_part,
        ]
        .iter()
        .filter_map(|v| v.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
    }

    pub fn study_date_parsed(&self) -> Option<NaiveDate> {
        let raw = self.study_date.as_deref()?;
        NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Checks the 128-byte preamble plus "DICM" magic without parsing the dataset.
pub fn looks_like_dicom(path: &Path) -> bool {
    let mut header = [0u8; 132];
    match fs::File::open(path).and_then(|mut f| f.read_exact(&mut header)) {
        Ok(()) => &header[128..132] == b"DICM",
        Err(_) => false,
    }
}

fn text_for_tag<T: ElementAccess>(obj: &T, tag: Tag) -> Option<String> {
    obj.element_str(tag).filter(|s| !s.is_empty())
}

pub fn extract_source_file<T: ElementAccess>(obj: &T, path: &Path) -> SourceFile {
    let instance_number = text_for_tag(obj, Tag(0x0020, 0x0013)).and_then(|s| s.parse().ok());
    let number_of_frames = text_for_tag(obj, Tag(0x0028, 0x0008))
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1);

    SourceFile {
        path: path.to_path_buf(),
        study_date: text_for_tag(obj, Tag(0x0008, 0x0020)),
        study_time: text_for_tag(obj, Tag(0x0008, 0x0030)),
        modality: text_for_tag(obj, Tag(0x0008, 0x0060)),
        series_number: text_for_tag(obj, Tag(0x0020, 0x0011)),
        series_description: text_for_tag(obj, Tag(0x0008, 0x103E)),
        study_description: text_for_tag(obj, Tag(0x0008, 0x1030)),
        protocol_name: text_for_tag(obj, Tag(0x0018, 0x1030)),
        body_part: text_for_tag(obj, Tag(0x0018, 0x0015)),
        instance_number,
        number_of_frames,
        modified: file_mtime(path),
    }
}

/// Header-only read: stops before PixelData so classification never pays for
/// a pixel decode. Any parse failure degrades to `Unreadable`.
pub fn read_source_file(path: &Path) -> Result<SourceFile, PipelineError> {
    let obj = OpenFileOptions::new()
        .read_until(PIXEL_DATA)
        .open_file(path)
        .map_err(|e| PipelineError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(extract_source_file(&obj, path))
}

fn file_mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Prints the extracted attributes and the classification the default rules
/// would give, for debugging the bucket configuration.
pub fn print_info(path: &Path) -> anyhow::Result<()> {
    let meta = read_source_file(path)?;
    let rules = OrganizeConfig::default_rules();
    let bucket = classify::classify(&meta, &rules);
    let modality = classify::modality_group(&meta);

    println!("{}", "=".repeat(80));
    println!("Source file: {:?}", path.file_name().unwrap_or_default());
    println!("{}", "=".repeat(80));

    println!("HEADER");
    println!("  Study Date:  {}", meta.study_date.as_deref().unwrap_or("N/A"));
    println!("  Modality:    {}", meta.modality.as_deref().unwrap_or("N/A"));
    println!(
        "  Series:      #{} {}",
        meta.series_number.as_deref().unwrap_or("?"),
        meta.series_description.as_deref().unwrap_or("")
    );
    println!(
        "  Instance:    {}",
        meta.instance_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    );
    println!("  Frames:      {}", meta.number_of_frames);

    println!("\nCLASSIFICATION (keyword rules only)");
    println!("  Bucket:      {}", bucket);
    println!("  Modality:    {}", modality);

    Ok(())
}
