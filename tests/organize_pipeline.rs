//
// organize_pipeline.rs
// dicom-organizer
//
// Integration tests covering the full batch pass: classification, series
// assembly, frame export, digest writing, manifest building, and pruning.
//

use std::fs;
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use dicom_organizer::config::OrganizeConfig;
use dicom_organizer::models::{Classification, Manifest, ManifestEntry};
use dicom_organizer::{manifest, organize, prune};
use tempfile::tempdir;

struct Fixture<'a> {
    modality: &'a str,
    study_date: &'a str,
    series_number: &'a str,
    series_description: &'a str,
    body_part: &'a str,
    instance_number: &'a str,
}

/// Builds a tiny Secondary Capture instance with predictable pixel values.
fn write_dicom(path: &Path, fixture: &Fixture) {
    write_dicom_with_pixels(path, fixture, vec![0u8, 64, 128, 255]);
}

/// Same instance, but with caller-supplied PixelData bytes. A payload shorter
/// than Rows x Columns yields a header that parses but pixels that do not.
fn write_dicom_with_pixels(path: &Path, fixture: &Fixture, pixels: Vec<u8>) {
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    let mut put_str = |tag: Tag, vr: VR, value: &str| {
        if !value.is_empty() {
            obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
        }
    };
    put_str(Tag(0x0010, 0x0010), VR::PN, "Test^Patient");
    put_str(Tag(0x0008, 0x0060), VR::CS, fixture.modality);
    put_str(Tag(0x0008, 0x0020), VR::DA, fixture.study_date);
    put_str(Tag(0x0020, 0x0011), VR::IS, fixture.series_number);
    put_str(Tag(0x0008, 0x103E), VR::LO, fixture.series_description);
    put_str(Tag(0x0018, 0x0015), VR::CS, fixture.body_part);
    put_str(Tag(0x0020, 0x0013), VR::IS, fixture.instance_number);
    put_str(Tag(0x0008, 0x0016), VR::UI, "1.2.840.10008.5.1.4.1.1.7");
    put_str(
        Tag(0x0008, 0x0018),
        VR::UI,
        &format!(
            "1.2.826.0.1.3680043.2.1125.{}",
            fixture.instance_number.parse::<u32>().unwrap_or(99)
        ),
    );

    let dims: Vec<(Tag, u16)> = vec![
        (Tag(0x0028, 0x0010), 2), // Rows
        (Tag(0x0028, 0x0011), 2), // Columns
        (Tag(0x0028, 0x0002), 1), // Samples per Pixel
        (Tag(0x0028, 0x0100), 8), // Bits Allocated
        (Tag(0x0028, 0x0101), 8), // Bits Stored
        (Tag(0x0028, 0x0102), 7), // High Bit
        (Tag(0x0028, 0x0103), 0), // Pixel Representation
    ];
    for (tag, value) in dims {
        obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
    }
    obj.put(DataElement::new(
        Tag(0x0028, 0x0004),
        VR::CS,
        PrimitiveValue::from("MONOCHROME2"),
    ));
    obj.put(DataElement::new(
        Tag(0x7FE0, 0x0010),
        VR::OB,
        PrimitiveValue::from(pixels),
    ));

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
        .media_storage_sop_instance_uid("1.2.826.0.1.3680043.2.1125.1")
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj.write_to_file(path).expect("write test dicom");
}

fn shoulder_fixture<'a>(instance_number: &'a str) -> Fixture<'a> {
    Fixture {
        modality: "XR",
        study_date: "20240301",
        series_number: "5",
        series_description: "left shoulder arthroscopy",
        body_part: "SHOULDER",
        instance_number,
    }
}

fn march_shoulder_config() -> OrganizeConfig {
    OrganizeConfig::from_cli("20240301", "20240331", "", "", false).expect("config")
}

#[test]
fn organize_classifies_by_date_range_and_exports_ordered_frames() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();

    write_dicom(&input.join("a.dcm"), &shoulder_fixture("2"));
    write_dicom(&input.join("b.dcm"), &shoulder_fixture("1"));

    let summary = organize::run(&input, &output, &march_shoulder_config()).expect("organize");
    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.classified, 2);
    assert_eq!(summary.unreadable, 0);
    assert_eq!(summary.series_total, 1);
    assert_eq!(summary.frames_exported, 2);
    assert_eq!(summary.decode_failures, 0);

    let series_dir = output
        .join("01_surg_shoulder")
        .join("XRAY")
        .join("20240301_S005_left_shoulder_arthroscopy");
    assert!(series_dir.join("frame_0000.png").is_file());
    assert!(series_dir.join("frame_0001.png").is_file());
    assert!(!series_dir.join("frame_0002.png").exists());

    let info = fs::read_to_string(series_dir.join("series.info.txt")).expect("digest");
    assert!(info.contains("Bucket: 01_surg_shoulder"));
    assert!(info.contains("Modality: XRAY"));
    assert!(info.contains("StudyDate: 20240301"));
    assert!(info.contains("FrameCount: 2"));
}

#[test]
fn unknown_modality_still_gets_a_folder_and_a_frame() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();

    write_dicom(
        &input.join("mystery.dcm"),
        &Fixture {
            modality: "ZZ",
            study_date: "20230101",
            series_number: "1",
            series_description: "routine followup",
            body_part: "",
            instance_number: "1",
        },
    );

    let summary = organize::run(&input, &output, &march_shoulder_config()).expect("organize");
    assert_eq!(summary.classified, 1);

    let series_dir = output
        .join("_unsorted")
        .join("OTHER")
        .join("20230101_S001_routine_followup");
    assert!(series_dir.join("frame_0000.png").is_file());
}

#[test]
fn unreadable_file_is_kept_and_counted_but_never_published() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();

    fs::write(input.join("broken.dcm"), b"not a dicom file at all").unwrap();

    let summary = organize::run(&input, &output, &march_shoulder_config()).expect("organize");
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.unreadable, 1);
    assert_eq!(summary.classified, 0);
    assert_eq!(summary.series_total, 1);
    assert_eq!(summary.frames_exported, 0);
    assert_eq!(summary.decode_failures, 1);

    // The fallback series folder exists for auditability...
    let series_dir = output.join("_unsorted").join("UNKNOWN").join("broken");
    assert!(series_dir.join("series.info.txt").is_file());

    // ...but a series with zero exported frames is not publishable.
    let built = manifest::build(&output, 0).expect("manifest");
    assert!(built.series.is_empty());
}

#[test]
fn decode_failure_leaves_a_gap_without_renumbering_later_frames() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();

    // Instance 1 parses but carries 2 of the 4 pixel bytes a 2x2 frame needs;
    // instance 2 is intact. The broken member must cost its own slot only.
    write_dicom_with_pixels(&input.join("a.dcm"), &shoulder_fixture("1"), vec![0u8, 0]);
    write_dicom(&input.join("b.dcm"), &shoulder_fixture("2"));

    let summary = organize::run(&input, &output, &march_shoulder_config()).expect("organize");
    assert_eq!(summary.classified, 2);
    assert_eq!(summary.frames_exported, 1);
    assert_eq!(summary.decode_failures, 1);

    let series_dir = output
        .join("01_surg_shoulder")
        .join("XRAY")
        .join("20240301_S005_left_shoulder_arthroscopy");
    assert!(!series_dir.join("frame_0000.png").exists());
    assert!(series_dir.join("frame_0001.png").is_file());
}

#[test]
fn manifest_classifies_and_is_byte_identical_across_reruns() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();

    // One two-frame series (animation) and one single-frame series (still).
    write_dicom(&input.join("a.dcm"), &shoulder_fixture("1"));
    write_dicom(&input.join("b.dcm"), &shoulder_fixture("2"));
    write_dicom(
        &input.join("c.dcm"),
        &Fixture {
            modality: "CT",
            study_date: "20240510",
            series_number: "2",
            series_description: "ankle ct",
            body_part: "ANKLE",
            instance_number: "1",
        },
    );

    let config = march_shoulder_config();
    organize::run(&input, &output, &config).expect("organize");

    let first = manifest::to_json_string(&manifest::build(&output, 0).unwrap()).unwrap();

    // Re-running the whole pipeline on unchanged input must not change a byte.
    organize::run(&input, &output, &config).expect("re-run");
    let second = manifest::to_json_string(&manifest::build(&output, 0).unwrap()).unwrap();
    assert_eq!(first, second);

    let built: Manifest = serde_json::from_str(&first).expect("parse manifest");
    assert_eq!(built.series.len(), 2);

    let shoulder = built
        .series
        .iter()
        .find(|e| e.bucket == "01_surg_shoulder")
        .expect("shoulder entry");
    assert_eq!(shoulder.classification, Classification::Animation);
    assert_eq!(shoulder.frame_count, 2);
    assert_eq!(shoulder.modality, "XRAY");

    let ankle = built
        .series
        .iter()
        .find(|e| e.bucket == "02_surg_ankle")
        .expect("ankle entry");
    assert_eq!(ankle.classification, Classification::Still);
    assert_eq!(ankle.frame_count, 1);
    assert_eq!(ankle.modality, "CT");
    assert_eq!(
        ankle.kept_frame_filenames,
        ["02_surg_ankle/CT/20240510_S002_ankle_ct/frame_0000.png"]
    );
}

#[test]
fn copy_dicom_retains_originals_beside_the_frames() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    fs::create_dir_all(&input).unwrap();
    write_dicom(&input.join("a.dcm"), &shoulder_fixture("1"));
    // Undecodable instances are retained too; those are the ones worth
    // re-examining later.
    write_dicom_with_pixels(&input.join("b.dcm"), &shoulder_fixture("2"), vec![0u8, 0]);

    let config = OrganizeConfig::from_cli("20240301", "20240331", "", "", true).expect("config");
    organize::run(&input, &output, &config).expect("organize");

    let series_dir = output
        .join("01_surg_shoulder")
        .join("XRAY")
        .join("20240301_S005_left_shoulder_arthroscopy");
    assert!(series_dir.join("dcm").join("a.dcm").is_file());
    assert!(series_dir.join("dcm").join("b.dcm").is_file());
}

/// Builds a fake organized series folder directly, bypassing DICOM decode.
fn fake_series(root: &Path, bucket: &str, modality: &str, series: &str, frames: usize) -> PathBuf {
    let dir = root.join(bucket).join(modality).join(series);
    fs::create_dir_all(&dir).unwrap();
    for i in 0..frames {
        fs::write(dir.join(format!("frame_{i:04}.png")), b"png").unwrap();
    }
    fs::write(dir.join("series.info.txt"), "SeriesDescription: test\n").unwrap();
    dir
}

#[test]
fn manifest_cap_takes_an_evenly_spaced_subsample() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("tree");
    fake_series(&root, "01_surg_shoulder", "XRAY", "s1", 10);

    let built = manifest::build(&root, 3).expect("manifest");
    let entry = &built.series[0];
    assert_eq!(entry.frame_count, 10);
    assert_eq!(entry.classification, Classification::Animation);
    assert_eq!(
        entry.kept_frame_filenames,
        [
            "01_surg_shoulder/XRAY/s1/frame_0000.png",
            "01_surg_shoulder/XRAY/s1/frame_0004.png",
            "01_surg_shoulder/XRAY/s1/frame_0009.png"
        ]
    );
    let info = &entry.info;
    assert_eq!(info.get("SeriesDescription").map(String::as_str), Some("test"));
}

#[test]
fn prune_drops_unreferenced_animation_frames_and_rewrites_the_manifest() {
    let dir = tempdir().expect("tempdir");
    let docs = dir.path().join("docs");
    let series_dir = fake_series(&docs, "01_surg_shoulder", "XRAY", "s1", 6);
    let still_dir = fake_series(&docs, "02_surg_ankle", "CT", "s2", 1);

    let built = manifest::build(&docs, 0).expect("manifest");
    fs::write(
        docs.join("manifest.json"),
        manifest::to_json_string(&built).unwrap(),
    )
    .unwrap();

    prune::run_prune(&docs, 2).expect("prune");

    // Every 2nd frame plus the last survives for the animation.
    for kept in [0, 2, 4, 5] {
        assert!(series_dir.join(format!("frame_{kept:04}.png")).is_file());
    }
    for gone in [1, 3] {
        assert!(!series_dir.join(format!("frame_{gone:04}.png")).exists());
    }
    // Stills are untouched.
    assert!(still_dir.join("frame_0000.png").is_file());

    let rewritten: Manifest =
        serde_json::from_str(&fs::read_to_string(docs.join("manifest.json")).unwrap())
            .expect("parse rewritten manifest");
    let animation: &ManifestEntry = rewritten
        .series
        .iter()
        .find(|e| e.series_id == "s1")
        .expect("animation entry");
    assert_eq!(animation.frame_count, 4);
    assert_eq!(animation.kept_frame_filenames.len(), 4);
}
