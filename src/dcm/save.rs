/// Derived working-copy writer
///
/// A save never touches the source: the dataset is cloned, given fresh
/// series/instance identities so it is a new derived version at the protocol
/// level, stamped with the display state through the annotation codec, and
/// written to a new path. A failed save therefore cannot corrupt either the
/// original file or the running session.

use std::path::{Path, PathBuf};

use dicom::core::value::PrimitiveValue;
use dicom::core::{DataElement, VR};
use dicom::dictionary_std::tags;
use dicom::object::FileMetaTableBuilder;
use tokio::task;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::imaging::WindowSetting;
use crate::state::AnnotationSet;

use super::codec;
use super::{DcmError, SourceFile};

/// Secondary Capture Image Storage, the fallback SOP class for datasets
/// missing their own.
const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

/// Background wrapper used by the UI task queue.
pub async fn save_derived_async(
    source: SourceFile,
    setting: WindowSetting,
    annotations: AnnotationSet,
    out_path: PathBuf,
) -> Result<PathBuf, String> {
    task::spawn_blocking(move || {
        save_derived(&source, setting, &annotations, &out_path)
            .map(|_| out_path)
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| format!("background task failed: {e}"))?
}

/// Write a derived copy of `source` carrying the given display state.
pub fn save_derived(
    source: &SourceFile,
    setting: WindowSetting,
    annotations: &AnnotationSet,
    out_path: &Path,
) -> Result<(), DcmError> {
    let mut ds = source.clone().into_inner();

    // Fresh identities: a new series holding a new instance, derived from
    // the source rather than overwriting it. The study identity is kept.
    let sop_uid = derived_uid();
    ds.put(DataElement::new(
        tags::SERIES_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(derived_uid()),
    ));
    ds.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(sop_uid.clone()),
    ));

    codec::write_display_state(&mut ds, setting, annotations)?;

    // UI values are null-padded to even length; strip that before reuse.
    let sop_class = ds
        .element(tags::SOP_CLASS_UID)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| {
            s.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| SECONDARY_CAPTURE.to_string());
    let transfer_syntax = source.meta().transfer_syntax().to_string();

    let file = ds
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(transfer_syntax)
                .media_storage_sop_class_uid(sop_class)
                .media_storage_sop_instance_uid(sop_uid),
        )
        .map_err(|e| DcmError::Write(e.to_string()))?;

    file.write_to_file(out_path)
        .map_err(|e| DcmError::Write(e.to_string()))?;

    println!("💾 Saved working copy: {}", out_path.display());
    Ok(())
}

/// UUID-derived UID (the 2.25 root).
fn derived_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

/// Suggested name for the next saved version:
/// `scan.dcm → scan_v1.dcm → scan_v2.dcm → …`
pub fn next_version_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut name = match split_version(&stem) {
        Some((base, n)) => format!("{base}_v{}", n + 1),
        None => format!("{stem}_v1"),
    };
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

fn split_version(stem: &str) -> Option<(&str, u32)> {
    let idx = stem.rfind("_v")?;
    let digits = &stem[idx + 2..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&stem[..idx], digits.parse().ok()?))
}

/// The lexicographic successor of `path` among the `.dcm` files in its
/// directory, used to auto-populate the right pane in side-by-side mode.
pub fn next_file_in_dir(path: &Path) -> Option<PathBuf> {
    let dir = path.parent()?;
    let current = path.file_name()?.to_string_lossy().to_string();

    let mut siblings: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map_or(false, |ext| ext.to_string_lossy().eq_ignore_ascii_case("dcm"))
        })
        .map(|entry| {
            (
                entry.file_name().to_string_lossy().to_string(),
                entry.into_path(),
            )
        })
        .collect();
    siblings.sort();

    siblings
        .into_iter()
        .find(|(name, _)| *name > current)
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_version_names_sequence() {
        let first = next_version_name(Path::new("/scans/chest.dcm"));
        assert_eq!(first, Path::new("/scans/chest_v1.dcm"));

        let second = next_version_name(&first);
        assert_eq!(second, Path::new("/scans/chest_v2.dcm"));

        let eleventh = next_version_name(Path::new("/scans/chest_v10.dcm"));
        assert_eq!(eleventh, Path::new("/scans/chest_v11.dcm"));
    }

    #[test]
    fn test_version_name_ignores_non_numeric_suffix() {
        let named = next_version_name(Path::new("/scans/chest_view.dcm"));
        assert_eq!(named, Path::new("/scans/chest_view_v1.dcm"));
    }

    #[test]
    fn test_next_file_lookup() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.dcm", "b.dcm", "c.DCM", "notes.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let after_a = next_file_in_dir(&dir.path().join("a.dcm")).unwrap();
        assert_eq!(after_a.file_name().unwrap(), "b.dcm");

        let after_b = next_file_in_dir(&dir.path().join("b.dcm")).unwrap();
        assert_eq!(after_b.file_name().unwrap(), "c.DCM");

        assert!(next_file_in_dir(&dir.path().join("c.DCM")).is_none());
    }

    #[test]
    fn test_next_file_lookup_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(next_file_in_dir(&dir.path().join("only.dcm")).is_none());
    }

    mod round_trip {
        use super::*;
        use crate::dcm::load::load_image;
        use crate::state::{Point, Rgb, Stroke};
        use dicom::core::dicom_value;
        use dicom::object::InMemDicomObject;

        const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

        /// A minimal but valid single-frame 16-bit grayscale file on disk.
        fn write_synthetic(path: &Path, width: u16, height: u16) {
            let mut ds = InMemDicomObject::new_empty();
            ds.put(DataElement::new(
                tags::SOP_CLASS_UID,
                VR::UI,
                PrimitiveValue::from(SECONDARY_CAPTURE),
            ));
            ds.put(DataElement::new(
                tags::SOP_INSTANCE_UID,
                VR::UI,
                PrimitiveValue::from("2.25.4242"),
            ));
            ds.put(DataElement::new(
                tags::PATIENT_NAME,
                VR::PN,
                PrimitiveValue::from("Doe^Jane"),
            ));
            ds.put(DataElement::new(tags::ROWS, VR::US, dicom_value!(U16, height)));
            ds.put(DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, width)));
            ds.put(DataElement::new(
                tags::BITS_ALLOCATED,
                VR::US,
                dicom_value!(U16, 16),
            ));
            ds.put(DataElement::new(
                tags::BITS_STORED,
                VR::US,
                dicom_value!(U16, 16),
            ));
            ds.put(DataElement::new(tags::HIGH_BIT, VR::US, dicom_value!(U16, 15)));
            ds.put(DataElement::new(
                tags::PIXEL_REPRESENTATION,
                VR::US,
                dicom_value!(U16, 0),
            ));
            ds.put(DataElement::new(
                tags::SAMPLES_PER_PIXEL,
                VR::US,
                dicom_value!(U16, 1),
            ));
            ds.put(DataElement::new(
                tags::PHOTOMETRIC_INTERPRETATION,
                VR::CS,
                PrimitiveValue::from("MONOCHROME2"),
            ));

            let samples: Vec<u16> = (0..width as u32 * height as u32)
                .map(|i| (i * 37 % 4096) as u16)
                .collect();
            ds.put(DataElement::new(
                tags::PIXEL_DATA,
                VR::OW,
                PrimitiveValue::U16(samples.into()),
            ));

            ds.with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(EXPLICIT_VR_LE)
                    .media_storage_sop_class_uid(SECONDARY_CAPTURE)
                    .media_storage_sop_instance_uid("2.25.4242"),
            )
            .unwrap()
            .write_to_file(path)
            .unwrap();
        }

        fn three_strokes() -> AnnotationSet {
            let mut set = AnnotationSet::new();
            for i in 0..3 {
                let mut stroke =
                    Stroke::begin(Point::new(i as f32, 1.0), 3.0, Rgb::BLUE);
                stroke.push(Point::new(i as f32 + 5.0, 8.0));
                set.push(stroke);
            }
            set
        }

        #[test]
        fn test_save_reload_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let original = dir.path().join("scan.dcm");
            write_synthetic(&original, 16, 16);

            let loaded = load_image(&original).unwrap();
            assert!(!loaded.derived);
            assert_eq!(loaded.window, loaded.auto_window);
            assert!(loaded.annotations.is_empty());

            let setting = WindowSetting::new(40, 350);
            let strokes = three_strokes();
            let copy = next_version_name(&original);
            save_derived(&loaded.source, setting, &strokes, &copy).unwrap();

            let reloaded = load_image(&copy).unwrap();
            assert!(reloaded.derived);
            assert_eq!(reloaded.window, setting);
            assert_eq!(reloaded.annotations, strokes);
            // Pixels and untouched metadata survive.
            assert_eq!(reloaded.buffer, loaded.buffer);
            let patient = reloaded
                .source
                .element(tags::PATIENT_NAME)
                .unwrap()
                .to_str()
                .unwrap()
                .trim()
                .to_string();
            assert_eq!(patient, "Doe^Jane");

            // The source file is still pristine.
            let original_again = load_image(&original).unwrap();
            assert!(!original_again.derived);
            assert!(original_again.annotations.is_empty());
        }

        #[test]
        fn test_save_is_idempotent_across_versions() {
            let dir = tempfile::tempdir().unwrap();
            let original = dir.path().join("scan.dcm");
            write_synthetic(&original, 8, 8);

            let setting = WindowSetting::new(-600, 1500);
            let strokes = three_strokes();

            let v1 = dir.path().join("scan_v1.dcm");
            let loaded = load_image(&original).unwrap();
            save_derived(&loaded.source, setting, &strokes, &v1).unwrap();

            // Save the reloaded copy again: the round trip must be stable.
            let loaded_v1 = load_image(&v1).unwrap();
            let v2 = dir.path().join("scan_v2.dcm");
            save_derived(&loaded_v1.source, loaded_v1.window, &loaded_v1.annotations, &v2)
                .unwrap();

            let loaded_v2 = load_image(&v2).unwrap();
            assert_eq!(loaded_v2.window, setting);
            assert_eq!(loaded_v2.annotations, strokes);
        }

        #[test]
        fn test_derived_copies_get_distinct_identities() {
            let dir = tempfile::tempdir().unwrap();
            let original = dir.path().join("scan.dcm");
            write_synthetic(&original, 8, 8);

            let loaded = load_image(&original).unwrap();
            let a = dir.path().join("a_copy.dcm");
            let b = dir.path().join("b_copy.dcm");
            save_derived(&loaded.source, loaded.window, &loaded.annotations, &a).unwrap();
            save_derived(&loaded.source, loaded.window, &loaded.annotations, &b).unwrap();

            let uid = |path: &Path| {
                load_image(path)
                    .unwrap()
                    .source
                    .element(tags::SOP_INSTANCE_UID)
                    .unwrap()
                    .to_str()
                    .unwrap()
                    .trim()
                    .to_string()
            };
            let original_uid = uid(&original);
            let a_uid = uid(&a);
            let b_uid = uid(&b);
            assert_ne!(a_uid, original_uid);
            assert_ne!(b_uid, original_uid);
            assert_ne!(a_uid, b_uid);
        }
    }
}
