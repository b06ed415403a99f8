/// Private-tag annotation codec and edit-provenance detection
///
/// Edited display state is embedded in a private block of group 0x0011. The
/// creator element registers ownership of the block and must be written
/// before the elements that live in it; its presence is also the sole signal
/// that a file came from our save path. Readers that do not know the block
/// ignore it, so a derived file stays a valid instance of the host format.

use dicom::core::value::PrimitiveValue;
use dicom::core::{dicom_value, DataElement, Tag, VR};
use dicom::dictionary_std::tags;
use dicom::object::InMemDicomObject;

use crate::imaging::WindowSetting;
use crate::state::AnnotationSet;

use super::DcmError;

/// Sentinel value of the private creator element. Compared
/// case-insensitively on read.
pub const CREATOR_ID: &str = "CT VIEWER";

/// Private creator (block registration), written before the block contents.
pub const CREATOR_TAG: Tag = Tag(0x0011, 0x0010);

/// Serialized stroke geometry, opaque to everything but this codec.
pub const STROKES_TAG: Tag = Tag(0x0011, 0x1001);

/// Write the current display state into a dataset.
///
/// Window center/width also go into the standard display-hint elements so
/// readers unaware of the private block still open the file with a sensible
/// default window. An empty annotation set omits the payload element
/// entirely (and drops a stale one) rather than writing zero bytes.
pub fn write_display_state(
    ds: &mut InMemDicomObject,
    setting: WindowSetting,
    annotations: &AnnotationSet,
) -> Result<(), DcmError> {
    ds.put(DataElement::new(
        tags::WINDOW_WIDTH,
        VR::DS,
        dicom_value!(F64, setting.width as f64),
    ));
    ds.put(DataElement::new(
        tags::WINDOW_CENTER,
        VR::DS,
        dicom_value!(F64, setting.center as f64),
    ));

    // Register the block owner first; the payload element belongs to it.
    ds.put(DataElement::new(
        CREATOR_TAG,
        VR::LO,
        PrimitiveValue::from(CREATOR_ID),
    ));

    if annotations.is_empty() {
        ds.remove_element(STROKES_TAG);
    } else {
        let payload = annotations.to_payload()?;
        ds.put(DataElement::new(
            STROKES_TAG,
            VR::OB,
            PrimitiveValue::U8(payload.into()),
        ));
    }

    Ok(())
}

/// Read the standard window display hints, each independently. Absence is
/// surfaced as None so the caller can fall back to the auto estimate
/// per component.
pub fn read_window(ds: &InMemDicomObject) -> (Option<f64>, Option<f64>) {
    let center = ds
        .element(tags::WINDOW_CENTER)
        .ok()
        .and_then(|e| e.to_float64().ok());
    let width = ds
        .element(tags::WINDOW_WIDTH)
        .ok()
        .and_then(|e| e.to_float64().ok());
    (center, width)
}

/// The trimmed value of the private creator element, if present.
pub fn provenance_marker(ds: &InMemDicomObject) -> Option<String> {
    ds.element(CREATOR_TAG)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// True iff the file carries our creator sentinel (case-insensitive).
/// Absence of the element, or any failure to read it, means "not ours".
pub fn is_derived(ds: &InMemDicomObject) -> bool {
    provenance_marker(ds).map_or(false, |marker| marker.eq_ignore_ascii_case(CREATOR_ID))
}

/// Restore the annotation set from a dataset.
///
/// Strokes come back only when the creator marker matches and the payload
/// is present, non-empty, and decodes. Every other combination yields an
/// empty set: a partial or garbled restore is never surfaced.
pub fn read_annotations(ds: &InMemDicomObject) -> AnnotationSet {
    if !is_derived(ds) {
        return AnnotationSet::new();
    }
    let bytes = match ds.element(STROKES_TAG).ok().and_then(|e| e.to_bytes().ok()) {
        Some(bytes) => bytes,
        None => return AnnotationSet::new(),
    };
    if bytes.is_empty() {
        return AnnotationSet::new();
    }
    AnnotationSet::from_payload(&bytes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Point, Rgb, Stroke};

    fn three_strokes() -> AnnotationSet {
        let mut set = AnnotationSet::new();
        for i in 0..3 {
            let mut stroke = Stroke::begin(Point::new(i as f32, 0.0), 2.0, Rgb::RED);
            stroke.push(Point::new(i as f32, 10.0));
            set.push(stroke);
        }
        set
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut ds = InMemDicomObject::new_empty();
        let setting = WindowSetting::new(40, 350);
        let strokes = three_strokes();

        write_display_state(&mut ds, setting, &strokes).unwrap();

        assert!(is_derived(&ds));
        let (center, width) = read_window(&ds);
        assert_eq!(center, Some(40.0));
        assert_eq!(width, Some(350.0));

        let restored = read_annotations(&ds);
        assert_eq!(restored, strokes);
    }

    #[test]
    fn test_fresh_dataset_is_not_derived() {
        let ds = InMemDicomObject::new_empty();
        assert!(!is_derived(&ds));
        assert_eq!(read_window(&ds), (None, None));
        assert!(read_annotations(&ds).is_empty());
    }

    #[test]
    fn test_marker_match_is_case_insensitive() {
        let mut ds = InMemDicomObject::new_empty();
        ds.put(DataElement::new(
            CREATOR_TAG,
            VR::LO,
            PrimitiveValue::from("ct viewer"),
        ));
        assert!(is_derived(&ds));
    }

    #[test]
    fn test_foreign_marker_restores_nothing() {
        let mut ds = InMemDicomObject::new_empty();
        write_display_state(&mut ds, WindowSetting::new(0, 1), &three_strokes()).unwrap();
        // Another application owning the same group must not leak strokes in.
        ds.put(DataElement::new(
            CREATOR_TAG,
            VR::LO,
            PrimitiveValue::from("OTHER APP"),
        ));

        assert!(!is_derived(&ds));
        assert!(read_annotations(&ds).is_empty());
    }

    #[test]
    fn test_marker_without_payload_restores_empty_set() {
        let mut ds = InMemDicomObject::new_empty();
        write_display_state(&mut ds, WindowSetting::new(50, 400), &AnnotationSet::new()).unwrap();

        assert!(is_derived(&ds));
        assert!(ds.element(STROKES_TAG).is_err());
        assert!(read_annotations(&ds).is_empty());
    }

    #[test]
    fn test_empty_set_drops_stale_payload() {
        let mut ds = InMemDicomObject::new_empty();
        write_display_state(&mut ds, WindowSetting::new(50, 400), &three_strokes()).unwrap();
        assert!(ds.element(STROKES_TAG).is_ok());

        // Saving again after the user cleared everything removes the payload.
        write_display_state(&mut ds, WindowSetting::new(50, 400), &AnnotationSet::new()).unwrap();
        assert!(ds.element(STROKES_TAG).is_err());
        assert!(read_annotations(&ds).is_empty());
    }

    #[test]
    fn test_garbled_payload_restores_empty_set() {
        let mut ds = InMemDicomObject::new_empty();
        ds.put(DataElement::new(
            CREATOR_TAG,
            VR::LO,
            PrimitiveValue::from(CREATOR_ID),
        ));
        ds.put(DataElement::new(
            STROKES_TAG,
            VR::OB,
            PrimitiveValue::U8(b"{ not valid json".to_vec().into()),
        ));
        assert!(read_annotations(&ds).is_empty());
    }

    #[test]
    fn test_window_components_read_independently() {
        let mut ds = InMemDicomObject::new_empty();
        ds.put(DataElement::new(
            tags::WINDOW_CENTER,
            VR::DS,
            dicom_value!(F64, 123.0),
        ));
        let (center, width) = read_window(&ds);
        assert_eq!(center, Some(123.0));
        assert_eq!(width, None);
    }
}
