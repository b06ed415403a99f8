/// Patient/study overlay text
///
/// Builds the four-line top (patient) and bottom (study) overlay blocks from
/// a dataset. Tags are pervasively optional in real studies, so values are
/// resolved through ordered candidate lists with an em-dash placeholder at
/// the end. Absence is never an error here.

use chrono::{NaiveDate, NaiveTime};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::InMemDicomObject;

const PLACEHOLDER: &str = "—";

/// The eight rendered overlay lines for one pane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayText {
    pub top: [String; 4],
    pub bottom: [String; 4],
}

/// Build both overlay blocks from a dataset.
pub fn overlay_text(ds: &InMemDicomObject) -> OverlayText {
    let patient = clean_person_name(text(ds, tags::PATIENT_NAME));
    let id = text(ds, tags::PATIENT_ID).unwrap_or_else(|| PLACEHOLDER.into());
    let clinic = text(ds, tags::INSTITUTION_NAME).unwrap_or_else(|| PLACEHOLDER.into());
    let physician = clean_person_name(first_non_empty([
        text(ds, tags::REFERRING_PHYSICIAN_NAME),
        text(ds, tags::PERFORMING_PHYSICIAN_NAME),
        text(ds, tags::REQUESTING_PHYSICIAN),
    ]));

    let date = first_non_empty([
        text(ds, tags::STUDY_DATE),
        text(ds, tags::SERIES_DATE),
        text(ds, tags::ACQUISITION_DATE),
        text(ds, tags::CONTENT_DATE),
    ]);
    let time = first_non_empty([
        text(ds, tags::STUDY_TIME),
        text(ds, tags::SERIES_TIME),
        text(ds, tags::ACQUISITION_TIME),
        text(ds, tags::CONTENT_TIME),
    ]);
    let modality = text(ds, tags::MODALITY).unwrap_or_else(|| PLACEHOLDER.into());
    let study = first_non_empty([
        text(ds, tags::STUDY_DESCRIPTION),
        text(ds, tags::SERIES_DESCRIPTION),
        text(ds, tags::PROTOCOL_NAME),
    ])
    .unwrap_or_else(|| PLACEHOLDER.into());
    let index = first_non_empty([
        text(ds, tags::INSTANCE_NUMBER),
        text(ds, tags::ACQUISITION_NUMBER),
    ])
    .unwrap_or_else(|| PLACEHOLDER.into());
    let body_part = text(ds, tags::BODY_PART_EXAMINED).unwrap_or_else(|| PLACEHOLDER.into());
    let laterality = first_non_empty([
        text(ds, tags::IMAGE_LATERALITY),
        text(ds, tags::LATERALITY),
    ])
    .unwrap_or_default();

    OverlayText {
        top: [
            format!("Patient: {patient}"),
            format!("ID: {id}"),
            format!("Clinic: {clinic}"),
            format!("Physician: {physician}"),
        ],
        bottom: [
            format!(
                "Date/Time: {}",
                format_dicom_datetime(date.as_deref(), time.as_deref())
            ),
            format!("Modality/Study: {modality} / {study}"),
            format!("Image Index: {index}"),
            format!("Body Area/Laterality: {}", {
                let mut s = body_part;
                if !laterality.is_empty() {
                    s.push(' ');
                    s.push_str(&laterality);
                }
                s
            }),
        ],
    }
}

/// First present, non-empty candidate.
pub fn first_non_empty(candidates: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    candidates.into_iter().flatten().next()
}

/// One tag as trimmed text; empty values count as absent.
fn text(ds: &InMemDicomObject, tag: Tag) -> Option<String> {
    let value = ds.element(tag).ok()?.to_str().ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Person-name fields separate components with `^`.
fn clean_person_name(name: Option<String>) -> String {
    match name {
        Some(pn) => {
            let cleaned = pn.replace('^', " ");
            let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
            if cleaned.is_empty() {
                PLACEHOLDER.into()
            } else {
                cleaned
            }
        }
        None => PLACEHOLDER.into(),
    }
}

/// Render DA (`YYYYMMDD`) and TM (`HHMMSS[.frac]`) values as a single
/// human-readable line, degrading gracefully when either part is missing or
/// malformed.
pub fn format_dicom_datetime(date: Option<&str>, time: Option<&str>) -> String {
    let parsed_date = date
        .filter(|d| d.len() >= 8)
        .and_then(|d| NaiveDate::parse_from_str(&d[..8], "%Y%m%d").ok());
    let parsed_time = time.and_then(parse_dicom_time);

    match (parsed_date, parsed_time) {
        (Some(d), Some(t)) => format!(
            "{} {}",
            d.format("%b %-d, %Y"),
            t.format("%-I:%M %p")
        ),
        (Some(d), None) => d.format("%b %-d, %Y").to_string(),
        (None, Some(t)) => t.format("%-I:%M %p").to_string(),
        (None, None) => PLACEHOLDER.into(),
    }
}

fn parse_dicom_time(raw: &str) -> Option<NaiveTime> {
    // Drop fractional seconds; pad missing minute/second components.
    let whole = raw.split('.').next().unwrap_or("");
    if whole.len() < 2 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{whole:0<6}");
    NaiveTime::parse_from_str(&padded[..6], "%H%M%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::value::PrimitiveValue;
    use dicom::core::{DataElement, VR};

    #[test]
    fn test_first_non_empty_resolution() {
        assert_eq!(
            first_non_empty([None, Some("b".into()), Some("c".into())]),
            Some("b".to_string())
        );
        assert_eq!(first_non_empty([None, None]), None);
    }

    #[test]
    fn test_person_name_cleanup() {
        assert_eq!(clean_person_name(Some("Doe^Jane^^Dr".into())), "Doe Jane Dr");
        assert_eq!(clean_person_name(Some("^".into())), PLACEHOLDER);
        assert_eq!(clean_person_name(None), PLACEHOLDER);
    }

    #[test]
    fn test_datetime_formats() {
        assert_eq!(
            format_dicom_datetime(Some("20240306"), Some("141502.123")),
            "Mar 6, 2024 2:15 PM"
        );
        assert_eq!(format_dicom_datetime(Some("20240306"), None), "Mar 6, 2024");
        assert_eq!(format_dicom_datetime(None, Some("0900")), "9:00 AM");
        assert_eq!(format_dicom_datetime(None, None), PLACEHOLDER);
        assert_eq!(format_dicom_datetime(Some("2024"), Some("junk")), PLACEHOLDER);
    }

    #[test]
    fn test_overlay_falls_back_across_tags() {
        let mut ds = InMemDicomObject::new_empty();
        ds.put(DataElement::new(
            tags::PERFORMING_PHYSICIAN_NAME,
            VR::PN,
            PrimitiveValue::from("Who^Jo"),
        ));
        ds.put(DataElement::new(
            tags::SERIES_DESCRIPTION,
            VR::LO,
            PrimitiveValue::from("Axial chest"),
        ));

        let overlay = overlay_text(&ds);
        assert_eq!(overlay.top[3], "Physician: Who Jo");
        assert_eq!(overlay.bottom[1], "Modality/Study: — / Axial chest");
        assert_eq!(overlay.top[0], "Patient: —");
    }

    #[test]
    fn test_empty_dataset_renders_placeholders() {
        let overlay = overlay_text(&InMemDicomObject::new_empty());
        assert_eq!(overlay.top[1], "ID: —");
        assert_eq!(overlay.bottom[0], "Date/Time: —");
    }
}
