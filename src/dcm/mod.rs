/// DICOM container handling
///
/// Everything that touches the structured file format lives here:
/// - codec.rs: the private-tag annotation codec and provenance detector
/// - load.rs: file → decoded sample buffer + restored-or-estimated state
/// - save.rs: derived working-copy writer, versioned names, sibling lookup
/// - overlay.rs: metadata fallback chains for the patient/study overlays

pub mod codec;
pub mod load;
pub mod overlay;
pub mod save;

use thiserror::Error;

/// The opened file object a pane retains so a save can clone its dataset.
pub type SourceFile = dicom::object::DefaultDicomObject;

pub use load::Rescale;

/// Failures of the load/save paths. Pure display-path computations never
/// produce these; a blank display is handled with safe defaults instead.
#[derive(Debug, Error)]
pub enum DcmError {
    /// Malformed or unreadable input file. No pane state is mutated.
    #[error("could not read DICOM file: {0}")]
    Read(String),

    /// The dataset decoded, but its pixel data is unusable.
    #[error("unusable pixel data: {0}")]
    Pixels(String),

    /// Writing the derived copy failed. The source file and the in-memory
    /// session are unaffected; saves only ever produce new files.
    #[error("could not write working copy: {0}")]
    Write(String),

    /// Stroke payload could not be encoded.
    #[error("could not encode annotations: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<crate::imaging::buffer::SizeMismatch> for DcmError {
    fn from(err: crate::imaging::buffer::SizeMismatch) -> Self {
        DcmError::Pixels(err.to_string())
    }
}
