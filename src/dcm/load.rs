/// DICOM file loading
///
/// Decodes frame 0 of a single-frame grayscale file into a SampleBuffer and
/// decides, via the provenance detector, whether to trust persisted display
/// state or fall back to the fresh percentile estimate. Runs on a blocking
/// task so decode never stalls the UI thread.

use std::path::{Path, PathBuf};

use dicom::core::value::PrimitiveValue;
use dicom::dictionary_std::tags;
use dicom::object::open_file;
use tokio::task;

use crate::imaging::{auto_window, SampleBuffer, WindowSetting};
use crate::state::AnnotationSet;

use super::codec;
use super::overlay::{self, OverlayText};
use super::{DcmError, SourceFile};

/// Rescale slope/intercept pair for the unit-value (HU) readout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for Rescale {
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl Rescale {
    /// Raw stored sample → rescaled unit value.
    pub fn apply(&self, raw: u16) -> f64 {
        self.slope * raw as f64 + self.intercept
    }

    /// Rescaled unit value → raw stored sample value (for presets given in
    /// HU). A degenerate slope is treated as identity.
    pub fn invert(&self, unit: f64) -> f64 {
        if self.slope == 0.0 {
            return unit - self.intercept;
        }
        (unit - self.intercept) / self.slope
    }

    /// Width of a window expressed in rescaled units, converted back to raw
    /// sample units. Spans are scale-only; the intercept cancels out.
    pub fn invert_span(&self, span: f64) -> f64 {
        if self.slope == 0.0 {
            return span;
        }
        span / self.slope.abs()
    }
}

/// Everything the load path hands to a pane in one piece.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub source: SourceFile,
    pub buffer: SampleBuffer,
    pub rescale: Rescale,
    /// Window to display: persisted values for a derived file, the estimate
    /// otherwise.
    pub window: WindowSetting,
    /// Percentile estimate, kept as the pane's reset baseline either way.
    pub auto_window: WindowSetting,
    pub annotations: AnnotationSet,
    pub derived: bool,
    pub overlay: OverlayText,
}

/// Background wrapper used by the UI task queue. Errors are flattened to the
/// human-readable message shown in the status line.
pub async fn load_image_async(path: PathBuf) -> Result<LoadedImage, String> {
    task::spawn_blocking(move || load_image(&path).map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("background task failed: {e}"))?
}

/// Load and decode one file. Nothing is mutated on failure; the caller's
/// panes stay exactly as they were.
pub fn load_image(path: &Path) -> Result<LoadedImage, DcmError> {
    let source = open_file(path).map_err(|e| DcmError::Read(e.to_string()))?;

    let buffer = decode_frame(&source)?;
    let rescale = read_rescale(&source);
    let estimate = auto_window(&buffer);
    let derived = codec::is_derived(&source);

    let (window, annotations) = if derived {
        let (center, width) = codec::read_window(&source);
        let window = WindowSetting::new(
            center.map(|v| v.round() as i32).unwrap_or(estimate.center),
            width.map(|v| v.round() as i32).unwrap_or(estimate.width),
        );
        (window, codec::read_annotations(&source))
    } else {
        (estimate, AnnotationSet::new())
    };

    let overlay = overlay::overlay_text(&source);

    println!(
        "📂 Loaded {}: {}x{}, window C{} W{}, {} stroke(s){}",
        path.display(),
        buffer.width(),
        buffer.height(),
        window.center,
        window.width,
        annotations.len(),
        if derived { " [working copy]" } else { "" },
    );

    Ok(LoadedImage {
        path: path.to_path_buf(),
        source,
        buffer,
        rescale,
        window,
        auto_window: estimate,
        annotations,
        derived,
        overlay,
    })
}

/// Frame 0 as a row-major u16 grid.
fn decode_frame(source: &SourceFile) -> Result<SampleBuffer, DcmError> {
    let width = source
        .element(tags::COLUMNS)
        .ok()
        .and_then(|e| e.to_int::<u32>().ok())
        .ok_or_else(|| DcmError::Pixels("missing Columns".into()))?;
    let height = source
        .element(tags::ROWS)
        .ok()
        .and_then(|e| e.to_int::<u32>().ok())
        .ok_or_else(|| DcmError::Pixels("missing Rows".into()))?;

    let frame_len = width as usize * height as usize;
    let element = source
        .element(tags::PIXEL_DATA)
        .map_err(|e| DcmError::Pixels(e.to_string()))?;

    // Native (uncompressed) pixel data only; 16 bits per sample. A
    // multi-frame file contributes its first frame.
    let samples: Vec<u16> = match element.value().primitive() {
        Some(PrimitiveValue::U16(values)) => values.iter().copied().take(frame_len).collect(),
        Some(PrimitiveValue::U8(bytes)) => bytes
            .chunks_exact(2)
            .take(frame_len)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
        _ => {
            return Err(DcmError::Pixels(
                "unsupported or encapsulated pixel data".into(),
            ))
        }
    };

    if samples.len() < frame_len {
        return Err(DcmError::Pixels(format!(
            "frame holds {} samples, expected {} for {}x{}",
            samples.len(),
            frame_len,
            width,
            height,
        )));
    }

    Ok(SampleBuffer::new(width, height, samples)?)
}

/// RescaleSlope/RescaleIntercept with the standard defaults when absent.
fn read_rescale(source: &SourceFile) -> Rescale {
    let slope = source
        .element(tags::RESCALE_SLOPE)
        .ok()
        .and_then(|e| e.to_float64().ok())
        .filter(|s| *s != 0.0)
        .unwrap_or(1.0);
    let intercept = source
        .element(tags::RESCALE_INTERCEPT)
        .ok()
        .and_then(|e| e.to_float64().ok())
        .unwrap_or(0.0);
    Rescale { slope, intercept }
}
