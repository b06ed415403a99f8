/// Per-pane viewing state
///
/// A pane is one independent image session: its own sample buffer, window
/// setting, annotation set, and backing file. Two panes coexist (left and
/// right) and never share a buffer or an annotation set; every mutation is
/// routed to exactly one of them through the session router.

use std::path::PathBuf;

use crate::dcm::load::LoadedImage;
use crate::dcm::overlay::OverlayText;
use crate::dcm::Rescale;
use crate::dcm::SourceFile;
use crate::imaging::{apply_window, SampleBuffer, WindowSetting};

use super::annotations::{AnnotationSet, Point, Rgb, Stroke};

/// Identity of a viewing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneId {
    Left,
    Right,
}

/// Mutable state of one viewing surface.
#[derive(Debug)]
pub struct PaneState {
    /// Decoded sample grid; None until a file is loaded into this pane.
    pub buffer: Option<SampleBuffer>,
    /// Current window center/width.
    pub setting: WindowSetting,
    /// Percentile estimate captured at load time; the reset baseline.
    pub auto_setting: WindowSetting,
    /// Finished strokes, oldest first.
    pub annotations: AnnotationSet,
    /// Gesture currently being drawn, if any.
    pub live_stroke: Option<Stroke>,
    pub draw_mode: bool,
    pub annotations_visible: bool,
    pub stroke_width: f32,
    pub stroke_color: Rgb,
    /// Path of the backing file.
    pub file_path: Option<PathBuf>,
    /// The opened dataset, retained so a save can clone it.
    pub source: Option<SourceFile>,
    /// Sample-to-HU conversion from the file's rescale tags.
    pub rescale: Rescale,
    /// Whether the backing file was produced by our own save path.
    pub derived: bool,
    /// Patient/study text for the info overlays.
    pub overlay: OverlayText,
}

impl Default for PaneState {
    fn default() -> Self {
        Self {
            buffer: None,
            setting: WindowSetting::default(),
            auto_setting: WindowSetting::default(),
            annotations: AnnotationSet::new(),
            live_stroke: None,
            draw_mode: false,
            annotations_visible: true,
            stroke_width: 2.0,
            stroke_color: Rgb::RED,
            file_path: None,
            source: None,
            rescale: Rescale::default(),
            derived: false,
            overlay: OverlayText::default(),
        }
    }
}

impl PaneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-initialize this pane in full from a freshly loaded image.
    ///
    /// Window and annotations come from the load path (persisted values for a
    /// derived file, the auto estimate otherwise); drawing starts disabled.
    pub fn load_from(&mut self, image: LoadedImage) {
        *self = Self {
            buffer: Some(image.buffer),
            setting: image.window,
            auto_setting: image.auto_window,
            annotations: image.annotations,
            file_path: Some(image.path),
            source: Some(image.source),
            rescale: image.rescale,
            derived: image.derived,
            overlay: image.overlay,
            ..Self::default()
        };
    }

    pub fn has_image(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn set_center(&mut self, center: i32) {
        self.setting = WindowSetting::new(center, self.setting.width);
    }

    pub fn set_width(&mut self, width: i32) {
        self.setting = WindowSetting::new(self.setting.center, width);
    }

    /// Back to the percentile estimate captured at load time.
    pub fn reset_window(&mut self) {
        self.setting = self.auto_setting;
    }

    /// Windowed intensities for display, or None with no image loaded.
    pub fn display(&self) -> Option<Vec<u16>> {
        self.buffer
            .as_ref()
            .map(|buffer| apply_window(buffer, self.setting))
    }

    /// Raw sample → rescaled unit value (HU for CT) at pixel coordinates.
    pub fn unit_value_at(&self, x: u32, y: u32) -> Option<f64> {
        let raw = self.buffer.as_ref()?.get(x, y)?;
        Some(self.rescale.apply(raw))
    }

    /// Start a gesture with the pane's current style.
    pub fn begin_stroke(&mut self, at: Point) {
        self.live_stroke = Some(Stroke::begin(at, self.stroke_width, self.stroke_color));
    }

    pub fn extend_stroke(&mut self, to: Point) {
        if let Some(stroke) = self.live_stroke.as_mut() {
            stroke.push(to);
        }
    }

    /// Commit the in-progress gesture to the annotation set.
    pub fn finish_stroke(&mut self) {
        if let Some(stroke) = self.live_stroke.take() {
            self.annotations.push(stroke);
        }
    }

    pub fn undo_stroke(&mut self) {
        self.annotations.undo();
    }

    pub fn clear_strokes(&mut self) {
        self.live_stroke = None;
        self.annotations.clear();
    }
}
