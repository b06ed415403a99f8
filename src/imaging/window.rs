/// Window/level transform and auto-window estimation
///
/// The transform maps the wide-dynamic-range sample buffer into the visible
/// intensity range under a center/width model. It is a pure function of its
/// inputs: same buffer and setting, byte-identical output.

use serde::{Deserialize, Serialize};

use super::buffer::SampleBuffer;

/// Brightest displayable intensity (16-bit grayscale output).
pub const MAX_DISPLAY: u16 = u16::MAX;

/// A display window: the midpoint and span of the sample range mapped to the
/// visible intensity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSetting {
    pub center: i32,
    pub width: i32,
}

impl WindowSetting {
    /// Create a setting, clamping width to at least 1 (zero width would be a
    /// division by zero in the transform).
    pub fn new(center: i32, width: i32) -> Self {
        Self {
            center,
            width: width.max(1),
        }
    }

    /// Samples at or below this value display as black.
    pub fn lower_bound(&self) -> f64 {
        self.center as f64 - self.width as f64 / 2.0
    }

    /// Samples at or above this value display as white.
    pub fn upper_bound(&self) -> f64 {
        self.center as f64 + self.width as f64 / 2.0
    }
}

impl Default for WindowSetting {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

/// Apply linear window/level scaling to a sample buffer.
///
/// Values at or below the lower bound clamp to black, values at or above the
/// upper bound clamp to white, and values in between ramp linearly. The
/// output has the same dimensions as the input; an empty buffer yields an
/// empty output rather than an error.
pub fn apply_window(buffer: &SampleBuffer, setting: WindowSetting) -> Vec<u16> {
    let min = setting.lower_bound();
    let max = setting.upper_bound();
    let width = setting.width.max(1) as f64;

    buffer
        .samples()
        .iter()
        .map(|&sample| {
            let value = sample as f64;
            if value <= min {
                0
            } else if value >= max {
                MAX_DISPLAY
            } else {
                ((value - min) / width * MAX_DISPLAY as f64) as u16
            }
        })
        .collect()
}

/// Estimate a window that maps the central 98% of the sample distribution
/// into the visible range, discarding the top/bottom 1% as outliers.
///
/// This estimate doubles as the pane's permanent "reset to default" baseline.
/// An empty buffer returns a safe default instead of failing; a blank
/// display is an acceptable degraded state.
pub fn auto_window(buffer: &SampleBuffer) -> WindowSetting {
    if buffer.is_empty() {
        return WindowSetting::new(0, 1);
    }

    let mut sorted = buffer.samples().to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let lower_index = ((n as f64 * 0.01) as usize).min(n - 1);
    let upper_index = ((n as f64 * 0.99) as usize).min(n - 1);

    let min_val = sorted[lower_index] as i32;
    let max_val = sorted[upper_index] as i32;

    WindowSetting::new((max_val + min_val) / 2, (max_val - min_val).max(1))
}
