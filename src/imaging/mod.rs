/// Pixel-level image model
///
/// This module owns everything that touches raw sample values:
/// - The immutable 16-bit sample grid (buffer.rs)
/// - The window/level transform and the auto-window estimator (window.rs)

pub mod buffer;
pub mod window;

pub use buffer::SampleBuffer;
pub use window::{apply_window, auto_window, WindowSetting, MAX_DISPLAY};
