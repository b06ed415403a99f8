/// Per-session mutable state
///
/// This module handles everything the user can change during a viewing
/// session:
/// - Vector ink annotations and their payload codec (annotations.rs)
/// - Per-pane state: buffer, window, strokes, style (pane.rs)
/// - Active-pane selection and shared-control mirroring (router.rs)

pub mod annotations;
pub mod pane;
pub mod router;

pub use annotations::{AnnotationSet, Point, Rgb, Stroke};
pub use pane::{PaneId, PaneState};
pub use router::{DualPaneChange, SessionRouter, SharedControls};
