/// Active-pane selection and shared-control mirroring
///
/// One set of control widgets (window sliders, stroke style pickers, draw
/// toggle) drives two independent panes. The router is the only place those
/// shared controls are written: on every activation transition it mirrors
/// the incoming pane's values into them under a guard, and while the guard
/// is held every widget-event entry point reports the event as suppressed.
/// Without the guard a mirrored write could be misread as user input and
/// leak one pane's values into the other.

use super::annotations::Rgb;
use super::pane::{PaneId, PaneState};

/// Values currently shown by the shared control widgets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedControls {
    pub center: i32,
    pub width: i32,
    pub stroke_width: f32,
    pub stroke_color: Rgb,
    pub draw_mode: bool,
    pub annotations_visible: bool,
}

impl SharedControls {
    fn mirror_of(pane: &PaneState) -> Self {
        Self {
            center: pane.setting.center,
            width: pane.setting.width,
            stroke_width: pane.stroke_width,
            stroke_color: pane.stroke_color,
            draw_mode: pane.draw_mode,
            annotations_visible: pane.annotations_visible,
        }
    }
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::mirror_of(&PaneState::default())
    }
}

/// Follow-up work the caller owes after a dual-pane toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualPaneChange {
    /// Second surface is now shown; auto-load the next sibling file into the
    /// right pane through the standard load path.
    Entered,
    /// Second surface is hidden; activation was forced back to the left pane
    /// and its state must be re-mirrored.
    Exited,
}

/// Two-state machine over the active pane, plus the dual-pane flag.
#[derive(Debug)]
pub struct SessionRouter {
    active: PaneId,
    dual_pane: bool,
    controls: SharedControls,
    mirroring: bool,
}

impl Default for SessionRouter {
    fn default() -> Self {
        Self {
            active: PaneId::Left,
            dual_pane: false,
            controls: SharedControls::default(),
            mirroring: false,
        }
    }
}

impl SessionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> PaneId {
        self.active
    }

    pub fn dual_pane(&self) -> bool {
        self.dual_pane
    }

    pub fn controls(&self) -> &SharedControls {
        &self.controls
    }

    /// Hold the reentrancy guard while pushing mirrored values into widgets.
    pub fn begin_mirror(&mut self) {
        self.mirroring = true;
    }

    pub fn end_mirror(&mut self) {
        self.mirroring = false;
    }

    /// Transition into pane `id`: mirror its window, style, and mode flags
    /// into the shared controls. Triggered by pointer-down on a surface or
    /// by a programmatic pane load.
    pub fn activate(&mut self, id: PaneId, pane: &PaneState) {
        self.active = id;
        self.begin_mirror();
        self.controls = SharedControls::mirror_of(pane);
        self.end_mirror();
    }

    /// Only the active pane's surface accepts ink input, and only while its
    /// draw mode is on. The inactive surface is non-interactive regardless
    /// of its own flag: one edit stream at any instant.
    pub fn input_enabled(&self, id: PaneId, pane: &PaneState) -> bool {
        id == self.active && pane.draw_mode
    }

    /// Toggle side-by-side mode. Leaving it forces activation back to Left.
    pub fn set_dual_pane(&mut self, on: bool) -> DualPaneChange {
        self.dual_pane = on;
        if on {
            DualPaneChange::Entered
        } else {
            self.active = PaneId::Left;
            DualPaneChange::Exited
        }
    }

    // Widget-event entry points. Each returns the value to apply to the
    // active pane, or None when the event is a mirrored write echoing back.

    pub fn center_changed(&mut self, value: i32) -> Option<i32> {
        if self.mirroring {
            return None;
        }
        self.controls.center = value;
        Some(value)
    }

    pub fn width_changed(&mut self, value: i32) -> Option<i32> {
        if self.mirroring {
            return None;
        }
        self.controls.width = value.max(1);
        Some(self.controls.width)
    }

    pub fn stroke_width_changed(&mut self, value: f32) -> Option<f32> {
        if self.mirroring {
            return None;
        }
        self.controls.stroke_width = value.max(1.0);
        Some(self.controls.stroke_width)
    }

    pub fn stroke_color_changed(&mut self, color: Rgb) -> Option<Rgb> {
        if self.mirroring {
            return None;
        }
        self.controls.stroke_color = color;
        Some(color)
    }

    pub fn draw_mode_toggled(&mut self, on: bool) -> Option<bool> {
        if self.mirroring {
            return None;
        }
        self.controls.draw_mode = on;
        Some(on)
    }

    pub fn visibility_toggled(&mut self, visible: bool) -> Option<bool> {
        if self.mirroring {
            return None;
        }
        self.controls.annotations_visible = visible;
        Some(visible)
    }
}
