use iced::widget::image::Handle;
use iced::widget::{
    button, canvas, checkbox, column, container, image, mouse_area, pick_list, row, slider, stack,
    text, Space,
};
use iced::{Alignment, ContentFit, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::fmt;
use std::path::PathBuf;

// Declare the application modules
mod dcm;
mod imaging;
mod state;
mod ui;

use dcm::load::{load_image_async, LoadedImage};
use dcm::save::{next_file_in_dir, next_version_name, save_derived_async};
use imaging::WindowSetting;
use state::{DualPaneChange, PaneId, PaneState, Point, Rgb, SessionRouter};
use ui::canvas::{AnnotationOverlay, HoverEvent};

/// Standard CT window presets, in rescaled (HU) units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowPreset {
    Default,
    Bone,
    SoftTissue,
    Lung,
    Brain,
    Mediastinum,
}

impl WindowPreset {
    const ALL: [WindowPreset; 6] = [
        WindowPreset::Default,
        WindowPreset::Bone,
        WindowPreset::SoftTissue,
        WindowPreset::Lung,
        WindowPreset::Brain,
        WindowPreset::Mediastinum,
    ];

    /// (center, width) in HU; None means the pane's own reset baseline.
    fn hu_window(self) -> Option<(f64, f64)> {
        match self {
            WindowPreset::Default => None,
            WindowPreset::Bone => Some((300.0, 1500.0)),
            WindowPreset::SoftTissue => Some((50.0, 400.0)),
            WindowPreset::Lung => Some((-600.0, 1500.0)),
            WindowPreset::Brain => Some((40.0, 80.0)),
            WindowPreset::Mediastinum => Some((40.0, 350.0)),
        }
    }
}

impl fmt::Display for WindowPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowPreset::Default => "Default",
            WindowPreset::Bone => "Bone",
            WindowPreset::SoftTissue => "Soft Tissue",
            WindowPreset::Lung => "Lung",
            WindowPreset::Brain => "Brain",
            WindowPreset::Mediastinum => "Mediastinum",
        };
        write!(f, "{name}")
    }
}

/// Named stroke colors offered by the shared style picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NamedColor {
    name: &'static str,
    color: Rgb,
}

impl fmt::Display for NamedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

const PALETTE: [NamedColor; 5] = [
    NamedColor { name: "Black", color: Rgb::BLACK },
    NamedColor { name: "Red", color: Rgb::RED },
    NamedColor { name: "Blue", color: Rgb::BLUE },
    NamedColor { name: "Green", color: Rgb::GREEN },
    NamedColor { name: "Yellow", color: Rgb::YELLOW },
];

/// Pixel readout shown in the status bar.
#[derive(Debug, Clone, Copy)]
struct Readout {
    pane: PaneId,
    x: u32,
    y: u32,
    unit: f64,
}

/// Main application state
struct CtViewer {
    left: PaneState,
    right: PaneState,
    router: SessionRouter,
    /// Rendered (windowed) images, refreshed whenever a pane's window moves.
    left_image: Option<Handle>,
    right_image: Option<Handle>,
    hover: Option<Readout>,
    selected_preset: Option<WindowPreset>,
    show_patient_info: bool,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User picked "Open"; loads into the active pane
    OpenFile,
    /// Background decode finished for a pane
    Loaded(PaneId, Result<LoadedImage, String>),
    CenterChanged(i32),
    WidthChanged(i32),
    ResetWindow,
    PresetSelected(WindowPreset),
    StrokeWidthChanged(f32),
    StrokeColorSelected(NamedColor),
    DrawModeToggled(bool),
    AnnotationsVisibleToggled(bool),
    UndoStroke,
    ClearStrokes,
    PatientInfoToggled,
    DualPaneToggled(bool),
    /// Pointer-down on a viewing surface
    PaneClicked(PaneId),
    StrokeBegan(PaneId, Point),
    StrokeMoved(PaneId, Point),
    StrokeEnded(PaneId),
    Hovered(PaneId, Option<HoverEvent>),
    SaveAs,
    Saved(Result<PathBuf, String>),
}

impl CtViewer {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        (
            CtViewer {
                left: PaneState::new(),
                right: PaneState::new(),
                router: SessionRouter::new(),
                left_image: None,
                right_image: None,
                hover: None,
                selected_preset: None,
                show_patient_info: true,
                status: "Ready. Open a DICOM file to begin.".to_string(),
            },
            Task::none(),
        )
    }

    fn pane(&self, id: PaneId) -> &PaneState {
        match id {
            PaneId::Left => &self.left,
            PaneId::Right => &self.right,
        }
    }

    fn pane_mut(&mut self, id: PaneId) -> &mut PaneState {
        match id {
            PaneId::Left => &mut self.left,
            PaneId::Right => &mut self.right,
        }
    }

    /// Route an activation transition through the session router.
    fn activate(&mut self, id: PaneId) {
        let pane = match id {
            PaneId::Left => &self.left,
            PaneId::Right => &self.right,
        };
        self.router.activate(id, pane);
        self.selected_preset = None;
    }

    /// Re-render a pane's windowed image after its setting changed.
    fn refresh_display(&mut self, id: PaneId) {
        let pane = self.pane(id);
        let handle = match (&pane.buffer, pane.display()) {
            (Some(buffer), Some(display)) => Some(Handle::from_rgba(
                buffer.width(),
                buffer.height(),
                ui::gray16_to_rgba(&display),
            )),
            _ => None,
        };
        match id {
            PaneId::Left => self.left_image = handle,
            PaneId::Right => self.right_image = handle,
        }
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFile => {
                let file = FileDialog::new()
                    .add_filter("DICOM files", &["dcm"])
                    .pick_file();

                if let Some(path) = file {
                    let pane = self.router.active();
                    self.status = format!("Loading {}…", path.display());
                    return Task::perform(load_image_async(path), move |result| {
                        Message::Loaded(pane, result)
                    });
                }
                Task::none()
            }

            Message::Loaded(id, Ok(image)) => {
                let name = image
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let derived = image.derived;
                self.pane_mut(id).load_from(image);
                // A programmatic load is an activation transition too.
                self.activate(id);
                self.refresh_display(id);
                self.status = if derived {
                    format!("Loaded working copy {name}; restored saved window and ink.")
                } else {
                    format!("Loaded {name}.")
                };
                Task::none()
            }

            Message::Loaded(_, Err(error)) => {
                // Failed loads leave every pane exactly as it was.
                self.status = format!("Error loading DICOM file: {error}");
                Task::none()
            }

            Message::CenterChanged(value) => {
                if let Some(value) = self.router.center_changed(value) {
                    let id = self.router.active();
                    self.pane_mut(id).set_center(value);
                    self.selected_preset = None;
                    self.refresh_display(id);
                }
                Task::none()
            }

            Message::WidthChanged(value) => {
                if let Some(value) = self.router.width_changed(value) {
                    let id = self.router.active();
                    self.pane_mut(id).set_width(value);
                    self.selected_preset = None;
                    self.refresh_display(id);
                }
                Task::none()
            }

            Message::ResetWindow => {
                let id = self.router.active();
                self.pane_mut(id).reset_window();
                self.activate(id); // re-mirror the restored values
                self.refresh_display(id);
                Task::none()
            }

            Message::PresetSelected(preset) => {
                let id = self.router.active();
                let pane = self.pane(id);
                if !pane.has_image() {
                    return Task::none();
                }
                let setting = match preset.hu_window() {
                    None => pane.auto_setting,
                    Some((center, width)) => WindowSetting::new(
                        pane.rescale.invert(center).round() as i32,
                        pane.rescale.invert_span(width).round() as i32,
                    ),
                };
                self.pane_mut(id).setting = setting;
                self.activate(id);
                self.selected_preset = Some(preset);
                self.refresh_display(id);
                Task::none()
            }

            Message::StrokeWidthChanged(value) => {
                if let Some(value) = self.router.stroke_width_changed(value) {
                    let id = self.router.active();
                    self.pane_mut(id).stroke_width = value;
                }
                Task::none()
            }

            Message::StrokeColorSelected(named) => {
                if let Some(color) = self.router.stroke_color_changed(named.color) {
                    let id = self.router.active();
                    self.pane_mut(id).stroke_color = color;
                }
                Task::none()
            }

            Message::DrawModeToggled(on) => {
                if let Some(on) = self.router.draw_mode_toggled(on) {
                    let id = self.router.active();
                    self.pane_mut(id).draw_mode = on;
                    if on {
                        self.hover = None; // tracking pauses while drawing
                    }
                }
                Task::none()
            }

            Message::AnnotationsVisibleToggled(visible) => {
                if let Some(visible) = self.router.visibility_toggled(visible) {
                    let id = self.router.active();
                    self.pane_mut(id).annotations_visible = visible;
                }
                Task::none()
            }

            Message::UndoStroke => {
                let id = self.router.active();
                self.pane_mut(id).undo_stroke();
                Task::none()
            }

            Message::ClearStrokes => {
                let id = self.router.active();
                self.pane_mut(id).clear_strokes();
                Task::none()
            }

            Message::PatientInfoToggled => {
                self.show_patient_info = !self.show_patient_info;
                Task::none()
            }

            Message::DualPaneToggled(on) => match self.router.set_dual_pane(on) {
                DualPaneChange::Entered => {
                    // Populate the right pane through the exact same load
                    // path a manual open uses.
                    if let Some(next) = self.left.file_path.as_ref().and_then(|p| next_file_in_dir(p))
                    {
                        self.status = format!(
                            "Loading {} into the right pane…",
                            next.file_name()
                                .map(|n| n.to_string_lossy().to_string())
                                .unwrap_or_default()
                        );
                        return Task::perform(load_image_async(next), |result| {
                            Message::Loaded(PaneId::Right, result)
                        });
                    }
                    self.status = "No next file in this folder for the right pane.".to_string();
                    Task::none()
                }
                DualPaneChange::Exited => {
                    self.activate(PaneId::Left);
                    Task::none()
                }
            },

            Message::PaneClicked(id) => {
                self.activate(id);
                Task::none()
            }

            Message::StrokeBegan(id, point) => {
                // The router enforces a single ink stream: only the active
                // pane's surface may draw.
                if self.router.input_enabled(id, self.pane(id)) {
                    self.pane_mut(id).begin_stroke(point);
                }
                Task::none()
            }

            Message::StrokeMoved(id, point) => {
                self.pane_mut(id).extend_stroke(point);
                Task::none()
            }

            Message::StrokeEnded(id) => {
                self.pane_mut(id).finish_stroke();
                Task::none()
            }

            Message::Hovered(id, event) => {
                match event {
                    Some(event) => {
                        let pane = self.pane(id);
                        self.hover = (!pane.draw_mode)
                            .then_some(())
                            .and_then(|_| {
                                let buffer = pane.buffer.as_ref()?;
                                let (x, y) = ui::pixel_at(
                                    event.width,
                                    event.height,
                                    buffer.width(),
                                    buffer.height(),
                                    event.position.x,
                                    event.position.y,
                                )?;
                                let unit = pane.unit_value_at(x, y)?;
                                Some(Readout { pane: id, x, y, unit })
                            });
                    }
                    None => {
                        if self.hover.map_or(false, |readout| readout.pane == id) {
                            self.hover = None;
                        }
                    }
                }
                Task::none()
            }

            Message::SaveAs => {
                let id = self.router.active();
                let pane = self.pane(id);
                let (Some(source), Some(path)) = (pane.source.clone(), pane.file_path.clone())
                else {
                    self.status = "Open a DICOM first.".to_string();
                    return Task::none();
                };

                let suggested = next_version_name(&path);
                let mut dialog = FileDialog::new().add_filter("DICOM file", &["dcm"]);
                if let Some(dir) = suggested.parent() {
                    dialog = dialog.set_directory(dir);
                }
                if let Some(name) = suggested.file_name() {
                    dialog = dialog.set_file_name(name.to_string_lossy());
                }

                if let Some(out_path) = dialog.save_file() {
                    let setting = pane.setting;
                    let annotations = pane.annotations.clone();
                    self.status = format!("Saving {}…", out_path.display());
                    return Task::perform(
                        save_derived_async(source, setting, annotations, out_path),
                        Message::Saved,
                    );
                }
                Task::none()
            }

            Message::Saved(Ok(path)) => {
                self.status = format!("Saved working copy to {}.", path.display());
                Task::none()
            }

            Message::Saved(Err(error)) => {
                // The source file and the session are untouched by a failed
                // save; just report it.
                self.status = format!("Error saving working copy: {error}");
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let viewers: Element<Message> = if self.router.dual_pane() {
            row![
                self.pane_view(PaneId::Left),
                self.pane_view(PaneId::Right)
            ]
            .spacing(8)
            .into()
        } else {
            self.pane_view(PaneId::Left)
        };

        column![self.control_panel(), viewers, self.status_bar()]
            .spacing(8)
            .padding(8)
            .into()
    }

    /// One viewing surface: windowed image, ink overlay, info overlays.
    fn pane_view(&self, id: PaneId) -> Element<Message> {
        let pane = self.pane(id);
        let handle = match id {
            PaneId::Left => &self.left_image,
            PaneId::Right => &self.right_image,
        };

        let surface: Element<Message> = match handle {
            Some(handle) => image(handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("No image loaded").size(16))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        let overlay = canvas(AnnotationOverlay {
            pane: id,
            annotations: &pane.annotations,
            live: pane.live_stroke.as_ref(),
            visible: pane.annotations_visible,
            input_enabled: self.router.input_enabled(id, pane),
        })
        .width(Length::Fill)
        .height(Length::Fill);

        let wl_ww = column![
            Space::with_height(Length::Fill),
            text(format!(
                "WL: {}   WW: {}",
                pane.setting.center, pane.setting.width
            ))
            .size(13),
        ]
        .padding(6);

        let mut layers = stack![surface, overlay];
        if self.show_patient_info && pane.has_image() {
            let info = column![
                text(pane.overlay.top.join("\n")).size(12),
                Space::with_height(Length::Fill),
                text(pane.overlay.bottom.join("\n")).size(12),
            ]
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(6);
            layers = layers.push(info);
        }
        if pane.has_image() {
            layers = layers.push(wl_ww);
        }

        let mut title = match id {
            PaneId::Left => "Left pane".to_string(),
            PaneId::Right => "Right pane".to_string(),
        };
        if self.router.active() == id {
            title.push_str(" (active)");
        }
        if pane.derived {
            title.push_str(" [working copy]");
        }

        let content = column![text(title).size(13), layers].spacing(4);

        mouse_area(container(content).width(Length::Fill).height(Length::Fill))
            .on_press(Message::PaneClicked(id))
            .into()
    }

    /// The single set of shared controls, mirrored from the active pane.
    fn control_panel(&self) -> Element<Message> {
        let controls = *self.router.controls();
        let has_image = self.pane(self.router.active()).has_image();

        let selected_color = PALETTE
            .iter()
            .find(|named| named.color == controls.stroke_color)
            .copied();

        let file_row = row![
            button("📂 Open…").on_press(Message::OpenFile),
            button("💾 Save As…").on_press_maybe(has_image.then_some(Message::SaveAs)),
            checkbox("🖼️🖼️ Side by side", self.router.dual_pane())
                .on_toggle(Message::DualPaneToggled),
            button("Patient info").on_press(Message::PatientInfoToggled),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        let window_row = row![
            text(format!("WL {}", controls.center)).size(13),
            slider(0..=65535, controls.center, Message::CenterChanged).width(220),
            text(format!("WW {}", controls.width)).size(13),
            slider(1..=65535, controls.width, Message::WidthChanged).width(220),
            pick_list(
                &WindowPreset::ALL[..],
                self.selected_preset,
                Message::PresetSelected
            )
            .placeholder("Preset…"),
            button("Back to Default").on_press_maybe(has_image.then_some(Message::ResetWindow)),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        let draw_row = row![
            checkbox("🖌️ Draw", controls.draw_mode).on_toggle(Message::DrawModeToggled),
            text("Size").size(13),
            slider(1.0..=20.0, controls.stroke_width, Message::StrokeWidthChanged)
                .step(0.5)
                .width(120),
            pick_list(&PALETTE[..], selected_color, Message::StrokeColorSelected),
            button("↩️ Undo").on_press_maybe(has_image.then_some(Message::UndoStroke)),
            button("🗑️ Clear").on_press_maybe(has_image.then_some(Message::ClearStrokes)),
            checkbox("Show ink", controls.annotations_visible)
                .on_toggle(Message::AnnotationsVisibleToggled),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        column![file_row, window_row, draw_row].spacing(6).into()
    }

    fn status_bar(&self) -> Element<Message> {
        let readout = match self.hover {
            Some(readout) => format!(
                "X: {}   Y: {}    HU: {:.0}",
                readout.x, readout.y, readout.unit
            ),
            None => "X: —   Y: —    HU: —".to_string(),
        };

        row![
            text(&self.status).size(13),
            Space::with_width(Length::Fill),
            text(readout).size(13),
        ]
        .spacing(8)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    iced::application("CT Viewer", CtViewer::update, CtViewer::view)
        .theme(CtViewer::theme)
        .centered()
        .run_with(CtViewer::new)
}
