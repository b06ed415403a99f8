use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Path, Program};
use iced::{Color, Rectangle, Renderer, Theme};

use crate::state::{AnnotationSet, PaneId, Point, Stroke};
use crate::Message;

/// Ink overlay for one pane: draws the committed and in-progress strokes and,
/// while this pane is the active one with draw mode on, captures pointer
/// gestures. The inactive pane's overlay never captures input regardless of
/// its own draw flag; pointer events fall through to the surface underneath,
/// which is what activates the pane.
pub struct AnnotationOverlay<'a> {
    pub pane: PaneId,
    pub annotations: &'a AnnotationSet,
    pub live: Option<&'a Stroke>,
    pub visible: bool,
    pub input_enabled: bool,
}

/// Per-widget interaction state: whether a gesture is in flight.
#[derive(Debug, Clone, Default)]
pub struct OverlayState {
    pub is_drawing: bool,
}

/// Cursor position in overlay coordinates plus the overlay size, which the
/// readout needs to invert the uniform image fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverEvent {
    pub position: Point,
    pub width: f32,
    pub height: f32,
}

impl Program<Message> for AnnotationOverlay<'_> {
    type State = OverlayState;

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<Message>) {
        match event {
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left))
                if self.input_enabled =>
            {
                if let Some(position) = cursor.position_in(bounds) {
                    state.is_drawing = true;
                    return (
                        canvas::event::Status::Captured,
                        Some(Message::StrokeBegan(
                            self.pane,
                            Point::new(position.x, position.y),
                        )),
                    );
                }
            }

            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if state.is_drawing && self.input_enabled {
                    if let Some(position) = cursor.position_in(bounds) {
                        return (
                            canvas::event::Status::Captured,
                            Some(Message::StrokeMoved(
                                self.pane,
                                Point::new(position.x, position.y),
                            )),
                        );
                    }
                } else {
                    // Tracking readout; pauses while a gesture is in flight.
                    let hover = cursor.position_in(bounds).map(|p| HoverEvent {
                        position: Point::new(p.x, p.y),
                        width: bounds.width,
                        height: bounds.height,
                    });
                    return (
                        canvas::event::Status::Ignored,
                        Some(Message::Hovered(self.pane, hover)),
                    );
                }
            }

            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left))
                if state.is_drawing =>
            {
                state.is_drawing = false;
                return (
                    canvas::event::Status::Captured,
                    Some(Message::StrokeEnded(self.pane)),
                );
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if self.visible {
            for stroke in self.annotations.strokes() {
                draw_stroke(&mut frame, stroke);
            }
            if let Some(live) = self.live {
                draw_stroke(&mut frame, live);
            }
        }

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(
        &self,
        _state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if self.input_enabled && cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

fn draw_stroke(frame: &mut canvas::Frame, stroke: &Stroke) {
    let color = Color::from_rgb8(stroke.color.r, stroke.color.g, stroke.color.b);

    if stroke.points.len() == 1 {
        // A click without movement still leaves a visible dot.
        let center = iced::Point::new(stroke.points[0].x, stroke.points[0].y);
        frame.fill(&Path::circle(center, stroke.width / 2.0), color);
        return;
    }

    let path = Path::new(|builder| {
        let mut points = stroke.points.iter();
        if let Some(first) = points.next() {
            builder.move_to(iced::Point::new(first.x, first.y));
        }
        for point in points {
            builder.line_to(iced::Point::new(point.x, point.y));
        }
    });

    let style = canvas::Stroke {
        line_cap: canvas::LineCap::Round,
        line_join: canvas::LineJoin::Round,
        ..canvas::Stroke::default()
    }
    .with_color(color)
    .with_width(stroke.width);

    frame.stroke(&path, style);
}
