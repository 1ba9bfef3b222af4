//! Overlay painting.
//!
//! Rectangles arrive in screen pixels and are mapped to egui points
//! through [`ScreenMapping`].

use eframe::egui::{self, Color32, Pos2, RichText, Stroke};

use crate::automation::LifecycleState;
use crate::calibration::{Corner, RegionCalibrator};
use crate::geometry::Rect;

const REGION_COLOR: Color32 = Color32::RED;
const HANDLE_COLOR: Color32 = Color32::from_rgb(0, 120, 255);
const ROUND_AREA_COLOR: Color32 = Color32::from_rgb(0, 120, 255);
const STROKE_WIDTH: f32 = 2.0;

/// Converts between overlay-local points and absolute screen pixels.
#[derive(Clone, Copy, Debug)]
pub struct ScreenMapping {
    /// Screen position of the overlay's top-left corner, in points
    pub origin: Pos2,
    pub pixels_per_point: f32,
}

impl ScreenMapping {
    pub fn to_screen(&self, pos: Pos2) -> (i32, i32) {
        let p = pos + self.origin.to_vec2();
        (
            (p.x * self.pixels_per_point).round() as i32,
            (p.y * self.pixels_per_point).round() as i32,
        )
    }

    pub fn to_local(&self, x: i32, y: i32) -> Pos2 {
        Pos2::new(
            x as f32 / self.pixels_per_point,
            y as f32 / self.pixels_per_point,
        ) - self.origin.to_vec2()
    }

    pub fn rect_to_local(&self, rect: Rect) -> egui::Rect {
        egui::Rect::from_two_pos(
            self.to_local(rect.left, rect.top),
            self.to_local(rect.right, rect.bottom),
        )
    }

    /// Outline for a rectangle that is being captured: the stroke sits
    /// entirely outside the captured pixels so it never shows up in a frame.
    pub fn outline_outside(&self, rect: Rect) -> egui::Rect {
        self.rect_to_local(rect).expand(STROKE_WIDTH)
    }
}

/// Paints the candidate rectangle with its four corner handles.
pub fn paint_region(painter: &egui::Painter, mapping: &ScreenMapping, calibrator: &RegionCalibrator) {
    let stroke = Stroke::new(STROKE_WIDTH, REGION_COLOR);
    if calibrator.is_frozen() {
        painter.rect_stroke(mapping.outline_outside(calibrator.current()), 0.0, stroke);
        return;
    }
    painter.rect_stroke(mapping.rect_to_local(calibrator.current()), 0.0, stroke);
    let radius = calibrator.handle_radius() as f32 / mapping.pixels_per_point;
    for corner in Corner::ALL {
        let (x, y) = calibrator.corner_position(corner);
        painter.circle_filled(mapping.to_local(x, y), radius, HANDLE_COLOR);
    }
}

/// Paints the derived round-indicator rectangle.
pub fn paint_round_area(painter: &egui::Painter, mapping: &ScreenMapping, round: Rect) {
    painter.rect_stroke(
        mapping.outline_outside(round),
        0.0,
        Stroke::new(STROKE_WIDTH, ROUND_AREA_COLOR),
    );
}

/// Status label in the top-left corner, with the latest game state while
/// running.
///
/// Returns true if the exit button was clicked.
pub fn render_status(ctx: &egui::Context, state: LifecycleState, summary: Option<&str>) -> bool {
    let mut exit_clicked = false;
    egui::Area::new(egui::Id::new("status"))
        .anchor(egui::Align2::LEFT_TOP, [12.0, 12.0])
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label("状态:");
                    let color = match state {
                        LifecycleState::Idle => Color32::GRAY,
                        LifecycleState::Running => Color32::from_rgb(0, 150, 0),
                        LifecycleState::Stopping => Color32::from_rgb(200, 150, 0),
                        _ => Color32::from_rgb(0, 120, 200),
                    };
                    ui.label(RichText::new(state.description_zh()).color(color));
                });
                if state.is_calibrating() {
                    ui.label("拖动红框移动，拖动蓝色角点调整大小");
                }
                if let Some(summary) = summary {
                    ui.label(RichText::new(summary).monospace().size(12.0));
                    ui.label("按 Esc 停止");
                }
                ui.add_space(4.0);
                if ui.button("退出").clicked() {
                    exit_clicked = true;
                }
            });
        });
    exit_clicked
}

/// Yes/no prompt for the selected rectangle.
///
/// Returns the user's answer once a button is clicked.
pub fn render_confirm_prompt(ctx: &egui::Context) -> Option<bool> {
    let mut answer = None;
    egui::Window::new("确认")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(RichText::new("是否确认当前选择的商店区域？").size(16.0));
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button(RichText::new("是").size(16.0)).clicked() {
                    answer = Some(true);
                }
                ui.add_space(20.0);
                if ui.button(RichText::new("否").size(16.0)).clicked() {
                    answer = Some(false);
                }
            });
        });
    answer
}
