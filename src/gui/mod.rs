//! Calibration overlay.
//!
//! A transparent, undecorated, always-on-top window covering the screen.
//! The user drags the red rectangle over the store and confirms it; the
//! overlay reports each step to the orchestrator as a [`CalibrationEvent`]
//! and then keeps showing the frozen result and the run status.

pub mod render;
pub mod state;

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;

use crate::automation::{LifecycleState, Orchestrator};
use crate::calibration::CalibrationEvent;

use render::ScreenMapping;
use state::{OverlayState, PointerFrame};

/// Chinese-capable system fonts, tried in order.
const CJK_FONT_PATHS: &[&str] = &[
    "C:\\Windows\\Fonts\\msyh.ttc",   // Microsoft YaHei
    "C:\\Windows\\Fonts\\simhei.ttf", // SimHei
    "C:\\Windows\\Fonts\\simsun.ttc", // SimSun
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
];

pub struct OverlayApp {
    state: OverlayState,
    orchestrator: Arc<Orchestrator>,
    events: Sender<CalibrationEvent>,
    /// Set once the overlay thread lost its receiver
    disconnected: bool,
    /// Whether mouse passthrough is currently enabled on the viewport
    passthrough: bool,
}

impl OverlayApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        orchestrator: Arc<Orchestrator>,
        events: Sender<CalibrationEvent>,
    ) -> Self {
        Self::setup_fonts(&cc.egui_ctx);

        Self {
            state: OverlayState::new(&orchestrator.config().calibration),
            orchestrator,
            events,
            disconnected: false,
            passthrough: false,
        }
    }

    fn setup_fonts(ctx: &egui::Context) {
        let mut fonts = egui::FontDefinitions::default();

        let loaded = CJK_FONT_PATHS.iter().find_map(|path| {
            std::fs::read(path).ok().map(|data| (path, data))
        });
        match loaded {
            Some((path, data)) => {
                fonts
                    .font_data
                    .insert("cjk_font".to_owned(), egui::FontData::from_owned(data).into());
                for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                    fonts
                        .families
                        .entry(family)
                        .or_default()
                        .insert(0, "cjk_font".to_owned());
                }
                tracing::info!("Loaded CJK font from {}", path);
            }
            None => tracing::warn!("No CJK font found, Chinese text may not render"),
        }

        ctx.set_fonts(fonts);
    }

    fn send(&mut self, event: CalibrationEvent) {
        if self.disconnected {
            return;
        }
        tracing::debug!("Overlay event: {:?}", event);
        if self.events.send(event).is_err() {
            tracing::warn!("Orchestrator no longer listens for calibration events");
            self.disconnected = true;
        }
    }

    fn screen_mapping(ctx: &egui::Context) -> ScreenMapping {
        let origin = ctx
            .input(|i| i.viewport().inner_rect)
            .map(|r| r.min)
            .unwrap_or(egui::Pos2::ZERO);
        ScreenMapping {
            origin,
            pixels_per_point: ctx.pixels_per_point(),
        }
    }

    /// Forwards primary-button input to the calibrator.
    fn handle_pointer(&mut self, ctx: &egui::Context, mapping: &ScreenMapping) {
        let (pressed, released, pos) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });
        let Some(pos) = pos else {
            return;
        };
        let frame = PointerFrame {
            pressed,
            released,
            position: mapping.to_screen(pos),
        };
        if let Some(event) = self.state.pointer_frame(frame, Instant::now()) {
            self.send(event);
        }
    }

    /// Lets clicks fall through to the game once the area is frozen, so the
    /// dispatcher's simulated input is not swallowed by the overlay.
    fn sync_passthrough(&mut self, ctx: &egui::Context) {
        let wanted = self.state.wants_passthrough();
        if wanted != self.passthrough {
            tracing::info!("Overlay mouse passthrough: {}", wanted);
            ctx.send_viewport_cmd(egui::ViewportCommand::MousePassthrough(wanted));
            self.passthrough = wanted;
        }
    }

    fn request_stop(&self) {
        let state = self.orchestrator.state();
        if state != LifecycleState::Idle && state != LifecycleState::Stopping {
            self.orchestrator.stop();
        }
    }
}

impl eframe::App for OverlayApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mapping = Self::screen_mapping(ctx);
        let lifecycle = self.orchestrator.state();

        if !self.state.is_prompting() {
            self.handle_pointer(ctx, &mapping);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let painter = ui.painter();
                render::paint_region(painter, &mapping, self.state.calibrator());
                if let Some((_, round)) = self.state.confirmed() {
                    render::paint_round_area(painter, &mapping, round);
                }
            });

        if self.state.is_prompting() {
            if let Some(yes) = render::render_confirm_prompt(ctx) {
                if let Some(event) = self.state.answer(yes) {
                    self.send(event);
                }
            }
        }
        self.sync_passthrough(ctx);

        let summary = (lifecycle == LifecycleState::Running)
            .then(|| self.orchestrator.store().summary());
        let exit_clicked = render::render_status(ctx, lifecycle, summary.as_deref());
        if exit_clicked || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            tracing::info!("Overlay closing");
            self.request_stop();
        }

        // Lifecycle changes happen on other threads.
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}

/// Runs the overlay on the calling thread until it is closed.
pub fn run_overlay(
    orchestrator: Arc<Orchestrator>,
    events: Sender<CalibrationEvent>,
) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("TFT Autopilot")
            .with_transparent(true)
            .with_decorations(false)
            .with_always_on_top()
            .with_maximized(true)
            .with_drag_and_drop(false),
        ..Default::default()
    };

    tracing::info!("Opening calibration overlay");
    eframe::run_native(
        "TFT Autopilot",
        options,
        Box::new(move |cc| Ok(Box::new(OverlayApp::new(cc, orchestrator, events)))),
    )
}
