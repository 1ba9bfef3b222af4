//! Overlay interaction state.
//!
//! Tracks the calibrator, the pending yes/no prompt and the frozen result,
//! and turns pointer input into [`CalibrationEvent`]s. Free of any egui
//! types so it can be tested directly.

use std::time::{Duration, Instant};

use crate::automation::config::{CalibrationConfig, RoundAreaOffset};
use crate::calibration::{CalibrationEvent, RegionCalibrator};
use crate::geometry::Rect;

/// Primary-button input observed during one overlay frame, in screen pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerFrame {
    pub pressed: bool,
    pub released: bool,
    pub position: (i32, i32),
}

pub struct OverlayState {
    calibrator: RegionCalibrator,
    initial_rect: Rect,
    round_offset: RoundAreaOffset,
    /// Rectangle awaiting the user's yes/no answer
    pending: Option<Rect>,
    /// Confirmed store and round-indicator rectangles
    confirmed: Option<(Rect, Rect)>,
}

impl OverlayState {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            calibrator: RegionCalibrator::new(
                config.initial_rect,
                config.handle_radius,
                config.min_size,
                Duration::from_millis(config.motion_throttle_ms),
            ),
            initial_rect: config.initial_rect,
            round_offset: config.round_area,
            pending: None,
            confirmed: None,
        }
    }

    pub fn calibrator(&self) -> &RegionCalibrator {
        &self.calibrator
    }

    pub fn is_prompting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn confirmed(&self) -> Option<(Rect, Rect)> {
        self.confirmed
    }

    fn accepts_pointer(&self) -> bool {
        self.pending.is_none() && self.confirmed.is_none()
    }

    pub fn pointer_pressed(&mut self, x: i32, y: i32, now: Instant) {
        if self.accepts_pointer() {
            self.calibrator.press(x, y, now);
        }
    }

    /// Returns true if the rectangle needs repainting.
    pub fn pointer_moved(&mut self, x: i32, y: i32, now: Instant) -> bool {
        self.accepts_pointer() && self.calibrator.motion(x, y, now)
    }

    /// Completes a gesture and opens the confirmation prompt.
    pub fn pointer_released(&mut self, x: i32, y: i32, now: Instant) -> Option<CalibrationEvent> {
        if !self.accepts_pointer() {
            return None;
        }
        let rect = self.calibrator.release(x, y, now)?;
        self.pending = Some(rect);
        Some(CalibrationEvent::Changed(rect))
    }

    /// Routes one frame's worth of primary-button input.
    ///
    /// A press and release may land in the same frame when the repaint
    /// rate is low; the press is applied first so the gesture still ends.
    pub fn pointer_frame(&mut self, frame: PointerFrame, now: Instant) -> Option<CalibrationEvent> {
        let (x, y) = frame.position;
        if frame.pressed {
            self.pointer_pressed(x, y, now);
        }
        if frame.released {
            return self.pointer_released(x, y, now);
        }
        if !frame.pressed && self.calibrator.is_active() {
            self.pointer_moved(x, y, now);
        }
        None
    }

    /// Once the area is frozen the overlay must not intercept the clicks
    /// the dispatcher sends to the game.
    pub fn wants_passthrough(&self) -> bool {
        self.confirmed.is_some()
    }

    /// Applies the user's answer to the pending prompt.
    ///
    /// Yes freezes the rectangle; no puts the initial rectangle back so
    /// calibration starts over.
    pub fn answer(&mut self, yes: bool) -> Option<CalibrationEvent> {
        let rect = self.pending.take()?;
        if yes {
            self.calibrator.freeze();
            self.confirmed = Some((rect, self.round_offset.derive(rect)));
        } else {
            self.calibrator.reset(self.initial_rect);
        }
        Some(CalibrationEvent::Confirmed(yes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> OverlayState {
        OverlayState::new(&CalibrationConfig {
            motion_throttle_ms: 0,
            ..Default::default()
        })
    }

    #[test]
    fn test_gesture_opens_prompt_and_blocks_pointer() {
        let mut s = state();
        let t = Instant::now();
        s.pointer_pressed(300, 250, t);
        let event = s.pointer_released(320, 260, t);
        assert_eq!(
            event,
            Some(CalibrationEvent::Changed(Rect::from_corners(220, 160, 420, 360)))
        );
        assert!(s.is_prompting());

        // No new gesture while the prompt is open.
        s.pointer_pressed(300, 250, t);
        assert!(s.pointer_released(400, 400, t).is_none());
    }

    #[test]
    fn test_yes_freezes_with_round_area() {
        let mut s = state();
        let t = Instant::now();
        s.pointer_pressed(300, 250, t);
        s.pointer_released(300, 250, t);
        assert_eq!(s.answer(true), Some(CalibrationEvent::Confirmed(true)));

        let (store, round) = s.confirmed().unwrap();
        assert_eq!(store, Rect::from_corners(200, 150, 400, 350));
        assert_eq!(round, RoundAreaOffset::default().derive(store));
        assert!(s.calibrator().is_frozen());
        assert!(s.answer(true).is_none());
    }

    #[test]
    fn test_click_within_one_frame_completes_gesture() {
        let mut s = state();
        let click = PointerFrame {
            pressed: true,
            released: true,
            position: (300, 250),
        };
        let event = s.pointer_frame(click, Instant::now());
        assert_eq!(
            event,
            Some(CalibrationEvent::Changed(Rect::from_corners(200, 150, 400, 350)))
        );
        assert!(!s.calibrator().is_active());
        assert!(s.is_prompting());
    }

    #[test]
    fn test_drag_across_frames() {
        let mut s = state();
        let t = Instant::now();
        let at = |pressed, released, position| PointerFrame { pressed, released, position };
        assert!(s.pointer_frame(at(true, false, (300, 250)), t).is_none());
        assert!(s.pointer_frame(at(false, false, (310, 255)), t).is_none());
        assert_eq!(
            s.pointer_frame(at(false, true, (320, 260)), t),
            Some(CalibrationEvent::Changed(Rect::from_corners(220, 160, 420, 360)))
        );
    }

    #[test]
    fn test_passthrough_only_after_confirmation() {
        let mut s = state();
        let t = Instant::now();
        assert!(!s.wants_passthrough());
        s.pointer_pressed(300, 250, t);
        s.pointer_released(300, 250, t);
        assert!(!s.wants_passthrough());
        s.answer(false);
        assert!(!s.wants_passthrough());

        s.pointer_pressed(300, 250, t);
        s.pointer_released(300, 250, t);
        s.answer(true);
        assert!(s.wants_passthrough());
    }

    #[test]
    fn test_no_restores_initial_rect() {
        let mut s = state();
        let t = Instant::now();
        s.pointer_pressed(300, 250, t);
        s.pointer_released(500, 450, t);
        assert_eq!(s.answer(false), Some(CalibrationEvent::Confirmed(false)));
        assert!(!s.is_prompting());
        assert!(s.confirmed().is_none());
        assert_eq!(s.calibrator().current(), Rect::from_corners(200, 150, 400, 350));
    }
}
