//! Calibration state shared between the overlay and the orchestrator.
//!
//! The overlay is the only writer: it reports completed gestures and the
//! user's yes/no answer as [`CalibrationEvent`]s. The orchestrator folds
//! those events into its own [`CalibrationState`] and only reads the
//! rectangles once the state is confirmed.

use crate::automation::config::RoundAreaOffset;
use crate::geometry::Rect;

/// Signals sent from the overlay thread.
#[derive(Clone, Debug, PartialEq)]
pub enum CalibrationEvent {
    /// A drag/resize gesture completed with this normalized rectangle.
    Changed(Rect),
    /// The user answered the confirmation prompt.
    Confirmed(bool),
}

impl RoundAreaOffset {
    /// Derives the round-indicator rectangle from the store rectangle.
    ///
    /// Same horizontal extent as the store, placed `offset_ratio` store
    /// heights above its top edge, `height_ratio` store heights tall.
    pub fn derive(&self, store: Rect) -> Rect {
        let h = store.height() as f32;
        let top = (store.top as f32 - self.offset_ratio * h).round().max(0.0) as i32;
        let height = (self.height_ratio * h).round().max(1.0) as u32;
        Rect::from_xywh(store.left, top, store.width().max(1), height)
    }
}

/// Calibration result as seen by the orchestrator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalibrationState {
    rect: Option<Rect>,
    round_rect: Option<Rect>,
    confirmed: bool,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a candidate rectangle. Ignored once confirmed.
    pub fn propose(&mut self, rect: Rect, offset: &RoundAreaOffset) {
        if self.confirmed {
            return;
        }
        let rect = rect.normalized();
        self.rect = Some(rect);
        self.round_rect = Some(offset.derive(rect));
    }

    /// Freezes the current candidate. Returns false if there is none.
    pub fn confirm(&mut self) -> bool {
        if self.rect.is_none() {
            return false;
        }
        self.confirmed = true;
        true
    }

    /// Discards the candidate so calibration starts over.
    pub fn reject(&mut self) {
        *self = Self::default();
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn round_rect(&self) -> Option<Rect> {
        self.round_rect
    }
}
