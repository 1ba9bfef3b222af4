//! Drag/resize logic for the calibration rectangle.
//!
//! Pure state machine driven by pointer events; the overlay only forwards
//! press/motion/release and paints whatever `current()` returns.

use std::time::{Duration, Instant};

use crate::geometry::Rect;

/// One of the four resize handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    /// Translating the whole rectangle.
    Drag,
    /// Moving one corner; the opposite corner stays pinned.
    Resize(Corner),
}

#[derive(Clone, Copy, Debug)]
struct ActiveGesture {
    kind: Gesture,
    /// Pointer position of the last applied update.
    anchor: (i32, i32),
    /// Latest pointer position, applied or not.
    latest: (i32, i32),
    last_applied: Instant,
}

/// Interactive calibration rectangle.
///
/// During a gesture the raw corners may cross (x2 < x1); they are
/// normalized and clamped to `min_size` when the gesture completes.
#[derive(Debug)]
pub struct RegionCalibrator {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    handle_radius: i32,
    min_size: u32,
    throttle: Duration,
    gesture: Option<ActiveGesture>,
    frozen: bool,
}

impl RegionCalibrator {
    pub fn new(initial: Rect, handle_radius: i32, min_size: u32, throttle: Duration) -> Self {
        let initial = initial.with_min_size(min_size);
        Self {
            x1: initial.left,
            y1: initial.top,
            x2: initial.right,
            y2: initial.bottom,
            handle_radius,
            min_size,
            throttle,
            gesture: None,
            frozen: false,
        }
    }

    /// The rectangle as currently drawn (may be inverted mid-gesture).
    pub fn current(&self) -> Rect {
        Rect {
            left: self.x1,
            top: self.y1,
            right: self.x2,
            bottom: self.y2,
        }
    }

    pub fn corner_position(&self, corner: Corner) -> (i32, i32) {
        match corner {
            Corner::TopLeft => (self.x1, self.y1),
            Corner::TopRight => (self.x2, self.y1),
            Corner::BottomLeft => (self.x1, self.y2),
            Corner::BottomRight => (self.x2, self.y2),
        }
    }

    pub fn handle_radius(&self) -> i32 {
        self.handle_radius
    }

    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Stops accepting gestures (after the user confirmed).
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.gesture = None;
    }

    /// Re-arms calibration from `rect` (after the user rejected).
    pub fn reset(&mut self, rect: Rect) {
        let rect = rect.with_min_size(self.min_size);
        self.x1 = rect.left;
        self.y1 = rect.top;
        self.x2 = rect.right;
        self.y2 = rect.bottom;
        self.gesture = None;
        self.frozen = false;
    }

    /// Which handle, if any, is under the pointer.
    pub fn hit_corner(&self, x: i32, y: i32) -> Option<Corner> {
        Corner::ALL.into_iter().find(|&corner| {
            let (cx, cy) = self.corner_position(corner);
            (x - cx).abs() <= self.handle_radius && (y - cy).abs() <= self.handle_radius
        })
    }

    /// Starts a gesture. Handles take precedence over the body.
    ///
    /// Returns false if the press hit neither.
    pub fn press(&mut self, x: i32, y: i32, now: Instant) -> bool {
        if self.frozen {
            return false;
        }
        let kind = match self.hit_corner(x, y) {
            Some(corner) => Gesture::Resize(corner),
            None if self.current().normalized().contains(x, y) => Gesture::Drag,
            None => return false,
        };
        self.gesture = Some(ActiveGesture {
            kind,
            anchor: (x, y),
            latest: (x, y),
            last_applied: now,
        });
        true
    }

    /// Records pointer motion.
    ///
    /// Updates are applied at most once per throttle interval; positions in
    /// between are remembered so the next applied update (or the release)
    /// catches up. Returns true if the rectangle changed.
    pub fn motion(&mut self, x: i32, y: i32, now: Instant) -> bool {
        let Some(mut gesture) = self.gesture else {
            return false;
        };
        gesture.latest = (x, y);
        let due = now.duration_since(gesture.last_applied) >= self.throttle;
        if due {
            self.apply(&mut gesture, now);
        }
        self.gesture = Some(gesture);
        due
    }

    /// Completes the gesture at the final pointer position.
    ///
    /// Returns the normalized, size-clamped rectangle that should be
    /// reported as the coordinates-changed event.
    pub fn release(&mut self, x: i32, y: i32, now: Instant) -> Option<Rect> {
        let mut gesture = self.gesture.take()?;
        gesture.latest = (x, y);
        self.apply(&mut gesture, now);

        let rect = self.current().with_min_size(self.min_size);
        self.x1 = rect.left;
        self.y1 = rect.top;
        self.x2 = rect.right;
        self.y2 = rect.bottom;
        Some(rect)
    }

    fn apply(&mut self, gesture: &mut ActiveGesture, now: Instant) {
        let dx = gesture.latest.0 - gesture.anchor.0;
        let dy = gesture.latest.1 - gesture.anchor.1;
        match gesture.kind {
            Gesture::Drag => {
                self.x1 += dx;
                self.x2 += dx;
                self.y1 += dy;
                self.y2 += dy;
            }
            Gesture::Resize(Corner::TopLeft) => {
                self.x1 += dx;
                self.y1 += dy;
            }
            Gesture::Resize(Corner::TopRight) => {
                self.x2 += dx;
                self.y1 += dy;
            }
            Gesture::Resize(Corner::BottomLeft) => {
                self.x1 += dx;
                self.y2 += dy;
            }
            Gesture::Resize(Corner::BottomRight) => {
                self.x2 += dx;
                self.y2 += dy;
            }
        }
        gesture.anchor = gesture.latest;
        gesture.last_applied = now;
    }
}
