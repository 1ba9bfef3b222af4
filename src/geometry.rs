//! Screen-space rectangles.
//!
//! The calibrator works with corner pairs (left, top, right, bottom) while
//! the capture and OCR boundaries want (left, top, width, height). Both are
//! views of the same `Rect`.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in absolute screen pixels.
///
/// A `Rect` produced by [`Rect::normalized`] always satisfies
/// `left <= right` and `top <= bottom`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Builds a rectangle from two corners, swapping them if inverted.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            left: x1,
            top: y1,
            right: x2,
            bottom: y2,
        }
        .normalized()
    }

    /// Builds a rectangle from its top-left corner and size.
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width as i32,
            bottom: y + height as i32,
        }
    }

    /// Returns (left, top, width, height).
    pub fn to_xywh(&self) -> (i32, i32, u32, u32) {
        (self.left, self.top, self.width(), self.height())
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    /// Center point, rounded toward the top-left.
    pub fn center(&self) -> (i32, i32) {
        (
            self.left + (self.right - self.left) / 2,
            self.top + (self.bottom - self.top) / 2,
        )
    }

    /// Swaps corners so that left <= right and top <= bottom.
    pub fn normalized(self) -> Self {
        Self {
            left: self.left.min(self.right),
            top: self.top.min(self.bottom),
            right: self.left.max(self.right),
            bottom: self.top.max(self.bottom),
        }
    }

    /// Grows the rectangle from its top-left corner until it is at least
    /// `min` pixels in each dimension.
    pub fn with_min_size(self, min: u32) -> Self {
        let min = min.max(1) as i32;
        let mut rect = self.normalized();
        if rect.right - rect.left < min {
            rect.right = rect.left + min;
        }
        if rect.bottom - rect.top < min {
            rect.bottom = rect.top + min;
        }
        rect
    }

    /// Inclusive of the top-left edge, exclusive of the bottom-right edge.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {}) [{}x{}]",
            self.left,
            self.top,
            self.right,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}
