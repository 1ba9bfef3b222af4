//! Interval-paced capture loop.

use std::time::{Duration, Instant};

use crate::automation::cancel::CancelToken;
use crate::geometry::Rect;

use super::{Frame, ScreenCapturer};

/// Captures `rect` every `interval` until `cancel` fires.
///
/// `on_frame` runs synchronously on the calling thread. After each
/// iteration the loop sleeps only for what is left of the interval, so a
/// slow capture shortens the following sleep instead of pushing every
/// later frame back. A failed capture is logged and skipped.
///
/// Returns the number of frames delivered.
pub fn run_capture_loop<F>(
    capturer: &dyn ScreenCapturer,
    rect: Rect,
    interval: Duration,
    cancel: &CancelToken,
    mut on_frame: F,
) -> usize
where
    F: FnMut(Frame),
{
    tracing::info!("Capture loop started: {} every {:?}", rect, interval);
    let mut delivered = 0usize;
    let mut failures = 0usize;

    while !cancel.is_cancelled() {
        let started = Instant::now();

        match capturer.capture(rect) {
            Ok(frame) => {
                on_frame(frame);
                delivered += 1;
            }
            Err(e) => {
                failures += 1;
                tracing::warn!("Capture failed, skipping frame: {:#}", e);
            }
        }

        let remaining = interval.saturating_sub(started.elapsed());
        if !remaining.is_zero() && !cancel.sleep(remaining) {
            break;
        }
    }

    tracing::info!(
        "Capture loop stopped ({} frames, {} failures)",
        delivered,
        failures
    );
    delivered
}
