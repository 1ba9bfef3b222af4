//! State Extractor: frame in, entities and analysis text out.

use std::sync::Arc;

use crate::automation::config::{DetectionConfig, RelativeRect};
use crate::capture::Frame;
use crate::game::{Entity, StateUpdate};

use super::detect::find_candidates;
use super::preprocess::{binarize, region_bounds};
use super::TextRecognizer;

pub struct StateExtractor {
    recognizer: Arc<dyn TextRecognizer>,
    config: DetectionConfig,
}

impl StateExtractor {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: DetectionConfig) -> Self {
        Self { recognizer, config }
    }

    /// Detects named entities inside `region` of `frame`.
    ///
    /// Each candidate component at least `min_area` pixels large is cropped
    /// from the color frame and recognized; empty or failed recognitions
    /// are dropped. Order follows component discovery order.
    pub fn extract_entities(&self, frame: &Frame, region: &RelativeRect, min_area: u32) -> Vec<Entity> {
        let (rx, ry, rw, rh) = region_bounds(frame.width(), frame.height(), region);
        if rw == 0 || rh == 0 {
            return Vec::new();
        }
        let cropped = image::imageops::crop_imm(&frame.image, rx, ry, rw, rh).to_image();
        let binary = binarize(&cropped, self.config.blur_sigma);

        let mut entities = Vec::new();
        for candidate in find_candidates(&binary, min_area) {
            let (bx, by, bw, bh) = candidate.bounds.to_xywh();
            let patch = image::imageops::crop_imm(&cropped, bx as u32, by as u32, bw, bh).to_image();

            let text = match self.recognizer.recognize(&patch) {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    tracing::warn!("Recognition failed for {}: {:#}", candidate.bounds, e);
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }

            let position = (
                frame.origin.0 + rx as i32 + bx,
                frame.origin.1 + ry as i32 + by,
            );
            entities.push(Entity::new(text, position, (bw, bh)));
        }
        entities
    }

    /// Recognizes the whole round-indicator frame as analysis text.
    pub fn read_analysis(&self, round_frame: &Frame) -> Option<String> {
        match self.recognizer.recognize(&round_frame.image) {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Round area recognition failed: {:#}", e);
                None
            }
        }
    }

    /// Builds the store update for one cycle.
    pub fn extract(&self, frame: &Frame, round_frame: Option<&Frame>) -> StateUpdate {
        let champions = self.extract_entities(
            frame,
            &self.config.champion_region,
            self.config.min_champion_area,
        );
        let items = match &self.config.item_region {
            Some(region) => self.extract_entities(frame, region, self.config.min_item_area),
            None => Vec::new(),
        };
        let analysis = if self.config.read_round_area {
            round_frame.and_then(|f| self.read_analysis(f))
        } else {
            None
        };

        tracing::debug!(
            "Extracted {} champions, {} items, analysis: {:?}",
            champions.len(),
            items.len(),
            analysis
        );

        StateUpdate {
            champions,
            items,
            analysis,
            timestamp: Some(frame.captured_at),
        }
    }
}
