use std::time::Instant;

use super::decode::decode_predictions;
use super::letterbox::Letterbox;
use super::nearest::select_nearest;
use super::nms::non_max_suppression;
use super::types::ResultRecord;
use super::DetectError;
use crate::capture::Frame;
use crate::config::AiConfig;
use crate::engine::{InferenceEngine, ModelMetadata};

/// Thresholds and class filter applied to raw predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Minimum score (exclusive)
    pub conf_threshold: f32,
    /// IoU above which the weaker box is suppressed
    pub nms_threshold: f32,
    /// Allowed class ids; empty allows every class
    pub classes: Vec<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.4,
            nms_threshold: 0.5,
            classes: vec![0],
        }
    }
}

impl From<&AiConfig> for DetectorConfig {
    fn from(ai: &AiConfig) -> Self {
        Self {
            conf_threshold: ai.conf_threshold,
            nms_threshold: ai.nms_threshold,
            classes: ai.classes.clone(),
        }
    }
}

/// Runs a loaded model over frames.
///
/// A detector cannot exist without an engine, so an unloaded model can never
/// reach `process`.
pub struct Detector {
    engine: Box<dyn InferenceEngine>,
    config: DetectorConfig,
}

impl Detector {
    pub fn new(engine: Box<dyn InferenceEngine>, config: DetectorConfig) -> Self {
        log::info!(
            "Detector ready: engine={}, conf={}, nms={}, classes={:?}",
            engine.name(),
            config.conf_threshold,
            config.nms_threshold,
            config.classes
        );
        Self { engine, config }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.engine.metadata()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect objects in `frame` and pick the one nearest its centre.
    ///
    /// The frame moves into the returned record. On error it is dropped.
    pub fn process(&mut self, frame: Frame) -> Result<ResultRecord, DetectError> {
        let started = Instant::now();
        let meta = *self.engine.metadata();

        let letterbox =
            Letterbox::fit(frame.width, frame.height, meta.input_width, meta.input_height);
        let input = letterbox.tensor(&frame, meta.channel_order)?;
        let preprocessed = Instant::now();

        let predictions = self.engine.run(&input)?;
        let inferred = Instant::now();

        let candidates = decode_predictions(
            predictions.view(),
            &letterbox,
            (frame.width, frame.height),
            &self.config,
        )?;
        let mut detections = non_max_suppression(candidates, self.config.nms_threshold);
        let nearest = select_nearest(&mut detections, frame.center());
        let finished = Instant::now();

        log::debug!(
            "Timings - Pre: {:.1}ms, Infer: {:.1}ms, Post: {:.1}ms. Detections: {}. Nearest: {}",
            (preprocessed - started).as_secs_f64() * 1000.0,
            (inferred - preprocessed).as_secs_f64() * 1000.0,
            (finished - inferred).as_secs_f64() * 1000.0,
            detections.len(),
            if nearest.is_some() { "yes" } else { "no" }
        );

        Ok(ResultRecord {
            timestamp: frame.timestamp,
            frame,
            detections,
            nearest,
        })
    }
}
