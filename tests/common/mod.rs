//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use image::RgbImage;
use ndarray::{Array2, Array4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use esp_overlay::aim::{AimError, PointerActuator};
use esp_overlay::capture::Frame;
use esp_overlay::detect::{BoundingBox, Detection};
use esp_overlay::engine::{EngineError, InferenceEngine, ModelMetadata};
use esp_overlay::present::{render_overlay, PresentError, Presenter};

/// Engine that returns the same prediction rows for every input.
pub struct ScriptedEngine {
    metadata: ModelMetadata,
    rows: Array2<f32>,
    calls: Arc<AtomicUsize>,
    failures: usize,
}

impl ScriptedEngine {
    /// `rows` are `[cx, cy, w, h, objectness, class scores...]` in model space.
    pub fn new(input_width: u32, input_height: u32, rows: &[Vec<f32>]) -> Self {
        let columns = rows.first().map_or(6, Vec::len);
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let rows = Array2::from_shape_vec((rows.len(), columns), flat)
            .expect("rows must have equal length");
        Self {
            metadata: ModelMetadata {
                input_width,
                input_height,
                ..ModelMetadata::default()
            },
            rows,
            calls: Arc::new(AtomicUsize::new(0)),
            failures: 0,
        }
    }

    /// Fail the first `count` runs with an inference error.
    pub fn failing_first(mut self, count: usize) -> Self {
        self.failures = count;
        self
    }

    /// Counter of `run` calls, readable after the engine moved into a worker.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl InferenceEngine for ScriptedEngine {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn run(&mut self, input: &Array4<f32>) -> Result<Array2<f32>, EngineError> {
        let expected = [
            1,
            3,
            self.metadata.input_height as usize,
            self.metadata.input_width as usize,
        ];
        if input.shape() != expected {
            return Err(EngineError::Inference(format!(
                "unexpected input shape {:?}",
                input.shape()
            )));
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(EngineError::Inference(format!("scripted failure {}", call + 1)));
        }
        Ok(self.rows.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// One candidate row with a single class column.
pub fn row(cx: f32, cy: f32, w: f32, h: f32, objectness: f32, class_score: f32) -> Vec<f32> {
    vec![cx, cy, w, h, objectness, class_score]
}

/// Pointer that records every requested move.
#[derive(Clone, Default)]
pub struct RecordingPointer {
    moves: Arc<Mutex<Vec<(i32, i32)>>>,
}

impl RecordingPointer {
    pub fn moves(&self) -> Vec<(i32, i32)> {
        self.moves.lock().unwrap().clone()
    }
}

impl PointerActuator for RecordingPointer {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), AimError> {
        self.moves.lock().unwrap().push((dx, dy));
        Ok(())
    }
}

/// What a [`ScriptedPresenter`] has seen so far.
#[derive(Debug, Default)]
pub struct PresenterLog {
    pub shown: usize,
    pub detections: Vec<usize>,
    pub esp_flags: Vec<bool>,
    pub shut_down: bool,
}

/// Presenter that draws for real and asks to exit after `exit_after` frames.
pub struct ScriptedPresenter {
    exit_after: usize,
    log: Arc<Mutex<PresenterLog>>,
}

impl ScriptedPresenter {
    pub fn new(exit_after: usize) -> (Self, Arc<Mutex<PresenterLog>>) {
        let log = Arc::new(Mutex::new(PresenterLog::default()));
        (
            Self {
                exit_after,
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl Presenter for ScriptedPresenter {
    fn render(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        esp_enabled: bool,
    ) -> Result<RgbImage, PresentError> {
        let mut log = self.log.lock().unwrap();
        log.detections.push(detections.len());
        log.esp_flags.push(esp_enabled);
        render_overlay(frame, detections, esp_enabled)
    }

    fn show(&mut self, _image: &RgbImage) -> Result<(), PresentError> {
        self.log.lock().unwrap().shown += 1;
        Ok(())
    }

    fn poll_exit(&mut self) -> bool {
        self.log.lock().unwrap().shown >= self.exit_after
    }

    fn shutdown(&mut self) {
        self.log.lock().unwrap().shut_down = true;
    }
}

pub fn detection(x1: i32, y1: i32, x2: i32, y2: i32, confidence: f32) -> Detection {
    Detection {
        bbox: BoundingBox::new(x1, y1, x2, y2),
        confidence,
        class_id: 0,
        is_nearest: false,
    }
}

/// Uniform grey RGB frame.
pub fn grey_frame(width: u32, height: u32) -> Frame {
    Frame::rgb(vec![100; width as usize * height as usize * 3], width, height)
}
