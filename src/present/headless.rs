//! Presenter without a window: logs the frame rate and optionally keeps the
//! latest rendered frame on disk.

use image::RgbImage;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::{render_overlay, FpsCounter, PresentError, Presenter};
use crate::capture::Frame;
use crate::config::OutputConfig;
use crate::detect::Detection;
use crate::pipeline;

const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);
const FPS_LOG_INTERVAL: Duration = Duration::from_secs(1);

pub struct HeadlessPresenter {
    title: String,
    show_fps: bool,
    fps: FpsCounter,
    last_fps_log: Instant,
    snapshot_path: Option<PathBuf>,
    last_snapshot: Option<Instant>,
    frames_shown: u64,
}

impl HeadlessPresenter {
    pub fn new(config: &OutputConfig) -> Self {
        if let Some(path) = &config.snapshot_path {
            log::info!("Writing overlay snapshots to {}", path.display());
        }
        Self {
            title: config.window_title.clone(),
            show_fps: config.show_fps,
            fps: FpsCounter::new(),
            last_fps_log: Instant::now(),
            snapshot_path: config.snapshot_path.clone(),
            last_snapshot: None,
            frames_shown: 0,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }
}

impl Presenter for HeadlessPresenter {
    fn render(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        esp_enabled: bool,
    ) -> Result<RgbImage, PresentError> {
        render_overlay(frame, detections, esp_enabled)
    }

    fn show(&mut self, image: &RgbImage) -> Result<(), PresentError> {
        self.frames_shown += 1;
        let fps = self.fps.update();

        if self.show_fps && self.last_fps_log.elapsed() >= FPS_LOG_INTERVAL {
            log::debug!("{}: FPS: {:.2}", self.title, fps);
            self.last_fps_log = Instant::now();
        }

        if let Some(path) = &self.snapshot_path {
            let due = self
                .last_snapshot
                .map_or(true, |t| t.elapsed() >= SNAPSHOT_INTERVAL);
            if due {
                self.last_snapshot = Some(Instant::now());
                image.save(path)?;
            }
        }

        Ok(())
    }

    fn poll_exit(&mut self) -> bool {
        pipeline::ctrlc_received()
    }

    fn shutdown(&mut self) {
        log::info!(
            "Closing display ({} frames shown, last FPS {:.2}).",
            self.frames_shown,
            self.fps.fps()
        );
    }
}
