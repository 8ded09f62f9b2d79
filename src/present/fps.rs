use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Frames per second, recomputed once per one-second window.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count one frame.
    pub fn update(&mut self) -> f64 {
        self.update_at(Instant::now())
    }

    pub fn update_at(&mut self, now: Instant) -> f64 {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= WINDOW {
            self.fps = self.frames as f64 / elapsed.as_secs_f64();
            self.window_start = now;
            self.frames = 0;
        }
        self.fps
    }

    /// Last computed rate.
    pub fn fps(&self) -> f64 {
        self.fps
    }
}
