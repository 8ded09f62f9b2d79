//! Proportional aim control.
//!
//! A fixed-rate loop reads the shared state each tick and nudges the pointer a
//! fraction of the way from the frame centre toward the nearest target. There
//! is no integral or derivative term and no clamping beyond the gain.

mod pointer;

pub use pointer::{create_pointer, CursorTracker, DryRunPointer, RdevPointer, RelativeMotion};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::AimConfig;
use crate::state::SharedState;

#[derive(Error, Debug)]
pub enum AimError {
    #[error("Failed to query display size: {0}")]
    DisplayUnavailable(String),

    #[error("Failed to move pointer: {0}")]
    Simulate(String),

    #[error("Failed to spawn aim thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Something that can displace the pointer.
pub trait PointerActuator: Send {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), AimError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimSettings {
    /// Gain in (0, 1]
    pub sensitivity: f32,
    pub tick: Duration,
}

impl Default for AimSettings {
    fn default() -> Self {
        Self {
            sensitivity: 0.15,
            tick: Duration::from_millis(10),
        }
    }
}

impl From<&AimConfig> for AimSettings {
    fn from(config: &AimConfig) -> Self {
        Self {
            sensitivity: config.sensitivity,
            tick: config.tick(),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Aim is disabled
    Idle,
    NoTarget,
    CenterUnset,
    /// The scaled move truncated to (0, 0)
    BelowResolution,
    Moved(i32, i32),
}

/// Scale the centre-to-target offset by `sensitivity`, truncating toward zero.
pub fn compute_move(target: (i32, i32), center: (i32, i32), sensitivity: f32) -> (i32, i32) {
    let gain = sensitivity as f64;
    let dx = (target.0 - center.0) as f64 * gain;
    let dy = (target.1 - center.1) as f64 * gain;
    (dx as i32, dy as i32)
}

/// Run one control step against `state`.
pub fn run_tick(
    state: &SharedState,
    pointer: &mut dyn PointerActuator,
    settings: &AimSettings,
) -> Result<TickOutcome, AimError> {
    let snapshot = state.aim_snapshot();
    if !snapshot.aim_enabled {
        return Ok(TickOutcome::Idle);
    }
    let Some(target) = snapshot.target else {
        return Ok(TickOutcome::NoTarget);
    };
    let Some(center) = snapshot.center else {
        return Ok(TickOutcome::CenterUnset);
    };

    let (dx, dy) = compute_move(target.bbox.center(), center, settings.sensitivity);
    if dx == 0 && dy == 0 {
        return Ok(TickOutcome::BelowResolution);
    }

    pointer.move_relative(dx, dy)?;
    Ok(TickOutcome::Moved(dx, dy))
}

/// Handle to the `aim` thread.
pub struct AimController {
    stop_signal: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AimController {
    pub fn spawn(
        state: SharedState,
        pointer: Box<dyn PointerActuator>,
        settings: AimSettings,
    ) -> Result<Self, AimError> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);

        let handle = thread::Builder::new()
            .name("aim".to_string())
            .spawn(move || run_aim_loop(state, pointer, settings, stop))
            .map_err(AimError::Spawn)?;

        Ok(Self {
            stop_signal,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            log::info!("Stopping aim thread...");
            if handle.join().is_err() {
                log::warn!("Aim thread panicked");
            }
        }
    }
}

impl Drop for AimController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_aim_loop(
    state: SharedState,
    mut pointer: Box<dyn PointerActuator>,
    settings: AimSettings,
    stop: Arc<AtomicBool>,
) {
    log::info!(
        "Aim thread started (sensitivity {}, tick {:?}).",
        settings.sensitivity,
        settings.tick
    );
    let mut active = false;

    while !stop.load(Ordering::Relaxed) && state.is_running() {
        let started = Instant::now();

        match run_tick(&state, pointer.as_mut(), &settings) {
            Ok(outcome) => {
                let now_active = outcome != TickOutcome::Idle;
                if now_active != active {
                    log::debug!("Aim controller {}", if now_active { "active" } else { "idle" });
                    active = now_active;
                }
                if let TickOutcome::Moved(dx, dy) = outcome {
                    log::trace!("Aim move ({dx}, {dy})");
                }
            }
            Err(e) => log::error!("Error in aim loop: {e}"),
        }

        let elapsed = started.elapsed();
        if elapsed < settings.tick {
            thread::sleep(settings.tick - elapsed);
        }
    }

    log::info!("Aim thread finished.");
}
