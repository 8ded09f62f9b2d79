//! Pointer actuators.

use rdev::{simulate, EventType};
use std::sync::{Arc, Mutex, PoisonError};

use super::{AimError, PointerActuator};

/// Last known cursor position, fed from global mouse events.
///
/// The aim thread reads it so moves start from wherever the user left the
/// cursor, not from where the actuator last put it.
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    position: Arc<Mutex<Option<(f64, f64)>>>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, x: f64, y: f64) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = Some((x, y));
    }

    /// `None` until the first mouse event arrives.
    pub fn position(&self) -> Option<(f64, f64)> {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Turns relative moves into absolute targets on a bounded display.
#[derive(Debug, Clone)]
pub struct RelativeMotion {
    cursor: CursorTracker,
    last: (f64, f64),
    max: (f64, f64),
}

impl RelativeMotion {
    /// Positions are clamped to `[0, width-1] x [0, height-1]`; until the
    /// tracker reports a position, the display centre is the origin.
    pub fn new(cursor: CursorTracker, width: u64, height: u64) -> Self {
        Self {
            cursor,
            last: ((width / 2) as f64, (height / 2) as f64),
            max: (
                width.saturating_sub(1) as f64,
                height.saturating_sub(1) as f64,
            ),
        }
    }

    /// Absolute position `(dx, dy)` away from the current cursor.
    pub fn target(&self, dx: i32, dy: i32) -> (f64, f64) {
        let (x, y) = self.cursor.position().unwrap_or(self.last);
        (
            (x + dx as f64).clamp(0.0, self.max.0),
            (y + dy as f64).clamp(0.0, self.max.1),
        )
    }

    /// Record that the cursor was sent to `(x, y)`.
    pub fn commit(&mut self, x: f64, y: f64) {
        self.last = (x, y);
        self.cursor.update(x, y);
    }
}

/// Moves the system pointer through rdev.
///
/// rdev only emits absolute moves, so each relative move is applied to the
/// cursor position reported by the [`CursorTracker`].
pub struct RdevPointer {
    motion: RelativeMotion,
}

impl RdevPointer {
    pub fn new(cursor: CursorTracker) -> Result<Self, AimError> {
        let (width, height) =
            rdev::display_size().map_err(|e| AimError::DisplayUnavailable(format!("{:?}", e)))?;
        log::info!("Pointer actuator using display {}x{}", width, height);

        Ok(Self {
            motion: RelativeMotion::new(cursor, width, height),
        })
    }
}

impl PointerActuator for RdevPointer {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), AimError> {
        let (x, y) = self.motion.target(dx, dy);

        simulate(&EventType::MouseMove { x, y })
            .map_err(|e| AimError::Simulate(format!("{:?}", e)))?;

        self.motion.commit(x, y);
        Ok(())
    }
}

/// Logs moves instead of performing them.
#[derive(Debug, Default)]
pub struct DryRunPointer {
    moves: u64,
}

impl DryRunPointer {
    pub fn moves(&self) -> u64 {
        self.moves
    }
}

impl PointerActuator for DryRunPointer {
    fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), AimError> {
        self.moves += 1;
        log::debug!("Dry run: pointer move ({dx}, {dy})");
        Ok(())
    }
}

/// Pick the actuator for this run.
///
/// When the real pointer cannot be driven, aiming continues in dry-run mode.
pub fn create_pointer(dry_run: bool, cursor: CursorTracker) -> Box<dyn PointerActuator> {
    if dry_run {
        log::info!("Aim dry run: pointer moves are logged only");
        return Box::new(DryRunPointer::default());
    }
    match RdevPointer::new(cursor) {
        Ok(pointer) => Box::new(pointer),
        Err(e) => {
            log::warn!("{e}; pointer moves will be logged only");
            Box::new(DryRunPointer::default())
        }
    }
}
