//! Process-wide state shared by the pipeline workers.
//!
//! All fields live behind a single mutex so a reader never sees a composite
//! value mid-update. `running` latches: once false it never becomes true again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::detect::Detection;

/// Centre coordinate value meaning "not known yet".
pub const CENTER_UNSET: i32 = -1;

#[derive(Debug, Clone, PartialEq)]
struct Fields {
    esp_enabled: bool,
    aim_enabled: bool,
    running: bool,
    nearest_target: Option<Detection>,
    center_x: i32,
    center_y: i32,
}

/// Consistent copy of everything the aim loop needs, taken under one lock.
#[derive(Debug, Clone, PartialEq)]
pub struct AimSnapshot {
    pub aim_enabled: bool,
    pub target: Option<Detection>,
    /// `None` while either coordinate is unset
    pub center: Option<(i32, i32)>,
}

/// Cloneable handle to the shared state.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<Fields>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl SharedState {
    pub fn new(esp_enabled: bool, aim_enabled: bool) -> Self {
        SharedState {
            inner: Arc::new(Mutex::new(Fields {
                esp_enabled,
                aim_enabled,
                running: true,
                nearest_target: None,
                center_x: CENTER_UNSET,
                center_y: CENTER_UNSET,
            })),
        }
    }

    // A panicking worker must not take shutdown down with it.
    fn lock(&self) -> MutexGuard<'_, Fields> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn esp_enabled(&self) -> bool {
        self.lock().esp_enabled
    }

    pub fn set_esp_enabled(&self, enabled: bool) {
        self.lock().esp_enabled = enabled;
    }

    /// Flip `esp_enabled` and return the new value.
    pub fn toggle_esp(&self) -> bool {
        let mut fields = self.lock();
        fields.esp_enabled = !fields.esp_enabled;
        fields.esp_enabled
    }

    pub fn aim_enabled(&self) -> bool {
        self.lock().aim_enabled
    }

    pub fn set_aim_enabled(&self, enabled: bool) {
        self.lock().aim_enabled = enabled;
    }

    /// Flip `aim_enabled` and return the new value.
    pub fn toggle_aim(&self) -> bool {
        let mut fields = self.lock();
        fields.aim_enabled = !fields.aim_enabled;
        fields.aim_enabled
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Setting false always succeeds; setting true after a shutdown is a no-op.
    pub fn set_running(&self, running: bool) {
        if !running {
            self.lock().running = false;
        }
    }

    /// Latch `running` to false. Idempotent and callable from any thread.
    ///
    /// Returns true only for the call that performed the transition.
    pub fn request_shutdown(&self) -> bool {
        let mut fields = self.lock();
        std::mem::replace(&mut fields.running, false)
    }

    pub fn nearest_target(&self) -> Option<Detection> {
        self.lock().nearest_target.clone()
    }

    pub fn set_nearest_target(&self, target: Option<Detection>) {
        self.lock().nearest_target = target;
    }

    pub fn center(&self) -> Option<(i32, i32)> {
        let fields = self.lock();
        center_of(&fields)
    }

    pub fn set_center(&self, x: i32, y: i32) {
        let mut fields = self.lock();
        fields.center_x = x;
        fields.center_y = y;
    }

    /// Store the latest nearest target together with the frame centre it was
    /// measured against.
    pub fn publish_target(&self, target: Option<Detection>, center: (i32, i32)) {
        let mut fields = self.lock();
        fields.nearest_target = target;
        fields.center_x = center.0;
        fields.center_y = center.1;
    }

    /// Read the aim toggle and, when enabled, the target and centre.
    pub fn aim_snapshot(&self) -> AimSnapshot {
        let fields = self.lock();
        if !fields.aim_enabled {
            return AimSnapshot {
                aim_enabled: false,
                target: None,
                center: None,
            };
        }
        AimSnapshot {
            aim_enabled: true,
            target: fields.nearest_target.clone(),
            center: center_of(&fields),
        }
    }
}

fn center_of(fields: &Fields) -> Option<(i32, i32)> {
    if fields.center_x < 0 || fields.center_y < 0 {
        None
    } else {
        Some((fields.center_x, fields.center_y))
    }
}
