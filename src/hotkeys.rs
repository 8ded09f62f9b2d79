//! Global hotkey handling for esp-overlay.
//!
//! Key presses are captured with rdev on a detached listener thread and sent
//! over a channel to the [`InputWatcher`], which maps them to state changes.
//! The same listener keeps the [`CursorTracker`] current for the aim thread.
//! rdev's `listen()` cannot be stopped, so shutdown only stops the watcher;
//! the listener thread lives until the process exits.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rdev::{listen, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use crate::aim::CursorTracker;
use crate::config::HotkeyConfig;
use crate::state::SharedState;

/// How long the watcher waits for a key before re-checking the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Unknown key name '{0}'")]
    UnknownKey(String),

    #[error("Failed to spawn hotkey thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A state change requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleEsp,
    ToggleAim,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotkeyBindings {
    pub toggle_esp: Key,
    pub toggle_aim: Key,
    pub exit: Key,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            toggle_esp: Key::F1,
            toggle_aim: Key::F2,
            exit: Key::F4,
        }
    }
}

impl HotkeyBindings {
    pub fn from_names(
        toggle_esp: &str,
        toggle_aim: &str,
        exit: &str,
    ) -> Result<Self, HotkeyError> {
        let key =
            |name: &str| parse_key(name).ok_or_else(|| HotkeyError::UnknownKey(name.to_string()));
        Ok(Self {
            toggle_esp: key(toggle_esp)?,
            toggle_aim: key(toggle_aim)?,
            exit: key(exit)?,
        })
    }

    pub fn from_config(config: &HotkeyConfig) -> Result<Self, HotkeyError> {
        Self::from_names(&config.toggle_esp, &config.toggle_aim, &config.exit)
    }

    pub fn action_for(&self, key: Key) -> Option<HotkeyAction> {
        if key == self.toggle_esp {
            Some(HotkeyAction::ToggleEsp)
        } else if key == self.toggle_aim {
            Some(HotkeyAction::ToggleAim)
        } else if key == self.exit {
            Some(HotkeyAction::Exit)
        } else {
            None
        }
    }
}

/// Resolve a key name such as `F1`, `q`, `7` or `Escape` (case-insensitive).
pub fn parse_key(name: &str) -> Option<Key> {
    let upper = name.trim().to_ascii_uppercase();

    let key = match upper.as_str() {
        "F1" => Key::F1,
        "F2" => Key::F2,
        "F3" => Key::F3,
        "F4" => Key::F4,
        "F5" => Key::F5,
        "F6" => Key::F6,
        "F7" => Key::F7,
        "F8" => Key::F8,
        "F9" => Key::F9,
        "F10" => Key::F10,
        "F11" => Key::F11,
        "F12" => Key::F12,
        "ESC" | "ESCAPE" => Key::Escape,
        "SPACE" => Key::Space,
        "TAB" => Key::Tab,
        "ENTER" | "RETURN" => Key::Return,
        "BACKSPACE" => Key::Backspace,
        "INSERT" => Key::Insert,
        "DELETE" => Key::Delete,
        "HOME" => Key::Home,
        "END" => Key::End,
        "PAGEUP" => Key::PageUp,
        "PAGEDOWN" => Key::PageDown,
        "PAUSE" => Key::Pause,
        "SCROLLLOCK" => Key::ScrollLock,
        "PRINTSCREEN" => Key::PrintScreen,
        "UP" => Key::UpArrow,
        "DOWN" => Key::DownArrow,
        "LEFT" => Key::LeftArrow,
        "RIGHT" => Key::RightArrow,
        other => return single_char_key(other),
    };
    Some(key)
}

fn single_char_key(name: &str) -> Option<Key> {
    let mut chars = name.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return None;
    };

    const LETTERS: [Key; 26] = [
        Key::KeyA,
        Key::KeyB,
        Key::KeyC,
        Key::KeyD,
        Key::KeyE,
        Key::KeyF,
        Key::KeyG,
        Key::KeyH,
        Key::KeyI,
        Key::KeyJ,
        Key::KeyK,
        Key::KeyL,
        Key::KeyM,
        Key::KeyN,
        Key::KeyO,
        Key::KeyP,
        Key::KeyQ,
        Key::KeyR,
        Key::KeyS,
        Key::KeyT,
        Key::KeyU,
        Key::KeyV,
        Key::KeyW,
        Key::KeyX,
        Key::KeyY,
        Key::KeyZ,
    ];
    const DIGITS: [Key; 10] = [
        Key::Num0,
        Key::Num1,
        Key::Num2,
        Key::Num3,
        Key::Num4,
        Key::Num5,
        Key::Num6,
        Key::Num7,
        Key::Num8,
        Key::Num9,
    ];

    match c {
        'A'..='Z' => Some(LETTERS[(c as u8 - b'A') as usize]),
        '0'..='9' => Some(DIGITS[(c as u8 - b'0') as usize]),
        _ => None,
    }
}

/// Apply `action` to the shared state.
pub fn apply_action(state: &SharedState, action: HotkeyAction) {
    match action {
        HotkeyAction::ToggleEsp => {
            let enabled = state.toggle_esp();
            log::info!("ESP overlay {}", if enabled { "enabled" } else { "disabled" });
        }
        HotkeyAction::ToggleAim => {
            let enabled = state.toggle_aim();
            log::info!("Aim assist {}", if enabled { "enabled" } else { "disabled" });
        }
        HotkeyAction::Exit => {
            log::info!("Exit hotkey pressed. Stopping...");
            state.request_shutdown();
        }
    }
}

/// Turns key presses from a channel into state changes on the `hotkeys` thread.
pub struct InputWatcher {
    stop_signal: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputWatcher {
    /// Start watching `keys`. Unbound keys are ignored.
    ///
    /// The watcher exits once the running flag is false or the key source
    /// disconnects, dropping its receiver.
    pub fn spawn(
        state: SharedState,
        bindings: HotkeyBindings,
        keys: Receiver<Key>,
    ) -> Result<Self, HotkeyError> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);

        let handle = thread::Builder::new()
            .name("hotkeys".to_string())
            .spawn(move || run_watch_loop(state, bindings, keys, stop))
            .map_err(HotkeyError::Spawn)?;

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
            log::info!("Stopping hotkey watcher...");
            if handle.join().is_err() {
                log::warn!("Hotkey watcher panicked");
            }
        }
    }
}

impl Drop for InputWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_watch_loop(
    state: SharedState,
    bindings: HotkeyBindings,
    keys: Receiver<Key>,
    stop: Arc<AtomicBool>,
) {
    log::info!(
        "Hotkeys: {:?} toggles ESP, {:?} toggles aim, {:?} exits",
        bindings.toggle_esp,
        bindings.toggle_aim,
        bindings.exit
    );

    while !stop.load(Ordering::Relaxed) && state.is_running() {
        match keys.recv_timeout(POLL_INTERVAL) {
            Ok(key) => {
                if let Some(action) = bindings.action_for(key) {
                    apply_action(&state, action);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Hotkey source closed; hotkeys are no longer available");
                break;
            }
        }
    }

    drop(keys);
    log::info!("Hotkey watcher finished.");
}

/// Route one global input event: key presses go to `keys`, pointer motion
/// to `cursor`.
pub fn forward_event(event: &EventType, keys: &Sender<Key>, cursor: &CursorTracker) {
    match *event {
        EventType::KeyPress(key) => {
            // The watcher may already be gone during shutdown.
            let _ = keys.send(key);
        }
        EventType::MouseMove { x, y } => cursor.update(x, y),
        _ => {}
    }
}

/// Start the global rdev listener and return the channel of pressed keys.
///
/// On macOS this requires Accessibility permissions. If the listener fails
/// the channel disconnects and `cursor` stops updating.
pub fn listen_global(cursor: CursorTracker) -> Result<Receiver<Key>, HotkeyError> {
    let (tx, rx) = crossbeam_channel::unbounded();

    thread::Builder::new()
        .name("hotkey-listener".to_string())
        .spawn(move || {
            let callback = move |event: Event| forward_event(&event.event_type, &tx, &cursor);

            if let Err(e) = listen(callback) {
                log::error!("Global hotkey listener error: {:?}", e);
            }
        })
        .map_err(HotkeyError::Spawn)?;

    Ok(rx)
}
