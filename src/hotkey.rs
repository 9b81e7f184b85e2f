//! Global toggle hotkey.
//!
//! Key events come from a process-wide `rdev` listener thread. Matching and
//! dispatch work on [`KeyPress`], so they do not depend on the hook backend.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::error::{Error, Result};

/// Key that toggles clicking. Numpad 5 unless the user picks another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hotkey {
    /// Backend key name, e.g. `Kp5` or `F8`.
    Key(String),
    /// Raw platform key code for keys the backend has no name for.
    Code(u32),
    /// Typed character, compared case-insensitively.
    Char(char),
}

impl Default for Hotkey {
    fn default() -> Self {
        Hotkey::Key("Kp5".into())
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hotkey::Key(name) => write!(f, "{name}"),
            Hotkey::Code(code) => write!(f, "code={code}"),
            Hotkey::Char(c) => write!(f, "char='{c}'"),
        }
    }
}

impl Hotkey {
    pub fn matches(&self, press: &KeyPress) -> bool {
        match self {
            Hotkey::Key(name) => press.key == *name,
            Hotkey::Code(code) => press.code == Some(*code),
            Hotkey::Char(c) => press
                .ch
                .is_some_and(|typed| typed.to_lowercase().eq(c.to_lowercase())),
        }
    }

    /// Parses a `--hotkey` value: a key name (case-insensitive, e.g. `kp5`)
    /// or a raw numeric key code. Unknown names are rejected so a typo can't
    /// leave the clicker without a working toggle.
    pub fn parse_cli(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Ok(code) = value.parse::<u32>() {
            return Ok(Hotkey::Code(code));
        }
        key_names()
            .find(|name| name.eq_ignore_ascii_case(value))
            .map(Hotkey::Key)
            .ok_or_else(|| Error::InvalidHotkey(value.to_string()))
    }

    /// Binding for a captured key: raw code when the key is unnamed.
    pub fn from_press(press: &KeyPress) -> Self {
        match press.code {
            Some(code) => Hotkey::Code(code),
            None => Hotkey::Key(press.key.clone()),
        }
    }
}

const NAMED_KEYS: &[&str] = &[
    "Alt", "AltGr", "Backspace", "CapsLock", "ControlLeft", "ControlRight", "Delete",
    "DownArrow", "End", "Escape", "Home", "LeftArrow", "MetaLeft", "MetaRight", "PageDown",
    "PageUp", "Return", "RightArrow", "ShiftLeft", "ShiftRight", "Space", "Tab", "UpArrow",
    "PrintScreen", "ScrollLock", "Pause", "NumLock", "BackQuote", "Minus", "Equal",
    "LeftBracket", "RightBracket", "SemiColon", "Quote", "BackSlash", "IntlBackslash", "Comma",
    "Dot", "Slash", "Insert", "KpReturn", "KpMinus", "KpPlus", "KpMultiply", "KpDivide",
    "KpDelete", "Function",
];

/// Every key name the hook backend reports, spelled as it reports them.
fn key_names() -> impl Iterator<Item = String> {
    let letters = ('A'..='Z').map(|c| format!("Key{c}"));
    let digits = (0..=9).flat_map(|n| [format!("Num{n}"), format!("Kp{n}")]);
    let function = (1..=12).map(|n| format!("F{n}"));
    NAMED_KEYS.iter().map(|s| s.to_string()).chain(letters).chain(digits).chain(function)
}

/// A key transition as seen by the handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub code: Option<u32>,
    pub ch: Option<char>,
}

#[cfg(test)]
impl KeyPress {
    pub fn named(key: &str) -> Self {
        Self { key: key.into(), ..Default::default() }
    }
}

#[cfg(feature = "hooks")]
impl KeyPress {
    fn from_key(key: rdev::Key, name: Option<&str>) -> Self {
        let code = match key {
            rdev::Key::Unknown(code) => Some(code),
            _ => None,
        };
        let ch = name.and_then(|s| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if !c.is_control() => Some(c),
                _ => None,
            }
        });
        Self { key: format!("{key:?}"), code, ch }
    }
}

/// Which physical key a press came from, independent of the typed character.
#[derive(Clone, Debug, PartialEq, Eq)]
struct KeyId {
    key: String,
    code: Option<u32>,
}

impl KeyId {
    fn of(press: &KeyPress) -> Self {
        Self { key: press.key.clone(), code: press.code }
    }

    fn is(&self, press: &KeyPress) -> bool {
        self.key == press.key && self.code == press.code
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HotkeyEvent {
    Toggle,
    Captured(Hotkey),
}

pub type HotkeyCallback = Box<dyn Fn(HotkeyEvent) + Send + Sync>;

struct Shared {
    binding: Mutex<Hotkey>,
    armed: AtomicBool,
    capturing: AtomicBool,
    /// Physical key that last fired, until it is released. Auto-repeat
    /// of that key is swallowed.
    held: Mutex<Option<KeyId>>,
    callback: HotkeyCallback,
}

impl Shared {
    fn handle_press(&self, press: &KeyPress) -> Option<HotkeyEvent> {
        if !self.armed.load(Ordering::Relaxed) {
            return None;
        }
        tracing::trace!(?press, "key pressed");

        if self.capturing.swap(false, Ordering::Relaxed) {
            let hotkey = Hotkey::from_press(press);
            *self.binding.lock() = hotkey.clone();
            // The capturing key is now the binding; ignore its auto-repeat.
            *self.held.lock() = Some(KeyId::of(press));
            tracing::info!(%hotkey, "captured new hotkey");
            return self.dispatch(HotkeyEvent::Captured(hotkey));
        }

        if !self.binding.lock().matches(press) {
            return None;
        }
        {
            let mut held = self.held.lock();
            if held.is_some() {
                return None;
            }
            *held = Some(KeyId::of(press));
        }
        tracing::debug!("hotkey matched");
        self.dispatch(HotkeyEvent::Toggle)
    }

    /// Releases carry no typed character, so they are matched by key identity.
    fn handle_release(&self, press: &KeyPress) {
        let mut held = self.held.lock();
        if held.as_ref().is_some_and(|id| id.is(press)) {
            *held = None;
        }
    }

    fn dispatch(&self, event: HotkeyEvent) -> Option<HotkeyEvent> {
        let callback = &self.callback;
        let delivered = event.clone();
        if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            tracing::error!("hotkey callback panicked");
        }
        Some(delivered)
    }
}

pub struct HotkeyHandler {
    shared: Arc<Shared>,
    listener_started: bool,
}

impl HotkeyHandler {
    pub fn new(hotkey: Hotkey, callback: HotkeyCallback) -> Self {
        Self {
            shared: Arc::new(Shared {
                binding: Mutex::new(hotkey),
                armed: AtomicBool::new(false),
                capturing: AtomicBool::new(false),
                held: Mutex::new(None),
                callback,
            }),
            listener_started: false,
        }
    }

    pub fn hotkey(&self) -> Hotkey {
        self.shared.binding.lock().clone()
    }

    pub fn set_hotkey(&self, hotkey: Hotkey) {
        tracing::debug!(%hotkey, "hotkey set");
        *self.shared.binding.lock() = hotkey;
        *self.shared.held.lock() = None;
    }

    pub fn is_armed(&self) -> bool {
        self.shared.armed.load(Ordering::Relaxed)
    }

    pub fn is_capturing(&self) -> bool {
        self.shared.capturing.load(Ordering::Relaxed)
    }

    /// The next key press becomes the binding instead of toggling.
    pub fn capture_next(&self) {
        self.shared.capturing.store(true, Ordering::Relaxed);
    }

    /// Accepts events without installing the OS hook.
    pub fn arm(&self) {
        self.shared.armed.store(true, Ordering::Relaxed);
    }

    /// Arms the handler, spawning the global listener on first use.
    pub fn start(&mut self) {
        self.arm();
        if self.listener_started {
            return;
        }
        self.listener_started = true;
        self.spawn_listener();
    }

    /// Disarms the handler. The OS hook stays installed but is ignored.
    pub fn stop(&mut self) {
        self.shared.armed.store(false, Ordering::Relaxed);
        self.shared.capturing.store(false, Ordering::Relaxed);
        tracing::debug!("hotkey handler disarmed");
    }

    pub fn handle_press(&self, press: &KeyPress) -> Option<HotkeyEvent> {
        self.shared.handle_press(press)
    }

    pub fn handle_release(&self, press: &KeyPress) {
        self.shared.handle_release(press)
    }

    #[cfg(feature = "hooks")]
    fn spawn_listener(&self) {
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                tracing::info!(hotkey = %shared.binding.lock(), "hotkey listener started");
                let result = rdev::listen(move |event| match event.event_type {
                    rdev::EventType::KeyPress(key) => {
                        shared.handle_press(&KeyPress::from_key(key, event.name.as_deref()));
                    }
                    rdev::EventType::KeyRelease(key) => {
                        shared.handle_release(&KeyPress::from_key(key, None));
                    }
                    _ => {}
                });
                if let Err(err) = result {
                    tracing::error!(error = ?err, "hotkey listener failed");
                }
            });
        if let Err(err) = spawned {
            tracing::error!(error = %err, "could not spawn hotkey listener");
        }
    }

    #[cfg(not(feature = "hooks"))]
    fn spawn_listener(&self) {
        tracing::warn!("built without the `hooks` feature; global hotkeys are unavailable");
    }
}
