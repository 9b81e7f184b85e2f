use enigo::{Enigo, MouseButton, MouseControllable};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::Rng;

use crate::{config::{clamp_offset, DEFAULT_OFFSET_RANGE}, error::Result};

/// Cursor access. Everything that touches the real pointer goes through here.
pub trait MouseBackend: Send {
    fn position(&mut self) -> Result<(i32, i32)>;
    fn click_at(&mut self, x: i32, y: i32) -> Result<()>;
}

static ENIGO: Lazy<Mutex<Enigo>> = Lazy::new(|| Mutex::new(Enigo::new()));

#[derive(Clone, Copy, Debug, Default)]
pub struct EnigoBackend;

impl MouseBackend for EnigoBackend {
    fn position(&mut self) -> Result<(i32, i32)> {
        Ok(ENIGO.lock().mouse_location())
    }

    fn click_at(&mut self, x: i32, y: i32) -> Result<()> {
        let mut en = ENIGO.lock();
        en.mouse_move_to(x, y);
        en.mouse_click(MouseButton::Left);
        Ok(())
    }
}

/// Primary display size as reported by enigo.
pub fn main_display_size() -> (i32, i32) {
    let (w, h) = ENIGO.lock().main_display_size();
    (w as i32, h as i32)
}

pub struct MouseController {
    backend: Box<dyn MouseBackend>,
    locked_position: Option<(i32, i32)>,
    offset_range: u32,
}

impl MouseController {
    pub fn new(backend: Box<dyn MouseBackend>) -> Self {
        Self { backend, locked_position: None, offset_range: DEFAULT_OFFSET_RANGE }
    }

    pub fn locked_position(&self) -> Option<(i32, i32)> { self.locked_position }
    pub fn offset_range(&self) -> u32 { self.offset_range }

    pub fn lock_current_position(&mut self) {
        match self.backend.position() {
            Ok((x, y)) => {
                self.locked_position = Some((x, y));
                tracing::debug!(x, y, "locked mouse position");
            }
            Err(err) => tracing::warn!(error = %err, "failed to lock mouse position"),
        }
    }

    pub fn unlock_position(&mut self) {
        match self.locked_position.take() {
            Some(prev) => tracing::debug!(?prev, "unlocked mouse position"),
            None => tracing::debug!("unlock requested but no position was locked"),
        }
    }

    /// Clicks once near the locked position. Backend failures are logged only.
    pub fn click_at_locked_position(&mut self) {
        let Some((x, y)) = self.locked_position else { return; };

        let (dx, dy) = self.random_offset();
        let (tx, ty) = (x + dx, y + dy);
        tracing::debug!(x = tx, y = ty, dx, dy, "clicking");

        if let Err(err) = self.backend.click_at(tx, ty) {
            tracing::warn!(error = %err, "click failed");
        }
    }

    pub fn set_offset_range(&mut self, value: i64) {
        self.offset_range = clamp_offset(value);
    }

    pub fn random_offset(&self) -> (i32, i32) {
        let r = self.offset_range as i32;
        let mut rng = rand::thread_rng();
        (rng.gen_range(-r..=r), rng.gen_range(-r..=r))
    }
}
