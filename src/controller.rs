//! Activation state shared by the settings window and the hotkey listener.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    config::DelayRange,
    error::{Error, Result},
    mouse::{MouseBackend, MouseController},
    scheduler::{ClickScheduler, PendingClick},
};

#[derive(Clone, Copy, Debug)]
pub struct Status {
    pub is_active: bool,
    pub locked_position: Option<(i32, i32)>,
    pub clicks: u64,
    pub next_click: Option<PendingClick>,
}

impl Status {
    pub fn message(&self) -> String {
        match (self.is_active, self.locked_position) {
            (true, Some((x, y))) => format!("Running at {x}, {y}"),
            (true, None) => "Automation running".into(),
            (false, _) => "Automation idle".into(),
        }
    }

    pub fn position_label(&self) -> String {
        match self.locked_position {
            Some((x, y)) => format!("Position: {x}, {y}"),
            None => "Position: Not Locked".into(),
        }
    }
}

pub struct Controller {
    mouse: Arc<Mutex<MouseController>>,
    scheduler: ClickScheduler,
}

impl Controller {
    pub fn new(backend: Box<dyn MouseBackend>, delays: DelayRange, offset_range: u32) -> Self {
        let mut mouse = MouseController::new(backend);
        mouse.set_offset_range(offset_range as i64);
        let mouse = Arc::new(Mutex::new(mouse));
        let scheduler = ClickScheduler::new(Arc::clone(&mouse), delays);
        Self { mouse, scheduler }
    }

    pub fn is_active(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Flips between idle and clicking. Returns the new state.
    pub fn toggle_clicking(&mut self) -> bool {
        if self.is_active() {
            self.deactivate();
        } else if let Err(err) = self.activate() {
            tracing::warn!(error = %err, "could not start clicking");
        }
        self.is_active()
    }

    /// Locks the cursor where it is now and starts the click loop.
    pub fn activate(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(Error::AlreadyRunning);
        }
        let locked = {
            let mut mouse = self.mouse.lock();
            mouse.lock_current_position();
            mouse.locked_position()
        };
        let Some((x, y)) = locked else {
            return Err(Error::Mouse("could not read cursor position".into()));
        };

        if let Err(err) = self.scheduler.start() {
            self.mouse.lock().unlock_position();
            return Err(err);
        }
        tracing::info!(x, y, "auto-clicker active");
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if !self.is_active() {
            return;
        }
        self.scheduler.stop();
        self.mouse.lock().unlock_position();
        tracing::info!("auto-clicker inactive");
    }

    pub fn set_delay_range(&self, delays: DelayRange) {
        self.scheduler.set_delay_range(delays);
    }

    pub fn delay_range(&self) -> DelayRange {
        self.scheduler.delay_range()
    }

    pub fn set_offset_range(&self, value: u32) {
        self.mouse.lock().set_offset_range(value as i64);
    }

    pub fn offset_range(&self) -> u32 {
        self.mouse.lock().offset_range()
    }

    pub fn status(&self) -> Status {
        let sched = self.scheduler.status();
        Status {
            is_active: sched.is_active,
            locked_position: self.mouse.lock().locked_position(),
            clicks: sched.clicks,
            next_click: sched.next_click,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mouse::tests::RecordingBackend;

    #[test]
    fn test_toggle_locks_and_unlocks() {
        let mut ctl = Controller::new(Box::new(RecordingBackend::at(40, 50)), DelayRange::default(), 3);
        assert!(!ctl.is_active());

        assert!(ctl.toggle_clicking());
        let status = ctl.status();
        assert!(status.is_active);
        assert_eq!(status.locked_position, Some((40, 50)));
        assert_eq!(status.message(), "Running at 40, 50");
        assert_eq!(status.position_label(), "Position: 40, 50");

        assert!(!ctl.toggle_clicking());
        let status = ctl.status();
        assert!(!status.is_active);
        assert!(status.locked_position.is_none());
        assert_eq!(status.message(), "Automation idle");
        assert_eq!(status.position_label(), "Position: Not Locked");
    }

    #[test]
    fn test_activation_requires_cursor_position() {
        let mut ctl = Controller::new(Box::new(RecordingBackend::default()), DelayRange::default(), 3);
        assert!(matches!(ctl.activate(), Err(Error::Mouse(_))));
        assert!(!ctl.toggle_clicking());
        assert!(ctl.status().locked_position.is_none());
    }

    #[test]
    fn test_double_activation_is_rejected() {
        let mut ctl = Controller::new(Box::new(RecordingBackend::at(1, 2)), DelayRange::default(), 3);
        ctl.activate().unwrap();
        assert!(matches!(ctl.activate(), Err(Error::AlreadyRunning)));
        ctl.deactivate();
    }

    #[test]
    fn test_running_without_position_message() {
        let status = Status { is_active: true, locked_position: None, clicks: 0, next_click: None };
        assert_eq!(status.message(), "Automation running");
    }

    #[test]
    fn test_settings_flow_through() {
        let ctl = Controller::new(Box::new(RecordingBackend::default()), DelayRange::default(), 80);
        assert_eq!(ctl.offset_range(), 50);
        ctl.set_offset_range(7);
        assert_eq!(ctl.offset_range(), 7);

        let r = DelayRange::validate(0.2, 0.4).unwrap();
        ctl.set_delay_range(r);
        assert_eq!(ctl.delay_range(), r);
    }
}
