use parking_lot::Mutex;
use rand::Rng;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    config::DelayRange,
    error::{Error, Result},
    mouse::MouseController,
};

/// Granularity of the interruptible sleep between clicks.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Wait for the click that is currently pending.
#[derive(Clone, Copy, Debug)]
pub struct PendingClick {
    pub due: Instant,
    pub interval: Duration,
}

impl PendingClick {
    pub fn remaining(&self) -> Duration {
        self.due.saturating_duration_since(Instant::now())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SchedulerStatus {
    pub is_active: bool,
    pub thread_alive: bool,
    pub clicks: u64,
    pub next_click: Option<PendingClick>,
}

pub struct ClickScheduler {
    mouse: Arc<Mutex<MouseController>>,
    delays: Arc<Mutex<DelayRange>>,
    running: Arc<AtomicBool>,
    clicks: Arc<AtomicU64>,
    next_click: Arc<Mutex<Option<PendingClick>>>,
    handle: Option<JoinHandle<()>>,
}

impl ClickScheduler {
    pub fn new(mouse: Arc<Mutex<MouseController>>, delays: DelayRange) -> Self {
        Self {
            mouse,
            delays: Arc::new(Mutex::new(delays)),
            running: Arc::new(AtomicBool::new(false)),
            clicks: Arc::new(AtomicU64::new(0)),
            next_click: Arc::new(Mutex::new(None)),
            handle: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn delay_range(&self) -> DelayRange {
        *self.delays.lock()
    }

    /// Picked up by the loop before its next wait.
    pub fn set_delay_range(&self, delays: DelayRange) {
        tracing::debug!(min = delays.min_secs(), max = delays.max_secs(), "delay range updated");
        *self.delays.lock() = delays;
    }

    pub fn start(&mut self) -> Result<()> {
        if self.is_active() {
            return Err(Error::AlreadyRunning);
        }
        // A previous loop may still be winding down after a failed stop.
        self.join();

        self.running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.running);
        let mouse = Arc::clone(&self.mouse);
        let delays = Arc::clone(&self.delays);
        let clicks = Arc::clone(&self.clicks);
        let next_click = Arc::clone(&self.next_click);

        tracing::info!(delays = ?self.delay_range(), "starting click scheduler");

        let spawned = thread::Builder::new()
            .name("click-scheduler".into())
            .spawn(move || {
                let mut rng = rand::thread_rng();
                while running.load(Ordering::Relaxed) {
                    let range = *delays.lock();
                    let wait = rng.gen_range(range.min_secs()..=range.max_secs());
                    let interval = Duration::from_secs_f32(wait);
                    *next_click.lock() = Some(PendingClick { due: Instant::now() + interval, interval });

                    if !sleep_while_running(&running, interval) {
                        break;
                    }

                    mouse.lock().click_at_locked_position();
                    clicks.fetch_add(1, Ordering::Relaxed);
                }
                *next_click.lock() = None;
                tracing::debug!("click loop exited");
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::Relaxed);
                Err(Error::Io(err))
            }
        }
    }

    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        self.running.store(false, Ordering::Relaxed);
        self.join();
        tracing::info!(clicks = self.clicks(), "click scheduler stopped");
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("click loop panicked");
            }
        }
    }

    pub fn clicks(&self) -> u64 {
        self.clicks.load(Ordering::Relaxed)
    }

    pub fn next_click(&self) -> Option<PendingClick> {
        if !self.is_active() {
            return None;
        }
        *self.next_click.lock()
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            is_active: self.is_active(),
            thread_alive: self.handle.as_ref().is_some_and(|h| !h.is_finished()),
            clicks: self.clicks(),
            next_click: self.next_click(),
        }
    }
}

impl Drop for ClickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleeps for `total` in short slices. Returns false if stopped early.
fn sleep_while_running(running: &AtomicBool, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if !running.load(Ordering::Relaxed) {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return running.load(Ordering::Relaxed);
        }
        thread::sleep(left.min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mouse::tests::RecordingBackend;

    fn scheduler_at(x: i32, y: i32, delays: DelayRange) -> (ClickScheduler, Arc<Mutex<Vec<(i32, i32)>>>) {
        let backend = RecordingBackend::at(x, y);
        let clicks = Arc::clone(&backend.clicks);
        let mut mouse = MouseController::new(Box::new(backend));
        mouse.set_offset_range(0);
        mouse.lock_current_position();
        (ClickScheduler::new(Arc::new(Mutex::new(mouse)), delays), clicks)
    }

    #[test]
    fn test_start_and_stop() {
        let (mut sched, _) = scheduler_at(10, 10, DelayRange::default());
        assert!(!sched.is_active());

        sched.start().unwrap();
        assert!(sched.is_active());
        assert!(sched.status().thread_alive);

        sched.stop();
        let status = sched.status();
        assert!(!status.is_active);
        assert!(!status.thread_alive);
        assert!(status.next_click.is_none());
    }

    #[test]
    fn test_double_start_is_rejected() {
        let (mut sched, _) = scheduler_at(10, 10, DelayRange::default());
        sched.start().unwrap();
        assert!(matches!(sched.start(), Err(Error::AlreadyRunning)));
        sched.stop();
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut sched, _) = scheduler_at(10, 10, DelayRange::default());
        sched.stop();
        assert!(!sched.is_active());
    }

    #[test]
    fn test_clicks_are_issued_at_locked_position() {
        let delays = DelayRange::validate(0.1, 0.1).unwrap();
        let (mut sched, clicks) = scheduler_at(300, 400, delays);

        sched.start().unwrap();
        thread::sleep(Duration::from_millis(550));
        sched.stop();

        let clicks = clicks.lock();
        assert!(clicks.len() >= 2, "expected several clicks, got {}", clicks.len());
        assert!(clicks.iter().all(|&p| p == (300, 400)));
        assert_eq!(sched.clicks(), clicks.len() as u64);
    }

    #[test]
    fn test_stop_interrupts_long_wait() {
        let delays = DelayRange::validate(10.0, 10.0).unwrap();
        let (mut sched, clicks) = scheduler_at(0, 0, delays);

        sched.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        let pending = sched.next_click().expect("a click should be pending");
        assert_eq!(pending.interval, Duration::from_secs(10));
        assert!(pending.remaining() <= Duration::from_secs(10));

        let started = Instant::now();
        sched.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(clicks.lock().is_empty());
    }

    #[test]
    fn test_restart_after_stop() {
        let delays = DelayRange::validate(0.1, 0.2).unwrap();
        let (mut sched, _) = scheduler_at(0, 0, delays);
        sched.start().unwrap();
        sched.stop();
        sched.start().unwrap();
        assert!(sched.is_active());
        sched.stop();
    }

    #[test]
    fn test_set_delay_range() {
        let (sched, _) = scheduler_at(0, 0, DelayRange::default());
        let r = DelayRange::validate(0.5, 0.7).unwrap();
        sched.set_delay_range(r);
        assert_eq!(sched.delay_range(), r);
    }

    #[test]
    fn test_sleep_while_running_returns_false_when_stopped() {
        let running = AtomicBool::new(false);
        assert!(!sleep_while_running(&running, Duration::from_secs(5)));
        let running = AtomicBool::new(true);
        assert!(sleep_while_running(&running, Duration::from_millis(10)));
    }
}
