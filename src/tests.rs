use std::path::Path;

use crate::{
    app::ClickApp,
    config::{Settings, OFFSET_MAX_PX},
    hotkey::{Hotkey, HotkeyEvent, KeyPress},
    indicator::DotState,
    logging::LogControl,
    mouse::tests::RecordingBackend,
};

fn test_app(path: &Path, backend: RecordingBackend) -> ClickApp {
    let app = ClickApp::new(
        Settings::default(),
        path.to_path_buf(),
        Box::new(backend),
        LogControl::detached(),
        None,
    );
    app.hotkey.arm();
    app
}

#[test]
fn test_app_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(0, 0));

    assert_eq!(app.min_delay_input, 1.0);
    assert_eq!(app.max_delay_input, 3.0);
    assert_eq!(app.applied_label, "Applied: Min 1s, Max 3s");
    assert!(app.timing_error.is_none());
    assert!(!app.controller.lock().is_active());
    assert_eq!(app.controller.lock().offset_range(), 3);
}

#[test]
fn test_apply_valid_delays() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(0, 0));

    app.min_delay_input = 0.5;
    app.max_delay_input = 1.5;
    assert!(app.apply_delay_settings());

    let range = app.controller.lock().delay_range();
    assert_eq!((range.min_secs(), range.max_secs()), (0.5, 1.5));
    assert_eq!((app.settings.min_delay, app.settings.max_delay), (0.5, 1.5));
    assert_eq!(app.applied_label, "Applied: Min 0.5s, Max 1.5s");
}

#[test]
fn test_apply_rejects_reversed_delays() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(0, 0));

    app.min_delay_input = 4.0;
    app.max_delay_input = 2.0;
    assert!(!app.apply_delay_settings());
    assert_eq!(
        app.timing_error.as_deref(),
        Some("Max delay must be greater than or equal to Min delay.")
    );

    // previous range stays in force
    let range = app.controller.lock().delay_range();
    assert_eq!((range.min_secs(), range.max_secs()), (1.0, 3.0));
    assert_eq!(app.applied_label, "Applied: Min 1s, Max 3s");
}

#[test]
fn test_offset_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(0, 0));

    app.apply_offset(500);
    assert_eq!(app.settings.offset_range, OFFSET_MAX_PX);
    assert_eq!(app.controller.lock().offset_range(), OFFSET_MAX_PX);
}

#[test]
fn test_hotkey_toggles_clicking() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(640, 480));
    let kp5 = KeyPress::named("Kp5");

    assert_eq!(app.hotkey.handle_press(&kp5), Some(HotkeyEvent::Toggle));
    let status = app.controller.lock().status();
    assert!(status.is_active);
    assert_eq!(status.locked_position, Some((640, 480)));

    app.hotkey.handle_release(&kp5);
    app.hotkey.handle_press(&kp5);
    assert!(!app.controller.lock().is_active());
    assert!(app.controller.lock().status().locked_position.is_none());
}

#[test]
fn test_indicator_follows_hotkey_without_ui_frame() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(5, 5));
    // the overlay holds its own handle and never goes through `update`
    let shared = std::sync::Arc::clone(&app.controller);
    let kp5 = KeyPress::named("Kp5");

    assert!(!DotState::read(&shared.lock()).active);

    app.hotkey.handle_press(&kp5);
    assert!(DotState::read(&shared.lock()).active);

    // the first wait is drawn on the scheduler thread
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    let fraction = loop {
        if let Some(fraction) = DotState::read(&shared.lock()).countdown {
            break fraction;
        }
        assert!(std::time::Instant::now() < deadline, "no countdown after activation");
        std::thread::sleep(std::time::Duration::from_millis(10));
    };
    assert!(fraction > 0.0 && fraction <= 1.0);

    app.hotkey.handle_release(&kp5);
    app.hotkey.handle_press(&kp5);
    assert_eq!(DotState::read(&shared.lock()), DotState { active: false, countdown: None });
}

#[test]
fn test_captured_hotkey_lands_in_settings() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(0, 0));

    app.hotkey.capture_next();
    app.hotkey.handle_press(&KeyPress::named("F8"));
    app.drain_hotkey_events();

    assert_eq!(app.settings.hotkey, Hotkey::Key("F8".into()));
    assert!(!app.controller.lock().is_active());
}

#[test]
fn test_behavior_toggles_update_settings() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(&dir.path().join("settings.json"), RecordingBackend::at(0, 0));

    app.set_console_output(true);
    app.set_show_indicator(false);
    app.set_indicator_corner(crate::indicator::Corner::BottomLeft);

    assert!(app.settings.console_output);
    assert!(!app.settings.show_indicator);
    assert_eq!(app.settings.indicator_corner, crate::indicator::Corner::BottomLeft);
}

#[test]
fn test_cleanup_stops_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let mut app = test_app(&path, RecordingBackend::at(10, 20));

    app.toggle_clicking();
    assert!(app.controller.lock().is_active());
    app.apply_offset(9);

    app.cleanup();
    assert!(!app.controller.lock().is_active());
    assert!(!app.hotkey.is_armed());

    let saved = Settings::load(&path);
    assert_eq!(saved.offset_range, 9);

    // second call is a no-op
    app.cleanup();
}
