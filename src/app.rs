use eframe::egui::{self, Color32};
use parking_lot::Mutex;
use std::{
    path::PathBuf,
    sync::{mpsc, Arc},
    time::Duration,
};

use crate::{
    config::{DelayRange, Settings, MAX_DELAY_SECONDS, MIN_DELAY_SECONDS, OFFSET_MAX_PX},
    controller::Controller,
    error::Error,
    hotkey::{Hotkey, HotkeyEvent, HotkeyHandler},
    indicator::{self, Corner, StatusIndicator},
    logging::LogControl,
    mouse::MouseBackend,
};

const ERROR_COLOR: Color32 = Color32::from_rgb(0xE5, 0x48, 0x4D);

// -------------- App State --------------
pub struct ClickApp {
    pub(crate) controller: Arc<Mutex<Controller>>,
    pub(crate) hotkey: HotkeyHandler,
    events: mpsc::Receiver<HotkeyEvent>,
    pub(crate) settings: Settings,
    settings_path: PathBuf,
    indicator: StatusIndicator,
    log: LogControl,

    // timing inputs as typed, before Apply
    pub(crate) min_delay_input: f32,
    pub(crate) max_delay_input: f32,
    pub(crate) timing_error: Option<String>,
    pub(crate) applied_label: String,

    window_level_applied: Option<bool>,
    cleaned_up: bool,
}

impl ClickApp {
    pub fn new(
        settings: Settings,
        settings_path: PathBuf,
        backend: Box<dyn MouseBackend>,
        log: LogControl,
        repaint: Option<egui::Context>,
    ) -> Self {
        let settings = settings.normalized();
        let delays = settings.delay_range();
        let controller = Arc::new(Mutex::new(Controller::new(backend, delays, settings.offset_range)));

        // Toggles apply straight from the listener thread so they work while
        // the window is minimized; the UI is only told to redraw.
        let (tx, events) = mpsc::channel();
        let tx = Mutex::new(tx);
        let hotkey_controller = Arc::clone(&controller);
        let callback = move |event: HotkeyEvent| {
            if event == HotkeyEvent::Toggle {
                hotkey_controller.lock().toggle_clicking();
            }
            if let Err(err) = tx.lock().send(event) {
                tracing::debug!(error = %err, "hotkey event dropped, ui gone");
            }
            if let Some(ctx) = &repaint {
                ctx.request_repaint();
                ctx.request_repaint_of(indicator::viewport_id());
            }
        };
        let hotkey = HotkeyHandler::new(settings.hotkey.clone(), Box::new(callback));
        let indicator = StatusIndicator::new(settings.indicator_corner, settings.show_indicator);

        Self {
            controller,
            hotkey,
            events,
            min_delay_input: delays.min_secs(),
            max_delay_input: delays.max_secs(),
            timing_error: None,
            applied_label: delays.applied_label(),
            settings,
            settings_path,
            indicator,
            log,
            window_level_applied: None,
            cleaned_up: false,
        }
    }

    /// Hooks the global hotkey. Kept out of `new` so tests never touch the OS.
    pub fn start_services(&mut self) {
        self.hotkey.start();
    }

    pub fn toggle_clicking(&self) -> bool {
        self.controller.lock().toggle_clicking()
    }

    /// Handles events queued by the hotkey listener. Toggles were already applied.
    pub fn drain_hotkey_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let HotkeyEvent::Captured(hotkey) = event {
                self.settings.hotkey = hotkey;
            }
        }
    }

    pub fn validate_timing_inputs(&self) -> Result<DelayRange, String> {
        DelayRange::validate(self.min_delay_input, self.max_delay_input).map_err(|err| match err {
            Error::InvalidTiming(msg) => msg,
            other => other.to_string(),
        })
    }

    /// Pushes the typed interval to the scheduler, or records why it was rejected.
    pub fn apply_delay_settings(&mut self) -> bool {
        match self.validate_timing_inputs() {
            Ok(range) => {
                self.min_delay_input = range.min_secs();
                self.max_delay_input = range.max_secs();
                self.settings.min_delay = range.min_secs();
                self.settings.max_delay = range.max_secs();
                self.controller.lock().set_delay_range(range);
                self.applied_label = range.applied_label();
                self.timing_error = None;
                true
            }
            Err(msg) => {
                self.timing_error = Some(msg);
                false
            }
        }
    }

    pub fn apply_offset(&mut self, value: u32) {
        let value = value.min(OFFSET_MAX_PX);
        self.settings.offset_range = value;
        self.controller.lock().set_offset_range(value);
    }

    pub fn set_console_output(&mut self, enabled: bool) {
        self.settings.console_output = enabled;
        self.log.set_console_output(enabled);
    }

    pub fn set_show_indicator(&mut self, visible: bool) {
        self.settings.show_indicator = visible;
        self.indicator.set_visible(visible);
    }

    pub fn set_indicator_corner(&mut self, corner: Corner) {
        self.settings.indicator_corner = corner;
        self.indicator.set_corner(corner);
    }

    pub fn save_settings(&self) {
        match self.settings.save(&self.settings_path) {
            Ok(()) => tracing::info!(path = %self.settings_path.display(), "settings saved"),
            Err(err) => tracing::warn!(error = %err, "could not save settings"),
        }
    }

    /// Stops clicking, disarms the hotkey and persists settings. Idempotent.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;
        self.controller.lock().deactivate();
        self.hotkey.stop();
        self.save_settings();
        tracing::debug!("cleanup complete");
    }

    fn minimize_to_indicator(&self, ctx: &egui::Context) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
    }

    fn sync_window_level(&mut self, ctx: &egui::Context) {
        let on_top = self.settings.always_on_top;
        if self.window_level_applied == Some(on_top) {
            return;
        }
        let level = if on_top { egui::WindowLevel::AlwaysOnTop } else { egui::WindowLevel::Normal };
        ctx.send_viewport_cmd(egui::ViewportCommand::WindowLevel(level));
        self.window_level_applied = Some(on_top);
    }

    // -------------- Panels --------------

    fn status_ui(&mut self, ui: &mut egui::Ui) {
        let status = self.controller.lock().status();
        ui.group(|ui| {
            ui.label("Status");
            ui.horizontal(|ui| {
                let (text, color) = if status.is_active {
                    ("Active", Color32::from_rgb(0x2E, 0xA0, 0x43))
                } else {
                    ("Inactive", ERROR_COLOR)
                };
                ui.colored_label(color, text);
                ui.label(status.message());
            });
            ui.label(status.position_label());
            ui.label(format!("Clicks this session: {}", status.clicks));
            match status.next_click {
                Some(pending) => {
                    ui.label(format!("Next click in {:.1}s", pending.remaining().as_secs_f32()));
                }
                None => {
                    ui.label("Next click: -");
                }
            }

            let button = if status.is_active { "Stop Auto-Clicker" } else { "Start Auto-Clicker" };
            if ui.button(button).clicked() {
                self.toggle_clicking();
            }
        });
    }

    fn timing_ui(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Click interval (seconds)");
            ui.horizontal(|ui| {
                ui.label("Min");
                ui.add(
                    egui::DragValue::new(&mut self.min_delay_input)
                        .speed(0.1)
                        .fixed_decimals(1)
                        .clamp_range(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS),
                );
                ui.label("Max");
                ui.add(
                    egui::DragValue::new(&mut self.max_delay_input)
                        .speed(0.1)
                        .fixed_decimals(1)
                        .clamp_range(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS),
                );
                let valid = self.validate_timing_inputs();
                if ui.add_enabled(valid.is_ok(), egui::Button::new("Apply")).clicked() {
                    self.apply_delay_settings();
                }
                if let Err(msg) = valid {
                    self.timing_error = Some(msg);
                } else if self.timing_error.is_some() {
                    self.timing_error = None;
                }
            });
            if let Some(msg) = &self.timing_error {
                ui.colored_label(ERROR_COLOR, msg);
            }
            ui.label(&self.applied_label);
        });
    }

    fn offset_ui(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Position jitter");
            let mut offset = self.settings.offset_range;
            let resp = ui.add(egui::Slider::new(&mut offset, 0..=OFFSET_MAX_PX).text("± px"));
            if resp.changed() {
                self.apply_offset(offset);
            }
        });
    }

    fn behavior_ui(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Behavior");
            ui.checkbox(&mut self.settings.always_on_top, "Keep window on top");

            let mut show = self.settings.show_indicator;
            if ui.checkbox(&mut show, "Show status indicator").changed() {
                self.set_show_indicator(show);
            }

            let mut console = self.settings.console_output;
            if ui.checkbox(&mut console, "Verbose console output").changed() {
                self.set_console_output(console);
            }

            let mut corner = self.settings.indicator_corner;
            egui::ComboBox::from_label("Indicator corner")
                .selected_text(corner.label())
                .show_ui(ui, |ui| {
                    for c in Corner::ALL {
                        ui.selectable_value(&mut corner, c, c.label());
                    }
                });
            if corner != self.settings.indicator_corner {
                self.set_indicator_corner(corner);
            }
        });
    }

    fn hotkey_ui(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.label(format!("Hotkey: {}", self.hotkey.hotkey()));
                if self.hotkey.is_capturing() {
                    ui.label("press a key…");
                    return;
                }
                if ui.button("Capture").clicked() {
                    self.hotkey.capture_next();
                }
                if ui.button("Reset").clicked() {
                    self.hotkey.set_hotkey(Hotkey::default());
                    self.settings.hotkey = Hotkey::default();
                }
            });
        });
    }
}

impl eframe::App for ClickApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_hotkey_events();
        self.sync_window_level(ctx);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.cleanup();
            return;
        }

        self.indicator.show(ctx, &self.controller);
        let is_active = self.controller.lock().is_active();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.heading("ClickClick");
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.status_ui(ui);
            ui.separator();
            self.timing_ui(ui);
            self.offset_ui(ui);
            self.behavior_ui(ui);
            self.hotkey_ui(ui);
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save Settings").clicked() {
                    self.save_settings();
                }
                if ui.button("Minimize to indicator").clicked() {
                    self.minimize_to_indicator(ctx);
                }
            });
        });

        // keep the countdown and status fresh
        if is_active || self.hotkey.is_capturing() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

impl Drop for ClickApp {
    fn drop(&mut self) {
        self.cleanup();
    }
}
