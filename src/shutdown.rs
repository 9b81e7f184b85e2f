use eframe::egui;
use parking_lot::Mutex;
use std::{sync::Arc, thread};

use crate::{controller::Controller, indicator};

/// Stops clicking and asks the window to close. The app's close path then
/// runs the usual cleanup and saves settings.
pub fn request_shutdown(controller: &Mutex<Controller>, ctx: &egui::Context) {
    controller.lock().deactivate();
    // a minimized root may not process commands until it is shown again
    indicator::restore_root(ctx);
    ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Close);
    ctx.request_repaint();
    ctx.request_repaint_of(indicator::viewport_id());
}

/// Waits for Ctrl+C on a side thread with a small single-threaded runtime,
/// since the UI owns the main thread.
pub fn install(controller: Arc<Mutex<Controller>>, ctx: egui::Context) {
    let spawned = thread::Builder::new().name("ctrl-c".into()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::warn!(error = %err, "no runtime for the Ctrl+C handler");
                return;
            }
        };
        match runtime.block_on(tokio::signal::ctrl_c()) {
            Ok(()) => {
                tracing::info!("shutdown signal received");
                request_shutdown(&controller, &ctx);
            }
            Err(err) => tracing::warn!(error = %err, "failed to install Ctrl+C handler"),
        }
    });
    if let Err(err) = spawned {
        tracing::warn!(error = %err, "could not spawn the Ctrl+C thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DelayRange, mouse::tests::RecordingBackend};

    #[test]
    fn test_shutdown_stops_clicking() {
        let mut controller = Controller::new(Box::new(RecordingBackend::at(3, 4)), DelayRange::default(), 0);
        controller.activate().unwrap();
        let controller = Mutex::new(controller);

        request_shutdown(&controller, &egui::Context::default());

        let status = controller.lock().status();
        assert!(!status.is_active);
        assert!(status.locked_position.is_none());
    }
}
