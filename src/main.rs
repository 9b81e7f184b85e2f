mod app;
mod config;
mod controller;
mod error;
mod hotkey;
mod indicator;
mod logging;
mod mouse;
mod scheduler;
mod shutdown;

#[cfg(test)]
mod tests;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use eframe::egui;

use crate::{
    app::ClickApp,
    config::{clamp_offset, Settings, WINDOW_HEIGHT, WINDOW_WIDTH},
    hotkey::Hotkey,
    mouse::EnigoBackend,
};

#[derive(Parser, Debug)]
#[command(name = "clickclick", about = "Hotkey-toggled auto-clicker with randomized timing", version)]
struct Cli {
    /// Settings file (default: per-user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Override the minimum delay between clicks, in seconds
    #[arg(long)]
    min_delay: Option<f32>,
    /// Override the maximum delay between clicks, in seconds
    #[arg(long)]
    max_delay: Option<f32>,
    /// Override the click position jitter, in pixels
    #[arg(long)]
    offset: Option<i64>,
    /// Override the toggle hotkey by key name (e.g. F8, Kp5) or raw key code
    #[arg(long, value_parser = Hotkey::parse_cli)]
    hotkey: Option<Hotkey>,
    /// Verbose console output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(min) = self.min_delay {
            settings.min_delay = min;
        }
        if let Some(max) = self.max_delay {
            settings.max_delay = max;
        }
        if let Some(offset) = self.offset {
            settings.offset_range = clamp_offset(offset);
        }
        if let Some(hotkey) = &self.hotkey {
            settings.hotkey = hotkey.clone();
        }
        if self.verbose {
            settings.console_output = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);

    let mut settings = Settings::load(&settings_path);
    cli.apply(&mut settings);
    let settings = settings.normalized();

    let log = logging::init(settings.console_output);
    tracing::info!(path = %settings_path.display(), hotkey = %settings.hotkey, "starting clickclick");

    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_WIDTH, 400.0])
            .with_transparent(true),
        follow_system_theme: true,
        ..Default::default()
    };

    eframe::run_native(
        "ClickClick",
        opts,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            let mut app = ClickApp::new(
                settings,
                settings_path,
                Box::new(EnigoBackend),
                log,
                Some(cc.egui_ctx.clone()),
            );
            app.start_services();
            shutdown::install(Arc::clone(&app.controller), cc.egui_ctx.clone());
            Box::new(app)
        }),
    )
    .map_err(|err| anyhow::anyhow!("gui failed: {err}"))
}
