//! Tunables and the persisted settings file.

use std::{fs, path::{Path, PathBuf}};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{error::{Error, Result}, hotkey::Hotkey, indicator::Corner};

// -------------- Defaults --------------
pub const DEFAULT_MIN_DELAY: f32 = 1.0;
pub const DEFAULT_MAX_DELAY: f32 = 3.0;

/// Accepted bounds for either end of the click interval, in seconds.
pub const MIN_DELAY_SECONDS: f32 = 0.1;
pub const MAX_DELAY_SECONDS: f32 = 10.0;

/// Per-axis jitter applied around the locked position, in pixels.
pub const DEFAULT_OFFSET_RANGE: u32 = 3;
pub const OFFSET_MAX_PX: u32 = 50;

pub const INDICATOR_SIZE: f32 = 30.0;
pub const INDICATOR_MARGIN: f32 = 20.0;
pub const INDICATOR_OPACITY: f32 = 0.7;
pub const INDICATOR_COLOR_ACTIVE: egui::Color32 = egui::Color32::from_rgb(0x00, 0xFF, 0x00);
pub const INDICATOR_COLOR_INACTIVE: egui::Color32 = egui::Color32::from_rgb(0xFF, 0x00, 0x00);

pub const WINDOW_WIDTH: f32 = 460.0;
pub const WINDOW_HEIGHT: f32 = 520.0;

const SETTINGS_FILE: &str = "settings.json";

// -------------- Delay helpers --------------

/// Rounds to a tenth of a second and clamps into the accepted range.
/// Non-finite input collapses to the lower bound.
pub fn clamp_delay(value: f32) -> f32 {
    if !value.is_finite() {
        return MIN_DELAY_SECONDS;
    }
    let rounded = (value * 10.0).round() / 10.0;
    rounded.clamp(MIN_DELAY_SECONDS, MAX_DELAY_SECONDS)
}

pub fn clamp_offset(value: i64) -> u32 {
    value.clamp(0, OFFSET_MAX_PX as i64) as u32
}

/// `2s` for whole seconds, `1.5s` otherwise.
pub fn format_delay(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}s", value as i64)
    } else {
        format!("{value:.1}s")
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayRange {
    min_secs: f32,
    max_secs: f32,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self { min_secs: DEFAULT_MIN_DELAY, max_secs: DEFAULT_MAX_DELAY }
    }
}

impl DelayRange {
    /// Checks raw user input. Messages are shown verbatim in the settings window.
    pub fn validate(min_secs: f32, max_secs: f32) -> Result<Self> {
        let bounds = MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS;
        if !min_secs.is_finite() || !max_secs.is_finite() {
            return Err(Error::InvalidTiming("Enter numeric delays (0.1-10.0s).".into()));
        }
        if !bounds.contains(&min_secs) {
            return Err(Error::InvalidTiming(format!(
                "Min delay must be between {MIN_DELAY_SECONDS:.1}s and {MAX_DELAY_SECONDS:.1}s."
            )));
        }
        if !bounds.contains(&max_secs) {
            return Err(Error::InvalidTiming(format!(
                "Max delay must be between {MIN_DELAY_SECONDS:.1}s and {MAX_DELAY_SECONDS:.1}s."
            )));
        }
        if max_secs < min_secs {
            return Err(Error::InvalidTiming(
                "Max delay must be greater than or equal to Min delay.".into(),
            ));
        }
        Ok(Self { min_secs: clamp_delay(min_secs), max_secs: clamp_delay(max_secs) })
    }

    /// Builds a range from possibly out-of-range values, swapping reversed ends.
    pub fn clamped(a: f32, b: f32) -> Self {
        let (a, b) = (clamp_delay(a), clamp_delay(b));
        Self { min_secs: a.min(b), max_secs: a.max(b) }
    }

    pub fn min_secs(&self) -> f32 { self.min_secs }
    pub fn max_secs(&self) -> f32 { self.max_secs }

    pub fn applied_label(&self) -> String {
        format!("Applied: Min {}, Max {}", format_delay(self.min_secs), format_delay(self.max_secs))
    }
}

// -------------- Settings file --------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub min_delay: f32,
    pub max_delay: f32,
    pub offset_range: u32,
    pub always_on_top: bool,
    pub console_output: bool,
    pub show_indicator: bool,
    pub hotkey: Hotkey,
    pub indicator_corner: Corner,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            offset_range: DEFAULT_OFFSET_RANGE,
            always_on_top: false,
            console_output: false,
            show_indicator: true,
            hotkey: Hotkey::default(),
            indicator_corner: Corner::default(),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "clickclick")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
            .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE))
    }

    /// Never fails: a missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(settings)) => {
                tracing::debug!(path = %path.display(), "loaded settings");
                settings
            }
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable settings");
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        Ok(Some(settings.normalized()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "saved settings");
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        self.min_delay = clamp_delay(self.min_delay);
        self.max_delay = clamp_delay(self.max_delay);
        self.offset_range = self.offset_range.min(OFFSET_MAX_PX);
        self
    }

    pub fn delay_range(&self) -> DelayRange {
        DelayRange::clamped(self.min_delay, self.max_delay)
    }
}
