use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("click scheduler is already running")]
    AlreadyRunning,

    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    #[error("unknown hotkey {0:?}: use a key name such as F8 or Kp5, or a numeric key code")]
    InvalidHotkey(String),

    #[error("mouse backend error: {0}")]
    Mouse(String),

    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings format error: {0}")]
    Serialization(#[from] serde_json::Error),
}
