use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

const QUIET: &str = "clickclick=warn";
const VERBOSE: &str = "clickclick=debug";

/// Switches console verbosity at runtime.
#[derive(Clone)]
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogControl {
    /// A control that does nothing, for tests and embedding.
    pub fn detached() -> Self {
        Self { handle: None }
    }

    pub fn set_console_output(&self, enabled: bool) {
        let Some(handle) = &self.handle else { return; };
        let directive = if enabled { VERBOSE } else { QUIET };
        if let Err(err) = handle.reload(EnvFilter::new(directive)) {
            tracing::warn!(error = %err, "could not change log level");
        }
    }
}

/// `RUST_LOG` wins when set; otherwise the console-output setting decides.
pub fn init(console_output: bool) -> LogControl {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
        return LogControl::detached();
    }

    let initial = if console_output { VERBOSE } else { QUIET };
    let (filter, handle) = reload::Layer::new(EnvFilter::new(initial));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
    LogControl { handle: Some(handle) }
}
