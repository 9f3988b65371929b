// Configuration loading

pub mod session;
pub mod settings;

pub use session::SessionFile;
pub use settings::{Settings, SettingsError};

use std::path::PathBuf;

/// `<config_dir>/tabsplit`, or `./tabsplit` when the platform has no config dir.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabsplit")
}
