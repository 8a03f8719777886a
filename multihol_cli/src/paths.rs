//! Application directories
//!
//! Configuration lives in the platform config directory, backups in the
//! platform data directory. Both fall back to a dot directory in the
//! current working directory when the platform gives no answer.

use std::path::PathBuf;

/// Directory name used under every platform root
const APP_DIR: &str = "multihol";

const BACKUP_SUBDIR: &str = "backups";

const CONFIG_FILE: &str = "config.toml";

/// Base data directory, e.g. `~/.local/share/multihol`
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".multihol"))
}

/// Default directory for candidate backups
pub fn get_backup_dir() -> PathBuf {
    get_data_dir().join(BACKUP_SUBDIR)
}

/// Configuration directory.
///
/// `XDG_CONFIG_HOME` is honoured on every non-Windows platform, including
/// macOS where `dirs` would otherwise pick `Library/Application Support`.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".multihol"))
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}
