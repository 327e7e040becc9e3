//! Default paths for tabwardend components
//!
//! Provides centralized path defaults that all crates can use. Environment
//! overrides (`TABWARDEN_SOCKET`, `TABWARDEN_DATA_DIR`) are handled at the
//! CLI boundary; these functions return the XDG-style fallbacks.
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/tabwardend/tabwardend.sock` or `/tmp/tabwardend-$USER/tabwardend.sock`
//! - Data: `$XDG_DATA_HOME/tabwardend` or `~/.local/share/tabwardend`
//! - Config: `$XDG_CONFIG_HOME/tabwardend/config.toml` or `~/.config/tabwardend/config.toml`

use std::path::PathBuf;

/// Socket filename within the socket directory
const SOCKET_FILENAME: &str = "tabwardend.sock";

/// Application subdirectory name
const APP_DIR: &str = "tabwardend";

/// Get the default socket path.
///
/// `$XDG_RUNTIME_DIR/tabwardend/tabwardend.sock`, falling back to
/// `/tmp/tabwardend-$USER/tabwardend.sock`.
pub fn default_socket_path() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// `$XDG_DATA_HOME/tabwardend`, falling back to `~/.local/share/tabwardend`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default config file path.
///
/// `$XDG_CONFIG_HOME/tabwardend/config.toml` or
/// `~/.config/tabwardend/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}
