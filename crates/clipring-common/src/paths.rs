//! XDG path utilities for clipring.

use std::path::PathBuf;

/// Get the socket path for IPC communication.
///
/// Returns `$XDG_RUNTIME_DIR/clipring/clipring.sock` or falls back to
/// `/tmp/clipring-$UID/clipring.sock`.
#[cfg(unix)]
pub fn socket_path() -> PathBuf {
    if let Some(runtime_dir) = dirs::runtime_dir() {
        runtime_dir.join("clipring").join("clipring.sock")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/clipring-{}/clipring.sock", uid))
    }
}

/// Get the named pipe path for IPC communication.
#[cfg(windows)]
pub fn socket_path() -> PathBuf {
    PathBuf::from(r"\\.\pipe\clipring")
}

/// Get the configuration file path.
///
/// Returns `$XDG_CONFIG_HOME/clipring/config.toml` or falls back to
/// `~/.config/clipring/config.toml`.
pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".config")
    });
    config_dir.join("clipring").join("config.toml")
}
