//! Default file locations for the hub.

use std::path::PathBuf;

/// Returns the default socket path for the hub.
///
/// # Resolution Order
///
/// 1. `FARMLORE_SOCKET` environment variable.
/// 2. System runtime directory (e.g., `$XDG_RUNTIME_DIR`).
/// 3. System temp directory (e.g., `/tmp`).
#[must_use]
pub fn default_socket_path() -> PathBuf {
	if let Ok(p) = std::env::var("FARMLORE_SOCKET") {
		return PathBuf::from(p);
	}

	dirs::runtime_dir()
		.filter(|p| std::fs::create_dir_all(p).is_ok())
		.unwrap_or_else(std::env::temp_dir)
		.join("farmlore.sock")
}

/// Returns the directory holding the durable store and log exports.
#[must_use]
pub fn default_data_dir() -> PathBuf {
	dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("farmlore")
}

/// Returns the default config file location (`$XDG_CONFIG_HOME/farmlore/config.toml`).
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("farmlore").join("config.toml"))
}
