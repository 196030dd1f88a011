//! Hub configuration, read from TOML.
//!
//! Every field has a default, so an empty or missing file is a valid
//! configuration:
//!
//! ```toml
//! base_url = "https://farmrpg.com"
//! data_dir = "/var/lib/farmlore"
//!
//! [schedule]
//! inventory_refresh_secs = 300
//! perk_refresh_secs = 900
//! render_secs = 60
//!
//! [pages]
//! inventory = "inventory.php"
//! perks = "perks.php"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The file exists but could not be read.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Config file path.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The file is not valid TOML for [`HubConfig`].
	#[error("invalid config {path}: {error}")]
	Parse {
		/// Config file path.
		path: PathBuf,
		/// Parser error.
		error: toml::de::Error,
	},

	/// `base_url` is not an absolute http(s) URL.
	#[error("invalid base_url {0:?}")]
	BaseUrl(String),
}

/// Top-level hub settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
	/// Origin of the remote application.
	pub base_url: String,
	/// Directory for the store file and log exports. Defaults to the platform data dir.
	pub data_dir: Option<PathBuf>,
	/// Directory of `<collection>.json` fixture files merged at startup.
	pub fixtures_dir: Option<PathBuf>,
	/// Periodic triggers.
	pub schedule: ScheduleConfig,
	/// Pages fetched by the triggers, relative to `base_url`.
	pub pages: PagesConfig,
}

impl Default for HubConfig {
	fn default() -> Self {
		Self {
			base_url: "https://farmrpg.com".to_string(),
			data_dir: None,
			fixtures_dir: None,
			schedule: ScheduleConfig::default(),
			pages: PagesConfig::default(),
		}
	}
}

/// Trigger periods, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
	/// Inventory refetch period.
	pub inventory_refresh_secs: u64,
	/// Perk page refetch period.
	pub perk_refresh_secs: u64,
	/// Unconditional re-render period.
	pub render_secs: u64,
}

impl Default for ScheduleConfig {
	fn default() -> Self {
		Self {
			inventory_refresh_secs: 5 * 60,
			perk_refresh_secs: 15 * 60,
			render_secs: 60,
		}
	}
}

impl ScheduleConfig {
	/// Inventory refetch period.
	pub fn inventory_refresh(&self) -> Duration {
		Duration::from_secs(self.inventory_refresh_secs.max(1))
	}

	/// Perk page refetch period.
	pub fn perk_refresh(&self) -> Duration {
		Duration::from_secs(self.perk_refresh_secs.max(1))
	}

	/// Re-render period.
	pub fn render(&self) -> Duration {
		Duration::from_secs(self.render_secs.max(1))
	}
}

/// Paths of the pages the hub fetches on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagesConfig {
	/// Inventory page.
	pub inventory: String,
	/// Perk set page.
	pub perks: String,
	/// Home page, carrying the farm link.
	pub home: String,
}

impl Default for PagesConfig {
	fn default() -> Self {
		Self {
			inventory: "inventory.php".to_string(),
			perks: "perks.php".to_string(),
			home: "index.php".to_string(),
		}
	}
}

impl HubConfig {
	/// Parses a configuration document.
	pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(text).map_err(|error| ConfigError::Parse {
			path: path.to_path_buf(),
			error,
		})?;
		config.validate()?;
		Ok(config)
	}

	/// Reads `path`. A missing file yields the defaults.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		match std::fs::read_to_string(path) {
			Ok(text) => Self::from_toml(&text, path),
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				tracing::debug!(path = %path.display(), "no config file, using defaults");
				Ok(Self::default())
			}
			Err(error) => Err(ConfigError::Io {
				path: path.to_path_buf(),
				error,
			}),
		}
	}

	/// `base_url` without a trailing slash.
	pub fn origin(&self) -> &str {
		self.base_url.trim_end_matches('/')
	}

	/// Absolute URL of `page`.
	pub fn page_url(&self, page: &str) -> String {
		format!("{}/{}", self.origin(), page.trim_start_matches('/'))
	}

	/// Where the store file lives.
	pub fn db_path(&self) -> PathBuf {
		self.data_dir().join("farmlore.db")
	}

	/// Directory for data files.
	pub fn data_dir(&self) -> PathBuf {
		self.data_dir.clone().unwrap_or_else(farmlore_proto::paths::default_data_dir)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		match url::Url::parse(&self.base_url) {
			Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
			_ => Err(ConfigError::BaseUrl(self.base_url.clone())),
		}
	}
}
