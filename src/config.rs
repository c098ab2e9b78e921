//! Run configuration
//!
//! Every knob of a run lives in one [`Config`]. It can be loaded from a
//! TOML or JSON5 file; the command line then overrides individual fields.
//!
//! ```toml
//! recursive = true
//! delete = true
//! attributes = ["perms"]
//! excludeFiles = '\.tmp$'
//!
//! [backendOptions.mem]
//! snapshotDir = "/var/lib/polysync"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::attributes::{AttrName, AttrSet};
use crate::error::{FilterError, SyncError};
use crate::filter::Filter;
use crate::transport::TransportOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Descend into subdirectories
	pub recursive: bool,

	/// Remove destination entries missing from the source
	pub delete: bool,

	/// Decide everything, change nothing
	pub dry_run: bool,

	/// Skip files whose destination copy is newer
	pub update: bool,

	/// Attributes to carry over beyond the evaluation set
	pub attributes: Vec<String>,

	pub exclude_files: Option<String>,
	pub include_files: Option<String>,
	pub exclude_dirs: Option<String>,
	pub include_dirs: Option<String>,

	/// Still propagate attributes onto a destination skipped as newer
	pub propagate_on_update_skip: bool,

	/// Option blocks keyed by scheme, handed to `connect`
	pub backend_options: BTreeMap<String, TransportOptions>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			recursive: false,
			delete: false,
			dry_run: false,
			update: false,
			attributes: Vec::new(),
			exclude_files: None,
			include_files: None,
			exclude_dirs: None,
			include_dirs: None,
			propagate_on_update_skip: true,
			backend_options: BTreeMap::new(),
		}
	}
}

impl Config {
	/// Load from `.toml`, or JSON5 for any other extension
	pub fn load(path: &Path) -> Result<Self, SyncError> {
		let text = std::fs::read_to_string(path)?;
		let is_toml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

		let parsed: Result<Self, String> = if is_toml {
			toml::from_str(&text).map_err(|e| e.to_string())
		} else {
			json5::from_str(&text).map_err(|e| e.to_string())
		};
		parsed.map_err(|message| SyncError::InvalidConfig {
			message: format!("{}: {}", path.display(), message),
		})
	}

	/// Attributes the user asked for; update mode needs mtime
	pub fn requested_attributes(&self) -> AttrSet {
		let mut requested: AttrSet =
			self.attributes.iter().map(|name| AttrName::from(name.as_str())).collect();
		if self.update {
			requested.insert(AttrName::Mtime);
		}
		requested
	}

	/// Option block for `scheme`, empty if none was given
	pub fn options_for(&self, scheme: &str) -> TransportOptions {
		self.backend_options.get(scheme).cloned().unwrap_or_default()
	}

	/// Set one backend option, as given by `scheme.key=value` on the command line
	pub fn set_option(&mut self, scheme: &str, key: &str, value: &str) {
		self.backend_options
			.entry(scheme.to_string())
			.or_default()
			.insert(key.to_string(), value.to_string());
	}

	/// Compile the entry filter
	pub fn filter(&self) -> Result<Filter, FilterError> {
		Filter::new(
			self.exclude_files.as_deref(),
			self.include_files.as_deref(),
			self.exclude_dirs.as_deref(),
			self.include_dirs.as_deref(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::attributes::attr_set;

	#[test]
	fn test_defaults() {
		let config = Config::default();
		assert!(!config.recursive);
		assert!(config.propagate_on_update_skip);
		assert!(config.requested_attributes().is_empty());
		assert!(config.options_for("mem").is_empty());
	}

	#[test]
	fn test_update_implies_mtime() {
		let config =
			Config { update: true, attributes: vec!["perms".to_string()], ..Config::default() };
		assert_eq!(config.requested_attributes(), attr_set(["perms", "mtime"]));
	}

	#[test]
	fn test_set_option() {
		let mut config = Config::default();
		config.set_option("mem", "snapshotDir", "/tmp/snaps");
		let options = config.options_for("mem");
		assert_eq!(options.get("snapshotDir").map(String::as_str), Some("/tmp/snaps"));
		assert!(config.options_for("file").is_empty());
	}

	#[test]
	fn test_partial_json5() {
		let config: Config = json5::from_str("{ recursive: true, excludeDirs: '^cache' }").unwrap();
		assert!(config.recursive);
		assert_eq!(config.exclude_dirs.as_deref(), Some("^cache"));
		assert!(config.propagate_on_update_skip);
		assert!(config.filter().is_ok());
	}
}

// vim: ts=4
