//! Include/exclude decisions for listed entries
//!
//! Patterns are regular expressions searched anywhere in the entry URL.
//! An include pattern only matters for entries its exclude counterpart
//! matched.

use regex::Regex;

use crate::error::FilterError;
use crate::url;

#[derive(Debug, Clone, Default)]
pub struct Filter {
	exclude_files: Option<Regex>,
	include_files: Option<Regex>,
	exclude_dirs: Option<Regex>,
	include_dirs: Option<Regex>,
}

fn compile(option: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, FilterError> {
	pattern
		.map(Regex::new)
		.transpose()
		.map_err(|source| FilterError::InvalidPattern { option, source })
}

fn matches(pattern: &Option<Regex>, url: &str) -> bool {
	pattern.as_ref().is_some_and(|regex| regex.is_match(url))
}

impl Filter {
	/// Compile the four patterns; `None` never matches
	pub fn new(
		exclude_files: Option<&str>,
		include_files: Option<&str>,
		exclude_dirs: Option<&str>,
		include_dirs: Option<&str>,
	) -> Result<Self, FilterError> {
		Ok(Self {
			exclude_files: compile("exclude-files", exclude_files)?,
			include_files: compile("include-files", include_files)?,
			exclude_dirs: compile("exclude-dirs", exclude_dirs)?,
			include_dirs: compile("include-dirs", include_dirs)?,
		})
	}

	/// Whether the entry at `url` takes part in the run
	///
	/// Patterns see the URL with percent escapes resolved.
	pub fn includes(&self, url: &str, is_dir: bool) -> bool {
		let url = url::decode_path(url);
		if is_dir {
			!matches(&self.exclude_dirs, &url) || matches(&self.include_dirs, &url)
		} else {
			!matches(&self.exclude_files, &url) || matches(&self.include_files, &url)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_empty_filter_includes_everything() {
		let filter = Filter::default();
		assert!(filter.includes("file:///a/b", false));
		assert!(filter.includes("file:///a/", true));
	}

	#[test]
	fn test_exclude_with_include_override() {
		let filter =
			Filter::new(Some(r"\.tmp$"), Some(r"keep\.tmp$"), Some("/cache"), None).unwrap();

		assert!(!filter.includes("mem:///x/junk.tmp", false));
		assert!(filter.includes("mem:///x/keep.tmp", false));
		assert!(filter.includes("mem:///x/file.txt", false));

		assert!(!filter.includes("mem:///x/cache", true));
		// File patterns never apply to directories
		assert!(filter.includes("mem:///x/dir.tmp", true));
		assert!(filter.includes("mem:///cache-file", false));
	}

	#[test]
	fn test_include_alone_changes_nothing() {
		let filter = Filter::new(None, None, None, Some("src")).unwrap();
		assert!(filter.includes("file:///build", true));
		assert!(filter.includes("file:///src", true));
	}

	#[test]
	fn test_patterns_see_decoded_names() {
		let filter = Filter::new(Some(r"a#b\.txt$"), None, None, None).unwrap();
		assert!(!filter.includes("file:///x/a%23b.txt", false));
		assert!(filter.includes("file:///x/a.txt", false));
	}

	#[test]
	fn test_invalid_pattern() {
		let err = Filter::new(None, None, Some("(unclosed"), None).unwrap_err();
		assert!(err.to_string().starts_with("Invalid exclude-dirs pattern"));
	}
}

// vim: ts=4
