//! Callback hooks for progress reporting and per-entry events

use crate::error::TransportError;

type ProgressFn = dyn Fn(&str, u64) + Send + Sync;
type CopiedFn = dyn Fn(&str, &str, u64) + Send + Sync;
type SkippedFn = dyn Fn(&str, SkipReason) + Send + Sync;
type UrlFn = dyn Fn(&str) + Send + Sync;
type ErrorFn = dyn Fn(&str, &TransportError) + Send + Sync;

/// Why a file was not copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// No evaluation attribute differs
	Identical,
	/// Update mode and the destination is newer
	DestinationNewer,
}

/// Combined callback handler for all events of a run
///
/// In dry-run mode the events describe what would have happened.
pub trait SyncCallbacks: Send + Sync {
	/// Bytes copied so far for the file at `url`
	fn on_progress(&self, _url: &str, _bytes: u64) {}

	/// A file finished copying
	fn on_file_copied(&self, _source: &str, _destination: &str, _bytes: u64) {}

	/// A file was left alone
	fn on_file_skipped(&self, _source: &str, _reason: SkipReason) {}

	/// A destination file or directory was removed
	fn on_file_deleted(&self, _url: &str) {}

	/// A destination directory was created
	fn on_dir_created(&self, _url: &str) {}

	/// A per-file failure the run continued past
	fn on_error(&self, _url: &str, _error: &TransportError) {}
}

/// Default callback implementation that does nothing
pub struct NoCallbacks;

impl SyncCallbacks for NoCallbacks {}

/// Builder for callbacks using function closures
#[derive(Default)]
pub struct CallbackBuilder {
	progress: Option<Box<ProgressFn>>,
	copied: Option<Box<CopiedFn>>,
	skipped: Option<Box<SkippedFn>>,
	deleted: Option<Box<UrlFn>>,
	dir_created: Option<Box<UrlFn>>,
	error: Option<Box<ErrorFn>>,
}

impl CallbackBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_progress<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, u64) + Send + Sync + 'static,
	{
		self.progress = Some(Box::new(callback));
		self
	}

	pub fn on_file_copied<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, &str, u64) + Send + Sync + 'static,
	{
		self.copied = Some(Box::new(callback));
		self
	}

	pub fn on_file_skipped<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, SkipReason) + Send + Sync + 'static,
	{
		self.skipped = Some(Box::new(callback));
		self
	}

	pub fn on_file_deleted<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str) + Send + Sync + 'static,
	{
		self.deleted = Some(Box::new(callback));
		self
	}

	pub fn on_dir_created<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str) + Send + Sync + 'static,
	{
		self.dir_created = Some(Box::new(callback));
		self
	}

	pub fn on_error<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, &TransportError) + Send + Sync + 'static,
	{
		self.error = Some(Box::new(callback));
		self
	}

	pub fn build(self) -> Box<dyn SyncCallbacks> {
		Box::new(CompositeCallbacks(self))
	}
}

struct CompositeCallbacks(CallbackBuilder);

impl SyncCallbacks for CompositeCallbacks {
	fn on_progress(&self, url: &str, bytes: u64) {
		if let Some(ref callback) = self.0.progress {
			callback(url, bytes);
		}
	}

	fn on_file_copied(&self, source: &str, destination: &str, bytes: u64) {
		if let Some(ref callback) = self.0.copied {
			callback(source, destination, bytes);
		}
	}

	fn on_file_skipped(&self, source: &str, reason: SkipReason) {
		if let Some(ref callback) = self.0.skipped {
			callback(source, reason);
		}
	}

	fn on_file_deleted(&self, url: &str) {
		if let Some(ref callback) = self.0.deleted {
			callback(url);
		}
	}

	fn on_dir_created(&self, url: &str) {
		if let Some(ref callback) = self.0.dir_created {
			callback(url);
		}
	}

	fn on_error(&self, url: &str, error: &TransportError) {
		if let Some(ref callback) = self.0.error {
			callback(url, error);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	#[test]
	fn test_builder_routes_events() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let deleted = seen.clone();
		let skipped = seen.clone();

		let callbacks = CallbackBuilder::new()
			.on_file_deleted(move |url| deleted.lock().unwrap().push(format!("deleted {}", url)))
			.on_file_skipped(move |url, reason| {
				skipped.lock().unwrap().push(format!("skipped {} {:?}", url, reason))
			})
			.build();

		callbacks.on_file_deleted("mem:///a");
		callbacks.on_file_skipped("mem:///b", SkipReason::Identical);
		callbacks.on_dir_created("mem:///c");

		assert_eq!(
			*seen.lock().unwrap(),
			vec!["deleted mem:///a".to_string(), "skipped mem:///b Identical".to_string()]
		);
	}
}

// vim: ts=4
