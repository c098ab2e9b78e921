//! Reconciliation engine
//!
//! One [`SyncEngine::sync`] call converges a destination tree onto a source
//! tree. The engine only talks to [`Transport`](crate::transport::Transport)
//! trait objects and decides what to compare and propagate from their
//! capability descriptors:
//!
//! - attributes gettable on both sides bound what can be read,
//! - attributes evaluable on both sides decide whether two files differ,
//! - only attributes settable on the destination are ever written.

mod directory;
pub mod report;
mod transfer;

pub use report::SyncReport;

use std::time::Instant;

use crate::attributes::{join_names, AttrSet};
use crate::callbacks::{NoCallbacks, SyncCallbacks};
use crate::config::Config;
use crate::error::SyncError;
use crate::filter::Filter;
use crate::logging::*;
use crate::transport::{SharedTransport, TransportRegistry};
use crate::url;

/// Runs synchronizations with one configuration
pub struct SyncEngine {
	config: Config,
	registry: TransportRegistry,
	filter: Filter,
	callbacks: Box<dyn SyncCallbacks>,
}

impl SyncEngine {
	/// Engine over `registry`; fails if a filter pattern does not compile
	pub fn new(config: Config, registry: TransportRegistry) -> Result<Self, SyncError> {
		let filter = config.filter()?;
		Ok(Self { config, registry, filter, callbacks: Box::new(NoCallbacks) })
	}

	pub fn with_callbacks(mut self, callbacks: Box<dyn SyncCallbacks>) -> Self {
		self.callbacks = callbacks;
		self
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Synchronize `source` onto `destination`
	///
	/// Both transports are disconnected before returning, whether the run
	/// succeeded or not.
	pub async fn sync(&self, source: &str, destination: &str) -> Result<SyncReport, SyncError> {
		let started = Instant::now();
		let source = url::normalize(source)?;
		let destination = url::normalize(destination)?;

		let src = self.registry.resolve(&url::scheme(&source)?)?;
		let dst = self.registry.resolve(&url::scheme(&destination)?)?;

		self.connect(&src, &source).await?;
		if let Err(e) = self.connect(&dst, &destination).await {
			if let Err(e) = src.disconnect().await {
				warn!("Disconnecting from {} failed: {}", source, e);
			}
			return Err(e);
		}

		let mut run = Reconciler::new(self, source, destination, src, dst);
		let outcome = run.execute().await;
		let disconnected = run.disconnect().await;
		outcome?;
		disconnected?;

		run.report.elapsed = started.elapsed();
		info!("{}", run.report);
		Ok(run.report)
	}

	async fn connect(&self, transport: &SharedTransport, location: &str) -> Result<(), SyncError> {
		let capabilities = transport.capabilities();
		let options = self.config.options_for(capabilities.name());
		for key in options.keys() {
			if !capabilities.options.iter().any(|(name, _)| name == key) {
				warn!("Unknown option {}.{} ignored", capabilities.name(), key);
			}
		}

		debug!("Connecting to {}", location);
		transport.connect(location, &options).await.map_err(|source| {
			error!("Connection to {} failed: {}", location, source);
			SyncError::ConnectionFailed { location: location.to_string(), source }
		})
	}
}

/// State of one run
struct Reconciler<'a> {
	config: &'a Config,
	filter: &'a Filter,
	callbacks: &'a dyn SyncCallbacks,
	source: String,
	destination: String,
	src: SharedTransport,
	dst: SharedTransport,
	/// Attributes either side can retrieve
	max_attributes: AttrSet,
	/// Attributes both sides can compare
	max_evaluation: AttrSet,
	requested: AttrSet,
	report: SyncReport,
}

impl<'a> Reconciler<'a> {
	fn new(
		engine: &'a SyncEngine,
		source: String,
		destination: String,
		src: SharedTransport,
		dst: SharedTransport,
	) -> Self {
		let (src_caps, dst_caps) = (src.capabilities(), dst.capabilities());
		let max_attributes: AttrSet =
			src_caps.gettable.intersection(&dst_caps.gettable).cloned().collect();
		let max_evaluation: AttrSet =
			src_caps.evaluable.intersection(&dst_caps.evaluable).cloned().collect();
		let requested = engine.config.requested_attributes();

		debug!("Attributes retrievable on both sides: {}", join_names(&max_attributes));
		debug!("Attributes compared: {}", join_names(&max_evaluation));

		Self {
			config: &engine.config,
			filter: &engine.filter,
			callbacks: engine.callbacks.as_ref(),
			source,
			destination,
			src,
			dst,
			max_attributes,
			max_evaluation,
			requested,
			report: SyncReport { dry_run: engine.config.dry_run, ..SyncReport::default() },
		}
	}

	async fn execute(&mut self) -> Result<(), SyncError> {
		self.validate().await?;

		if self.src.is_dir(&self.source).await? {
			self.sync_tree().await
		} else {
			self.sync_single_file().await
		}
	}

	/// Preconditions, checked before anything is transferred
	async fn validate(&self) -> Result<(), SyncError> {
		let invalid = |message: String| -> Result<(), SyncError> {
			error!("{}", message);
			Err(SyncError::Validation { message })
		};

		for (role, location) in [("source", &self.source), ("destination", &self.destination)] {
			if url::parse(location, true, false)?.is_bare_scheme() {
				return invalid(format!("The {} needs more than a scheme: {}", role, location));
			}
		}

		if !self.src.exists(&self.source).await? {
			return invalid(format!("The source location {} does not exist", self.source));
		}

		let source_is_dir = self.src.is_dir(&self.source).await?;
		if source_is_dir && url::is_path_prefix(&self.source, &self.destination) {
			return invalid(format!(
				"The destination {} lies within the source directory {}",
				self.destination, self.source
			));
		}

		let (src_caps, dst_caps) = (self.src.capabilities(), self.dst.capabilities());
		if !src_caps.readable {
			return invalid(format!("The source protocol {} is write-only", src_caps.name()));
		}
		if !dst_caps.writable {
			return invalid(format!("The destination protocol {} is read-only", dst_caps.name()));
		}
		if self.config.delete && !dst_caps.removable {
			return invalid(format!(
				"The destination protocol {} does not support file deletion",
				dst_caps.name()
			));
		}

		let unreadable: AttrSet = self.requested.difference(&src_caps.gettable).cloned().collect();
		if !unreadable.is_empty() {
			let names = join_names(&unreadable);
			return invalid(format!("Requested attributes cannot be read: {}", names));
		}
		let unsettable: AttrSet = self.requested.difference(&dst_caps.settable).cloned().collect();
		if !unsettable.is_empty() {
			let names = join_names(&unsettable);
			return invalid(format!("Requested attributes cannot be set: {}", names));
		}

		Ok(())
	}

	async fn disconnect(&self) -> Result<(), SyncError> {
		let source = self.src.disconnect().await;
		let destination = self.dst.disconnect().await;

		if let Err(ref e) = source {
			error!("Disconnecting from {} failed: {}", self.source, e);
		}
		if let Err(ref e) = destination {
			error!("Disconnecting from {} failed: {}", self.destination, e);
		}
		source.and(destination).map_err(SyncError::from)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::attributes::attr_set;
	use crate::transport::{MemoryNamespace, MemoryTransport};
	use std::sync::Arc;

	fn engine(config: Config) -> SyncEngine {
		SyncEngine::new(config, TransportRegistry::with_defaults()).unwrap()
	}

	#[test]
	fn test_evaluation_set_is_common_subset() {
		let engine = engine(Config::default());
		let src: SharedTransport = Arc::new(MemoryTransport::new());
		let dst: SharedTransport = Arc::new(crate::transport::FileTransport::new());
		let run = Reconciler::new(
			&engine,
			"mem:///a".to_string(),
			"file:///b".to_string(),
			src.clone(),
			dst.clone(),
		);

		assert_eq!(run.max_evaluation, attr_set(["size", "mtime"]));
		assert!(run.max_evaluation.is_subset(&src.capabilities().evaluable));
		assert!(run.max_evaluation.is_subset(&dst.capabilities().evaluable));
		assert_eq!(run.max_attributes, attr_set(["size", "mtime"]));
	}

	#[tokio::test]
	async fn test_unknown_scheme_is_fatal() {
		let err = engine(Config::default()).sync("gopher://host/a", "mem:///b").await.unwrap_err();
		assert!(matches!(err, SyncError::UnsupportedProtocol { .. }));
	}

	#[tokio::test]
	async fn test_bare_scheme_rejected() {
		let err = engine(Config::default()).sync("mem://", "mem:///b").await.unwrap_err();
		assert!(matches!(err, SyncError::Validation { .. }));
	}

	#[tokio::test]
	async fn test_invalid_filter_rejected() {
		let config = Config { exclude_files: Some("[".to_string()), ..Config::default() };
		let err = SyncEngine::new(config, TransportRegistry::with_defaults()).err().unwrap();
		assert!(matches!(err, SyncError::InvalidConfig { .. }));
	}

	#[tokio::test]
	async fn test_requested_attribute_must_be_settable() {
		let mut namespace = MemoryNamespace::new();
		namespace.put_file("/a", "x", 1);
		let mut registry = TransportRegistry::new();
		registry.register(MemoryTransport::capabilities_descriptor(), move || {
			Arc::new(MemoryTransport::with_namespace(namespace.clone())) as SharedTransport
		});

		let config = Config { attributes: vec!["perms".to_string()], ..Config::default() };
		let engine = SyncEngine::new(config, registry).unwrap();
		match engine.sync("mem:///a", "mem:///b").await {
			Err(SyncError::Validation { message }) => assert!(message.contains("perms")),
			other => panic!("unexpected: {:?}", other),
		}
	}
}

// vim: ts=4
