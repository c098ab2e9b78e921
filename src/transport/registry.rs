//! Scheme to transport registry
//!
//! Built once at startup and read-only afterwards. Each backend registers its
//! descriptor and a factory under every scheme it serves.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{Capabilities, FileTransport, MemoryTransport, SharedTransport};
use crate::error::SyncError;
use crate::logging::*;

/// Creates a fresh transport instance for one run
pub type TransportFactory = Arc<dyn Fn() -> SharedTransport + Send + Sync>;

#[derive(Clone)]
struct Registration {
	capabilities: Capabilities,
	factory: TransportFactory,
}

/// Maps URL schemes to transport factories
#[derive(Clone, Default)]
pub struct TransportRegistry {
	by_scheme: BTreeMap<String, Registration>,
}

impl TransportRegistry {
	/// Create an empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding the built-in `file` and `mem` backends
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();
		registry.register(FileTransport::capabilities_descriptor(), || {
			Arc::new(FileTransport::new()) as SharedTransport
		});
		registry.register(MemoryTransport::capabilities_descriptor(), || {
			Arc::new(MemoryTransport::new()) as SharedTransport
		});
		registry
	}

	/// Register a backend under every scheme in `capabilities.schemes`
	///
	/// A scheme that is already taken keeps its first registrant.
	pub fn register<F>(&mut self, capabilities: Capabilities, factory: F)
	where
		F: Fn() -> SharedTransport + Send + Sync + 'static,
	{
		let factory: TransportFactory = Arc::new(factory);

		for scheme in &capabilities.schemes {
			if self.by_scheme.contains_key(*scheme) {
				warn!("Protocol {} already handled, ignoring", scheme);
				continue;
			}
			debug!("Registered transport for {}://", scheme);
			self.by_scheme.insert(
				scheme.to_string(),
				Registration { capabilities: capabilities.clone(), factory: factory.clone() },
			);
		}
	}

	/// Instantiate the transport serving `scheme`
	pub fn resolve(&self, scheme: &str) -> Result<SharedTransport, SyncError> {
		self.by_scheme
			.get(scheme)
			.map(|registration| (registration.factory)())
			.ok_or_else(|| SyncError::UnsupportedProtocol { scheme: scheme.to_string() })
	}

	/// Descriptor registered for `scheme`
	pub fn capabilities(&self, scheme: &str) -> Option<&Capabilities> {
		self.by_scheme.get(scheme).map(|registration| &registration.capabilities)
	}

	/// Registered schemes in sorted order
	pub fn schemes(&self) -> impl Iterator<Item = &str> {
		self.by_scheme.keys().map(String::as_str)
	}
}

impl fmt::Debug for TransportRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransportRegistry").field("schemes", &self.by_scheme.keys()).finish()
	}
}


// vim: ts=4
