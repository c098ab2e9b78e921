//! Storage transport interface
//!
//! Every backend (local filesystem, in-memory store, remote servers) implements
//! the [`Transport`] trait and declares what it can do through a
//! [`Capabilities`] descriptor. The reconciliation engine depends only on this
//! trait and on the descriptors, never on a concrete backend.

pub mod file;
pub mod memory;
pub mod registry;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::attributes::{AttrMap, AttrName, AttrSet};
use crate::error::TransportError;

pub use file::FileTransport;
pub use memory::{MemoryNamespace, MemoryTransport};
pub use registry::{TransportFactory, TransportRegistry};

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport shared between the engine and the entities it creates
pub type SharedTransport = Arc<dyn Transport>;

/// Backend-specific options (credentials, storage locations), keyed by option name
pub type TransportOptions = BTreeMap<String, String>;

/// Default chunk size for streaming copies
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 15;

/// What a transport type supports
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
	/// URL schemes served
	pub schemes: Vec<&'static str>,

	/// Whether the first segment after `scheme://` is a hostname
	pub uses_hostname: bool,

	/// Attributes a directory listing yields for free
	pub listable: AttrSet,

	/// Attributes `getattr` can retrieve
	pub gettable: AttrSet,

	/// Attributes `setattr` can change
	pub settable: AttrSet,

	/// Attributes usable to decide whether two files differ
	pub evaluable: AttrSet,

	/// Preferred chunk size for read/write
	pub buffer_size: usize,

	/// `open(.., Read)` and `read` are implemented
	pub readable: bool,

	/// `open(.., Write)` and `write` are implemented
	pub writable: bool,

	/// `remove` and `rmdir` are implemented
	pub removable: bool,

	/// Option names accepted by `connect`, with a short description
	pub options: Vec<(&'static str, &'static str)>,
}

impl Capabilities {
	/// Primary scheme, used in log messages
	pub fn name(&self) -> &'static str {
		self.schemes.first().copied().unwrap_or("?")
	}

	pub fn can_get(&self, name: &AttrName) -> bool {
		self.gettable.contains(name)
	}

	pub fn can_set(&self, name: &AttrName) -> bool {
		self.settable.contains(name)
	}

	/// Fail with `AttributeUnavailable` on the first name outside the gettable set
	pub fn check_gettable(&self, url: &str, names: &AttrSet) -> TransportResult<()> {
		match names.iter().find(|name| !self.can_get(name)) {
			Some(name) => Err(TransportError::AttributeUnavailable {
				url: url.to_string(),
				attribute: name.clone(),
			}),
			None => Ok(()),
		}
	}

	/// Keep only the entries `setattr` would honor
	pub fn settable_subset(&self, attributes: &AttrMap) -> AttrMap {
		attributes
			.iter()
			.filter(|(name, value)| self.can_set(name) && value.is_available())
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect()
	}
}

/// Mode for `Transport::open`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
	Read,
	Write,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
	/// Absolute URL of the child
	pub url: String,

	/// Attributes the listing produced without extra calls
	pub attributes: AttrMap,
}

/// Storage backend operations
///
/// Calls are issued one at a time; an instance holds at most one open file.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Static description of this backend
	fn capabilities(&self) -> &Capabilities;

	// === Lifecycle ===

	/// Prepare for a run against `url`
	async fn connect(&self, url: &str, options: &TransportOptions) -> TransportResult<()>;

	/// Tear down whatever `connect` set up
	async fn disconnect(&self) -> TransportResult<()>;

	// === Namespace ===

	async fn exists(&self, url: &str) -> TransportResult<bool>;

	/// False for files and for paths that do not exist
	async fn is_dir(&self, url: &str) -> TransportResult<bool>;

	/// Immediate children of `url`, or None if it is not a directory
	async fn listdir(&self, url: &str) -> TransportResult<Option<Vec<Listing>>>;

	/// Create `url` and any missing parents; an existing directory is not an error
	async fn mkdir(&self, url: &str) -> TransportResult<()>;

	// === Attributes ===

	/// Retrieve at least `names`; a missing object yields `Unavailable` values
	async fn getattr(&self, url: &str, names: &AttrSet) -> TransportResult<AttrMap>;

	/// Best-effort attribute update, unsupported names are ignored
	async fn setattr(&self, url: &str, attributes: &AttrMap) -> TransportResult<()>;

	// === Data ===

	async fn open(&self, _url: &str, _mode: OpenMode) -> TransportResult<()> {
		Err(TransportError::Unsupported { operation: "open" })
	}

	/// Read up to `size` bytes; an empty result means end of file
	async fn read(&self, _size: usize) -> TransportResult<Vec<u8>> {
		Err(TransportError::Unsupported { operation: "read" })
	}

	async fn write(&self, _data: &[u8]) -> TransportResult<()> {
		Err(TransportError::Unsupported { operation: "write" })
	}

	/// Close the open handle; closing with nothing open is a no-op
	async fn close(&self) -> TransportResult<()> {
		Ok(())
	}

	/// Remove a file, returning false if nothing was removed
	async fn remove(&self, _url: &str) -> TransportResult<bool> {
		Err(TransportError::Unsupported { operation: "remove" })
	}

	/// Remove an empty directory, returning false if nothing was removed
	async fn rmdir(&self, _url: &str) -> TransportResult<bool> {
		Err(TransportError::Unsupported { operation: "rmdir" })
	}
}


// vim: ts=4
