//! # polysync - Multiprotocol One-Way Synchronizer
//!
//! polysync copies a source tree onto a destination tree, rsync style, where
//! either side may live on any registered storage backend. One reconciliation
//! algorithm serves every backend pair; what gets compared and carried over is
//! negotiated from each backend's declared capabilities.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use polysync::{Config, SyncEngine, TransportRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config { recursive: true, delete: true, ..Config::default() };
//!     let engine = SyncEngine::new(config, TransportRegistry::with_defaults())?;
//!     let report = engine.sync("./photos", "mem://backup/photos").await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Backends
//!
//! Implement [`Transport`], describe it with a [`Capabilities`] value and
//! register a factory:
//!
//! ```rust,ignore
//! let mut registry = TransportRegistry::with_defaults();
//! registry.register(MyTransport::capabilities_descriptor(), || {
//!     Arc::new(MyTransport::new()) as SharedTransport
//! });
//! ```

pub mod attributes;
pub mod callbacks;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod filter;
pub mod logging;
pub mod transport;
pub mod url;

// Re-export commonly used types
pub use attributes::{AttrMap, AttrName, AttrSet, AttrValue};
pub use callbacks::{CallbackBuilder, NoCallbacks, SkipReason, SyncCallbacks};
pub use config::Config;
pub use engine::{SyncEngine, SyncReport};
pub use entity::FileEntity;
pub use error::{FilterError, SyncError, TransportError, UrlError};
pub use filter::Filter;
pub use transport::{
	Capabilities, FileTransport, Listing, MemoryNamespace, MemoryTransport, OpenMode,
	SharedTransport, Transport, TransportOptions, TransportRegistry,
};

// vim: ts=4
