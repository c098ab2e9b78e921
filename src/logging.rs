//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Copying {} to {}", source, destination);
//! warn!("Could not set perms on {}", url);
//! ```

pub use tracing::{debug, error, info, warn};

/// How chatty the command line host is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
	/// Errors only
	Quiet,
	/// Per-file decisions and the summary
	#[default]
	Normal,
	/// Everything, including attribute negotiation
	Debug,
}

impl Verbosity {
	/// Default filter directive for this verbosity
	pub fn directive(self) -> &'static str {
		match self {
			Verbosity::Quiet => "error",
			Verbosity::Normal => "info",
			Verbosity::Debug => "debug",
		}
	}
}

/// Initialize the tracing subscriber with environment filter support.
///
/// The level follows `verbosity` unless `RUST_LOG` is set:
///
/// ```bash
/// RUST_LOG=debug polysync -r src/ dst/
/// RUST_LOG=polysync::engine=debug polysync -r src/ mem://backup/src/
/// ```
pub fn init_tracing(verbosity: Verbosity) {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.directive())),
		)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}
