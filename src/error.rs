//! Error types for polysync operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::attributes::AttrName;

/// Main error type for a synchronization run
#[derive(Debug)]
pub enum SyncError {
	/// A precondition failed before any transfer took place
	Validation { message: String },

	/// No transport is registered for the scheme
	UnsupportedProtocol { scheme: String },

	/// Failed to connect to a location
	ConnectionFailed { location: String, source: TransportError },

	/// Invalid configuration
	InvalidConfig { message: String },

	/// URL could not be parsed or spliced
	Url(UrlError),

	/// Transport error (nested)
	Transport(TransportError),

	/// I/O error outside of any transport
	Io(io::Error),
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Validation { message } => write!(f, "Validation failed: {}", message),
			SyncError::UnsupportedProtocol { scheme } => {
				write!(f, "Protocol not supported: {}", scheme)
			}
			SyncError::ConnectionFailed { location, source } => {
				write!(f, "Connection to {} failed: {}", location, source)
			}
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::Url(e) => write!(f, "URL error: {}", e),
			SyncError::Transport(e) => write!(f, "Transport error: {}", e),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::ConnectionFailed { source, .. } => Some(source),
			SyncError::Url(e) => Some(e),
			SyncError::Transport(e) => Some(e),
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<UrlError> for SyncError {
	fn from(e: UrlError) -> Self {
		SyncError::Url(e)
	}
}

impl From<TransportError> for SyncError {
	fn from(e: TransportError) -> Self {
		SyncError::Transport(e)
	}
}

impl From<FilterError> for SyncError {
	fn from(e: FilterError) -> Self {
		SyncError::InvalidConfig { message: e.to_string() }
	}
}

/// Errors raised by a transport backend
#[derive(Debug)]
pub enum TransportError {
	/// Underlying I/O failed on a URL
	Io { url: String, source: io::Error },

	/// A handle is already open on this transport instance
	Busy { url: String },

	/// read/write/close issued without an open handle
	NotOpen,

	/// Attribute requested that the transport cannot supply
	AttributeUnavailable { url: String, attribute: AttrName },

	/// Operation the backend does not implement
	Unsupported { operation: &'static str },

	/// Backend state (snapshot, session) could not be loaded or stored
	Storage { message: String },

	/// URL handed to the transport could not be parsed
	Url(UrlError),
}

impl TransportError {
	pub fn io(url: &str, source: io::Error) -> Self {
		TransportError::Io { url: url.to_string(), source }
	}
}

impl fmt::Display for TransportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransportError::Io { url, source } => write!(f, "{}: {}", url, source),
			TransportError::Busy { url } => {
				write!(f, "Cannot open {}: another file is already open", url)
			}
			TransportError::NotOpen => write!(f, "No file is open"),
			TransportError::AttributeUnavailable { url, attribute } => {
				write!(f, "Attribute {} not retrievable for {}", attribute, url)
			}
			TransportError::Unsupported { operation } => {
				write!(f, "Operation not supported by this transport: {}", operation)
			}
			TransportError::Storage { message } => write!(f, "Storage error: {}", message),
			TransportError::Url(e) => write!(f, "{}", e),
		}
	}
}

impl Error for TransportError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			TransportError::Io { source, .. } => Some(source),
			TransportError::Url(e) => Some(e),
			_ => None,
		}
	}
}

impl From<UrlError> for TransportError {
	fn from(e: UrlError) -> Self {
		TransportError::Url(e)
	}
}

/// URL model errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
	/// Input does not follow the URL grammar
	Malformed { url: String, reason: String },

	/// Splice called with a full URL outside its base
	NotWithinBase { base: String, full: String },
}

impl fmt::Display for UrlError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UrlError::Malformed { url, reason } => write!(f, "Invalid URL \"{}\": {}", url, reason),
			UrlError::NotWithinBase { base, full } => {
				write!(f, "URL \"{}\" does not begin with base \"{}\"", full, base)
			}
		}
	}
}

impl Error for UrlError {}

/// Filter pattern errors
#[derive(Debug)]
pub enum FilterError {
	/// A pattern failed to compile
	InvalidPattern { option: &'static str, source: regex::Error },
}

impl fmt::Display for FilterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FilterError::InvalidPattern { option, source } => {
				write!(f, "Invalid {} pattern: {}", option, source)
			}
		}
	}
}

impl Error for FilterError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_carries_context() {
		let err = TransportError::AttributeUnavailable {
			url: "mem://store/a".to_string(),
			attribute: AttrName::Owner,
		};
		assert_eq!(err.to_string(), "Attribute owner not retrievable for mem://store/a");

		let err = SyncError::UnsupportedProtocol { scheme: "gopher".to_string() };
		assert_eq!(err.to_string(), "Protocol not supported: gopher");
	}

	#[test]
	fn test_connection_error_source() {
		let err = SyncError::ConnectionFailed {
			location: "mem://snap/".to_string(),
			source: TransportError::Storage { message: "corrupt".to_string() },
		};
		assert!(err.source().is_some());
		assert!(err.to_string().contains("mem://snap/"));
	}
}

// vim: ts=4
