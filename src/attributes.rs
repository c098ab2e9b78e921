//! File attribute names and values
//!
//! Backends agree on a small vocabulary of attribute names. Anything a
//! backend exposes beyond that travels as `AttrName::Other`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Name of a file attribute
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AttrName {
	/// Size in bytes
	Size,
	/// Modification time, whole seconds since the epoch
	Mtime,
	/// Access time, whole seconds since the epoch
	Atime,
	/// Permission bits
	Perms,
	/// Owning user id
	Owner,
	/// Owning group id
	Group,
	/// Directory flag; answered by `is_dir`, never by `getattr`
	IsDir,
	/// Backend-specific extension
	Other(String),
}

impl AttrName {
	pub fn as_str(&self) -> &str {
		match self {
			AttrName::Size => "size",
			AttrName::Mtime => "mtime",
			AttrName::Atime => "atime",
			AttrName::Perms => "perms",
			AttrName::Owner => "owner",
			AttrName::Group => "group",
			AttrName::IsDir => "isDir",
			AttrName::Other(name) => name,
		}
	}
}

impl fmt::Display for AttrName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl From<&str> for AttrName {
	fn from(name: &str) -> Self {
		match name {
			"size" => AttrName::Size,
			"mtime" => AttrName::Mtime,
			"atime" => AttrName::Atime,
			"perms" => AttrName::Perms,
			"owner" => AttrName::Owner,
			"group" => AttrName::Group,
			"isDir" => AttrName::IsDir,
			other => AttrName::Other(other.to_string()),
		}
	}
}

impl From<String> for AttrName {
	fn from(name: String) -> Self {
		AttrName::from(name.as_str())
	}
}

impl From<AttrName> for String {
	fn from(name: AttrName) -> Self {
		name.as_str().to_string()
	}
}

impl FromStr for AttrName {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(AttrName::from(s))
	}
}

/// Value of a file attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
	Int(i64),
	Bool(bool),
	Text(String),
	/// The object does not exist (or the value cannot be read) on the backend
	Unavailable,
}

impl AttrValue {
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			AttrValue::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			AttrValue::Bool(v) => Some(*v),
			_ => None,
		}
	}

	pub fn is_available(&self) -> bool {
		!matches!(self, AttrValue::Unavailable)
	}
}

impl fmt::Display for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Int(v) => write!(f, "{}", v),
			AttrValue::Bool(v) => write!(f, "{}", v),
			AttrValue::Text(v) => f.write_str(v),
			AttrValue::Unavailable => f.write_str("<unavailable>"),
		}
	}
}

pub type AttrSet = BTreeSet<AttrName>;
pub type AttrMap = BTreeMap<AttrName, AttrValue>;

/// Build an attribute set from names
pub fn attr_set<I, N>(names: I) -> AttrSet
where
	I: IntoIterator<Item = N>,
	N: Into<AttrName>,
{
	names.into_iter().map(Into::into).collect()
}

/// Render a set as "a, b, c" for log messages
pub fn join_names(names: &AttrSet) -> String {
	names.iter().map(AttrName::as_str).collect::<Vec<_>>().join(", ")
}


// vim: ts=4
