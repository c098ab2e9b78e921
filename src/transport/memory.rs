//! In-memory transport (`mem://`)
//!
//! The host part of a `mem://` URL names the namespace. `mem:///path` works
//! on a transient namespace that lives as long as the transport instance;
//! `mem://name/path` loads `<snapshotDir>/name` on connect and writes it
//! back on disconnect if anything changed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs as afs;
use tokio::sync::Mutex;

use super::{
	Capabilities, Listing, OpenMode, Transport, TransportOptions, TransportResult,
	DEFAULT_BUFFER_SIZE,
};
use crate::attributes::{attr_set, AttrMap, AttrName, AttrSet, AttrValue};
use crate::error::TransportError;
use crate::logging::*;
use crate::url;

const SNAPSHOT_DIR_OPTION: &str = "snapshotDir";

fn now() -> i64 {
	SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Canonical namespace key: leading slash, no trailing slash, root is "/"
fn normalize_key(path: &str) -> String {
	let trimmed = path.trim_matches('/');
	if trimmed.is_empty() {
		"/".to_string()
	} else {
		format!("/{}", trimmed)
	}
}

fn parent_key(key: &str) -> Option<String> {
	if key == "/" {
		return None;
	}
	match key.rsplit_once('/') {
		Some(("", _)) => Some("/".to_string()),
		Some((head, _)) => Some(head.to_string()),
		None => Some("/".to_string()),
	}
}

mod base64_data {
	use base64::{engine::general_purpose::STANDARD, Engine as _};
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&STANDARD.encode(data))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let text = String::deserialize(deserializer)?;
		STANDARD.decode(text).map_err(serde::de::Error::custom)
	}
}

/// One object in a memory namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MemoryNode {
	Directory {
		mtime: i64,
	},
	File {
		#[serde(with = "base64_data")]
		data: Vec<u8>,
		mtime: i64,
	},
}

impl MemoryNode {
	pub fn is_dir(&self) -> bool {
		matches!(self, MemoryNode::Directory { .. })
	}

	pub fn mtime(&self) -> i64 {
		match self {
			MemoryNode::Directory { mtime } | MemoryNode::File { mtime, .. } => *mtime,
		}
	}

	pub fn size(&self) -> i64 {
		match self {
			MemoryNode::Directory { .. } => 0,
			MemoryNode::File { data, .. } => data.len() as i64,
		}
	}

	fn attributes(&self) -> AttrMap {
		let mut attributes = AttrMap::new();
		attributes.insert(AttrName::Size, AttrValue::Int(self.size()));
		attributes.insert(AttrName::Mtime, AttrValue::Int(self.mtime()));
		attributes
	}
}

/// Flat path to node map; the root directory always exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryNamespace {
	nodes: BTreeMap<String, MemoryNode>,
}

impl Default for MemoryNamespace {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryNamespace {
	pub fn new() -> Self {
		let mut nodes = BTreeMap::new();
		nodes.insert("/".to_string(), MemoryNode::Directory { mtime: 0 });
		Self { nodes }
	}

	/// Create a directory and any missing ancestors
	pub fn put_dir(&mut self, path: &str, mtime: i64) {
		let key = normalize_key(path);
		self.ensure_ancestors(&key, mtime);
		self.nodes.insert(key, MemoryNode::Directory { mtime });
	}

	/// Create or replace a file, creating missing ancestors
	pub fn put_file(&mut self, path: &str, data: impl Into<Vec<u8>>, mtime: i64) {
		let key = normalize_key(path);
		self.ensure_ancestors(&key, mtime);
		self.nodes.insert(key, MemoryNode::File { data: data.into(), mtime });
	}

	fn ensure_ancestors(&mut self, key: &str, mtime: i64) {
		let mut ancestor = parent_key(key);
		while let Some(current) = ancestor {
			ancestor = parent_key(&current);
			self.nodes.entry(current).or_insert(MemoryNode::Directory { mtime });
		}
	}

	pub fn get(&self, path: &str) -> Option<&MemoryNode> {
		self.nodes.get(&normalize_key(path))
	}

	/// Content of the file at `path`
	pub fn file_data(&self, path: &str) -> Option<&[u8]> {
		match self.get(path) {
			Some(MemoryNode::File { data, .. }) => Some(data),
			_ => None,
		}
	}

	pub fn remove(&mut self, path: &str) -> Option<MemoryNode> {
		let key = normalize_key(path);
		if key == "/" {
			return None;
		}
		self.nodes.remove(&key)
	}

	/// All keys in sorted order
	pub fn paths(&self) -> impl Iterator<Item = &str> {
		self.nodes.keys().map(String::as_str)
	}

	/// Immediate children of the directory at `path`, by name
	pub fn children(&self, path: &str) -> Vec<(&str, &MemoryNode)> {
		let key = normalize_key(path);
		let prefix = if key == "/" { key } else { format!("{}/", key) };

		self.nodes
			.range(prefix.clone()..)
			.take_while(|(child, _)| child.starts_with(&prefix))
			.filter_map(|(child, node)| {
				let name = &child[prefix.len()..];
				(!name.is_empty() && !name.contains('/')).then_some((name, node))
			})
			.collect()
	}

	/// Read a snapshot; a missing file is an empty namespace
	pub async fn load(path: &Path) -> TransportResult<Self> {
		let raw = match afs::read(path).await {
			Ok(raw) => raw,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				debug!("No snapshot at {}, starting empty", path.display());
				return Ok(Self::new());
			}
			Err(e) => return Err(TransportError::io(&path.display().to_string(), e)),
		};

		let mut namespace: Self =
			serde_json::from_slice(&raw).map_err(|e| TransportError::Storage {
				message: format!("Corrupt snapshot {}: {}", path.display(), e),
			})?;
		namespace.nodes.entry("/".to_string()).or_insert(MemoryNode::Directory { mtime: 0 });
		Ok(namespace)
	}

	/// Write a snapshot through a temporary file and rename
	pub async fn save(&self, path: &Path) -> TransportResult<()> {
		let display = path.display().to_string();
		let json = serde_json::to_vec_pretty(self).map_err(|e| TransportError::Storage {
			message: format!("Cannot serialize snapshot {}: {}", display, e),
		})?;

		if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			afs::create_dir_all(dir).await.map_err(|e| TransportError::io(&display, e))?;
		}

		let mut temp = path.as_os_str().to_owned();
		temp.push(".tmp");
		let temp = PathBuf::from(temp);
		afs::write(&temp, json).await.map_err(|e| TransportError::io(&display, e))?;
		afs::rename(&temp, path).await.map_err(|e| TransportError::io(&display, e))
	}
}

struct MemoryState {
	namespace: MemoryNamespace,
	snapshot: Option<PathBuf>,
	dirty: bool,
}

enum MemoryHandle {
	Read { data: Vec<u8>, offset: usize },
	Write { key: String },
}

/// Namespace held in process memory, optionally persisted as a snapshot
pub struct MemoryTransport {
	capabilities: Capabilities,
	state: Mutex<MemoryState>,
	handle: Mutex<Option<MemoryHandle>>,
}

impl MemoryTransport {
	pub fn new() -> Self {
		Self::with_namespace(MemoryNamespace::new())
	}

	/// Transport over a prepared namespace
	pub fn with_namespace(namespace: MemoryNamespace) -> Self {
		Self {
			capabilities: Self::capabilities_descriptor(),
			state: Mutex::new(MemoryState { namespace, snapshot: None, dirty: false }),
			handle: Mutex::new(None),
		}
	}

	pub fn capabilities_descriptor() -> Capabilities {
		let attributes = attr_set([AttrName::Size, AttrName::Mtime]);
		Capabilities {
			schemes: vec!["mem"],
			uses_hostname: true,
			listable: attributes.clone(),
			gettable: attributes.clone(),
			settable: attr_set([AttrName::Mtime]),
			evaluable: attributes,
			buffer_size: DEFAULT_BUFFER_SIZE,
			readable: true,
			writable: true,
			removable: true,
			options: vec![(
				SNAPSHOT_DIR_OPTION,
				"Directory holding namespace snapshots (default: working directory)",
			)],
		}
	}

	/// Copy of the current namespace
	pub async fn namespace(&self) -> MemoryNamespace {
		self.state.lock().await.namespace.clone()
	}

	fn key(url: &str) -> TransportResult<String> {
		Ok(normalize_key(&url::decode_path(&url::parse(url, true, false)?.path)))
	}
}

impl Default for MemoryTransport {
	fn default() -> Self {
		Self::new()
	}
}

fn not_found(url: &str, what: &str) -> TransportError {
	TransportError::io(url, io::Error::new(io::ErrorKind::NotFound, what.to_string()))
}

#[async_trait]
impl Transport for MemoryTransport {
	fn capabilities(&self) -> &Capabilities {
		&self.capabilities
	}

	async fn connect(&self, url: &str, options: &TransportOptions) -> TransportResult<()> {
		let host = url::parse(url, true, false)?.hostname;
		if host.is_empty() {
			debug!("Using transient memory namespace for {}", url);
			return Ok(());
		}

		let dir = options.get(SNAPSHOT_DIR_OPTION).map(String::as_str).unwrap_or(".");
		let path = Path::new(dir).join(&host);
		let namespace = MemoryNamespace::load(&path).await?;
		info!("Loaded memory namespace {} ({} entries)", path.display(), namespace.nodes.len());

		let mut state = self.state.lock().await;
		state.namespace = namespace;
		state.snapshot = Some(path);
		state.dirty = false;
		Ok(())
	}

	async fn disconnect(&self) -> TransportResult<()> {
		self.close().await?;

		let mut state = self.state.lock().await;
		if let (Some(path), true) = (state.snapshot.clone(), state.dirty) {
			state.namespace.save(&path).await?;
			state.dirty = false;
			debug!("Saved memory namespace {}", path.display());
		}
		Ok(())
	}

	async fn exists(&self, url: &str) -> TransportResult<bool> {
		let key = Self::key(url)?;
		Ok(self.state.lock().await.namespace.get(&key).is_some())
	}

	async fn is_dir(&self, url: &str) -> TransportResult<bool> {
		let key = Self::key(url)?;
		Ok(self.state.lock().await.namespace.get(&key).is_some_and(MemoryNode::is_dir))
	}

	async fn listdir(&self, url: &str) -> TransportResult<Option<Vec<Listing>>> {
		let key = Self::key(url)?;
		let state = self.state.lock().await;
		if !state.namespace.get(&key).is_some_and(MemoryNode::is_dir) {
			return Ok(None);
		}

		let listing = state
			.namespace
			.children(&key)
			.into_iter()
			.map(|(name, node)| {
				let mut attributes = node.attributes();
				attributes.insert(AttrName::IsDir, AttrValue::Bool(node.is_dir()));
				Listing { url: url::child(url, name), attributes }
			})
			.collect();
		Ok(Some(listing))
	}

	async fn mkdir(&self, url: &str) -> TransportResult<()> {
		let key = Self::key(url)?;
		let mut state = self.state.lock().await;
		match state.namespace.get(&key) {
			Some(MemoryNode::Directory { .. }) => Ok(()),
			Some(MemoryNode::File { .. }) => Err(TransportError::io(
				url,
				io::Error::new(io::ErrorKind::AlreadyExists, "a file is in the way"),
			)),
			None => {
				state.namespace.put_dir(&key, now());
				state.dirty = true;
				Ok(())
			}
		}
	}

	async fn getattr(&self, url: &str, names: &AttrSet) -> TransportResult<AttrMap> {
		self.capabilities.check_gettable(url, names)?;

		let key = Self::key(url)?;
		let state = self.state.lock().await;
		Ok(match state.namespace.get(&key) {
			Some(node) => node.attributes(),
			None => self
				.capabilities
				.gettable
				.iter()
				.map(|name| (name.clone(), AttrValue::Unavailable))
				.collect(),
		})
	}

	async fn setattr(&self, url: &str, attributes: &AttrMap) -> TransportResult<()> {
		let key = Self::key(url)?;
		let Some(value) = attributes.get(&AttrName::Mtime).and_then(AttrValue::as_i64) else {
			return Ok(());
		};

		let mut state = self.state.lock().await;
		match state.namespace.nodes.get_mut(&key) {
			Some(MemoryNode::Directory { mtime }) | Some(MemoryNode::File { mtime, .. }) => {
				*mtime = value;
				state.dirty = true;
			}
			None => warn!("Cannot set mtime on {}: no such object", url),
		}
		Ok(())
	}

	async fn open(&self, url: &str, mode: OpenMode) -> TransportResult<()> {
		let mut handle = self.handle.lock().await;
		if handle.is_some() {
			return Err(TransportError::Busy { url: url.to_string() });
		}

		let key = Self::key(url)?;
		let mut state = self.state.lock().await;
		*handle = Some(match mode {
			OpenMode::Read => match state.namespace.get(&key) {
				Some(MemoryNode::File { data, .. }) => {
					MemoryHandle::Read { data: data.clone(), offset: 0 }
				}
				_ => return Err(not_found(url, "no such file")),
			},
			OpenMode::Write => {
				let parent_is_dir = parent_key(&key)
					.and_then(|parent| state.namespace.get(&parent).map(MemoryNode::is_dir))
					.unwrap_or(false);
				if !parent_is_dir || state.namespace.get(&key).is_some_and(MemoryNode::is_dir) {
					return Err(not_found(url, "no such directory"));
				}
				state.namespace.put_file(&key, Vec::new(), now());
				state.dirty = true;
				MemoryHandle::Write { key }
			}
		});
		Ok(())
	}

	async fn read(&self, size: usize) -> TransportResult<Vec<u8>> {
		let mut handle = self.handle.lock().await;
		match handle.as_mut() {
			Some(MemoryHandle::Read { data, offset }) => {
				let end = data.len().min(*offset + size);
				let chunk = data[*offset..end].to_vec();
				*offset = end;
				Ok(chunk)
			}
			Some(MemoryHandle::Write { .. }) => {
				Err(TransportError::Unsupported { operation: "read" })
			}
			None => Err(TransportError::NotOpen),
		}
	}

	async fn write(&self, chunk: &[u8]) -> TransportResult<()> {
		let handle = self.handle.lock().await;
		let key = match handle.as_ref() {
			Some(MemoryHandle::Write { key }) => key,
			Some(MemoryHandle::Read { .. }) => {
				return Err(TransportError::Unsupported { operation: "write" })
			}
			None => return Err(TransportError::NotOpen),
		};

		let mut state = self.state.lock().await;
		match state.namespace.nodes.get_mut(key) {
			Some(MemoryNode::File { data, mtime }) => {
				data.extend_from_slice(chunk);
				*mtime = now();
				Ok(())
			}
			_ => Err(not_found(key, "file vanished while open")),
		}
	}

	async fn close(&self) -> TransportResult<()> {
		self.handle.lock().await.take();
		Ok(())
	}

	async fn remove(&self, url: &str) -> TransportResult<bool> {
		let key = Self::key(url)?;
		let mut state = self.state.lock().await;
		if !matches!(state.namespace.get(&key), Some(MemoryNode::File { .. })) {
			return Ok(false);
		}
		state.namespace.remove(&key);
		state.dirty = true;
		Ok(true)
	}

	async fn rmdir(&self, url: &str) -> TransportResult<bool> {
		let key = Self::key(url)?;
		let mut state = self.state.lock().await;
		let removable = key != "/"
			&& state.namespace.get(&key).is_some_and(MemoryNode::is_dir)
			&& state.namespace.children(&key).is_empty();
		if removable {
			state.namespace.remove(&key);
			state.dirty = true;
		}
		Ok(removable)
	}
}


// vim: ts=4
