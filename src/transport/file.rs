//! Local filesystem transport (`file://`)
//!
//! `file://` URLs carry no hostname: `file:///abs/path` is absolute and
//! `file://rel/path` is relative to the working directory.

use async_trait::async_trait;
use filetime::FileTime;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs as afs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{
	Capabilities, Listing, OpenMode, Transport, TransportOptions, TransportResult,
	DEFAULT_BUFFER_SIZE,
};
use crate::attributes::{attr_set, AttrMap, AttrName, AttrSet, AttrValue};
use crate::error::TransportError;
use crate::logging::*;
use crate::url;

struct OpenFile {
	url: String,
	file: afs::File,
}

/// Plain file access
pub struct FileTransport {
	capabilities: Capabilities,
	handle: Mutex<Option<OpenFile>>,
}

impl FileTransport {
	pub fn new() -> Self {
		Self { capabilities: Self::capabilities_descriptor(), handle: Mutex::new(None) }
	}

	pub fn capabilities_descriptor() -> Capabilities {
		#[cfg(unix)]
		let (gettable, settable) = (
			attr_set([
				AttrName::Size,
				AttrName::Mtime,
				AttrName::Atime,
				AttrName::Perms,
				AttrName::Owner,
				AttrName::Group,
			]),
			attr_set([
				AttrName::Mtime,
				AttrName::Atime,
				AttrName::Perms,
				AttrName::Owner,
				AttrName::Group,
			]),
		);
		#[cfg(not(unix))]
		let (gettable, settable) = (
			attr_set([AttrName::Size, AttrName::Mtime, AttrName::Atime, AttrName::Perms]),
			attr_set([AttrName::Mtime, AttrName::Atime, AttrName::Perms]),
		);

		Capabilities {
			schemes: vec!["file"],
			uses_hostname: false,
			listable: AttrSet::new(),
			gettable,
			settable,
			evaluable: attr_set([AttrName::Size, AttrName::Mtime]),
			buffer_size: DEFAULT_BUFFER_SIZE,
			readable: true,
			writable: true,
			removable: true,
			options: vec![],
		}
	}

	fn local_path(url: &str) -> TransportResult<PathBuf> {
		let parts = url::parse(url, false, false)?;
		if parts.path.is_empty() {
			Ok(PathBuf::from("."))
		} else {
			Ok(PathBuf::from(url::decode_path(&parts.path)))
		}
	}
}

impl Default for FileTransport {
	fn default() -> Self {
		Self::new()
	}
}

fn metadata_attributes(meta: &std::fs::Metadata) -> AttrMap {
	let mut attributes = AttrMap::new();
	attributes.insert(AttrName::Size, AttrValue::Int(meta.len() as i64));
	attributes.insert(
		AttrName::Mtime,
		AttrValue::Int(FileTime::from_last_modification_time(meta).unix_seconds()),
	);
	attributes.insert(
		AttrName::Atime,
		AttrValue::Int(FileTime::from_last_access_time(meta).unix_seconds()),
	);

	#[cfg(unix)]
	{
		use std::os::unix::fs::MetadataExt;
		attributes.insert(AttrName::Perms, AttrValue::Int(i64::from(meta.mode() & 0o7777)));
		attributes.insert(AttrName::Owner, AttrValue::Int(i64::from(meta.uid())));
		attributes.insert(AttrName::Group, AttrValue::Int(i64::from(meta.gid())));
	}
	#[cfg(not(unix))]
	{
		let mode = if meta.permissions().readonly() { 0o444 } else { 0o666 };
		attributes.insert(AttrName::Perms, AttrValue::Int(mode));
	}

	attributes
}

#[async_trait]
impl Transport for FileTransport {
	fn capabilities(&self) -> &Capabilities {
		&self.capabilities
	}

	async fn connect(&self, url: &str, _options: &TransportOptions) -> TransportResult<()> {
		debug!("Local filesystem needs no connection ({})", url);
		Ok(())
	}

	async fn disconnect(&self) -> TransportResult<()> {
		self.close().await
	}

	async fn exists(&self, url: &str) -> TransportResult<bool> {
		Ok(afs::metadata(Self::local_path(url)?).await.is_ok())
	}

	async fn is_dir(&self, url: &str) -> TransportResult<bool> {
		Ok(afs::metadata(Self::local_path(url)?).await.map(|m| m.is_dir()).unwrap_or(false))
	}

	async fn listdir(&self, url: &str) -> TransportResult<Option<Vec<Listing>>> {
		let path = Self::local_path(url)?;
		let mut entries = match afs::read_dir(&path).await {
			Ok(entries) => entries,
			Err(e) => {
				debug!("{} is not a listable directory: {}", url, e);
				return Ok(None);
			}
		};

		let mut listing = Vec::new();
		while let Some(entry) =
			entries.next_entry().await.map_err(|e| TransportError::io(url, e))?
		{
			let name = entry.file_name().to_string_lossy().into_owned();
			let is_dir = match entry.file_type().await {
				// Symlinks are followed, like stat()
				Ok(ft) if ft.is_symlink() => {
					afs::metadata(entry.path()).await.map(|m| m.is_dir()).unwrap_or(false)
				}
				Ok(ft) => ft.is_dir(),
				Err(_) => false,
			};

			let mut attributes = AttrMap::new();
			attributes.insert(AttrName::IsDir, AttrValue::Bool(is_dir));
			listing.push(Listing { url: url::child(url, &name), attributes });
		}

		Ok(Some(listing))
	}

	async fn mkdir(&self, url: &str) -> TransportResult<()> {
		afs::create_dir_all(Self::local_path(url)?).await.map_err(|e| TransportError::io(url, e))
	}

	async fn getattr(&self, url: &str, names: &AttrSet) -> TransportResult<AttrMap> {
		self.capabilities.check_gettable(url, names)?;

		match afs::metadata(Self::local_path(url)?).await {
			Ok(meta) => Ok(metadata_attributes(&meta)),
			Err(_) => Ok(self
				.capabilities
				.gettable
				.iter()
				.map(|name| (name.clone(), AttrValue::Unavailable))
				.collect()),
		}
	}

	async fn setattr(&self, url: &str, attributes: &AttrMap) -> TransportResult<()> {
		let path = Self::local_path(url)?;
		let attributes = self.capabilities.settable_subset(attributes);
		let time = |name: &AttrName| {
			attributes.get(name).and_then(AttrValue::as_i64).map(|t| FileTime::from_unix_time(t, 0))
		};

		let times = match (time(&AttrName::Atime), time(&AttrName::Mtime)) {
			(Some(atime), Some(mtime)) => filetime::set_file_times(&path, atime, mtime),
			(Some(atime), None) => filetime::set_file_atime(&path, atime),
			(None, Some(mtime)) => filetime::set_file_mtime(&path, mtime),
			(None, None) => Ok(()),
		};
		if let Err(e) = times {
			warn!("Could not set atime/mtime on {}: {}", url, e);
		}

		if let Some(mode) = attributes.get(&AttrName::Perms).and_then(AttrValue::as_i64) {
			#[cfg(unix)]
			let permissions = {
				use std::os::unix::fs::PermissionsExt;
				std::fs::Permissions::from_mode(mode as u32)
			};
			#[cfg(not(unix))]
			let permissions = {
				let mut permissions = afs::metadata(&path)
					.await
					.map_err(|e| TransportError::io(url, e))?
					.permissions();
				permissions.set_readonly(mode & 0o200 == 0);
				permissions
			};
			if let Err(e) = afs::set_permissions(&path, permissions).await {
				warn!("Could not set perms on {}: {}", url, e);
			}
		}

		#[cfg(unix)]
		{
			let id = |name: &AttrName| {
				attributes.get(name).and_then(AttrValue::as_i64).map(|v| v as u32)
			};
			let (owner, group) = (id(&AttrName::Owner), id(&AttrName::Group));
			if owner.is_some() || group.is_some() {
				if let Err(e) = std::os::unix::fs::chown(&path, owner, group) {
					warn!("Could not set owner/group on {}: {}", url, e);
				}
			}
		}

		Ok(())
	}

	async fn open(&self, url: &str, mode: OpenMode) -> TransportResult<()> {
		let mut handle = self.handle.lock().await;
		if handle.is_some() {
			return Err(TransportError::Busy { url: url.to_string() });
		}

		let path = Self::local_path(url)?;
		let file = match mode {
			OpenMode::Read => afs::File::open(&path).await,
			OpenMode::Write => afs::File::create(&path).await,
		}
		.map_err(|e| TransportError::io(url, e))?;

		*handle = Some(OpenFile { url: url.to_string(), file });
		Ok(())
	}

	async fn read(&self, size: usize) -> TransportResult<Vec<u8>> {
		let mut handle = self.handle.lock().await;
		let open = handle.as_mut().ok_or(TransportError::NotOpen)?;

		let mut buf = vec![0u8; size];
		let n = open.file.read(&mut buf).await.map_err(|e| TransportError::io(&open.url, e))?;
		buf.truncate(n);
		Ok(buf)
	}

	async fn write(&self, data: &[u8]) -> TransportResult<()> {
		let mut handle = self.handle.lock().await;
		let open = handle.as_mut().ok_or(TransportError::NotOpen)?;
		open.file.write_all(data).await.map_err(|e| TransportError::io(&open.url, e))
	}

	async fn close(&self) -> TransportResult<()> {
		if let Some(mut open) = self.handle.lock().await.take() {
			open.file.flush().await.map_err(|e| TransportError::io(&open.url, e))?;
		}
		Ok(())
	}

	async fn remove(&self, url: &str) -> TransportResult<bool> {
		match afs::remove_file(Self::local_path(url)?).await {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
			Err(e) => {
				debug!("Could not remove {}: {}", url, e);
				Ok(false)
			}
		}
	}

	async fn rmdir(&self, url: &str) -> TransportResult<bool> {
		match afs::remove_dir(Self::local_path(url)?).await {
			Ok(()) => Ok(true),
			Err(e) => {
				debug!("Could not remove directory {}: {}", url, e);
				Ok(false)
			}
		}
	}
}


// vim: ts=4
