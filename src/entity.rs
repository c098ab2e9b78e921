//! Located objects with a lazily filled attribute cache

use std::fmt;

use crate::attributes::{AttrMap, AttrName, AttrSet, AttrValue};
use crate::error::TransportError;
use crate::transport::{SharedTransport, TransportResult};

/// One object at a URL, backed by the transport that serves it
///
/// Attributes are fetched on first use and never evicted. An entity lives
/// for one traversal visit, so the cache never goes stale in practice.
#[derive(Clone)]
pub struct FileEntity {
	url: String,
	transport: SharedTransport,
	attributes: AttrMap,
}

impl FileEntity {
	pub fn new(url: impl Into<String>, transport: SharedTransport) -> Self {
		Self { url: url.into(), transport, attributes: AttrMap::new() }
	}

	/// Entity seeded with attributes a listing already produced
	pub fn with_attributes(
		url: impl Into<String>,
		transport: SharedTransport,
		attributes: AttrMap,
	) -> Self {
		Self { url: url.into(), transport, attributes }
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn transport(&self) -> &SharedTransport {
		&self.transport
	}

	/// Cached value of `name`, fetching it on a miss
	pub async fn get(&mut self, name: &AttrName) -> TransportResult<AttrValue> {
		if let Some(value) = self.attributes.get(name) {
			return Ok(value.clone());
		}

		if *name == AttrName::IsDir {
			let is_dir = self.transport.is_dir(&self.url).await?;
			self.attributes.insert(AttrName::IsDir, AttrValue::Bool(is_dir));
			return Ok(AttrValue::Bool(is_dir));
		}

		if !self.transport.capabilities().can_get(name) {
			return Err(TransportError::AttributeUnavailable {
				url: self.url.clone(),
				attribute: name.clone(),
			});
		}

		let single: AttrSet = [name.clone()].into_iter().collect();
		let fetched = self.transport.getattr(&self.url, &single).await?;
		self.attributes.extend(fetched);
		Ok(self.attributes.get(name).cloned().unwrap_or(AttrValue::Unavailable))
	}

	/// Directory flag, cached after the first call
	pub async fn is_dir(&mut self) -> TransportResult<bool> {
		Ok(self.get(&AttrName::IsDir).await?.as_bool().unwrap_or(false))
	}

	/// Overwrite a cached value without touching the backend
	pub fn set(&mut self, name: AttrName, value: AttrValue) {
		self.attributes.insert(name, value);
	}

	/// Fetch every name in `names` not cached yet with one `getattr` call
	pub async fn populate(&mut self, names: &AttrSet) -> TransportResult<()> {
		let missing: AttrSet =
			names.iter().filter(|name| !self.attributes.contains_key(*name)).cloned().collect();
		if missing.is_empty() {
			return Ok(());
		}

		self.transport.capabilities().check_gettable(&self.url, &missing)?;
		let fetched = self.transport.getattr(&self.url, &missing).await?;
		self.attributes.extend(fetched);
		Ok(())
	}

	/// Names currently cached
	pub fn attribute_set(&self) -> AttrSet {
		self.attributes.keys().cloned().collect()
	}

	pub fn attributes(&self) -> &AttrMap {
		&self.attributes
	}

	/// Cached value without fetching
	pub fn cached(&self, name: &AttrName) -> Option<&AttrValue> {
		self.attributes.get(name)
	}
}

impl PartialEq for FileEntity {
	fn eq(&self, other: &Self) -> bool {
		self.url == other.url
	}
}

impl Eq for FileEntity {}

impl fmt::Display for FileEntity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.url)
	}
}

impl fmt::Debug for FileEntity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FileEntity")
			.field("url", &self.url)
			.field("transport", &self.transport.capabilities().name())
			.field("attributes", &self.attributes)
			.finish()
	}
}

/// Children of `url` as entities carrying their listing attributes
pub async fn listdir(
	transport: &SharedTransport,
	url: &str,
) -> TransportResult<Option<Vec<FileEntity>>> {
	Ok(transport.listdir(url).await?.map(|listing| {
		listing
			.into_iter()
			.map(|entry| {
				FileEntity::with_attributes(entry.url, transport.clone(), entry.attributes)
			})
			.collect()
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::attributes::attr_set;
	use crate::transport::{MemoryNamespace, MemoryTransport};
	use std::sync::Arc;

	fn transport() -> SharedTransport {
		let mut namespace = MemoryNamespace::new();
		namespace.put_file("/dir/file", "content", 1234);
		Arc::new(MemoryTransport::with_namespace(namespace))
	}

	#[tokio::test]
	async fn test_get_fetches_and_caches() {
		let mut entity = FileEntity::new("mem:///dir/file", transport());
		assert!(entity.attribute_set().is_empty());

		assert_eq!(entity.get(&AttrName::Size).await.unwrap(), AttrValue::Int(7));
		// The whole getattr result is merged
		assert_eq!(entity.cached(&AttrName::Mtime), Some(&AttrValue::Int(1234)));
		assert!(!entity.is_dir().await.unwrap());
		assert!(entity.attribute_set().contains(&AttrName::IsDir));
	}

	#[tokio::test]
	async fn test_get_ungettable() {
		let mut entity = FileEntity::new("mem:///dir/file", transport());
		let err = entity.get(&AttrName::Owner).await.unwrap_err();
		assert!(matches!(err, TransportError::AttributeUnavailable { .. }));
	}

	#[tokio::test]
	async fn test_set_only_touches_cache() {
		let shared = transport();
		let mut entity = FileEntity::new("mem:///dir/file", shared.clone());
		entity.set(AttrName::Mtime, AttrValue::Int(1));
		assert_eq!(entity.get(&AttrName::Mtime).await.unwrap(), AttrValue::Int(1));

		let mut fresh = FileEntity::new("mem:///dir/file", shared);
		assert_eq!(fresh.get(&AttrName::Mtime).await.unwrap(), AttrValue::Int(1234));
	}

	#[tokio::test]
	async fn test_populate() {
		let mut entity = FileEntity::new("mem:///dir/file", transport());
		entity.populate(&attr_set(["size", "mtime"])).await.unwrap();
		assert_eq!(entity.attribute_set(), attr_set(["size", "mtime"]));

		let err = entity.populate(&attr_set(["size", "perms"])).await.unwrap_err();
		assert!(matches!(
			err,
			TransportError::AttributeUnavailable { attribute: AttrName::Perms, .. }
		));
	}

	#[tokio::test]
	async fn test_equality_and_listing() {
		let shared = transport();
		let children = listdir(&shared, "mem:///dir").await.unwrap().unwrap();
		assert_eq!(children.len(), 1);
		assert_eq!(children[0], FileEntity::new("mem:///dir/file", shared.clone()));
		assert_eq!(children[0].cached(&AttrName::Size), Some(&AttrValue::Int(7)));
		assert_eq!(children[0].to_string(), "mem:///dir/file");

		assert!(listdir(&shared, "mem:///dir/file").await.unwrap().is_none());
	}
}

// vim: ts=4
