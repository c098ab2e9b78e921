//! File comparison, byte copies and attribute propagation

use std::io;

use super::Reconciler;
use crate::attributes::{join_names, AttrMap, AttrName, AttrSet, AttrValue};
use crate::callbacks::{SkipReason, SyncCallbacks};
use crate::entity::FileEntity;
use crate::error::{SyncError, TransportError};
use crate::logging::*;
use crate::transport::{OpenMode, SharedTransport, TransportResult};
use crate::url;

fn mtime(entity: &FileEntity) -> Option<i64> {
	entity.cached(&AttrName::Mtime).and_then(AttrValue::as_i64)
}

impl Reconciler<'_> {
	/// Copy a lone source file, into the destination if it is directory-shaped
	pub(super) async fn sync_single_file(&mut self) -> Result<(), SyncError> {
		let mut destination_root = FileEntity::new(self.destination.clone(), self.dst.clone());
		let destination_is_dir = destination_root.is_dir().await?;

		let destination_url = if self.destination.ends_with('/') || destination_is_dir {
			if !destination_is_dir {
				info!("Creating directory {}", self.destination);
				if !self.config.dry_run {
					self.dst.mkdir(&self.destination).await?;
				}
				self.report.dirs_created += 1;
				self.callbacks.on_dir_created(&self.destination);
			}

			let name = url::filename(&self.source, self.src.capabilities().uses_hostname)?;
			let mut parts = url::parse(
				&url::append_slash(&self.destination, true),
				self.dst.capabilities().uses_hostname,
				false,
			)?;
			parts.path.push_str(&name);
			url::compose(&parts)
		} else {
			self.destination.clone()
		};

		let mut source = FileEntity::new(self.source.clone(), self.src.clone());
		source.set(AttrName::IsDir, AttrValue::Bool(false));
		let mut destination = FileEntity::new(destination_url, self.dst.clone());
		destination.set(AttrName::IsDir, AttrValue::Bool(false));
		self.compare_and_copy(&mut source, &mut destination).await
	}

	/// Copy `source` over `destination` if an evaluation attribute differs,
	/// then propagate attributes
	pub(super) async fn compare_and_copy(
		&mut self,
		source: &mut FileEntity,
		destination: &mut FileEntity,
	) -> Result<(), SyncError> {
		let src_wanted: AttrSet = self
			.src
			.capabilities()
			.gettable
			.intersection(&self.max_evaluation)
			.chain(self.requested.iter())
			.cloned()
			.collect();
		source.populate(&src_wanted).await?;

		// Gone between listing and stat, or unreadable
		let vanished = src_wanted
			.iter()
			.any(|name| source.cached(name).is_some_and(|value| !value.is_available()));
		if vanished {
			let e = TransportError::io(
				source.url(),
				io::Error::new(io::ErrorKind::NotFound, "source attributes unavailable"),
			);
			error!("Could not read {}: {}", source, e);
			self.callbacks.on_error(source.url(), &e);
			self.report.files_processed += 1;
			return Ok(());
		}

		let mut dst_wanted: AttrSet =
			self.dst.capabilities().gettable.intersection(&self.max_evaluation).cloned().collect();
		if self.config.update && self.max_attributes.contains(&AttrName::Mtime) {
			dst_wanted.insert(AttrName::Mtime);
		}
		destination.populate(&dst_wanted).await?;

		let comparison: AttrSet = source
			.attribute_set()
			.intersection(&destination.attribute_set())
			.filter(|name| self.max_evaluation.contains(*name))
			.cloned()
			.collect();
		debug!("Checking evaluation attributes {}", join_names(&comparison));

		let difference =
			comparison.into_iter().find(|name| source.cached(name) != destination.cached(name));
		match difference {
			None => {
				info!("Files {} and {} are identical, skipping", source, destination);
				self.callbacks.on_file_skipped(source.url(), SkipReason::Identical);
				self.set_destination_attributes(destination.url(), source.attributes()).await;
			}
			Some(name) => {
				debug!(
					"Source and destination {} differ ({} vs {})",
					name,
					source.cached(&name).unwrap_or(&AttrValue::Unavailable),
					destination.cached(&name).unwrap_or(&AttrValue::Unavailable)
				);

				let destination_newer = match (mtime(source), mtime(destination)) {
					(Some(src), Some(dst)) => dst > src,
					_ => false,
				};
				if self.config.update && destination_newer {
					info!("Destination {} is newer, skipping", destination);
					self.callbacks.on_file_skipped(source.url(), SkipReason::DestinationNewer);
					if self.config.propagate_on_update_skip {
						let attributes = source.attributes();
						self.set_destination_attributes(destination.url(), attributes).await;
					}
				} else {
					info!("Copying {} to {}", source, destination);
					match self.copy_file(source, destination).await {
						Ok(bytes) => {
							self.report.files_copied += 1;
							self.report.bytes_transferred += bytes;
							self.callbacks.on_file_copied(source.url(), destination.url(), bytes);
							let attributes = source.attributes();
							self.set_destination_attributes(destination.url(), attributes).await;
						}
						Err(e) => {
							error!("Could not copy {} to {}: {}", source, destination, e);
							self.callbacks.on_error(source.url(), &e);
						}
					}
				}
			}
		}

		self.report.files_processed += 1;
		Ok(())
	}

	/// Stream the bytes of `source` into a fresh `destination`
	async fn copy_file(
		&self,
		source: &FileEntity,
		destination: &FileEntity,
	) -> TransportResult<u64> {
		if self.config.dry_run {
			return Ok(0);
		}

		let chunk_size =
			self.src.capabilities().buffer_size.min(self.dst.capabilities().buffer_size).max(1);

		self.src.open(source.url(), OpenMode::Read).await?;
		let written = self.write_destination(source, destination, chunk_size).await;
		let closed = self.src.close().await;
		let bytes = written?;
		closed?;
		Ok(bytes)
	}

	async fn write_destination(
		&self,
		source: &FileEntity,
		destination: &FileEntity,
		chunk_size: usize,
	) -> TransportResult<u64> {
		let parent = url::parent(destination.url(), self.dst.capabilities().uses_hostname)?;
		if !self.dst.is_dir(&parent).await? {
			self.dst.mkdir(&parent).await?;
		}

		// Replace, never update in place
		self.dst.remove(destination.url()).await?;
		self.dst.open(destination.url(), OpenMode::Write).await?;
		let pumped = pump(&self.src, &self.dst, source.url(), chunk_size, self.callbacks).await;
		let closed = self.dst.close().await;
		let bytes = pumped?;
		closed?;
		Ok(bytes)
	}

	/// Write the evaluated and requested part of `attributes` onto `url`,
	/// as far as the destination can set it
	pub(super) async fn set_destination_attributes(&self, url: &str, attributes: &AttrMap) {
		let carried: AttrMap = attributes
			.iter()
			.filter(|(name, _)| {
				self.max_evaluation.contains(*name) || self.requested.contains(*name)
			})
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect();
		let settable = self.dst.capabilities().settable_subset(&carried);
		if settable.is_empty() || self.config.dry_run {
			return;
		}

		let names: AttrSet = settable.keys().cloned().collect();
		debug!("Setting {} on {}", join_names(&names), url);
		if let Err(e) = self.dst.setattr(url, &settable).await {
			warn!("Could not set attributes on {}: {}", url, e);
		}
	}
}

/// Read until the source reports end of file
async fn pump(
	src: &SharedTransport,
	dst: &SharedTransport,
	url: &str,
	chunk_size: usize,
	callbacks: &dyn SyncCallbacks,
) -> TransportResult<u64> {
	let mut bytes = 0u64;
	loop {
		let data = src.read(chunk_size).await?;
		if data.is_empty() {
			return Ok(bytes);
		}
		dst.write(&data).await?;
		bytes += data.len() as u64;
		callbacks.on_progress(url, bytes);
	}
}

// vim: ts=4
