//! Tree traversal, directory reconciliation and recursive deletion

use std::collections::BTreeMap;

use super::Reconciler;
use crate::attributes::{AttrName, AttrSet, AttrValue};
use crate::entity::{self, FileEntity};
use crate::error::SyncError;
use crate::logging::*;
use crate::url;

impl Reconciler<'_> {
	/// Depth-first walk of the source tree with an explicit stack
	pub(super) async fn sync_tree(&mut self) -> Result<(), SyncError> {
		let mut root = FileEntity::new(self.source.clone(), self.src.clone());
		root.set(AttrName::IsDir, AttrValue::Bool(true));
		let mut stack = vec![root];

		while let Some(mut item) = stack.pop() {
			if !item.is_dir().await? {
				let destination_url = url::splice(&self.source, item.url(), &self.destination)?;
				debug!("Destination URL is {}", destination_url);
				let mut destination = FileEntity::new(destination_url, self.dst.clone());
				self.compare_and_copy(&mut item, &mut destination).await?;
				continue;
			}

			// The root is always listed
			if !self.config.recursive && item.url() != self.source {
				info!("Skipping directory {}", item);
				continue;
			}

			let Some(listing) = entity::listdir(&self.src, item.url()).await? else {
				warn!("Could not list source directory {}, skipping", item);
				continue;
			};
			let mut children = Vec::with_capacity(listing.len());
			for mut child in listing {
				let is_dir = child.is_dir().await?;
				if self.filter.includes(child.url(), is_dir) {
					children.push(child);
				} else {
					debug!("Excluding {}", child);
				}
			}
			children.sort_by(|a, b| a.url().cmp(b.url()));

			let destination_dir = url::splice(&self.source, item.url(), &self.destination)?;
			debug!("Comparing directories {} and {}", item, destination_dir);
			self.reconcile_directory(&mut item, &mut children, &destination_dir).await?;

			stack.extend(children.into_iter().rev());
		}

		Ok(())
	}

	/// Bring the entries of `destination_dir` in line with the source listing
	///
	/// Deletions run before directory creations so a directory can replace a
	/// file of the same name.
	async fn reconcile_directory(
		&mut self,
		source_dir: &mut FileEntity,
		children: &mut [FileEntity],
		destination_dir: &str,
	) -> Result<(), SyncError> {
		let destination_children = match entity::listdir(&self.dst, destination_dir).await? {
			Some(listing) => listing,
			None => {
				self.create_directory(source_dir, destination_dir).await?;
				Vec::new()
			}
		};

		let dst_hostname = self.dst.capabilities().uses_hostname;
		let src_hostname = self.src.capabilities().uses_hostname;

		let mut pending = BTreeMap::new();
		for mut existing in destination_children {
			let is_dir = existing.is_dir().await?;
			if self.filter.includes(existing.url(), is_dir) {
				pending.insert(url::filename(existing.url(), dst_hostname)?, existing);
			}
		}

		let mut create = Vec::new();
		for (index, child) in children.iter_mut().enumerate() {
			let name = url::filename(child.url(), src_hostname)?;
			let is_dir = child.is_dir().await?;

			let same_kind = match pending.get_mut(&name) {
				Some(existing) => existing.is_dir().await? == is_dir,
				None => false,
			};
			if same_kind {
				if let Some(existing) = pending.remove(&name) {
					if is_dir {
						self.propagate_directory(child, existing.url()).await?;
					}
				}
			} else if is_dir && self.config.recursive {
				create.push(index);
			}
		}

		if self.config.delete {
			for mut existing in pending.into_values() {
				if existing.is_dir().await? {
					if self.config.recursive {
						info!("Deleting destination directory {}", existing);
						self.delete_recursively(existing).await?;
					}
				} else {
					info!("Deleting destination file {}", existing);
					self.remove_destination_file(existing.url()).await?;
				}
			}
		}

		// In dry-run the missing directories are counted when visited
		if self.config.dry_run {
			return Ok(());
		}
		for index in create {
			let child = &mut children[index];
			let destination_url = url::splice(&self.source, child.url(), &self.destination)?;
			self.create_directory(child, &destination_url).await?;
		}

		Ok(())
	}

	async fn create_directory(
		&mut self,
		source_dir: &mut FileEntity,
		destination_url: &str,
	) -> Result<(), SyncError> {
		info!("Creating directory {}", destination_url);
		if !self.config.dry_run {
			if let Err(e) = self.dst.mkdir(destination_url).await {
				error!("Could not create directory {}: {}", destination_url, e);
				self.callbacks.on_error(destination_url, &e);
				return Ok(());
			}
		}

		self.report.dirs_created += 1;
		self.callbacks.on_dir_created(destination_url);
		self.propagate_directory(source_dir, destination_url).await
	}

	/// Copy a source directory's attributes onto its destination counterpart
	async fn propagate_directory(
		&mut self,
		source_dir: &mut FileEntity,
		destination_url: &str,
	) -> Result<(), SyncError> {
		if self.config.dry_run {
			return Ok(());
		}

		let gettable = &self.src.capabilities().gettable;
		let wanted: AttrSet = self
			.max_evaluation
			.union(&self.requested)
			.filter(|name| gettable.contains(*name))
			.cloned()
			.collect();
		source_dir.populate(&wanted).await?;

		debug!("Setting attributes for {}", destination_url);
		self.set_destination_attributes(destination_url, source_dir.attributes()).await;
		Ok(())
	}

	async fn remove_destination_file(&mut self, url: &str) -> Result<(), SyncError> {
		if !self.config.dry_run && !self.dst.remove(url).await? {
			warn!("Could not remove {}", url);
			return Ok(());
		}

		self.report.files_deleted += 1;
		self.callbacks.on_file_deleted(url);
		Ok(())
	}

	/// Remove a destination directory tree, files first, then directories
	/// deepest first
	async fn delete_recursively(&mut self, directory: FileEntity) -> Result<(), SyncError> {
		let mut stack = vec![directory];
		let mut directories = Vec::new();

		while let Some(mut item) = stack.pop() {
			if item.is_dir().await? {
				if let Some(listing) = entity::listdir(&self.dst, item.url()).await? {
					stack.extend(listing.into_iter().rev());
				}
				directories.push(item);
			} else {
				self.remove_destination_file(item.url()).await?;
			}
		}

		while let Some(item) = directories.pop() {
			if !self.config.dry_run && !self.dst.rmdir(item.url()).await? {
				warn!("Could not remove directory {}", item);
				continue;
			}
			self.report.files_deleted += 1;
			self.callbacks.on_file_deleted(item.url());
		}

		Ok(())
	}
}

// vim: ts=4
