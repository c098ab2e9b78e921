/// Real file integration tests - runs actual syncs between local directories
///
/// These tests create real directory trees, run the engine with different
/// configurations and then inspect the destination on disk.
///
/// Tests verify:
/// 1. Single files land where the destination shape says
/// 2. Trees are copied recursively (or not) with mtimes preserved
/// 3. A second run over unchanged content copies nothing
/// 4. Delete, filter and update modes change exactly what they should
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use polysync::{Config, SyncEngine, SyncError, SyncReport, TransportRegistry};

const T0: i64 = 1_500_000_000;
const T1: i64 = 1_600_000_000;

/// Helper to create a file with specific content and modification time
fn create_file(dir: &Path, name: &str, content: &str, mtime: i64) {
	let path = dir.join(name);
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).unwrap();
	}
	fs::write(&path, content).unwrap();
	set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

/// Helper to read file content (returns None if file doesn't exist)
fn read_file(dir: &Path, name: &str) -> Option<String> {
	fs::read_to_string(dir.join(name)).ok()
}

fn mtime_of(dir: &Path, name: &str) -> i64 {
	let meta = fs::metadata(dir.join(name)).unwrap();
	FileTime::from_last_modification_time(&meta).unix_seconds()
}

fn url_of(path: &Path) -> String {
	format!("file://{}", path.display())
}

async fn run(config: Config, source: &str, destination: &str) -> Result<SyncReport, SyncError> {
	SyncEngine::new(config, TransportRegistry::with_defaults())?.sync(source, destination).await
}

fn recursive() -> Config {
	Config { recursive: true, ..Config::default() }
}

/// src/{a.txt, sub/b.txt, sub/deeper/c.txt}
fn populate_tree(src: &Path) {
	create_file(src, "a.txt", "alpha", T1);
	create_file(src, "sub/b.txt", "bravo!", T1);
	create_file(src, "sub/deeper/c.txt", "charlie", T0);
}

// ===================================================================
// SINGLE FILES
// ===================================================================

#[tokio::test]
async fn test_single_file_into_directory_url() {
	let root = TempDir::new().unwrap();
	let src = root.path().join("src");
	create_file(&src, "report.txt", "quarterly numbers", T1);
	let dst = root.path().join("dst");

	let report = run(
		Config::default(),
		&url_of(&src.join("report.txt")),
		&format!("{}/", url_of(&dst)),
	)
	.await
	.unwrap();

	assert_eq!(read_file(&dst, "report.txt").as_deref(), Some("quarterly numbers"));
	assert_eq!(mtime_of(&dst, "report.txt"), T1);
	assert_eq!(report.files_copied, 1);
	assert_eq!(report.dirs_created, 1);
	assert_eq!(report.bytes_transferred, 17);
}

#[tokio::test]
async fn test_single_file_into_existing_directory() {
	let root = TempDir::new().unwrap();
	let src = root.path().join("src");
	create_file(&src, "report.txt", "numbers", T1);
	let dst = root.path().join("dst");
	fs::create_dir(&dst).unwrap();

	// Plain paths are normalized to file:// URLs
	let source = src.join("report.txt").display().to_string();
	run(Config::default(), &source, &dst.display().to_string()).await.unwrap();

	assert_eq!(read_file(&dst, "report.txt").as_deref(), Some("numbers"));
}

#[tokio::test]
async fn test_single_file_to_literal_name() {
	let root = TempDir::new().unwrap();
	create_file(root.path(), "src/a.txt", "content", T1);
	fs::create_dir(root.path().join("dst")).unwrap();

	run(
		Config::default(),
		&url_of(&root.path().join("src/a.txt")),
		&url_of(&root.path().join("dst/renamed.txt")),
	)
	.await
	.unwrap();

	assert_eq!(read_file(root.path(), "dst/renamed.txt").as_deref(), Some("content"));
	assert!(!root.path().join("dst/a.txt").exists());
}

// ===================================================================
// TREES
// ===================================================================

#[tokio::test]
async fn test_recursive_copy_preserves_mtime() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	populate_tree(&src);

	let report = run(recursive(), &url_of(&src), &url_of(&dst)).await.unwrap();

	assert_eq!(read_file(&dst, "a.txt").as_deref(), Some("alpha"));
	assert_eq!(read_file(&dst, "sub/b.txt").as_deref(), Some("bravo!"));
	assert_eq!(read_file(&dst, "sub/deeper/c.txt").as_deref(), Some("charlie"));
	assert_eq!(mtime_of(&dst, "sub/deeper/c.txt"), T0);
	assert_eq!(mtime_of(&dst, "a.txt"), T1);

	assert_eq!(report.files_processed, 3);
	assert_eq!(report.files_copied, 3);
	assert_eq!(report.dirs_created, 3);
	assert_eq!(report.bytes_transferred, 18);
}

#[tokio::test]
async fn test_non_recursive_copies_top_level_only() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	populate_tree(&src);

	let report = run(Config::default(), &url_of(&src), &url_of(&dst)).await.unwrap();

	assert_eq!(read_file(&dst, "a.txt").as_deref(), Some("alpha"));
	assert!(!dst.join("sub").exists());
	assert_eq!(report.files_copied, 1);
}

#[tokio::test]
async fn test_second_run_copies_nothing() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	populate_tree(&src);

	run(recursive(), &url_of(&src), &url_of(&dst)).await.unwrap();
	let second = run(recursive(), &url_of(&src), &url_of(&dst)).await.unwrap();

	assert_eq!(second.files_processed, 3);
	assert_eq!(second.files_copied, 0);
	assert_eq!(second.bytes_transferred, 0);
	assert_eq!(second.dirs_created, 0);
}

#[tokio::test]
async fn test_names_with_url_delimiters_are_copied() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	let names = ["plain.txt", "a#b.txt", "c?d.txt", "e;f.txt", "100%.txt", "with space.txt"];
	for name in names {
		create_file(&src, name, "payload", T1);
	}
	create_file(&src, "dir#1/inner?.txt", "payload", T1);
	create_file(&dst, "x#y.txt", "stale", T0);

	let config = Config { delete: true, ..recursive() };
	let report = run(config.clone(), &url_of(&src), &url_of(&dst)).await.unwrap();

	assert_eq!(report.files_copied, names.len() as u64 + 1);
	assert_eq!(report.files_deleted, 1);
	for name in names {
		assert_eq!(read_file(&dst, name).as_deref(), Some("payload"), "{}", name);
		assert_eq!(mtime_of(&dst, name), T1);
	}
	assert_eq!(read_file(&dst, "dir#1/inner?.txt").as_deref(), Some("payload"));
	assert!(!dst.join("x#y.txt").exists());

	let second = run(config, &url_of(&src), &url_of(&dst)).await.unwrap();
	assert_eq!(second.files_copied, 0);
	assert_eq!(second.files_deleted, 0);
}

#[tokio::test]
async fn test_bare_paths_with_url_delimiters() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("in#box"), root.path().join("out;put"));
	create_file(&src, "note?.txt", "payload", T1);

	let report =
		run(recursive(), &src.display().to_string(), &dst.display().to_string()).await.unwrap();
	assert_eq!(report.files_copied, 1);
	assert_eq!(read_file(&dst, "note?.txt").as_deref(), Some("payload"));
}

#[tokio::test]
async fn test_changed_file_is_replaced() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	populate_tree(&src);
	run(recursive(), &url_of(&src), &url_of(&dst)).await.unwrap();

	create_file(&src, "a.txt", "alpha, revised", T1 + 60);
	let report = run(recursive(), &url_of(&src), &url_of(&dst)).await.unwrap();

	assert_eq!(read_file(&dst, "a.txt").as_deref(), Some("alpha, revised"));
	assert_eq!(mtime_of(&dst, "a.txt"), T1 + 60);
	assert_eq!(report.files_copied, 1);
}

// ===================================================================
// DELETE
// ===================================================================

#[tokio::test]
async fn test_delete_removes_extraneous_entries() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	populate_tree(&src);
	create_file(&dst, "extra.txt", "stale", T0);
	create_file(&dst, "olddir/nested/x.txt", "stale", T0);

	let config = Config { delete: true, ..recursive() };
	let report = run(config, &url_of(&src), &url_of(&dst)).await.unwrap();

	assert!(!dst.join("extra.txt").exists());
	assert!(!dst.join("olddir").exists());
	assert_eq!(read_file(&dst, "a.txt").as_deref(), Some("alpha"));
	// extra.txt, x.txt, nested, olddir
	assert_eq!(report.files_deleted, 4);
}

#[tokio::test]
async fn test_without_delete_extraneous_entries_stay() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	populate_tree(&src);
	create_file(&dst, "extra.txt", "stale", T0);

	let report = run(recursive(), &url_of(&src), &url_of(&dst)).await.unwrap();

	assert_eq!(read_file(&dst, "extra.txt").as_deref(), Some("stale"));
	assert_eq!(report.files_deleted, 0);
}

#[tokio::test]
async fn test_type_changes_are_resolved() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	create_file(&src, "was_dir", "now a file", T1);
	create_file(&src, "was_file/inner.txt", "now a dir", T1);
	create_file(&dst, "was_dir/old.txt", "old", T0);
	create_file(&dst, "was_file", "old", T0);

	let config = Config { delete: true, ..recursive() };
	run(config, &url_of(&src), &url_of(&dst)).await.unwrap();

	assert_eq!(read_file(&dst, "was_dir").as_deref(), Some("now a file"));
	assert_eq!(read_file(&dst, "was_file/inner.txt").as_deref(), Some("now a dir"));
}

// ===================================================================
// FILTERS
// ===================================================================

#[tokio::test]
async fn test_excluded_entries_are_ignored() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	create_file(&src, "keep.txt", "k", T1);
	create_file(&src, "junk.tmp", "j", T1);
	create_file(&src, "important.tmp", "i", T1);
	create_file(&src, "cache/blob", "b", T1);
	create_file(&dst, "cache/local", "l", T0);
	create_file(&dst, "other.tmp", "o", T0);

	let config = Config {
		delete: true,
		exclude_files: Some(r"\.tmp$".to_string()),
		include_files: Some(r"important".to_string()),
		exclude_dirs: Some(r"/cache$".to_string()),
		..recursive()
	};
	run(config, &url_of(&src), &url_of(&dst)).await.unwrap();

	assert!(dst.join("keep.txt").exists());
	assert!(dst.join("important.tmp").exists());
	assert!(!dst.join("junk.tmp").exists());
	assert!(!dst.join("cache/blob").exists());
	// Excluded destination entries are not deleted either
	assert_eq!(read_file(&dst, "cache/local").as_deref(), Some("l"));
	assert_eq!(read_file(&dst, "other.tmp").as_deref(), Some("o"));
}

// ===================================================================
// UPDATE AND DRY RUN
// ===================================================================

#[tokio::test]
async fn test_update_keeps_newer_destination() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	create_file(&src, "doc.txt", "source version", T0);
	create_file(&dst, "doc.txt", "edited on destination", T1);

	let config = Config { update: true, ..recursive() };
	let report = run(config.clone(), &url_of(&src), &url_of(&dst)).await.unwrap();
	assert_eq!(read_file(&dst, "doc.txt").as_deref(), Some("edited on destination"));
	assert_eq!(report.files_copied, 0);
	assert_eq!(report.files_processed, 1);
	// The skipped file still takes the source mtime
	assert_eq!(mtime_of(&dst, "doc.txt"), T0);

	// No longer newer, so the next update run overwrites it
	let report = run(config, &url_of(&src), &url_of(&dst)).await.unwrap();
	assert_eq!(report.files_copied, 1);
	assert_eq!(read_file(&dst, "doc.txt").as_deref(), Some("source version"));
}

#[tokio::test]
async fn test_update_skip_without_propagation_keeps_mtime() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	create_file(&src, "doc.txt", "source version", T0);
	create_file(&dst, "doc.txt", "edited on destination", T1);

	let config = Config { update: true, propagate_on_update_skip: false, ..recursive() };
	for _ in 0..2 {
		let report = run(config.clone(), &url_of(&src), &url_of(&dst)).await.unwrap();
		assert_eq!(report.files_copied, 0);
		assert_eq!(mtime_of(&dst, "doc.txt"), T1);
		assert_eq!(read_file(&dst, "doc.txt").as_deref(), Some("edited on destination"));
	}
}

#[tokio::test]
async fn test_dry_run_leaves_disk_untouched() {
	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	populate_tree(&src);
	create_file(&dst, "extra.txt", "stale", T0);

	let config = Config { dry_run: true, delete: true, ..recursive() };
	let report = run(config, &url_of(&src), &url_of(&dst)).await.unwrap();

	assert!(report.dry_run);
	assert_eq!(report.files_copied, 3);
	assert_eq!(report.files_deleted, 1);
	assert_eq!(report.dirs_created, 2);
	assert_eq!(report.bytes_transferred, 0);
	assert!(dst.join("extra.txt").exists());
	assert!(!dst.join("a.txt").exists());
	assert!(!dst.join("sub").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_permissions_preserved_on_request() {
	use std::os::unix::fs::PermissionsExt;

	let root = TempDir::new().unwrap();
	let (src, dst) = (root.path().join("src"), root.path().join("dst"));
	create_file(&src, "script.sh", "#!/bin/sh\n", T1);
	fs::set_permissions(src.join("script.sh"), fs::Permissions::from_mode(0o750)).unwrap();

	let config = Config { attributes: vec!["perms".to_string()], ..recursive() };
	run(config, &url_of(&src), &url_of(&dst)).await.unwrap();

	let mode = fs::metadata(dst.join("script.sh")).unwrap().permissions().mode();
	assert_eq!(mode & 0o7777, 0o750);
}

// ===================================================================
// VALIDATION
// ===================================================================

#[tokio::test]
async fn test_missing_source_is_rejected() {
	let root = TempDir::new().unwrap();
	let err = run(Config::default(), &url_of(&root.path().join("nope")), &url_of(root.path()))
		.await
		.unwrap_err();
	assert!(matches!(err, SyncError::Validation { .. }));
}

#[tokio::test]
async fn test_destination_inside_source_is_rejected() {
	let root = TempDir::new().unwrap();
	let src = root.path().join("src");
	populate_tree(&src);

	let err = run(recursive(), &url_of(&src), &url_of(&src.join("backup"))).await.unwrap_err();
	assert!(matches!(err, SyncError::Validation { .. }));
	assert!(!src.join("backup").exists());

	// A sibling sharing the name prefix is fine
	run(recursive(), &url_of(&src), &url_of(&root.path().join("src-backup"))).await.unwrap();
}
