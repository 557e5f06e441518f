//! Tree walker: enumerate the configured subset of the working tree.

use crate::error::SyncError;
use crate::types::{FileMetadata, RelPath, WalkEntry};
use ignore::WalkBuilder;
use std::path::Path;

/// Walk `root` restricted to the top-level names in `sync_paths`, yielding
/// every regular file reachable beneath them. Missing sync-path entries are
/// skipped silently; symlinks at any depth are never followed or recorded;
/// files whose base name contains `.conflict.` are skipped.
pub async fn walk(root: &Path, sync_paths: &[String]) -> Result<Vec<WalkEntry>, SyncError> {
	let root = root.to_path_buf();
	let sync_paths = sync_paths.to_vec();
	tokio::task::spawn_blocking(move || walk_blocking(&root, &sync_paths))
		.await
		.map_err(|e| SyncError::Other { message: format!("walker task panicked: {}", e) })?
}

fn walk_blocking(root: &Path, sync_paths: &[String]) -> Result<Vec<WalkEntry>, SyncError> {
	let mut entries = Vec::new();

	for name in sync_paths {
		let top = root.join(name);
		let metadata = match std::fs::symlink_metadata(&top) {
			Ok(m) => m,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
			Err(e) => return Err(SyncError::Io(e)),
		};

		if metadata.file_type().is_symlink() {
			continue;
		}

		let walker = WalkBuilder::new(&top)
			.follow_links(false)
			.standard_filters(false)
			.hidden(false)
			.build();

		for result in walker {
			let entry = result.map_err(|e| SyncError::Other { message: format!("walk error: {}", e) })?;

			let file_type = match entry.file_type() {
				Some(ft) => ft,
				None => continue, // stdin sentinel; never occurs for a path-rooted walk
			};
			if !file_type.is_file() {
				continue;
			}

			let abs_path = entry.path();
			let rel = match RelPath::from_root(root, abs_path) {
				Some(rel) => rel,
				None => continue,
			};
			if rel.is_conflict_sidecar() {
				continue;
			}

			let meta = entry
				.metadata()
				.map_err(|e| SyncError::Other { message: format!("stat {}: {}", abs_path.display(), e) })?;
			let mtime: crate::types::Instant = meta
				.modified()
				.map_err(|e| SyncError::Other { message: format!("mtime {}: {}", abs_path.display(), e) })?
				.into();

			entries.push(WalkEntry { path: rel, metadata: FileMetadata { size: meta.len(), mtime } });
		}
	}

	Ok(entries)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::os::unix::fs::symlink;

	#[tokio::test]
	async fn walks_files_and_directories_in_sync_path_set() {
		let dir = tempfile::tempdir().unwrap();
		tokio::fs::write(dir.path().join("CLAUDE.md"), b"Hello").await.unwrap();
		tokio::fs::create_dir_all(dir.path().join("agents")).await.unwrap();
		tokio::fs::write(dir.path().join("agents/x.json"), b"{}").await.unwrap();
		tokio::fs::write(dir.path().join("ignored.txt"), b"not in sync set").await.unwrap();

		let entries = walk(dir.path(), &["CLAUDE.md".to_string(), "agents".to_string()]).await.unwrap();
		let mut paths: Vec<_> = entries.iter().map(|e| e.path.as_str().to_string()).collect();
		paths.sort();
		assert_eq!(paths, vec!["CLAUDE.md", "agents/x.json"]);
	}

	#[tokio::test]
	async fn missing_sync_path_entries_are_skipped() {
		let dir = tempfile::tempdir().unwrap();
		let entries = walk(dir.path(), &["does-not-exist".to_string()]).await.unwrap();
		assert!(entries.is_empty());
	}

	#[tokio::test]
	async fn symlinks_are_never_followed_or_recorded() {
		let dir = tempfile::tempdir().unwrap();
		tokio::fs::write(dir.path().join("real.txt"), b"data").await.unwrap();
		symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();

		let entries = walk(dir.path(), &["real.txt".to_string(), "link.txt".to_string()]).await.unwrap();
		let paths: Vec<_> = entries.iter().map(|e| e.path.as_str().to_string()).collect();
		assert_eq!(paths, vec!["real.txt"]);
	}

	#[tokio::test]
	async fn conflict_sidecars_are_skipped() {
		// a conflict sidecar sitting next to its origin file never surfaces from a walk
		let dir = tempfile::tempdir().unwrap();
		tokio::fs::write(dir.path().join("notes.txt"), b"v1b").await.unwrap();
		tokio::fs::write(dir.path().join("notes.txt.conflict.20260101-120000"), b"v1a").await.unwrap();

		let entries = walk(dir.path(), &["notes.txt".to_string()]).await.unwrap();
		let paths: Vec<_> = entries.iter().map(|e| e.path.as_str().to_string()).collect();
		assert_eq!(paths, vec!["notes.txt"]);
	}
}

// vim: ts=4
