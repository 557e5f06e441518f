//! Backup snapshot: copy the working-tree subset to a timestamped sibling.

use crate::config::TIMESTAMP_FORMAT;
use crate::error::SyncError;
use crate::types::now;
use crate::walker;
use std::path::{Path, PathBuf};
use tracing::info;

/// Copy every walked path verbatim to `<tree_root>.backup.<timestamp>`.
/// Called explicitly by the caller, never implicitly by `pull`.
pub async fn create_backup(tree_root: &Path, sync_paths: &[String]) -> Result<PathBuf, SyncError> {
	let timestamp = now().format(TIMESTAMP_FORMAT).to_string();
	let backup_root = backup_root_for(tree_root, &timestamp);

	let walked = walker::walk(tree_root, sync_paths).await?;

	for entry in &walked {
		let source = entry.path.resolve(tree_root);
		let dest = entry.path.resolve(&backup_root);

		if let Some(parent) = dest.parent() {
			tokio::fs::create_dir_all(parent).await?;
			#[cfg(unix)]
			{
				use std::os::unix::fs::PermissionsExt;
				let _ = tokio::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755)).await;
			}
		}

		tokio::fs::copy(&source, &dest).await?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let _ = tokio::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o644)).await;
		}
	}

	info!("backup: copied {} file(s) to {}", walked.len(), backup_root.display());
	Ok(backup_root)
}

fn backup_root_for(tree_root: &Path, timestamp: &str) -> PathBuf {
	let file_name = tree_root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
	tree_root.with_file_name(format!("{}.backup.{}", file_name, timestamp))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn backup_copies_every_synced_file_verbatim() {
		// the half of the backup-then-pull flow that only copies local content
		let dir = tempfile::tempdir().unwrap();
		let tree_root = dir.path().join("tree");
		tokio::fs::create_dir_all(&tree_root).await.unwrap();
		tokio::fs::write(tree_root.join("settings.json"), b"local").await.unwrap();

		let backup_root = create_backup(&tree_root, &["settings.json".to_string()]).await.unwrap();

		assert!(backup_root.to_string_lossy().contains(".backup."));
		let contents = tokio::fs::read(backup_root.join("settings.json")).await.unwrap();
		assert_eq!(contents, b"local");
	}

	#[tokio::test]
	async fn backup_preserves_directory_structure() {
		let dir = tempfile::tempdir().unwrap();
		let tree_root = dir.path().join("tree");
		tokio::fs::create_dir_all(tree_root.join("agents")).await.unwrap();
		tokio::fs::write(tree_root.join("agents/x.json"), b"{}").await.unwrap();

		let backup_root = create_backup(&tree_root, &["agents".to_string()]).await.unwrap();
		let contents = tokio::fs::read(backup_root.join("agents/x.json")).await.unwrap();
		assert_eq!(contents, b"{}");
	}
}

// vim: ts=4
