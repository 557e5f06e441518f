//! Change detector: diff the working tree against persisted state.

use crate::digest::fingerprint_file;
use crate::state::SyncState;
use crate::types::{FileMetadata, RelPath, WalkEntry};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
	Add,
	Modify,
	Delete,
}

/// One detected change. `metadata`/`hash` are present for `Add`/`Modify`;
/// `Delete` carries neither since the file no longer exists to describe.
#[derive(Debug, Clone)]
pub struct Change {
	pub path: RelPath,
	pub kind: ChangeKind,
	pub metadata: Option<FileMetadata>,
	pub hash: Option<String>,
}

/// Run the change detector. Order is unspecified.
pub async fn detect_changes(
	root: &Path,
	walked: &[WalkEntry],
	state: &SyncState,
) -> Result<Vec<Change>, crate::error::SyncError> {
	let mut changes = Vec::new();
	let mut seen = HashSet::new();

	for entry in walked {
		seen.insert(entry.path.as_str().to_string());

		let abs_path = entry.path.resolve(root);
		let hash = fingerprint_file(&abs_path).await?;

		match state.get_file(&entry.path) {
			None => changes.push(Change {
				path: entry.path.clone(),
				kind: ChangeKind::Add,
				metadata: Some(entry.metadata),
				hash: Some(hash),
			}),
			Some(record) if record.hash != hash => changes.push(Change {
				path: entry.path.clone(),
				kind: ChangeKind::Modify,
				metadata: Some(entry.metadata),
				hash: Some(hash),
			}),
			Some(_) => {} // unchanged
		}
	}

	for path in state.files.keys() {
		if !seen.contains(path) {
			changes.push(Change { path: RelPath::new(path.clone()), kind: ChangeKind::Delete, metadata: None, hash: None });
		}
	}

	Ok(changes)
}


// vim: ts=4
