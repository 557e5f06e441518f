//! Persistent state: per-device record of every synced file.

use crate::error::{boxed_error, StateError};
use crate::types::{zero_instant, is_zero_instant, now, FileMetadata, FileStateRecord, Instant, RelPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Singleton sync state for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
	pub files: BTreeMap<String, FileStateRecord>,

	pub device_id: String,

	#[serde(default = "zero_instant")]
	pub last_sync: Instant,

	#[serde(default = "zero_instant")]
	pub last_push: Instant,

	#[serde(default = "zero_instant")]
	pub last_pull: Instant,
}

impl SyncState {
	/// A fresh, unsynced state for a new device.
	pub fn empty() -> Self {
		SyncState {
			files: BTreeMap::new(),
			device_id: default_device_id(),
			last_sync: zero_instant(),
			last_push: zero_instant(),
			last_pull: zero_instant(),
		}
	}

	/// True iff `files` is non-empty or any last-* instant is non-zero.
	pub fn has_state(&self) -> bool {
		!self.files.is_empty()
			|| !is_zero_instant(&self.last_sync)
			|| !is_zero_instant(&self.last_push)
			|| !is_zero_instant(&self.last_pull)
	}

	pub fn get_file(&self, path: &RelPath) -> Option<&FileStateRecord> {
		self.files.get(path.as_str())
	}

	pub fn update_file(&mut self, path: &RelPath, metadata: FileMetadata, hash: String) {
		let record = self.files.entry(path.as_str().to_string()).or_insert_with(|| FileStateRecord {
			hash: hash.clone(),
			size: metadata.size,
			mod_time: metadata.mtime,
			uploaded: zero_instant(),
		});
		record.hash = hash;
		record.size = metadata.size;
		record.mod_time = metadata.mtime;
	}

	pub fn mark_uploaded(&mut self, path: &RelPath, instant: Instant) {
		if let Some(record) = self.files.get_mut(path.as_str()) {
			record.uploaded = instant;
		}
	}

	pub fn remove_file(&mut self, path: &RelPath) {
		self.files.remove(path.as_str());
	}
}

fn default_device_id() -> String {
	hostname()
}

fn hostname() -> String {
	// Best-effort; diagnostics only, never used for correctness.
	std::env::var("HOSTNAME")
		.ok()
		.or_else(|| {
			let output = std::process::Command::new("hostname").output().ok()?;
			String::from_utf8(output.stdout).ok()
		})
		.map(|s| s.trim().to_string())
		.filter(|s| !s.is_empty())
		.unwrap_or_else(|| "unknown-device".to_string())
}

/// Loads and atomically persists a single `SyncState` at a fixed path.
pub struct StateManager {
	state_path: PathBuf,
}

impl StateManager {
	pub fn new(state_path: impl Into<PathBuf>) -> Self {
		StateManager { state_path: state_path.into() }
	}

	/// A missing file returns an empty state, not an error.
	pub async fn load(&self) -> Result<SyncState, StateError> {
		let contents = match tokio::fs::read_to_string(&self.state_path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!("state: no existing state file at {}, starting fresh", self.state_path.display());
				return Ok(SyncState::empty());
			}
			Err(e) => return Err(StateError::LoadFailed { source: boxed_error(e) }),
		};

		serde_json::from_str(&contents)
			.map_err(|e| StateError::Corrupted { message: format!("state file is not valid JSON: {}", e) })
	}

	/// Write atomically: to a sibling temporary file, then rename, so a
	/// crash never leaves a partial state file.
	pub async fn save(&self, state: &SyncState) -> Result<(), StateError> {
		if let Some(parent) = self.state_path.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|e| StateError::SaveFailed { source: boxed_error(e) })?;
		}

		let json = serde_json::to_string_pretty(state)
			.map_err(|e| StateError::SaveFailed { source: boxed_error(e) })?;

		let tmp_path = tmp_sibling(&self.state_path);
		tokio::fs::write(&tmp_path, &json)
			.await
			.map_err(|e| StateError::SaveFailed { source: boxed_error(e) })?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let permissions = std::fs::Permissions::from_mode(0o600);
			let _ = tokio::fs::set_permissions(&tmp_path, permissions).await;
		}

		tokio::fs::rename(&tmp_path, &self.state_path)
			.await
			.map_err(|e| StateError::SaveFailed { source: boxed_error(e) })?;

		debug!("state: saved {} file record(s) to {}", state.files.len(), self.state_path.display());
		Ok(())
	}
}

fn tmp_sibling(path: &Path) -> PathBuf {
	let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "state".into());
	path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::RelPath;

	#[tokio::test]
	async fn load_missing_file_returns_empty_state() {
		let dir = tempfile::tempdir().unwrap();
		let manager = StateManager::new(dir.path().join("state.json"));
		let state = manager.load().await.unwrap();
		assert!(!state.has_state());
	}

	#[tokio::test]
	async fn save_then_load_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("state.json");
		let manager = StateManager::new(&path);

		let mut state = SyncState::empty();
		let rel = RelPath::new("notes.txt");
		state.update_file(&rel, FileMetadata { size: 3, mtime: now() }, "abc123".to_string());
		state.mark_uploaded(&rel, now());
		manager.save(&state).await.unwrap();

		let loaded = manager.load().await.unwrap();
		assert_eq!(loaded.get_file(&rel).unwrap().hash, "abc123");
		assert!(loaded.has_state());
	}

	#[tokio::test]
	async fn save_leaves_no_temp_file_behind() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("state.json");
		let manager = StateManager::new(&path);
		manager.save(&SyncState::empty()).await.unwrap();

		let mut seen_only_state_json = true;
		let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
		while let Some(entry) = entries.next_entry().await.unwrap() {
			if entry.file_name() != "state.json" {
				seen_only_state_json = false;
			}
		}
		assert!(seen_only_state_json);
	}

	#[test]
	fn remove_file_deletes_record() {
		let mut state = SyncState::empty();
		let rel = RelPath::new("gone.txt");
		state.update_file(&rel, FileMetadata { size: 1, mtime: now() }, "h".to_string());
		state.remove_file(&rel);
		assert!(state.get_file(&rel).is_none());
	}

	#[test]
	fn has_state_is_false_for_fresh_state() {
		assert!(!SyncState::empty().has_state());
	}
}

// vim: ts=4
