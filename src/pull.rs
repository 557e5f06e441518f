//! Pull engine and pull preview.

use crate::blob_store::BlobStore;
use crate::config::TIMESTAMP_FORMAT;
use crate::crypto;
use crate::digest::fingerprint_file;
use crate::error::{PathError, SyncError};
use crate::progress::{ProgressAction, ProgressCallback, ProgressEvent};
use crate::state::{StateManager, SyncState};
use crate::types::{now, FileMetadata, Instant, RelPath};
use crate::walker;
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct PullResult {
	pub downloaded: Vec<String>,
	pub conflicts: Vec<String>,
	pub errors: Vec<PathError>,
}

impl PullResult {
	fn empty() -> Self {
		PullResult { downloaded: Vec::new(), conflicts: Vec::new(), errors: Vec::new() }
	}
}

#[derive(Debug, Clone)]
pub struct OverwriteCandidate {
	pub path: String,
	pub local_size: u64,
	pub remote_size: u64,
	pub local_mtime: Instant,
	pub remote_mtime: Instant,
}

pub struct Preview {
	pub would_download: Vec<String>,
	pub would_overwrite: Vec<OverwriteCandidate>,
	pub would_conflict: Vec<String>,
	pub would_keep: Vec<String>,
	pub local_only: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
	Download,
	Conflict,
	SkipAlreadySynced,
	SkipLocalNewer,
}

struct ClassifiedRemote {
	path: RelPath,
	remote: crate::types::RemoteObjectMeta,
	local_present: bool,
	local_metadata: Option<FileMetadata>,
	decision: Decision,
}

/// List remote + enumerate local, then classify every remote path against
/// the decision table below.
async fn classify(
	tree_root: &Path,
	sync_paths: &[String],
	state: &SyncState,
	store: &dyn BlobStore,
) -> Result<(Vec<ClassifiedRemote>, Vec<RelPath>), SyncError> {
	let remote_objects = store.list("").await?;
	let mut remote: HashMap<String, crate::types::RemoteObjectMeta> = HashMap::new();
	for meta in remote_objects {
		if let Some(rel) = RelPath::from_object_key(&meta.key) {
			remote.insert(rel.as_str().to_string(), meta);
		}
	}

	let walked = walker::walk(tree_root, sync_paths).await?;
	let mut local_by_path: HashMap<String, FileMetadata> = HashMap::new();
	for entry in &walked {
		local_by_path.insert(entry.path.as_str().to_string(), entry.metadata);
	}

	let mut classified = Vec::new();
	for (path_str, remote_meta) in &remote {
		let path = RelPath::new(path_str.clone());
		let local_metadata = local_by_path.get(path_str).copied();
		let local_present = local_metadata.is_some();

		let decision = if !local_present {
			Decision::Download
		} else {
			let abs_path = path.resolve(tree_root);
			let local_hash = fingerprint_file(&abs_path).await?;
			match state.get_file(&path) {
				None => Decision::Conflict,
				Some(record) if record.hash == local_hash => {
					if remote_meta.last_modified > record.uploaded {
						Decision::Download
					} else {
						Decision::SkipAlreadySynced
					}
				}
				Some(record) => {
					if remote_meta.last_modified > record.uploaded {
						Decision::Conflict
					} else {
						Decision::SkipLocalNewer
					}
				}
			}
		};

		classified.push(ClassifiedRemote {
			path,
			remote: remote_meta.clone(),
			local_present,
			local_metadata,
			decision,
		});
	}

	let local_only: Vec<RelPath> =
		walked.iter().map(|e| e.path.clone()).filter(|p| !remote.contains_key(p.as_str())).collect();

	Ok((classified, local_only))
}

/// Run one pull operation.
pub async fn pull(
	tree_root: &Path,
	sync_paths: &[String],
	identity: &age::x25519::Identity,
	state_manager: &StateManager,
	store: &dyn BlobStore,
	cancel: &CancellationToken,
	progress: &dyn ProgressCallback,
) -> Result<PullResult, SyncError> {
	let mut state = state_manager.load().await?;
	let (classified, _local_only) = classify(tree_root, sync_paths, &state, store).await?;

	info!("pull: {} remote object(s) classified under {}", classified.len(), tree_root.display());

	let mut result = PullResult::empty();

	for (index, item) in classified.iter().enumerate() {
		if cancel.is_cancelled() {
			info!("pull: cancelled after {}/{} items", index, classified.len());
			break;
		}

		match item.decision {
			Decision::Download => {
				match download_and_write(tree_root, item, store, identity).await {
					Ok(decrypted_len) => {
						debug!("pull: downloaded {}", item.path);
						result.downloaded.push(item.path.to_string());
						progress.on_event(ProgressEvent {
							action: ProgressAction::Download,
							path: item.path.to_string(),
							size: decrypted_len,
							current: index + 1,
							total: classified.len(),
							complete: true,
							error: None,
						});
						let hash = fingerprint_file(&item.path.resolve(tree_root)).await?;
						state.update_file(&item.path, FileMetadata { size: decrypted_len, mtime: now() }, hash);
						state.mark_uploaded(&item.path, item.remote.last_modified);
					}
					Err(e) => {
						warn!("pull: failed to download {}: {}", item.path, e);
						result.errors.push(PathError { path: item.path.to_string(), error: e });
					}
				}
			}
			Decision::Conflict => match write_conflict_sidecar(tree_root, item, store, identity).await {
				Ok(()) => {
					info!("pull: conflict on {}, wrote sidecar", item.path);
					result.conflicts.push(item.path.to_string());
					progress.on_event(ProgressEvent {
						action: ProgressAction::Conflict,
						path: item.path.to_string(),
						size: item.remote.size,
						current: index + 1,
						total: classified.len(),
						complete: true,
						error: None,
					});
				}
				Err(e) => {
					warn!("pull: failed to materialize conflict sidecar for {}: {}", item.path, e);
					result.errors.push(PathError { path: item.path.to_string(), error: e });
				}
			},
			Decision::SkipAlreadySynced | Decision::SkipLocalNewer => {}
		}
	}

	info!("pull: {} downloaded, {} conflict(s), {} error(s)", result.downloaded.len(), result.conflicts.len(), result.errors.len());

	state.last_pull = now();
	state.last_sync = now();
	state_manager.save(&state).await?;

	if cancel.is_cancelled() {
		return Err(SyncError::Cancelled);
	}

	Ok(result)
}

/// Downloads, decrypts, and writes the object; returns the decrypted byte
/// length, since the remote object's size is the *ciphertext* size (the age
/// envelope adds its own framing overhead) and must never be mistaken for it.
async fn download_and_write(
	tree_root: &Path,
	item: &ClassifiedRemote,
	store: &dyn BlobStore,
	identity: &age::x25519::Identity,
) -> Result<u64, SyncError> {
	let ciphertext = store.download(&item.path.object_key()).await?;
	let plaintext = crypto::decrypt(&ciphertext, identity)
		.map_err(|_| SyncError::KeyDecryptFailure { path: item.path.to_string() })?;

	let abs_path = item.path.resolve(tree_root);
	if let Some(parent) = abs_path.parent() {
		tokio::fs::create_dir_all(parent).await?;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let _ = tokio::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o755)).await;
		}
	}
	let decrypted_len = plaintext.len() as u64;
	tokio::fs::write(&abs_path, &plaintext).await?;
	Ok(decrypted_len)
}

async fn write_conflict_sidecar(
	tree_root: &Path,
	item: &ClassifiedRemote,
	store: &dyn BlobStore,
	identity: &age::x25519::Identity,
) -> Result<(), SyncError> {
	let ciphertext = store.download(&item.path.object_key()).await?;
	let plaintext = crypto::decrypt(&ciphertext, identity)
		.map_err(|_| SyncError::KeyDecryptFailure { path: item.path.to_string() })?;

	let timestamp = now().format(TIMESTAMP_FORMAT).to_string();
	let abs_path = item.path.resolve(tree_root);
	let sidecar_path = sidecar_for(&abs_path, &timestamp);
	tokio::fs::write(&sidecar_path, &plaintext).await?;
	// The local file and the state record are intentionally left untouched:
	// the engine still considers the local side "dirty relative to uploaded",
	// which is correct.
	Ok(())
}

fn sidecar_for(path: &Path, timestamp: &str) -> std::path::PathBuf {
	let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
	path.with_file_name(format!("{}.conflict.{}", file_name, timestamp))
}

/// Same classification as `pull`, but performs no writes and updates no state.
pub async fn preview_pull(
	tree_root: &Path,
	sync_paths: &[String],
	state_manager: &StateManager,
	store: &dyn BlobStore,
) -> Result<Preview, SyncError> {
	let state = state_manager.load().await?;
	let (classified, local_only) = classify(tree_root, sync_paths, &state, store).await?;

	let mut preview = Preview {
		would_download: Vec::new(),
		would_overwrite: Vec::new(),
		would_conflict: Vec::new(),
		would_keep: Vec::new(),
		local_only: local_only.iter().map(|p| p.to_string()).collect(),
	};

	for item in &classified {
		match item.decision {
			Decision::Download if !item.local_present => preview.would_download.push(item.path.to_string()),
			Decision::Download => {
				let local = item.local_metadata.expect("local_present implies local_metadata");
				preview.would_overwrite.push(OverwriteCandidate {
					path: item.path.to_string(),
					local_size: local.size,
					remote_size: item.remote.size,
					local_mtime: local.mtime,
					remote_mtime: item.remote.last_modified,
				});
			}
			Decision::Conflict => preview.would_conflict.push(item.path.to_string()),
			Decision::SkipLocalNewer => preview.would_keep.push(item.path.to_string()),
			Decision::SkipAlreadySynced => {}
		}
	}

	Ok(preview)
}


// vim: ts=4
