//! Push engine: project local changes onto the bucket.

use crate::blob_store::BlobStore;
use crate::change::{detect_changes, ChangeKind};
use crate::crypto;
use crate::error::{PathError, SyncError};
use crate::progress::{ProgressAction, ProgressCallback, ProgressEvent};
use crate::state::{StateManager, SyncState};
use crate::types::now;
use crate::walker;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct PushResult {
	pub uploaded: Vec<String>,
	pub deleted: Vec<String>,
	pub errors: Vec<PathError>,
}

impl PushResult {
	fn empty() -> Self {
		PushResult { uploaded: Vec::new(), deleted: Vec::new(), errors: Vec::new() }
	}
}

/// Run one push operation.
pub async fn push(
	tree_root: &Path,
	sync_paths: &[String],
	identity_path: &Path,
	state_manager: &StateManager,
	store: &dyn BlobStore,
	recipient: &age::x25519::Recipient,
	cancel: &CancellationToken,
	progress: &dyn ProgressCallback,
) -> Result<PushResult, SyncError> {
	let _ = identity_path; // push only ever encrypts; it never needs the identity itself

	let mut state = state_manager.load().await?;
	let walked = walker::walk(tree_root, sync_paths).await?;
	let changes = detect_changes(tree_root, &walked, &state).await?;

	info!("push: {} change(s) detected under {}", changes.len(), tree_root.display());

	if changes.is_empty() {
		debug!("push: nothing to do");
		state.last_sync = now();
		state_manager.save(&state).await?;
		return Ok(PushResult::empty());
	}

	let mut result = PushResult::empty();

	for (index, change) in changes.iter().enumerate() {
		if cancel.is_cancelled() {
			info!("push: cancelled after {}/{} changes", index, changes.len());
			break;
		}

		progress.on_event(ProgressEvent {
			action: ProgressAction::Scan,
			path: change.path.to_string(),
			size: 0,
			current: index,
			total: changes.len(),
			complete: false,
			error: None,
		});

		match change.kind {
			ChangeKind::Add | ChangeKind::Modify => {
				match push_one(tree_root, change, store, recipient).await {
					Ok((hash, metadata)) => {
						state.update_file(&change.path, metadata, hash);
						state.mark_uploaded(&change.path, now());
						result.uploaded.push(change.path.to_string());
						progress.on_event(ProgressEvent {
							action: ProgressAction::Upload,
							path: change.path.to_string(),
							size: metadata.size,
							current: index + 1,
							total: changes.len(),
							complete: true,
							error: None,
						});
					}
					Err(e) => {
						warn!("push: failed to upload {}: {}", change.path, e);
						result.errors.push(PathError { path: change.path.to_string(), error: e });
					}
				}
			}
			ChangeKind::Delete => match store.delete(&change.path.object_key()).await {
				Ok(()) => {
					debug!("push: deleted {} from bucket", change.path);
					state.remove_file(&change.path);
					result.deleted.push(change.path.to_string());
					progress.on_event(ProgressEvent {
						action: ProgressAction::Delete,
						path: change.path.to_string(),
						size: 0,
						current: index + 1,
						total: changes.len(),
						complete: true,
						error: None,
					});
				}
				Err(e) => {
					// State is retained so a retry re-attempts the delete.
					warn!("push: failed to delete {}: {}", change.path, e);
					result.errors.push(PathError { path: change.path.to_string(), error: e.into() });
				}
			},
		}
	}

	info!("push: {} uploaded, {} deleted, {} error(s)", result.uploaded.len(), result.deleted.len(), result.errors.len());

	state.last_push = now();
	state.last_sync = now();
	state_manager.save(&state).await?;

	if cancel.is_cancelled() {
		return Err(SyncError::Cancelled);
	}

	Ok(result)
}

async fn push_one(
	tree_root: &Path,
	change: &crate::change::Change,
	store: &dyn BlobStore,
	recipient: &age::x25519::Recipient,
) -> Result<(String, crate::types::FileMetadata), SyncError> {
	let abs_path = change.path.resolve(tree_root);
	let bytes = tokio::fs::read(&abs_path).await?;

	let ciphertext = crypto::encrypt(&bytes, recipient)?;
	store.upload(&change.path.object_key(), &ciphertext).await?;

	// Recompute the fingerprint from the bytes already read, avoiding a
	// second read that could race with a concurrent external write.
	let hash = crate::digest::fingerprint_bytes(&bytes);
	let metadata = change.metadata.unwrap_or(crate::types::FileMetadata { size: bytes.len() as u64, mtime: now() });
	Ok((hash, metadata))
}


// vim: ts=4
