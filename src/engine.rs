//! The public facade wiring every component together.

use crate::blob_store::BlobStore;
use crate::config::EngineConfig;
use crate::crypto;
use crate::error::SyncError;
use crate::progress::{NullProgressCallback, ProgressCallback};
use crate::pull::{self, Preview, PullResult};
use crate::push::{self, PushResult};
use crate::state::StateManager;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The engine for one device: an identity, a blob store, and the
/// configuration naming the working tree and state file.
///
/// The engine owns a handle to the blob store and the encryption identity
/// for the duration of one operation; it holds no process-wide singleton
/// state.
pub struct Engine {
	config: EngineConfig,
	identity: age::x25519::Identity,
	store: Arc<dyn BlobStore>,
	state_manager: StateManager,
}

impl Engine {
	/// Construct an engine from host-provided configuration and an
	/// already-resolved identity. Use `open` to load the identity from disk.
	pub fn new(config: EngineConfig, identity: age::x25519::Identity, store: Arc<dyn BlobStore>) -> Self {
		let state_manager = StateManager::new(config.state_path.clone());
		Engine { config, identity, store, state_manager }
	}

	/// Construct an engine, loading the identity from `config.identity_path`.
	pub async fn open(config: EngineConfig, store: Arc<dyn BlobStore>) -> Result<Self, SyncError> {
		let identity = crypto::load_identity(&config.identity_path).await?;
		info!("engine: opened for tree {}", config.tree_root.display());
		Ok(Self::new(config, identity, store))
	}

	pub fn tree_root(&self) -> &std::path::Path {
		&self.config.tree_root
	}

	/// Push local changes to the bucket.
	pub async fn push(&self, cancel: &CancellationToken) -> Result<PushResult, SyncError> {
		self.push_with_progress(cancel, &NullProgressCallback).await
	}

	pub async fn push_with_progress(
		&self,
		cancel: &CancellationToken,
		progress: &dyn ProgressCallback,
	) -> Result<PushResult, SyncError> {
		let recipient = self.identity.to_public();
		push::push(
			&self.config.tree_root,
			&self.config.sync_paths,
			&self.config.identity_path,
			&self.state_manager,
			self.store.as_ref(),
			&recipient,
			cancel,
			progress,
		)
		.await
	}

	/// Pull remote changes into the working tree.
	pub async fn pull(&self, cancel: &CancellationToken) -> Result<PullResult, SyncError> {
		self.pull_with_progress(cancel, &NullProgressCallback).await
	}

	pub async fn pull_with_progress(
		&self,
		cancel: &CancellationToken,
		progress: &dyn ProgressCallback,
	) -> Result<PullResult, SyncError> {
		pull::pull(
			&self.config.tree_root,
			&self.config.sync_paths,
			&self.identity,
			&self.state_manager,
			self.store.as_ref(),
			cancel,
			progress,
		)
		.await
	}

	/// Preview what a pull would do without writing anything.
	pub async fn preview_pull(&self) -> Result<Preview, SyncError> {
		pull::preview_pull(&self.config.tree_root, &self.config.sync_paths, &self.state_manager, self.store.as_ref())
			.await
	}

	/// Verify the configured identity matches the bucket's contents.
	pub async fn verify_key_matches_remote(&self) -> crate::probe::ProbeOutcome {
		crate::probe::verify_key_matches_remote(self.store.as_ref(), &self.identity).await
	}

	/// Snapshot the working-tree subset before a destructive pull.
	pub async fn create_backup(&self) -> Result<PathBuf, SyncError> {
		crate::backup::create_backup(&self.config.tree_root, &self.config.sync_paths).await
	}

	/// Remove a set of object keys from the bucket directly, bypassing the
	/// per-path walk-and-diff that `push` does. Useful for pruning orphaned
	/// objects a caller has identified some other way (e.g. a stale-object
	/// sweep). Fans out with at most `config.max_concurrent_ops` deletes in
	/// flight.
	pub async fn delete_batch(&self, keys: &[String], cancel: &CancellationToken) -> Result<(), SyncError> {
		self.store.delete_batch(keys, self.config.max_concurrent_ops, cancel).await.map_err(Into::into)
	}
}


// vim: ts=4
