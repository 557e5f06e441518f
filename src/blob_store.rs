//! The abstract blob store capability.
//!
//! The engine depends only on this trait; it never sees a concrete transport.
//! The three real adapters (object-store-specific HTTP clients) are out of
//! scope for this crate and are supplied by the caller.

use crate::config::MAX_CONCURRENT_BUCKET_OPS;
use crate::error::BlobStoreError;
use crate::types::{Instant, RemoteObjectMeta};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub type BlobResult<T> = Result<T, BlobStoreError>;

/// Opaque key/value object store, plus batch delete and listing.
///
/// Cancellation during a blob-store call is surfaced by the engine wrapping
/// the call, not by the adapter itself: implementors don't need a dedicated
/// cancelled-error variant of their own, only to check `cancel` at their own
/// suspension points where a long-running batch method accepts one.
#[async_trait]
pub trait BlobStore: Send + Sync {
	async fn upload(&self, key: &str, bytes: &[u8]) -> BlobResult<()>;

	async fn download(&self, key: &str) -> BlobResult<Vec<u8>>;

	/// Idempotent: deleting an absent key is success.
	async fn delete(&self, key: &str) -> BlobResult<()>;

	/// Bulk delete. Fans out internally with at most `max_concurrent`
	/// concurrent deletes (callers typically pass `EngineConfig::max_concurrent_ops`,
	/// or `config::MAX_CONCURRENT_BUCKET_OPS` when no caller-supplied cap
	/// applies); an error on any key aborts the batch with an aggregate
	/// `BlobStoreError::BatchFailed` listing every failure.
	async fn delete_batch(&self, keys: &[String], max_concurrent: usize, cancel: &CancellationToken) -> BlobResult<()> {
		default_delete_batch(self, keys, max_concurrent, cancel).await
	}

	/// Lazily or eagerly, in any order; pagination is the adapter's concern.
	async fn list(&self, prefix: &str) -> BlobResult<Vec<RemoteObjectMeta>>;

	async fn head(&self, key: &str) -> BlobResult<RemoteObjectMeta>;

	/// Never an error for "bucket absent" — only for "could not determine".
	async fn bucket_exists(&self) -> BlobResult<bool>;
}

/// Default `delete_batch`: fan out with at most `max_concurrent` in flight
/// (clamped to at least 1), aggregating every failure rather than stopping
/// at the first.
async fn default_delete_batch(
	store: &(impl BlobStore + ?Sized),
	keys: &[String],
	max_concurrent: usize,
	cancel: &CancellationToken,
) -> BlobResult<()> {
	use futures::stream::{FuturesUnordered, StreamExt};

	let max_concurrent = max_concurrent.max(1);
	let mut failures = Vec::new();
	let mut in_flight = FuturesUnordered::new();
	let mut remaining = keys.iter();

	for key in remaining.by_ref().take(max_concurrent) {
		in_flight.push(delete_one(store, key, cancel));
	}

	while let Some((key, result)) = in_flight.next().await {
		if let Err(e) = result {
			failures.push((key, e.to_string()));
		}
		if let Some(next_key) = remaining.next() {
			in_flight.push(delete_one(store, next_key, cancel));
		}
	}

	if failures.is_empty() {
		Ok(())
	} else {
		Err(BlobStoreError::BatchFailed { failures })
	}
}

async fn delete_one(
	store: &(impl BlobStore + ?Sized),
	key: &str,
	cancel: &CancellationToken,
) -> (String, BlobResult<()>) {
	if cancel.is_cancelled() {
		return (key.to_string(), Err(BlobStoreError::Other { message: "cancelled".into() }));
	}
	(key.to_string(), store.delete(key).await)
}

/// Construct a `RemoteObjectMeta` for test doubles and in-memory adapters.
pub fn meta(key: impl Into<String>, size: u64, last_modified: Instant, etag: impl Into<String>) -> RemoteObjectMeta {
	RemoteObjectMeta { key: key.into(), size, last_modified, etag: etag.into() }
}


#[cfg(test)]
mod tests {
	use super::memory::MemoryBlobStore;
	use super::*;

	#[tokio::test]
	async fn upload_then_download_round_trips() {
		let store = MemoryBlobStore::new();
		store.upload("a.age", b"hello").await.unwrap();
		let bytes = store.download("a.age").await.unwrap();
		assert_eq!(bytes, b"hello");
	}

	#[tokio::test]
	async fn download_missing_key_errors() {
		let store = MemoryBlobStore::new();
		let err = store.download("missing.age").await.unwrap_err();
		assert!(matches!(err, BlobStoreError::KeyMissing { .. }));
	}

	#[tokio::test]
	async fn delete_is_idempotent() {
		let store = MemoryBlobStore::new();
		store.delete("never-existed.age").await.unwrap();
	}

	#[tokio::test]
	async fn delete_batch_removes_all_keys() {
		let store = MemoryBlobStore::new();
		store.upload("a.age", b"1").await.unwrap();
		store.upload("b.age", b"2").await.unwrap();
		let cancel = CancellationToken::new();
		store
			.delete_batch(&["a.age".to_string(), "b.age".to_string()], MAX_CONCURRENT_BUCKET_OPS, &cancel)
			.await
			.unwrap();
		assert!(store.list("").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn list_filters_by_prefix_and_ignores_non_age_keys_upstream() {
		let store = MemoryBlobStore::new();
		store.upload("agents/x.json.age", b"1").await.unwrap();
		store.upload("notes.txt.age", b"2").await.unwrap();
		let listed = store.list("agents/").await.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].key, "agents/x.json.age");
	}
}

// vim: ts=4
