//! Key-match probe: verify the configured identity matches the bucket.

use crate::blob_store::BlobStore;
use crate::config::PROBE_SMALL_OBJECT_THRESHOLD;
use crate::crypto;
use crate::error::SyncError;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
	Ok,
	KeyMismatch,
	Inconclusive,
}

/// Attempt decryption of one small existing remote object.
pub async fn verify_key_matches_remote(
	store: &dyn BlobStore,
	identity: &age::x25519::Identity,
) -> ProbeOutcome {
	let objects = match store.list("").await {
		Ok(objects) => objects,
		Err(e) => {
			warn!("probe: could not list bucket, inconclusive: {}", e);
			return ProbeOutcome::Inconclusive;
		}
	};

	if objects.is_empty() {
		info!("probe: bucket is empty, nothing to verify against");
		return ProbeOutcome::Ok;
	}

	let candidate = pick_candidate(&objects);

	let ciphertext = match store.download(&candidate.key).await {
		Ok(bytes) => bytes,
		Err(e) => {
			warn!("probe: could not download candidate {}, inconclusive: {}", candidate.key, e);
			return ProbeOutcome::Inconclusive;
		}
	};

	match crypto::decrypt(&ciphertext, identity) {
		Ok(_) => {
			info!("probe: identity matches bucket contents");
			ProbeOutcome::Ok
		}
		Err(_) => {
			warn!("probe: identity does not decrypt candidate {}", candidate.key);
			ProbeOutcome::KeyMismatch
		}
	}
}

fn pick_candidate(objects: &[crate::types::RemoteObjectMeta]) -> &crate::types::RemoteObjectMeta {
	objects
		.iter()
		.filter(|o| o.size > 0 && o.size < PROBE_SMALL_OBJECT_THRESHOLD)
		.min_by_key(|o| o.size)
		.unwrap_or(&objects[0])
}

impl From<ProbeOutcome> for Option<SyncError> {
	fn from(outcome: ProbeOutcome) -> Self {
		match outcome {
			ProbeOutcome::Ok => None,
			ProbeOutcome::KeyMismatch => Some(SyncError::KeyMismatch),
			ProbeOutcome::Inconclusive => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::blob_store::memory::MemoryBlobStore;

	#[tokio::test]
	async fn empty_bucket_is_ok() {
		let store = MemoryBlobStore::new();
		let identity = crypto::generate_random_identity();
		assert_eq!(verify_key_matches_remote(&store, &identity).await, ProbeOutcome::Ok);
	}

	#[tokio::test]
	async fn matching_identity_is_ok() {
		let store = MemoryBlobStore::new();
		let identity = crypto::generate_random_identity();
		let ciphertext = crypto::encrypt(b"small", &identity.to_public()).unwrap();
		store.upload("a.txt.age", &ciphertext).await.unwrap();
		assert_eq!(verify_key_matches_remote(&store, &identity).await, ProbeOutcome::Ok);
	}

	#[tokio::test]
	async fn mismatched_identity_is_key_mismatch() {
		// a device with the wrong identity is detected before it overwrites anything
		let store = MemoryBlobStore::new();
		let id_a = crypto::generate_random_identity();
		let id_b = crypto::generate_random_identity();
		let ciphertext = crypto::encrypt(b"small", &id_a.to_public()).unwrap();
		store.upload("a.txt.age", &ciphertext).await.unwrap();
		assert_eq!(verify_key_matches_remote(&store, &id_b).await, ProbeOutcome::KeyMismatch);
	}

	#[tokio::test]
	async fn prefers_smallest_object_under_threshold() {
		let store = MemoryBlobStore::new();
		let identity = crypto::generate_random_identity();
		let big = vec![0u8; 20_000];
		let small = vec![0u8; 10];
		store.upload("big.age", &crypto::encrypt(&big, &identity.to_public()).unwrap()).await.unwrap();
		store.upload("small.age", &crypto::encrypt(&small, &identity.to_public()).unwrap()).await.unwrap();

		let objects = store.list("").await.unwrap();
		let candidate = pick_candidate(&objects);
		assert_eq!(candidate.key, "small.age");
	}
}

// vim: ts=4
