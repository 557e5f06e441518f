//! Content fingerprinting.
//!
//! Fingerprints are SHA-256 over the full byte content, lowercase hex,
//! computed streaming so the working set stays bounded for large files.

use sha2::{Digest, Sha256};
use std::io;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Fingerprint of bytes already in memory (used by the push path to avoid
/// a second read of a file it just loaded).
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
	let mut hasher = Sha256::new();
	hasher.update(bytes);
	hex::encode(hasher.finalize())
}

/// Fingerprint a file on disk, streaming its contents in fixed-size reads.
pub async fn fingerprint_file(path: &std::path::Path) -> io::Result<String> {
	let mut file = File::open(path).await?;
	let mut hasher = Sha256::new();
	let mut buf = vec![0u8; READ_CHUNK];
	loop {
		let n = file.read(&mut buf).await?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fingerprint_bytes_matches_known_vector() {
		// known SHA-256 test vector: SHA-256("Hello")
		let digest = fingerprint_bytes(b"Hello");
		assert_eq!(digest, "185f8db32271fe25f561a6fc938b2e264306ec304eda518007d1764826381969");
	}

	#[test]
	fn identical_bytes_produce_identical_fingerprints() {
		assert_eq!(fingerprint_bytes(b"same content"), fingerprint_bytes(b"same content"));
	}

	#[test]
	fn one_byte_change_produces_different_fingerprint() {
		assert_ne!(fingerprint_bytes(b"content-a"), fingerprint_bytes(b"content-b"));
	}

	#[tokio::test]
	async fn fingerprint_file_matches_in_memory_fingerprint() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("f.txt");
		tokio::fs::write(&path, b"Hello").await.unwrap();
		let from_disk = fingerprint_file(&path).await.unwrap();
		assert_eq!(from_disk, fingerprint_bytes(b"Hello"));
	}
}

// vim: ts=4
