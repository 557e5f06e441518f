//! The encryption envelope.
//!
//! Deterministic-keyed authenticated encryption over arbitrary byte
//! sequences, built on the real `age` file-encryption format (X25519
//! recipients, HKDF-SHA-256, ChaCha20-Poly1305 over fixed-size chunks).
//! Key derivation from a passphrase uses a fixed salt so independent devices
//! agree on an identity without any out-of-band exchange — see §9 of the
//! design notes for the trade-off this accepts.

use crate::error::SyncError;
use age::secrecy::ExposeSecret;
use argon2::{Algorithm, Argon2, Params, Version};
use bech32::{ToBase32, Variant};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::str::FromStr;

const FIXED_SALT_INPUT: &[u8] = b"claude-sync-v1";
const ARGON2_MEMORY_KIB: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;
const BECH32_HRP: &str = "age-secret-key-";
const MIN_PASSPHRASE_LEN: usize = 8;

/// Encrypt `plaintext` to `recipient`. A fresh ephemeral sender scalar is
/// used on every call, so encrypting identical plaintext twice yields
/// distinct ciphertext.
pub fn encrypt(plaintext: &[u8], recipient: &age::x25519::Recipient) -> Result<Vec<u8>, SyncError> {
	let encryptor = age::Encryptor::with_recipients(vec![Box::new(recipient.clone())])
		.ok_or_else(|| SyncError::Other { message: "no recipients given to encryptor".into() })?;

	let mut ciphertext = Vec::new();
	let mut writer = encryptor
		.wrap_output(&mut ciphertext)
		.map_err(|e| SyncError::Other { message: format!("encrypt: {}", e) })?;
	writer.write_all(plaintext)?;
	writer.finish().map_err(|e| SyncError::Other { message: format!("encrypt: {}", e) })?;
	Ok(ciphertext)
}

/// Decrypt `ciphertext` with `identity`. "Not encrypted to this identity" and
/// "tampered / truncated" are deliberately collapsed into a single
/// `SyncError::Integrity` here; callers needing the `KeyDecryptFailure`
/// framing apply it at the call site (pull per-path errors, or the probe in
/// `probe.rs`).
pub fn decrypt(ciphertext: &[u8], identity: &age::x25519::Identity) -> Result<Vec<u8>, SyncError> {
	let decryptor = match age::Decryptor::new(ciphertext)
		.map_err(|e| SyncError::Integrity { message: e.to_string() })?
	{
		age::Decryptor::Recipients(d) => d,
		age::Decryptor::Passphrase(_) => {
			return Err(SyncError::Integrity { message: "envelope is passphrase-encrypted, expected recipient form".into() })
		}
	};

	let identities: [&dyn age::Identity; 1] = [identity];
	let mut reader = decryptor
		.decrypt(identities.into_iter())
		.map_err(|e| SyncError::Integrity { message: e.to_string() })?;

	let mut plaintext = Vec::new();
	reader
		.read_to_end(&mut plaintext)
		.map_err(|e| SyncError::Integrity { message: e.to_string() })?;
	Ok(plaintext)
}

/// Generate a fresh, random identity. Used on first setup when the user
/// chooses not to derive from a passphrase.
pub fn generate_random_identity() -> age::x25519::Identity {
	age::x25519::Identity::generate()
}

/// Deterministically derive an identity from a passphrase via Argon2id. The
/// salt is a fixed 32-byte constant, NOT per-user — substituting a random
/// salt breaks cross-device key agreement and MUST NOT be done.
pub fn derive_identity_from_passphrase(passphrase: &str) -> Result<age::x25519::Identity, SyncError> {
	if passphrase.len() < MIN_PASSPHRASE_LEN {
		return Err(SyncError::Other {
			message: format!("passphrase must be at least {} bytes", MIN_PASSPHRASE_LEN),
		});
	}

	let salt = fixed_salt();

	let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, Some(ARGON2_OUTPUT_LEN))
		.map_err(|e| SyncError::Other { message: format!("argon2 params: {}", e) })?;
	let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

	let mut raw = [0u8; ARGON2_OUTPUT_LEN];
	argon2
		.hash_password_into(passphrase.as_bytes(), &salt, &mut raw)
		.map_err(|e| SyncError::Other { message: format!("argon2 derivation: {}", e) })?;

	clamp(&mut raw);

	let encoded = bech32::encode(BECH32_HRP, raw.to_base32(), Variant::Bech32)
		.map_err(|e| SyncError::Other { message: format!("bech32 encode: {}", e) })?
		.to_uppercase();

	age::x25519::Identity::from_str(&encoded)
		.map_err(|e| SyncError::Other { message: format!("derived identity is not a valid age key: {}", e) })
}

fn fixed_salt() -> [u8; 32] {
	let mut hasher = Sha256::new();
	hasher.update(FIXED_SALT_INPUT);
	let digest = hasher.finalize();
	let mut salt = [0u8; 32];
	salt.copy_from_slice(&digest);
	salt
}

/// Curve25519 scalar clamping, applied to the raw Argon2id output before
/// bech32-encoding it.
fn clamp(raw: &mut [u8; 32]) {
	raw[0] &= 0xF8;
	raw[31] &= 0x7F;
	raw[31] |= 0x40;
}

/// Read the identity file: one UPPERCASE bech32 line, HRP
/// `age-secret-key-`, trailing newline permitted.
pub async fn load_identity(path: &Path) -> Result<age::x25519::Identity, SyncError> {
	let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
		if e.kind() == std::io::ErrorKind::NotFound {
			SyncError::ConfigMissing { path: path.display().to_string() }
		} else {
			SyncError::Io(e)
		}
	})?;
	let line = contents.trim();
	age::x25519::Identity::from_str(line)
		.map_err(|e| SyncError::Other { message: format!("invalid identity file {}: {}", path.display(), e) })
}

/// Write the identity file, creating it with owner-only permissions
/// (mode 0600).
pub async fn save_identity(path: &Path, identity: &age::x25519::Identity) -> Result<(), SyncError> {
	let line = format!("{}\n", identity.to_string().expose_secret());
	tokio::fs::write(path, line).await?;
	let permissions = std::fs::Permissions::from_mode(0o600);
	tokio::fs::set_permissions(path, permissions).await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip_encrypt_decrypt() {
		// round-tripping through encrypt/decrypt recovers the original plaintext
		let identity = generate_random_identity();
		let recipient = identity.to_public();
		let ciphertext = encrypt(b"Hello, world!", &recipient).unwrap();
		let plaintext = decrypt(&ciphertext, &identity).unwrap();
		assert_eq!(plaintext, b"Hello, world!");
	}

	#[test]
	fn encrypting_twice_yields_distinct_ciphertext() {
		let identity = generate_random_identity();
		let recipient = identity.to_public();
		let a = encrypt(b"same bytes", &recipient).unwrap();
		let b = encrypt(b"same bytes", &recipient).unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn derivation_is_deterministic() {
		// deriving from the same passphrase twice yields the same identity
		let a = derive_identity_from_passphrase("correct horse battery staple").unwrap();
		let b = derive_identity_from_passphrase("correct horse battery staple").unwrap();
		assert_eq!(a.to_string().expose_secret(), b.to_string().expose_secret());
	}

	#[test]
	fn different_passphrases_derive_different_identities() {
		// deriving from two different passphrases yields different identities
		let a = derive_identity_from_passphrase("passphrase number one").unwrap();
		let b = derive_identity_from_passphrase("passphrase number two").unwrap();
		assert_ne!(a.to_string().expose_secret(), b.to_string().expose_secret());
	}

	#[test]
	fn cross_device_decryption_works() {
		// independently-derived identities from the same passphrase must
		// decrypt ciphertext produced for either's recipient.
		let id_a = derive_identity_from_passphrase("shared device passphrase").unwrap();
		let id_b = derive_identity_from_passphrase("shared device passphrase").unwrap();
		let ciphertext = encrypt(b"config payload", &id_a.to_public()).unwrap();
		let plaintext = decrypt(&ciphertext, &id_b).unwrap();
		assert_eq!(plaintext, b"config payload");
	}

	#[test]
	fn derived_identity_is_bech32_uppercase() {
		let identity = derive_identity_from_passphrase("another long passphrase").unwrap();
		let text = identity.to_string();
		let text = text.expose_secret();
		assert!(text.starts_with("AGE-SECRET-KEY-1"));
		assert_eq!(text, &text.to_uppercase());
	}

	#[test]
	fn short_passphrase_is_rejected() {
		let err = derive_identity_from_passphrase("short").unwrap_err();
		assert!(matches!(err, SyncError::Other { .. }));
	}

	#[test]
	fn decrypting_with_wrong_identity_fails() {
		let id_a = generate_random_identity();
		let id_b = generate_random_identity();
		let ciphertext = encrypt(b"secret", &id_a.to_public()).unwrap();
		let err = decrypt(&ciphertext, &id_b).unwrap_err();
		assert!(matches!(err, SyncError::Integrity { .. }));
	}

	#[tokio::test]
	async fn save_then_load_identity_round_trips() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("age-key.txt");
		let identity = generate_random_identity();
		save_identity(&path, &identity).await.unwrap();

		let metadata = tokio::fs::metadata(&path).await.unwrap();
		assert_eq!(metadata.permissions().mode() & 0o777, 0o600);

		let loaded = load_identity(&path).await.unwrap();
		assert_eq!(loaded.to_string().expose_secret(), identity.to_string().expose_secret());
	}

	#[tokio::test]
	async fn load_missing_identity_file_is_config_missing() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("does-not-exist.txt");
		let err = load_identity(&path).await.unwrap_err();
		assert!(matches!(err, SyncError::ConfigMissing { .. }));
	}
}

// vim: ts=4
