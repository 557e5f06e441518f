//! Error types for the sync engine

use std::error::Error;
use std::fmt;
use std::io;

/// Helper function to reduce Box::new() boilerplate when wrapping errors
#[inline]
pub fn boxed_error<E: Error + Send + Sync + 'static>(e: E) -> Box<dyn Error + Send + Sync> {
	Box::new(e)
}

/// Errors surfaced by the blob store abstraction
#[derive(Debug)]
pub enum BlobStoreError {
	/// Transient or permanent transport failure against the bucket
	Network { message: String },

	/// The bucket rejected credentials
	Auth { message: String },

	/// The bucket itself does not exist
	BucketNotFound,

	/// The requested key does not exist
	KeyMissing { key: String },

	/// One or more keys failed during a batch delete
	BatchFailed { failures: Vec<(String, String)> },

	/// Anything else the adapter can't classify
	Other { message: String },
}

impl fmt::Display for BlobStoreError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BlobStoreError::Network { message } => write!(f, "network error: {}", message),
			BlobStoreError::Auth { message } => write!(f, "auth error: {}", message),
			BlobStoreError::BucketNotFound => write!(f, "bucket does not exist"),
			BlobStoreError::KeyMissing { key } => write!(f, "key missing: {}", key),
			BlobStoreError::BatchFailed { failures } => {
				write!(f, "batch delete failed for {} key(s): ", failures.len())?;
				for (i, (key, message)) in failures.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{} ({})", key, message)?;
				}
				Ok(())
			}
			BlobStoreError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for BlobStoreError {}

/// Errors from the persistent state layer
#[derive(Debug)]
pub enum StateError {
	/// Failed to read or parse the state file
	LoadFailed { source: Box<dyn Error + Send + Sync> },

	/// Failed to write the state file
	SaveFailed { source: Box<dyn Error + Send + Sync> },

	/// The state file exists but its contents are not a valid sync state
	Corrupted { message: String },
}

impl fmt::Display for StateError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StateError::LoadFailed { source } => write!(f, "Failed to load state: {}", source),
			StateError::SaveFailed { source } => write!(f, "Failed to save state: {}", source),
			StateError::Corrupted { message } => write!(f, "State corrupted: {}", message),
		}
	}
}

impl Error for StateError {}

/// Unified error type returned by engine operations.
///
/// Per-file errors inside `push`/`pull` are collected into the operation's
/// result rather than surfaced through this type (see `PathError` below);
/// `SyncError` is reserved for failures that prevent an operation from
/// progressing at all.
#[derive(Debug)]
pub enum SyncError {
	/// Expected configuration or identity file absent
	ConfigMissing { path: String },

	/// A specific remote object could not be decrypted with the current identity
	KeyDecryptFailure { path: String },

	/// The key-match probe determined the bucket was written by a different identity
	KeyMismatch,

	/// Transient or permanent transport failure against the bucket
	Network { message: String },

	/// The bucket rejected credentials
	Auth { message: String },

	/// Local filesystem failure
	Io(io::Error),

	/// A decrypted payload was truncated or the envelope's tag was invalid.
	/// Deliberately indistinguishable from `KeyDecryptFailure` at the type
	/// level where the caller only needs "this object is unreadable".
	Integrity { message: String },

	/// The cancel token fired before the operation could complete
	Cancelled,

	/// Nested blob-store error that didn't map onto one of the variants above
	BlobStore(BlobStoreError),

	/// Nested persistent-state error
	State(StateError),

	/// Generic error message, used sparingly
	Other { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::ConfigMissing { path } => write!(f, "missing configuration: {}", path),
			SyncError::KeyDecryptFailure { path } => {
				write!(f, "failed to decrypt {} with the configured identity", path)
			}
			SyncError::KeyMismatch => {
				write!(f, "the configured identity does not match the bucket's contents")
			}
			SyncError::Network { message } => write!(f, "network error: {}", message),
			SyncError::Auth { message } => write!(f, "auth error: {}", message),
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Integrity { message } => write!(f, "integrity error: {}", message),
			SyncError::Cancelled => write!(f, "operation cancelled"),
			SyncError::BlobStore(e) => write!(f, "blob store error: {}", e),
			SyncError::State(e) => write!(f, "state error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<StateError> for SyncError {
	fn from(e: StateError) -> Self {
		SyncError::State(e)
	}
}

impl From<BlobStoreError> for SyncError {
	fn from(e: BlobStoreError) -> Self {
		match e {
			BlobStoreError::Network { message } => SyncError::Network { message },
			BlobStoreError::Auth { message } => SyncError::Auth { message },
			BlobStoreError::BucketNotFound => {
				SyncError::Other { message: "bucket does not exist".to_string() }
			}
			other => SyncError::BlobStore(other),
		}
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

/// A single path's failure inside a `push` or `pull`, collected into the
/// operation's result rather than propagated.
#[derive(Debug)]
pub struct PathError {
	pub path: String,
	pub error: SyncError,
}

impl fmt::Display for PathError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.path, self.error)
	}
}

// vim: ts=4
