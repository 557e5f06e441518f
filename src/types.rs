//! Core data types for the sync engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Wall-clock instant as stored in persistent state; rendered as ISO-8601 on the wire.
pub type Instant = DateTime<Utc>;

/// The sentinel used throughout the state layer to mean "never happened":
/// `last_sync`, `last_push`, `last_pull` are wall-clock instants, zero if never.
pub fn zero_instant() -> Instant {
	DateTime::from_timestamp(0, 0).expect("unix epoch is representable")
}

pub fn is_zero_instant(instant: &Instant) -> bool {
	*instant == zero_instant()
}

pub fn now() -> Instant {
	Utc::now()
}

/// A POSIX-style, forward-slash relative path rooted at the working-tree base.
///
/// Paths always use `/` regardless of the host separator, so they double
/// directly as bucket-key material.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelPath(String);

impl RelPath {
	pub fn new(s: impl Into<String>) -> Self {
		RelPath(s.into())
	}

	/// Build a relative path from an absolute filesystem path known to live
	/// under `root`. Returns `None` if `abs` escapes `root` or if any
	/// component isn't a plain name (e.g. `..`).
	pub fn from_root(root: &Path, abs: &Path) -> Option<Self> {
		let rel = abs.strip_prefix(root).ok()?;
		let mut parts = Vec::new();
		for component in rel.components() {
			match component {
				Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
				_ => return None,
			}
		}
		if parts.is_empty() {
			return None;
		}
		Some(RelPath(parts.join("/")))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// The bucket key for this path: the relative path with `.age` appended,
	/// e.g. `<relative/path>.age`.
	pub fn object_key(&self) -> String {
		format!("{}.age", self.0)
	}

	/// Recover a relative path from a bucket key, iff it ends in `.age`.
	/// Keys not matching the suffix are forward-compatibility noise and
	/// must be ignored by callers.
	pub fn from_object_key(key: &str) -> Option<Self> {
		key.strip_suffix(".age").map(|s| RelPath(s.to_string()))
	}

	/// Resolve this relative path onto a filesystem root.
	pub fn resolve(&self, root: &Path) -> PathBuf {
		let mut p = root.to_path_buf();
		for part in self.0.split('/') {
			p.push(part);
		}
		p
	}

	/// True if this path is a conflict sidecar and must never be synced.
	pub fn is_conflict_sidecar(&self) -> bool {
		is_conflict_sidecar_name(&self.0)
	}
}

impl std::fmt::Display for RelPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// True if `name` contains the `.conflict.` sidecar marker anywhere in its
/// text. The walker applies this to a path's base name; `RelPath` applies it
/// to the whole relative string, which is equivalent since the marker can
/// only legitimately appear in the final component.
pub fn is_conflict_sidecar_name(name: &str) -> bool {
	name.contains(".conflict.")
}

/// Metadata the tree walker observes for a working-tree entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileMetadata {
	pub size: u64,
	pub mtime: Instant,
}

/// One entry produced by the tree walker.
#[derive(Debug, Clone)]
pub struct WalkEntry {
	pub path: RelPath,
	pub metadata: FileMetadata,
}

/// One per tracked path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStateRecord {
	/// Last known content fingerprint (SHA-256 hex).
	pub hash: String,

	/// Last known byte length.
	pub size: u64,

	/// The working-tree entry's modification instant at the time this record was written.
	pub mod_time: Instant,

	/// Wall-clock instant the engine last sent or received-and-trusted this
	/// path, zero if it has only ever been observed, never synced.
	#[serde(default = "zero_instant")]
	pub uploaded: Instant,
}

/// Metadata observable about a remote object.
#[derive(Debug, Clone)]
pub struct RemoteObjectMeta {
	pub key: String,
	pub size: u64,
	pub last_modified: Instant,
	pub etag: String,
}


// vim: ts=4
