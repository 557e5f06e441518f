//! In-memory engine configuration.
//!
//! This is NOT file-backed: parsing a configuration file and storing
//! credentials on disk stays the caller's concern. `EngineConfig` exists
//! only to centralize the small number of constants the engine's own
//! algorithms need, rather than sprinkling magic numbers at call sites.

/// Objects below this size are preferred candidates for the key-match probe.
pub const PROBE_SMALL_OBJECT_THRESHOLD: u64 = 10_000;

/// Maximum concurrent bucket operations for batch upload/download/delete.
pub const MAX_CONCURRENT_BUCKET_OPS: usize = 10;

/// Format string for conflict-sidecar and backup-directory timestamps:
/// `YYYYMMDD-HHMMSS`, zero-padded.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Host-provided parameters the engine is constructed with.
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Absolute path to the working-tree root.
	pub tree_root: std::path::PathBuf,

	/// Ordered list of top-level names under `tree_root` the engine considers.
	pub sync_paths: Vec<String>,

	/// Path to the encryption identity file.
	pub identity_path: std::path::PathBuf,

	/// Path to the state file.
	pub state_path: std::path::PathBuf,

	/// Maximum concurrent bucket operations; defaults to
	/// `MAX_CONCURRENT_BUCKET_OPS` but may be lowered by a caller running in
	/// a constrained environment.
	pub max_concurrent_ops: usize,
}

impl EngineConfig {
	pub fn new(
		tree_root: impl Into<std::path::PathBuf>,
		sync_paths: Vec<String>,
		identity_path: impl Into<std::path::PathBuf>,
		state_path: impl Into<std::path::PathBuf>,
	) -> Self {
		EngineConfig {
			tree_root: tree_root.into(),
			sync_paths,
			identity_path: identity_path.into(),
			state_path: state_path.into(),
			max_concurrent_ops: MAX_CONCURRENT_BUCKET_OPS,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_config_defaults_concurrency_cap() {
		let config = EngineConfig::new("/tree", vec!["CLAUDE.md".to_string()], "/tree/age-key.txt", "/tree/state.json");
		assert_eq!(config.max_concurrent_ops, MAX_CONCURRENT_BUCKET_OPS);
		assert_eq!(config.sync_paths, vec!["CLAUDE.md".to_string()]);
	}
}

// vim: ts=4
