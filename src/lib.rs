//! # claude-sync engine
//!
//! A cross-device synchronizer for a user-local configuration tree. It
//! maintains eventual consistency of a configured subset of that tree across
//! independently-operating devices by mediating through a shared,
//! client-side-encrypted object-store bucket.
//!
//! The crate's front door is [`engine::Engine`]: construct one with a working
//! tree, a sync-path set, an encryption identity, and a blob store, then call
//! [`engine::Engine::push`], [`engine::Engine::pull`], or
//! [`engine::Engine::preview_pull`].
//!
//! ```rust,ignore
//! use claude_sync::config::EngineConfig;
//! use claude_sync::engine::Engine;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::new(
//!         "/home/user/.claude",
//!         vec!["CLAUDE.md".to_string(), "agents".to_string()],
//!         "/home/user/.claude/age-key.txt",
//!         "/home/user/.claude/state.json",
//!     );
//!     let store = std::sync::Arc::new(my_adapter::MyBlobStore::new());
//!     let engine = Engine::open(config, store).await?;
//!     engine.push(&CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(dead_code)]

pub mod backup;
pub mod blob_store;
pub mod change;
pub mod config;
pub mod crypto;
pub mod digest;
pub mod engine;
pub mod error;
pub mod logging;
pub mod probe;
pub mod progress;
pub mod pull;
pub mod push;
pub mod state;
pub mod types;
pub mod walker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{BlobStoreError, PathError, StateError, SyncError};
pub use probe::ProbeOutcome;
pub use pull::{OverwriteCandidate, Preview, PullResult};
pub use push::PushResult;

// vim: ts=4
