//! tapedeck - Community Mixtape Playlist Engine
//!
//! Aggregates chat-submitted video links into rolling playlists, releases a
//! playlist once it is old enough and full enough, and retires archived
//! entries after a retention window.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`engine`] - Playlist lifecycle logic (open, add, remove, release, cleanup)
//! - [`router`] - Chat command parsing and dispatch
//! - [`scheduler`] - Periodic release and cleanup ticks
//! - [`store`] - Item and playlist persistence (SQLite)
//! - [`publisher`] - Remote playlist service client
//! - [`notifier`] - Release announcements (webhook)
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use tapedeck::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     tapedeck::commands::run(config).await?;
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod notifier;
pub mod publisher;
pub mod router;
pub mod scheduler;
pub mod store;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{EngineStatus, PlaylistEngine};
    pub use crate::error::{Error, Result};
    pub use crate::models::{Item, NewItem, Playlist, ReactionKind, ReleaseOutcome};
    pub use crate::router::{CommandRouter, Intent, ParsedCommand};
    pub use crate::store::{EntryStore, SharedEntryStore, SqliteEntryStore};
}

// Direct re-exports for convenience
pub use models::{Item, Playlist, ReactionKind, ReleaseOutcome};
