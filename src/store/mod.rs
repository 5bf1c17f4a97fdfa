//! Durable storage for the two logical collections (`items`, `playlists`)
//!
//! The engine is the only writer; the scheduler and command router never
//! touch the store directly. Operations are atomic at the single-row level
//! only — there are no cross-collection transactions, so the engine orders
//! its writes to keep the item/playlist invariants eventually consistent.

mod repository;

pub use repository::{
    create_sqlite_store, EntryStore, MockEntryStore, SharedEntryStore, SqliteEntryStore,
};
