//! Append-only event log boundary.
//!
//! Appends happen inside the caller's transaction; reads are windowed by a
//! `since` cursor and a page size.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::{EventWindow, DEFAULT_LIMIT, MAX_LIMIT};
pub use r#trait::{EventStore, UncommittedEvent};
