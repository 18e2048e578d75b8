//! User domain module (state-stored, event-recorded).
//!
//! This crate contains the user aggregate and its event vocabulary, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod events;
pub mod user;

pub use events::{UserCreated, UserEvent, UserUpdated};
pub use user::{CredentialSecret, User, UserDraft, UserId};
