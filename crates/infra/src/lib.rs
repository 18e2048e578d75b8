//! Infrastructure layer: storage backends, the user repository, the event log,
//! and the transaction coordinator that ties a mutation to its event.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event_store;
pub mod repository;
pub mod service;


pub use backend::{Backend, InMemoryBackend, PostgresBackend};
pub use config::{AppConfig, ConfigError, DatabaseConfig, StorageKind};
pub use coordinator::{AtomicScope, CommandError, Committed, ScopeFuture, TransactionCoordinator};
pub use error::PersistenceError;
pub use event_store::{EventStore, EventWindow, InMemoryEventStore, PostgresEventStore, UncommittedEvent};
pub use repository::{InMemoryUserRepository, PostgresUserRepository, RepositoryError, UserRepository};
pub use service::{decode_events, InMemoryUserService, PostgresUserService, QueryError, UserService};
