//! Operation surface for callers (HTTP adapter, tests, tools).
//!
//! Commands go through the [`TransactionCoordinator`]; queries read committed
//! state directly.

use thiserror::Error;
use tracing::instrument;

use chronicle_core::Mutation;
use chronicle_events::{CodecError, DecodedEvent, StoredEvent};
use chronicle_users::{User, UserDraft, UserEvent, UserId};

use crate::backend::{Backend, InMemoryBackend, PostgresBackend};
use crate::coordinator::{CommandError, Committed, TransactionCoordinator};
use crate::error::PersistenceError;
use crate::event_store::{EventStore, EventWindow, InMemoryEventStore, PostgresEventStore};
use crate::repository::{
    InMemoryUserRepository, PostgresUserRepository, RepositoryError, UserRepository,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("user {0} not found")]
    NotFound(UserId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("failed to decode event payload: {0}")]
    Decode(#[from] CodecError),
}

impl From<RepositoryError> for QueryError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(id) => QueryError::NotFound(id),
            RepositoryError::Persistence(e) => QueryError::Persistence(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserService<B, R, S> {
    repository: R,
    coordinator: TransactionCoordinator<B, S>,
}

pub type InMemoryUserService =
    UserService<InMemoryBackend, InMemoryUserRepository, InMemoryEventStore>;

pub type PostgresUserService =
    UserService<PostgresBackend, PostgresUserRepository, PostgresEventStore>;

impl InMemoryUserService {
    pub fn in_memory(backend: InMemoryBackend) -> Self {
        let repository = InMemoryUserRepository::new(&backend);
        let store = InMemoryEventStore::new(&backend);
        Self::new(backend, repository, store)
    }
}

impl PostgresUserService {
    pub fn postgres(backend: PostgresBackend) -> Self {
        let repository = PostgresUserRepository::new(backend.pool().clone());
        let store = PostgresEventStore::new(backend.pool().clone());
        Self::new(backend, repository, store)
    }
}

impl<B, R, S> UserService<B, R, S>
where
    B: Backend,
    R: UserRepository<Tx = B::Tx> + Clone + 'static,
    S: EventStore<Tx = B::Tx>,
{
    pub fn new(backend: B, repository: R, store: S) -> Self {
        Self {
            repository,
            coordinator: TransactionCoordinator::new(backend, store),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn coordinator(&self) -> &TransactionCoordinator<B, S> {
        &self.coordinator
    }

    /// Insert a user and append its `UserCreated` event.
    #[instrument(skip(self, draft), err)]
    pub async fn create_user(&self, draft: UserDraft) -> Result<Committed<User>, CommandError> {
        let repository = self.repository.clone();

        self.coordinator
            .execute(
                move |tx| {
                    Box::pin(async move {
                        let user = repository.create(tx, &draft).await?;
                        Ok::<_, RepositoryError>(Mutation::Created(user))
                    })
                },
                UserEvent::for_mutation,
            )
            .await
    }

    /// Overwrite a user's name and secret and append its `UserUpdated` event.
    ///
    /// The previous row is read under a row lock in the same transaction, so
    /// `passwordChanged` compares against the value this update replaced.
    #[instrument(skip(self, draft), fields(user_id = %id), err)]
    pub async fn update_user(
        &self,
        id: UserId,
        draft: UserDraft,
    ) -> Result<Committed<User>, CommandError> {
        let repository = self.repository.clone();

        self.coordinator
            .execute(
                move |tx| {
                    Box::pin(async move {
                        let before = repository.find_for_update(tx, id).await?;
                        let after = repository.update(tx, id, &draft).await?;
                        Ok::<_, RepositoryError>(Mutation::Updated { before, after })
                    })
                },
                UserEvent::for_mutation,
            )
            .await
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, QueryError> {
        Ok(self.repository.get_by_id(id).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, QueryError> {
        Ok(self.repository.list_all().await?)
    }

    pub async fn list_events(&self, window: EventWindow) -> Result<Vec<StoredEvent>, QueryError> {
        Ok(self.coordinator.store().query_global(window).await?)
    }

    /// Events for one user. An unknown id yields an empty page, not an error.
    pub async fn list_user_events(
        &self,
        id: UserId,
        window: EventWindow,
    ) -> Result<Vec<StoredEvent>, QueryError> {
        Ok(self
            .coordinator
            .store()
            .query_by_aggregate(id.into(), window)
            .await?)
    }
}

/// Decode a page of events into key-ordered maps for generic readers.
pub fn decode_events(events: Vec<StoredEvent>) -> Result<Vec<DecodedEvent>, QueryError> {
    events
        .into_iter()
        .map(|e| e.decode().map_err(QueryError::from))
        .collect()
}
