//! Current-state storage for the user aggregate.
//!
//! Writes (`create`, `find_for_update`, `update`) run inside a caller-owned
//! transaction; reads go straight to committed state.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use chronicle_users::{User, UserDraft, UserId};

use crate::coordinator::CommandError;
use crate::error::PersistenceError;

pub use in_memory::InMemoryUserRepository;
pub use postgres::PostgresUserRepository;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("user {0} not found")]
    NotFound(UserId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<RepositoryError> for CommandError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(id) => CommandError::NotFound(id.into()),
            RepositoryError::Persistence(e) => CommandError::Persistence(e),
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    type Tx: Send + 'static;

    /// Insert a new user. Storage assigns the id; `created_at == updated_at`.
    async fn create(&self, tx: &mut Self::Tx, draft: &UserDraft) -> Result<User, RepositoryError>;

    /// Read a user and hold its row lock until `tx` ends.
    async fn find_for_update(&self, tx: &mut Self::Tx, id: UserId) -> Result<User, RepositoryError>;

    /// Overwrite name and secret, bump `updated_at`, return the new state.
    async fn update(
        &self,
        tx: &mut Self::Tx,
        id: UserId,
        draft: &UserDraft,
    ) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: UserId) -> Result<User, RepositoryError>;

    /// Every user, ordered by id ascending.
    async fn list_all(&self) -> Result<Vec<User>, RepositoryError>;
}

#[async_trait]
impl<R> UserRepository for Arc<R>
where
    R: UserRepository + ?Sized,
{
    type Tx = R::Tx;

    async fn create(&self, tx: &mut Self::Tx, draft: &UserDraft) -> Result<User, RepositoryError> {
        (**self).create(tx, draft).await
    }

    async fn find_for_update(&self, tx: &mut Self::Tx, id: UserId) -> Result<User, RepositoryError> {
        (**self).find_for_update(tx, id).await
    }

    async fn update(
        &self,
        tx: &mut Self::Tx,
        id: UserId,
        draft: &UserDraft,
    ) -> Result<User, RepositoryError> {
        (**self).update(tx, id, draft).await
    }

    async fn get_by_id(&self, id: UserId) -> Result<User, RepositoryError> {
        (**self).get_by_id(id).await
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        (**self).list_all().await
    }
}
