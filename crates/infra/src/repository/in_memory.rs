use async_trait::async_trait;
use chrono::Utc;

use chronicle_users::{User, UserDraft, UserId};

use super::{RepositoryError, UserRepository};
use crate::backend::{InMemoryBackend, MemoryTx};

/// In-memory user table backed by [`InMemoryBackend`].
#[derive(Debug, Clone)]
pub struct InMemoryUserRepository {
    backend: InMemoryBackend,
}

impl InMemoryUserRepository {
    pub fn new(backend: &InMemoryBackend) -> Self {
        Self {
            backend: backend.clone(),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    type Tx = MemoryTx;

    async fn create(&self, tx: &mut Self::Tx, draft: &UserDraft) -> Result<User, RepositoryError> {
        let id = tx.next_user_id()?;
        let now = Utc::now();
        let user = User::from_parts(id, draft.name.clone(), draft.credential_secret.clone(), now, now);

        tx.lock_row(id).await?;
        tx.stage_user(user.clone());
        Ok(user)
    }

    async fn find_for_update(&self, tx: &mut Self::Tx, id: UserId) -> Result<User, RepositoryError> {
        tx.lock_row(id).await?;
        tx.visible_user(id)?.ok_or(RepositoryError::NotFound(id))
    }

    async fn update(
        &self,
        tx: &mut Self::Tx,
        id: UserId,
        draft: &UserDraft,
    ) -> Result<User, RepositoryError> {
        let current = self.find_for_update(tx, id).await?;
        let updated = current.revised(draft, Utc::now());

        tx.stage_user(updated.clone());
        Ok(updated)
    }

    async fn get_by_id(&self, id: UserId) -> Result<User, RepositoryError> {
        let tables = self.backend.db().read()?;
        tables.users.get(&id).cloned().ok_or(RepositoryError::NotFound(id))
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let tables = self.backend.db().read()?;
        Ok(tables.users.values().cloned().collect())
    }
}
