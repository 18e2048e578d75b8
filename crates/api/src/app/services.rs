//! Storage wiring: one handle over whichever backend the config selects.

use chronicle_events::StoredEvent;
use chronicle_infra::{
    AppConfig, CommandError, Committed, EventWindow, InMemoryBackend, InMemoryUserService,
    PersistenceError, PostgresBackend, PostgresUserService, QueryError, StorageKind,
};
use chronicle_users::{User, UserDraft, UserId};

#[derive(Debug, Clone)]
pub enum AppServices {
    InMemory(InMemoryUserService),
    Postgres(PostgresUserService),
}

macro_rules! with_service {
    ($self:expr, $svc:ident => $body:expr) => {
        match $self {
            AppServices::InMemory($svc) => $body,
            AppServices::Postgres($svc) => $body,
        }
    };
}

impl AppServices {
    pub fn in_memory() -> Self {
        AppServices::InMemory(InMemoryUserService::in_memory(InMemoryBackend::new()))
    }

    /// Open the configured backend. Postgres gets its tables created if missing.
    pub async fn connect(config: &AppConfig) -> Result<Self, PersistenceError> {
        match config.storage {
            StorageKind::Memory => {
                tracing::warn!("using in-memory storage; data is lost on exit");
                Ok(Self::in_memory())
            }
            StorageKind::Postgres => {
                let backend = PostgresBackend::connect(&config.database).await?;
                backend.ensure_schema().await?;
                Ok(AppServices::Postgres(PostgresUserService::postgres(backend)))
            }
        }
    }

    pub async fn create_user(&self, draft: UserDraft) -> Result<Committed<User>, CommandError> {
        with_service!(self, s => s.create_user(draft).await)
    }

    pub async fn update_user(
        &self,
        id: UserId,
        draft: UserDraft,
    ) -> Result<Committed<User>, CommandError> {
        with_service!(self, s => s.update_user(id, draft).await)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, QueryError> {
        with_service!(self, s => s.get_user(id).await)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, QueryError> {
        with_service!(self, s => s.list_users().await)
    }

    pub async fn list_events(&self, window: EventWindow) -> Result<Vec<StoredEvent>, QueryError> {
        with_service!(self, s => s.list_events(window).await)
    }

    pub async fn list_user_events(
        &self,
        id: UserId,
        window: EventWindow,
    ) -> Result<Vec<StoredEvent>, QueryError> {
        with_service!(self, s => s.list_user_events(id, window).await)
    }
}
