use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chronicle_core::{AggregateId, AggregateRoot, DomainError};

/// User identifier (assigned by storage on create).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub AggregateId);

impl UserId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0.get()
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<UserId> for AggregateId {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        AggregateId::new(value).map(Self)
    }
}

impl core::str::FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AggregateId>().map(Self)
    }
}

/// A credential (e.g. password) kept in comparable form.
///
/// The value is opaque to this crate; equality is what the write path uses to
/// tell whether an update changed it. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSecret(String);

impl CredentialSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CredentialSecret(<redacted>)")
    }
}

/// Input for creating a user or overwriting its mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub credential_secret: CredentialSecret,
}

impl UserDraft {
    pub fn new(name: impl Into<String>, credential_secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credential_secret: CredentialSecret::new(credential_secret),
        }
    }
}

/// Aggregate root: User.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: String,
    credential_secret: CredentialSecret,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Rebuild a user from its persisted columns.
    pub fn from_parts(
        id: UserId,
        name: impl Into<String>,
        credential_secret: CredentialSecret,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            credential_secret,
            created_at,
            updated_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credential_secret(&self) -> &CredentialSecret {
        &self.credential_secret
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Apply a draft at time `now`, returning the post-update state.
    ///
    /// `id` and `created_at` are untouched; `updated_at` never moves backwards.
    pub fn revised(&self, draft: &UserDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            name: draft.name.clone(),
            credential_secret: draft.credential_secret.clone(),
            created_at: self.created_at,
            updated_at: now.max(self.updated_at),
        }
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    const KIND: &'static str = "user";

    fn id(&self) -> Self::Id {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
