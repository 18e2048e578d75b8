use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chronicle_core::{AggregateRoot, DomainError, DomainResult, EventId};
use chronicle_events::{DecodedEvent, Payload};
use chronicle_infra::EventWindow;
use chronicle_users::{User, UserDraft};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /users` and `PUT /users/:id`.
#[derive(Deserialize)]
pub struct UserRequest {
    pub name: String,
    pub password: String,
}

impl UserRequest {
    pub fn into_draft(self) -> DomainResult<UserDraft> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        Ok(UserDraft::new(self.name, self.password))
    }
}

/// `?since=<rfc3339>&limit=<n>&after=<event id>`
///
/// `after` breaks ties at `since`, so it is only accepted together with it.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub after: Option<i64>,
}

impl EventsQuery {
    pub fn into_window(self) -> DomainResult<EventWindow> {
        if self.after.is_some() && self.since.is_none() {
            return Err(DomainError::validation("`after` requires `since`"));
        }

        let mut window = EventWindow::new(self.since, self.limit);
        if let Some(raw) = self.after {
            window.after = Some(EventId::new(raw)?);
        }
        Ok(window)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOut {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserOut {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().get(),
            name: user.name().to_string(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOut {
    pub id: i64,
    pub aggregate_id: i64,
    pub aggregate_kind: String,
    pub kind: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub data: Payload,
}

impl From<DecodedEvent> for EventOut {
    fn from(event: DecodedEvent) -> Self {
        Self {
            id: event.id().get(),
            aggregate_id: event.aggregate_id().get(),
            aggregate_kind: event.aggregate_kind().to_string(),
            kind: event.kind().to_string(),
            version: event.version().to_string(),
            created_at: event.created_at(),
            data: event.into_payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        let req = UserRequest {
            name: "  ".to_string(),
            password: "pw".to_string(),
        };
        assert!(matches!(req.into_draft(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn non_positive_cursor_is_rejected() {
        let query = EventsQuery {
            since: Some(Utc::now()),
            after: Some(0),
            ..EventsQuery::default()
        };
        assert!(matches!(query.into_window(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn cursor_requires_since() {
        let query = EventsQuery {
            after: Some(4),
            ..EventsQuery::default()
        };
        assert!(matches!(query.into_window(), Err(DomainError::Validation(_))));

        let since = Utc::now();
        let window = EventsQuery {
            since: Some(since),
            after: Some(4),
            limit: None,
        }
        .into_window()
        .unwrap();
        assert_eq!(window.since, since);
        assert_eq!(window.after, Some(EventId::new(4).unwrap()));
    }

    #[test]
    fn empty_query_uses_default_window() {
        let window = EventsQuery::default().into_window().unwrap();
        assert_eq!(window.limit, 20);
        assert!(window.after.is_none());
    }
}
