//! User event vocabulary, keyed by `(kind, version)`.
//!
//! Payloads are written untagged: the stored bytes hold only the variant's
//! fields, and `kind` / `version` live in their own columns.

use serde::{Deserialize, Serialize};

use chronicle_core::{AggregateRoot, Mutation};
use chronicle_events::{CodecError, Event, codec};

use crate::user::User;

pub const USER_CREATED: &str = "UserCreated";
pub const USER_UPDATED: &str = "UserUpdated";
pub const V1: &str = "v1";

/// Event: UserCreated (v1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreated {
    pub id: u64,
    pub name: String,
}

/// Event: UserUpdated (v1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdated {
    pub id: u64,
    pub name: String,
    pub password_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserEvent {
    Created(UserCreated),
    Updated(UserUpdated),
}

impl Event for UserEvent {
    fn kind(&self) -> &'static str {
        match self {
            UserEvent::Created(_) => USER_CREATED,
            UserEvent::Updated(_) => USER_UPDATED,
        }
    }

    fn version(&self) -> &'static str {
        V1
    }
}

impl UserEvent {
    /// Describe a committed-to-be mutation of a user.
    pub fn for_mutation(mutation: &Mutation<User>) -> Self {
        match mutation {
            Mutation::Created(user) => UserEvent::Created(UserCreated {
                id: user.id().get().unsigned_abs(),
                name: user.name().to_string(),
            }),
            Mutation::Updated { before, after } => UserEvent::Updated(UserUpdated {
                id: after.id().get().unsigned_abs(),
                name: after.name().to_string(),
                password_changed: before.credential_secret() != after.credential_secret(),
            }),
        }
    }

    /// Typed read path: pick the variant from the stored tags, then decode.
    pub fn decode(kind: &str, version: &str, payload: &[u8]) -> Result<Self, CodecError> {
        match (kind, version) {
            (USER_CREATED, V1) => codec::decode_as(payload).map(UserEvent::Created),
            (USER_UPDATED, V1) => codec::decode_as(payload).map(UserEvent::Updated),
            _ => Err(CodecError::Decode(format!(
                "unknown user event {kind}/{version}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{CredentialSecret, UserDraft, UserId};
    use chrono::Utc;
    use chronicle_events::encode_event;
    use proptest::prelude::*;

    fn user(id: i64, name: &str, secret: &str) -> User {
        let now = Utc::now();
        User::from_parts(
            UserId::try_from(id).unwrap(),
            name,
            CredentialSecret::new(secret),
            now,
            now,
        )
    }

    #[test]
    fn created_event_matches_wire_shape() {
        let event = UserEvent::for_mutation(&Mutation::Created(user(1, "alice", "s3cr3t")));
        let encoded = encode_event(&event).unwrap();

        assert_eq!(encoded.kind, "UserCreated");
        assert_eq!(encoded.version, "v1");
        assert_eq!(
            std::str::from_utf8(&encoded.payload).unwrap(),
            r#"{"id":1,"name":"alice"}"#
        );
    }

    #[test]
    fn updated_event_reports_unchanged_secret() {
        let before = user(1, "alice", "s3cr3t");
        let after = before.revised(&UserDraft::new("alicia", "s3cr3t"), Utc::now());

        let event = UserEvent::for_mutation(&Mutation::Updated { before, after });
        assert_eq!(
            event,
            UserEvent::Updated(UserUpdated {
                id: 1,
                name: "alicia".into(),
                password_changed: false,
            })
        );
    }

    #[test]
    fn updated_event_reports_changed_secret() {
        let before = user(1, "alice", "s3cr3t");
        let after = before.revised(&UserDraft::new("alice", "other"), Utc::now());

        let event = UserEvent::for_mutation(&Mutation::Updated { before, after });
        assert!(matches!(
            event,
            UserEvent::Updated(UserUpdated { password_changed: true, .. })
        ));
        assert_eq!(
            std::str::from_utf8(&encode_event(&event).unwrap().payload).unwrap(),
            r#"{"id":1,"name":"alice","passwordChanged":true}"#
        );
    }

    #[test]
    fn decode_rejects_unknown_tags() {
        let err = UserEvent::decode("UserDeleted", "v1", br#"{"id":1}"#).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));

        let err = UserEvent::decode(USER_CREATED, "v2", br#"{"id":1,"name":"a"}"#).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    proptest! {
        #[test]
        fn typed_round_trip(id in 1i64..i64::MAX, name in "[A-Za-z][A-Za-z0-9 ]{0,31}", changed in any::<bool>()) {
            let before = user(id, &name, "old");
            let secret = if changed { "new" } else { "old" };
            let after = before.revised(&UserDraft::new(name.clone(), secret), Utc::now());

            let event = UserEvent::for_mutation(&Mutation::Updated { before, after });
            let encoded = encode_event(&event).unwrap();
            let decoded = UserEvent::decode(&encoded.kind, &encoded.version, &encoded.payload).unwrap();

            prop_assert!(matches!(&decoded, UserEvent::Updated(e) if e.id == id.unsigned_abs()));
            prop_assert_eq!(decoded, event);
        }
    }
}
