//! Read-only access to the event log.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use chronicle_events::StoredEvent;
use chronicle_infra::{decode_events, EventWindow};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_events))
}

/// Turn query parameters into a window; missing values take the defaults
/// (last hour, 20 events).
pub(crate) fn window_from(
    query: Result<Query<dto::EventsQuery>, QueryRejection>,
) -> Result<EventWindow, axum::response::Response> {
    let Query(query) = query.map_err(|rejection| errors::bad_request(rejection.body_text()))?;
    query.into_window().map_err(errors::domain_error_to_response)
}

pub(crate) fn events_response(events: Vec<StoredEvent>) -> axum::response::Response {
    match decode_events(events) {
        Ok(decoded) => Json(
            decoded
                .into_iter()
                .map(dto::EventOut::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::query_error_to_response(e),
    }
}

/// GET /events?since=<rfc3339>&limit=<n>&after=<event id>
pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::EventsQuery>, QueryRejection>,
) -> axum::response::Response {
    let window = match window_from(query) {
        Ok(window) => window,
        Err(resp) => return resp,
    };

    match services.list_events(window).await {
        Ok(events) => events_response(events),
        Err(e) => errors::query_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use chronicle_core::{AggregateId, EventId};

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn stored(payload: &[u8]) -> StoredEvent {
        StoredEvent::new(
            EventId::new(1).unwrap(),
            AggregateId::new(1).unwrap(),
            "user",
            "UserCreated",
            "v1",
            Utc::now(),
            payload.to_vec(),
        )
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_server_error() {
        let resp = events_response(vec![stored(b"not json")]);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "decode_error");
    }

    #[tokio::test]
    async fn decodable_payload_is_rendered_as_data() {
        let resp = events_response(vec![stored(br#"{"name":"a","id":1}"#)]);
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body[0]["data"]["name"], "a");
        assert_eq!(body[0]["aggregateId"], 1);
    }

    #[tokio::test]
    async fn cursor_without_since_is_rejected() {
        let query = dto::EventsQuery {
            after: Some(3),
            ..dto::EventsQuery::default()
        };
        let resp = window_from(Ok(Query(query))).unwrap_err();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "validation_error");
    }
}
