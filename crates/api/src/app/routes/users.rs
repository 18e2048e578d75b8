use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use chronicle_users::UserId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user))
        .route("/:id/events", get(list_user_events))
}

fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse::<UserId>()
        .map_err(errors::domain_error_to_response)
}

/// POST /users
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UserRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::bad_request(rejection.body_text()),
    };
    let draft = match body.into_draft() {
        Ok(draft) => draft,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.create_user(draft).await {
        Ok(committed) => (
            StatusCode::CREATED,
            Json(dto::UserOut::from(&committed.aggregate)),
        )
            .into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}

/// PUT /users/:id
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::UserRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::bad_request(rejection.body_text()),
    };
    let draft = match body.into_draft() {
        Ok(draft) => draft,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.update_user(id, draft).await {
        Ok(committed) => Json(dto::UserOut::from(&committed.aggregate)).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}

/// GET /users
pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.list_users().await {
        Ok(users) => Json(users.iter().map(dto::UserOut::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::query_error_to_response(e),
    }
}

/// GET /users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_user(id).await {
        Ok(user) => Json(dto::UserOut::from(&user)).into_response(),
        Err(e) => errors::query_error_to_response(e),
    }
}

/// GET /users/:id/events?since=&limit=&after=
pub async fn list_user_events(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    query: Result<Query<dto::EventsQuery>, QueryRejection>,
) -> axum::response::Response {
    let id = match parse_user_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let window = match super::events::window_from(query) {
        Ok(window) => window,
        Err(resp) => return resp,
    };

    match services.list_user_events(id, window).await {
        Ok(events) => super::events::events_response(events),
        Err(e) => errors::query_error_to_response(e),
    }
}
