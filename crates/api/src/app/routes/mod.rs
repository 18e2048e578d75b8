use axum::Router;

pub mod events;
pub mod system;
pub mod users;

/// Router for every resource endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/users", users::router())
        .nest("/events", events::router())
}
