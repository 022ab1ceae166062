mod cache;
mod groups;
mod health;
mod posts;
mod records;
mod state;

pub use state::AdminState;

use axum::{
    Router, middleware,
    response::Response,
    routing::{delete, get, post},
};

use super::auth::found;
use super::middleware::{log_responses, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/", get(admin_home))
        .route("/groups", get(groups::admin_groups).post(groups::admin_group_create))
        .route("/groups/{slug}", delete(records::admin_group_delete))
        .route("/users/{username}", delete(records::admin_user_delete))
        .route("/posts", get(posts::admin_posts))
        .route("/posts/{id}", delete(records::admin_post_delete))
        .route("/cache/clear", post(cache::clear_index_cache))
        .route("/health", get(health::admin_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_home() -> Response {
    found("/posts")
}
