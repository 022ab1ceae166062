//! Record deletion. Dependents follow the cascade rules of each relation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::{admin::AdminContentError, error::HttpError};

use super::AdminState;

pub(super) async fn admin_group_delete(
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> Response {
    deleted(state.content.delete_group(&slug).await)
}

pub(super) async fn admin_user_delete(
    State(state): State<AdminState>,
    Path(username): Path<String>,
) -> Response {
    deleted(state.content.delete_user(&username).await)
}

pub(super) async fn admin_post_delete(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Response {
    deleted(state.content.delete_post(id).await)
}

fn deleted(result: Result<(), AdminContentError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}
