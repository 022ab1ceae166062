use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    application::error::HttpError,
    presentation::{
        admin::views::{AdminLayout, AdminPostsTemplate, AdminPostsView},
        views::render_template_response,
    },
};

use super::AdminState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AdminPostQuery {
    search: Option<String>,
    page: Option<String>,
}

pub(super) async fn admin_posts(
    State(state): State<AdminState>,
    Query(query): Query<AdminPostQuery>,
) -> Response {
    let search = query.search.as_deref().map(str::trim).unwrap_or_default();
    let page = match state
        .content
        .list_posts(Some(search), query.page.as_deref())
        .await
    {
        Ok(page) => page,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let view = AdminPostsView::new(page, search, state.display_length);
    render_template_response(
        AdminPostsTemplate {
            view: AdminLayout::new("Посты", "/posts", view),
        },
        StatusCode::OK,
    )
}
