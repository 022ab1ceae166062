use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        admin::{AdminGroupError, CreateGroupCommand},
        error::HttpError,
    },
    domain::validators::FieldErrors,
    presentation::{
        admin::views::{AdminGroupsTemplate, AdminGroupsView, AdminLayout},
        views::render_template_response,
    },
};

use super::AdminState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AdminGroupForm {
    title: String,
    slug: String,
    description: String,
}

pub(super) async fn admin_groups(State(state): State<AdminState>) -> Response {
    render_groups(&state, ["", "", ""], &FieldErrors::new(), None, StatusCode::OK).await
}

pub(super) async fn admin_group_create(
    State(state): State<AdminState>,
    Form(form): Form<AdminGroupForm>,
) -> Response {
    let command = CreateGroupCommand {
        title: form.title.clone(),
        slug: form.slug.clone(),
        description: form.description.clone(),
    };

    match state.groups.create(command).await {
        Ok(group) => {
            render_groups(
                &state,
                ["", "", ""],
                &FieldErrors::new(),
                Some(group.title),
                StatusCode::CREATED,
            )
            .await
        }
        Err(AdminGroupError::Validation(errors)) => {
            render_groups(
                &state,
                [&form.title, &form.slug, &form.description],
                &errors,
                None,
                StatusCode::BAD_REQUEST,
            )
            .await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn render_groups(
    state: &AdminState,
    form: [&str; 3],
    errors: &FieldErrors,
    created: Option<String>,
    status: StatusCode,
) -> Response {
    let groups = match state.groups.list().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let mut view = AdminGroupsView::new(groups, form, errors);
    view.created = created;
    render_template_response(
        AdminGroupsTemplate {
            view: AdminLayout::new("Группы", "/groups", view),
        },
        status,
    )
}
