//! Post pages: detail, create/edit forms and comments.

use axum::{
    extract::{Form, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        posts::{CommentForm, ImageUpload, PostError, PostForm},
    },
    domain::validators::FieldErrors,
    presentation::views::{
        CommentFormView, CommentView, LayoutChrome, LayoutContext, PostCard, PostDetailTemplate,
        PostDetailView, PostFormTemplate, PostFormView, render_not_found_response,
        render_template_response,
    },
};

use super::{
    HttpState,
    auth::{SignedIn, Viewer, found, post_path, profile_path},
};

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    Viewer(principal): Viewer,
    Path(post_id): Path<i64>,
) -> Response {
    let chrome = LayoutChrome::new(&principal);
    let detail = match state.posts.detail(post_id).await {
        Ok(detail) => detail,
        Err(err) => return post_error_to_response(err, chrome),
    };

    let can_edit = principal.user_id() == Some(detail.entry.post.author_id);
    let post = PostCard::from_entry(detail.entry, state.display_length);
    let chrome = chrome.with_title(format!("Пост {}", post.short_text));
    let view = PostDetailView {
        author_post_count: detail.author_post_count,
        comments: detail.comments.into_iter().map(CommentView::from).collect(),
        can_edit,
        comment_form: principal
            .is_authenticated()
            .then(|| CommentFormView::new(post.id)),
        post,
    };

    render_template_response(
        PostDetailTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    )
}

pub(super) async fn post_create_form(
    State(state): State<HttpState>,
    signed_in: SignedIn,
) -> Response {
    render_post_form(&state, &signed_in, None, "", "", &FieldErrors::new()).await
}

pub(super) async fn post_create(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    multipart: Multipart,
) -> Response {
    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (form.text.clone(), form.group.clone());

    match state.posts.create(&signed_in.principal, form).await {
        Ok(_) => found(&profile_path(&signed_in.user.username)),
        Err(PostError::Validation(errors)) => {
            render_post_form(&state, &signed_in, None, &text, &group, &errors).await
        }
        Err(err) => post_error_to_response(err, LayoutChrome::new(&signed_in.principal)),
    }
}

pub(super) async fn post_edit_form(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Path(post_id): Path<i64>,
) -> Response {
    match state.posts.editable(&signed_in.principal, post_id).await {
        Ok(entry) => {
            let group = entry
                .post
                .group_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            let editing = Editing {
                post_id,
                current_image: entry.post.image.clone(),
            };
            render_post_form(
                &state,
                &signed_in,
                Some(editing),
                &entry.post.text,
                &group,
                &FieldErrors::new(),
            )
            .await
        }
        Err(PostError::AccessDenied { .. }) => found(&post_path(post_id)),
        Err(err) => post_error_to_response(err, LayoutChrome::new(&signed_in.principal)),
    }
}

pub(super) async fn post_edit(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Path(post_id): Path<i64>,
    multipart: Multipart,
) -> Response {
    let current = match state.posts.editable(&signed_in.principal, post_id).await {
        Ok(entry) => entry,
        Err(PostError::AccessDenied { .. }) => return found(&post_path(post_id)),
        Err(err) => return post_error_to_response(err, LayoutChrome::new(&signed_in.principal)),
    };

    let form = match read_post_form(multipart).await {
        Ok(form) => form,
        Err(err) => return err.into_response(),
    };
    let (text, group) = (form.text.clone(), form.group.clone());

    match state.posts.edit(&signed_in.principal, post_id, form).await {
        Ok(_) => found(&post_path(post_id)),
        Err(PostError::Validation(errors)) => {
            let editing = Editing {
                post_id,
                current_image: current.post.image,
            };
            render_post_form(&state, &signed_in, Some(editing), &text, &group, &errors).await
        }
        Err(PostError::AccessDenied { .. }) => found(&post_path(post_id)),
        Err(err) => post_error_to_response(err, LayoutChrome::new(&signed_in.principal)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CommentInput {
    text: String,
}

/// Blank comments are dropped and the visitor lands back on the post.
pub(super) async fn add_comment(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Path(post_id): Path<i64>,
    Form(input): Form<CommentInput>,
) -> Response {
    let form = CommentForm { text: input.text };
    match state
        .posts
        .add_comment(&signed_in.principal, post_id, form)
        .await
    {
        Ok(_) | Err(PostError::Validation(_)) => found(&post_path(post_id)),
        Err(err) => post_error_to_response(err, LayoutChrome::new(&signed_in.principal)),
    }
}

struct Editing {
    post_id: i64,
    current_image: Option<String>,
}

async fn render_post_form(
    state: &HttpState,
    signed_in: &SignedIn,
    editing: Option<Editing>,
    text: &str,
    group: &str,
    errors: &FieldErrors,
) -> Response {
    let groups = match state.posts.groups().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let chrome = LayoutChrome::new(&signed_in.principal);
    let (chrome, view) = match editing {
        Some(editing) => (
            chrome.with_title("Редактировать пост"),
            PostFormView::new(
                format!("/posts/{}/edit/", editing.post_id),
                text,
                group,
                &groups,
                errors,
            )
            .editing(editing.current_image),
        ),
        None => (
            chrome.with_title("Новый пост"),
            PostFormView::new("/create/".to_string(), text, group, &groups, errors),
        ),
    };

    render_template_response(
        PostFormTemplate {
            view: LayoutContext::new(chrome, view),
        },
        StatusCode::OK,
    )
}

/// Collect the post form fields; an empty file input means no image.
/// A ticked `image-clear` checkbox asks to drop the current image.
async fn read_post_form(mut multipart: Multipart) -> Result<PostForm, HttpError> {
    let mut form = PostForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => form.text = field.text().await.map_err(multipart_error)?,
            "group" => form.group = field.text().await.map_err(multipart_error)?,
            "image-clear" => {
                let value = field.text().await.map_err(multipart_error)?;
                form.clear_image = !matches!(value.as_str(), "" | "off" | "false");
            }
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                if !(file_name.is_empty() && data.is_empty()) {
                    form.image = Some(ImageUpload { file_name, data });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn multipart_error(err: MultipartError) -> HttpError {
    HttpError::from_error(
        "infra::http::posts::read_post_form",
        err.status(),
        "Invalid form submission",
        &err,
    )
}

fn post_error_to_response(err: PostError, chrome: LayoutChrome) -> Response {
    match err {
        PostError::NotFound { .. } => render_not_found_response(chrome),
        err => HttpError::from(err).into_response(),
    }
}
