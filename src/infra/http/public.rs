use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, Request, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;

use crate::{
    application::{
        accounts::AccountService,
        error::HttpError,
        feed::{FeedError, FeedService},
        follows::{FollowError, FollowService},
        posts::PostService,
    },
    infra::{
        cache::ResponseCache,
        uploads::{ImageStorage, ImageStorageError},
    },
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, ErrorPageView, ErrorTemplate, FeedPageView,
        FeedView, FollowTemplate, GroupPageView, GroupTemplate, IndexTemplate, LayoutChrome,
        LayoutContext, ProfileTemplate, ProfileView, render_not_found_response,
        render_template_response,
    },
};

use super::{
    accounts,
    auth::{SignedIn, Viewer, found, profile_path},
    middleware::{cache_index, log_responses, resolve_principal, set_request_context},
    posts,
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub images: Arc<ImageStorage>,
    pub index_cache: ResponseCache,
    pub session_cookie: Arc<str>,
    pub session_ttl: time::Duration,
    pub upload_limit_bytes: usize,
    pub display_length: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.upload_limit_bytes);

    let cached_routes = Router::new()
        .route("/", get(index))
        .route_layer(middleware::from_fn_with_state(state.clone(), cache_index));

    Router::new()
        .merge(cached_routes)
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
        .route("/follow/", get(follow_index))
        .route("/posts/{id}/", get(posts::post_detail))
        .route(
            "/create/",
            get(posts::post_create_form)
                .post(posts::post_create)
                .layer(upload_limit.clone()),
        )
        .route(
            "/posts/{id}/edit/",
            get(posts::post_edit_form)
                .post(posts::post_edit)
                .layer(upload_limit),
        )
        .route("/posts/{id}/comment/", axum::routing::post(posts::add_comment))
        .route(
            "/auth/signup/",
            get(accounts::signup_form).post(accounts::signup),
        )
        .route("/auth/login/", get(accounts::login_form).post(accounts::login))
        .route("/auth/logout/", get(accounts::logout).post(accounts::logout))
        .route(
            "/auth/password_change/",
            get(accounts::password_change_form).post(accounts::password_change),
        )
        .route(
            "/auth/password_change/done/",
            get(accounts::password_change_done),
        )
        .route("/about/author/", get(about_author))
        .route("/about/tech/", get(about_tech))
        .route("/media/{*path}", get(serve_media))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_principal,
        ))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

async fn index(
    State(state): State<HttpState>,
    Viewer(principal): Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::new(&principal).with_title("Последние обновления на сайте");
    match state.feed.index(query.page.as_deref()).await {
        Ok(page) => {
            let feed = FeedView::from_page(page, state.display_length);
            let view = LayoutContext::new(chrome, FeedPageView { feed });
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    Viewer(principal): Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::new(&principal);
    match state.feed.group(&slug, query.page.as_deref()).await {
        Ok(group_feed) => {
            let chrome = chrome.with_title(format!("Записи сообщества {}", group_feed.group));
            let feed = FeedView::from_page(group_feed.page, state.display_length);
            let view = LayoutContext::new(chrome, GroupPageView::new(group_feed.group, feed));
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Viewer(principal): Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::new(&principal);
    match state
        .feed
        .profile(&username, &principal, query.page.as_deref())
        .await
    {
        Ok(profile) => {
            let post_count = profile.post_count();
            let display_name = profile.author.summary().display_name().to_string();
            let chrome = chrome.with_title(format!("Профайл пользователя {display_name}"));
            let view = ProfileView {
                username: profile.author.username,
                display_name,
                post_count,
                following: profile.following,
                can_follow: profile.can_follow,
                feed: FeedView::from_page(profile.page, state.display_length),
            };
            render_template_response(
                ProfileTemplate {
                    view: LayoutContext::new(chrome, view),
                },
                StatusCode::OK,
            )
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = LayoutChrome::new(&signed_in.principal).with_title("Избранные авторы");
    match state
        .feed
        .follow(&signed_in.principal, query.page.as_deref())
        .await
    {
        Ok(page) => {
            let feed = FeedView::from_page(page, state.display_length);
            let view = LayoutContext::new(chrome, FeedPageView { feed });
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn profile_follow(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Path(username): Path<String>,
) -> Response {
    match state.follows.follow(&signed_in.principal, &username).await {
        Ok((author, _)) => found(&profile_path(&author.username)),
        Err(err) => follow_error_to_response(err, LayoutChrome::new(&signed_in.principal)),
    }
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    signed_in: SignedIn,
    Path(username): Path<String>,
) -> Response {
    match state.follows.unfollow(&signed_in.principal, &username).await {
        Ok((author, _)) => found(&profile_path(&author.username)),
        Err(err) => follow_error_to_response(err, LayoutChrome::new(&signed_in.principal)),
    }
}

async fn about_author(Viewer(principal): Viewer) -> Response {
    let chrome = LayoutChrome::new(&principal).with_title("Об авторе проекта");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

async fn about_tech(Viewer(principal): Viewer) -> Response {
    let chrome = LayoutChrome::new(&principal).with_title("Технологии");
    let view = LayoutContext::new(chrome, ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.images.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(ImageStorageError::InvalidPath | ImageStorageError::NotFound) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "File not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored image"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

async fn not_found(Viewer(principal): Viewer, request: Request<Body>) -> Response {
    let chrome = LayoutChrome::new(&principal).with_title("Страница не найдена");
    let view = LayoutContext::new(
        chrome,
        ErrorPageView::not_found().with_path(request.uri().path()),
    );
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    crate::application::error::ErrorReport::from_message(
        "infra::http::public::not_found",
        StatusCode::NOT_FOUND,
        "No route matched",
    )
    .attach(&mut response);
    response
}

pub(super) fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    match err {
        FeedError::NotFound { .. } => render_not_found_response(chrome),
        err => HttpError::from(err).into_response(),
    }
}

fn follow_error_to_response(err: FollowError, chrome: LayoutChrome) -> Response {
    match err {
        FollowError::NotFound { .. } => render_not_found_response(chrome),
        err => HttpError::from(err).into_response(),
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    response
}
