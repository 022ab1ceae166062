//! Request identity: extractors for the resolved [`Principal`] and the
//! redirect that sends anonymous visitors to the login page.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::LOCATION, request::Parts},
    response::{IntoResponse, Response},
};
use url::{Url, form_urlencoded};

use crate::application::{accounts::Principal, error::HttpError};
use crate::domain::entities::AuthorSummary;

pub const LOGIN_PATH: &str = "/auth/login/";
const LOCAL_ORIGIN: &str = "http://yatube.local/";

/// The principal of the current request, anonymous when nobody is signed in.
pub struct Viewer(pub Principal);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .unwrap_or_default();
        Ok(Self(principal))
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page.
pub struct SignedIn {
    pub principal: Principal,
    pub user: AuthorSummary,
}

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal>() {
            Some(principal @ Principal::User(user)) => Ok(Self {
                user: user.clone(),
                principal: principal.clone(),
            }),
            _ => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|value| value.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(LoginRedirect { next })
            }
        }
    }
}

#[derive(Debug)]
pub struct LoginRedirect {
    next: String,
}

impl LoginRedirect {
    pub fn location(&self) -> String {
        login_location(&self.next)
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        found(&self.location())
    }
}

/// `/auth/login/?next=<path>` with the path kept readable.
pub fn login_location(next: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={}", encoded.replace("%2F", "/"))
}

/// Resolve `target` against this site, refusing anything that leaves it.
///
/// The result is percent-encoded and safe to put in a `Location` header.
pub fn local_location(target: &str) -> Option<String> {
    if !target.starts_with('/') || target.starts_with("//") || target.contains('\\') {
        return None;
    }
    let base = Url::parse(LOCAL_ORIGIN).ok()?;
    let resolved = base.join(target).ok()?;
    if resolved.origin() != base.origin() {
        return None;
    }
    Some(match resolved.query() {
        Some(query) => format!("{}?{query}", resolved.path()),
        None => resolved.path().to_string(),
    })
}

/// `302 Found` to a site-local path.
pub fn found(location: &str) -> Response {
    let encoded = local_location(location).unwrap_or_else(|| "/".to_string());
    match HeaderValue::from_str(&encoded) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => HttpError::new(
            "infra::http::auth::found",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Redirect failed",
            err.to_string(),
        )
        .into_response(),
    }
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn post_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}
