//! Sign up, log in, log out and password change.

mod support;

use axum::http::{StatusCode, header::SET_COOKIE};

use support::{PASSWORD, SESSION_COOKIE, TestApp, assert_redirect, body_text};

fn session_from(response: &axum::http::Response<axum::body::Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            let pair = value.split(';').next()?;
            let (name, token) = pair.split_once('=')?;
            (name == SESSION_COOKIE && !token.is_empty()).then(|| token.to_string())
        })
}

#[tokio::test]
async fn signup_opens_a_session() {
    let app = TestApp::new();
    let body = "first_name=%D0%9B%D0%B5%D0%B2&last_name=&username=leo&email=leo%40example.com&password1=s3cret-pass&password2=s3cret-pass";

    let response = app.post_form("/auth/signup/", None, body).await;
    assert_redirect(&response, "/");
    let session = session_from(&response).expect("session cookie");

    let home = body_text(app.get("/profile/leo/", Some(&session)).await).await;
    assert!(home.contains("Пользователь: leo"));
    assert!(home.contains("Лев"));
}

#[tokio::test]
async fn signup_rejects_taken_names_and_mismatched_passwords() {
    let app = TestApp::new();
    app.signup("leo").await;

    let taken = app
        .post_form(
            "/auth/signup/",
            None,
            "username=leo&password1=s3cret-pass&password2=s3cret-pass",
        )
        .await;
    assert_eq!(taken.status(), StatusCode::OK);
    assert!(session_from(&taken).is_none());
    assert!(body_text(taken).await.contains("уже существует"));

    let mismatch = app
        .post_form(
            "/auth/signup/",
            None,
            "username=kate&password1=s3cret-pass&password2=other-pass",
        )
        .await;
    assert_eq!(mismatch.status(), StatusCode::OK);
    assert!(session_from(&mismatch).is_none());
}

#[tokio::test]
async fn login_follows_a_local_next() {
    let app = TestApp::new();
    app.signup("leo").await;

    let form = app.get("/auth/login/?next=/create/", None).await;
    assert!(body_text(form).await.contains("value=\"/create/\""));

    let response = app
        .post_form(
            "/auth/login/",
            None,
            &format!("username=leo&password={PASSWORD}&next=%2Fcreate%2F"),
        )
        .await;
    assert_redirect(&response, "/create/");
    assert!(session_from(&response).is_some());
}

#[tokio::test]
async fn login_ignores_foreign_next() {
    let app = TestApp::new();
    app.signup("leo").await;

    let response = app
        .post_form(
            "/auth/login/",
            None,
            &format!("username=leo&password={PASSWORD}&next=https%3A%2F%2Fevil.example%2F"),
        )
        .await;
    assert_redirect(&response, "/");
}

#[tokio::test]
async fn wrong_password_shows_the_form_error() {
    let app = TestApp::new();
    app.signup("leo").await;

    let response = app
        .post_form("/auth/login/", None, "username=leo&password=wrong-pass")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_from(&response).is_none());
    assert!(
        body_text(response)
            .await
            .contains("введите правильные имя пользователя и пароль")
    );
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    let (_, session) = app.signup("leo").await;

    let response = app.get("/auth/logout/", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Вы вышли"));

    assert_redirect(
        &app.get("/create/", Some(&session)).await,
        "/auth/login/?next=/create/",
    );
}

#[tokio::test]
async fn password_change_requires_the_old_password() {
    let app = TestApp::new();
    let (_, session) = app.signup("leo").await;

    let wrong = app
        .post_form(
            "/auth/password_change/",
            Some(&session),
            "old_password=nope&new_password1=n3w-secret&new_password2=n3w-secret",
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::OK);
    assert!(body_text(wrong).await.contains("старый пароль"));

    let changed = app
        .post_form(
            "/auth/password_change/",
            Some(&session),
            &format!("old_password={PASSWORD}&new_password1=n3w-secret&new_password2=n3w-secret"),
        )
        .await;
    assert_redirect(&changed, "/auth/password_change/done/");

    let login = app
        .post_form(
            "/auth/login/",
            None,
            "username=leo&password=n3w-secret",
        )
        .await;
    assert_eq!(login.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn password_change_is_for_signed_in_users() {
    let app = TestApp::new();
    assert_redirect(
        &app.get("/auth/password_change/", None).await,
        "/auth/login/?next=/auth/password_change/",
    );
}
