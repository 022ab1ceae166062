//! Subscriptions between users and the feed they produce.

mod support;

use axum::http::StatusCode;

use support::{TestApp, assert_redirect, body_text};

#[tokio::test]
async fn following_adds_the_author_to_the_follow_feed() {
    let app = TestApp::new();
    let (author, _) = app.signup("author").await;
    let (_, follower) = app.signup("follower").await;
    let (_, bystander) = app.signup("bystander").await;
    app.create_post(&author, "Пост для подписчиков", None).await;

    assert_redirect(
        &app.get("/profile/author/follow/", Some(&follower)).await,
        "/profile/author/",
    );
    assert_eq!(app.store.follow_count(), 1);

    let feed = body_text(app.get("/follow/", Some(&follower)).await).await;
    assert!(feed.contains("Пост для подписчиков"));

    let other = body_text(app.get("/follow/", Some(&bystander)).await).await;
    assert!(!other.contains("Пост для подписчиков"));
}

#[tokio::test]
async fn following_twice_keeps_one_pair() {
    let app = TestApp::new();
    app.signup("author").await;
    let (_, follower) = app.signup("follower").await;

    app.get("/profile/author/follow/", Some(&follower)).await;
    app.get("/profile/author/follow/", Some(&follower)).await;
    assert_eq!(app.store.follow_count(), 1);

    let profile = body_text(app.get("/profile/author/", Some(&follower)).await).await;
    assert!(profile.contains("Отписаться"));
}

#[tokio::test]
async fn unfollow_removes_the_pair() {
    let app = TestApp::new();
    let (author, _) = app.signup("author").await;
    let (_, follower) = app.signup("follower").await;
    app.create_post(&author, "Пост автора", None).await;

    app.get("/profile/author/follow/", Some(&follower)).await;
    assert_redirect(
        &app.get("/profile/author/unfollow/", Some(&follower)).await,
        "/profile/author/",
    );
    assert_eq!(app.store.follow_count(), 0);

    let feed = body_text(app.get("/follow/", Some(&follower)).await).await;
    assert!(!feed.contains("Пост автора"));

    assert_redirect(
        &app.get("/profile/author/unfollow/", Some(&follower)).await,
        "/profile/author/",
    );
}

#[tokio::test]
async fn self_follow_is_ignored() {
    let app = TestApp::new();
    let (_, session) = app.signup("author").await;

    assert_redirect(
        &app.get("/profile/author/follow/", Some(&session)).await,
        "/profile/author/",
    );
    assert_eq!(app.store.follow_count(), 0);
}

#[tokio::test]
async fn following_an_unknown_user_is_not_found() {
    let app = TestApp::new();
    let (_, session) = app.signup("follower").await;
    let response = app.get("/profile/ghost/follow/", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_follow_goes_to_login() {
    let app = TestApp::new();
    app.signup("author").await;
    assert_redirect(
        &app.get("/profile/author/follow/", None).await,
        "/auth/login/?next=/profile/author/follow/",
    );
}
