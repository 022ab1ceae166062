//! In-memory repositories and router builders shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

use yatube::{
    application::{
        accounts::{AccountService, SignupForm},
        admin::{AdminContentService, AdminGroupService},
        feed::FeedService,
        follows::FollowService,
        pagination::PageWindow,
        posts::PostService,
        repos::{
            CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams,
            CreateSessionParams, CreateUserParams, FollowsRepo, GroupsRepo, ImageChange,
            PostQueryFilter, PostsRepo, PostsWriteRepo, RecordsRepo, RepoError, Repositories,
            SessionsRepo, UpdatePostParams, UsersRepo,
        },
    },
    domain::{
        entities::{
            AuthorSummary, CommentEntry, CommentRecord, GroupRecord, GroupSummary, PostEntry,
            PostRecord, SessionRecord, UserRecord,
        },
        relations::Entity,
    },
    infra::{
        cache::ResponseCache,
        http::{AdminState, HttpState, build_admin_router, build_router},
        uploads::ImageStorage,
    },
};

pub const SESSION_COOKIE: &str = "sessionid";
pub const PASSWORD: &str = "s3cret-pass";

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: Vec<UserRecord>,
    sessions: HashMap<String, SessionRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<(i64, i64)>,
    post_writes_fail: bool,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn entry(&self, post: &PostRecord) -> Option<PostEntry> {
        let author = self.users.iter().find(|user| user.id == post.author_id)?;
        let group = post.group_id.and_then(|id| {
            self.groups
                .iter()
                .find(|group| group.id == id)
                .map(|group| GroupSummary {
                    id: group.id,
                    title: group.title.clone(),
                    slug: group.slug.clone(),
                })
        });
        Some(PostEntry {
            post: post.clone(),
            author: author.summary(),
            group,
        })
    }

    fn matches(&self, post: &PostRecord, filter: &PostQueryFilter) -> bool {
        if filter.group_id.is_some() && post.group_id != filter.group_id {
            return false;
        }
        if filter.author_id.is_some_and(|id| post.author_id != id) {
            return false;
        }
        if let Some(user_id) = filter.followed_by {
            if !self.follows.contains(&(user_id, post.author_id)) {
                return false;
            }
        }
        if let Some(term) = &filter.search {
            if !post.text.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        true
    }

    fn filtered(&self, filter: &PostQueryFilter) -> Vec<&PostRecord> {
        let mut posts: Vec<_> = self
            .posts
            .iter()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }

    fn delete_post_tree(&mut self, post_id: i64) {
        self.comments.retain(|comment| comment.post_id != post_id);
        self.posts.retain(|post| post.id != post_id);
    }
}

/// Every repository trait backed by plain vectors behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store poisoned")
    }

    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    pub fn comment_count(&self) -> usize {
        self.lock().comments.len()
    }

    pub fn follow_count(&self) -> usize {
        self.lock().follows.len()
    }

    pub fn latest_post(&self) -> Option<PostRecord> {
        self.lock().posts.iter().max_by_key(|post| post.id).cloned()
    }

    pub fn post(&self, id: i64) -> Option<PostRecord> {
        self.lock().posts.iter().find(|post| post.id == id).cloned()
    }

    /// Make every post insert and update fail like a lost database.
    pub fn fail_post_writes(&self) {
        self.lock().post_writes_fail = true;
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|user| user.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let user = UserRecord {
            id: state.allocate_id(),
            username: params.username,
            first_name: params.first_name,
            last_name: params.last_name,
            email: params.email,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.lock().users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), RepoError> {
        let mut state = self.lock();
        let user = state
            .users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl SessionsRepo for MemoryStore {
    async fn create_session(&self, params: CreateSessionParams) -> Result<(), RepoError> {
        self.lock().sessions.insert(
            params.token_hash,
            SessionRecord {
                user_id: params.user_id,
                expires_at: params.expires_at,
            },
        );
        Ok(())
    }

    async fn find_session(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self
            .lock()
            .sessions
            .get(token_hash)
            .filter(|session| session.expires_at > now)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), RepoError> {
        self.lock().sessions.remove(token_hash);
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut state = self.lock();
        let before = state.sessions.len();
        state.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - state.sessions.len()) as u64)
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.lock();
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: state.allocate_id(),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.lock().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.lock().groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .lock()
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let state = self.lock();
        Ok(state
            .filtered(filter)
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .filter_map(|post| state.entry(post))
            .collect())
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        Ok(self.lock().filtered(filter).len() as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post(id))
    }

    async fn find_entry(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let state = self.lock();
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .and_then(|post| state.entry(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        if state.post_writes_fail {
            return Err(RepoError::from_persistence("post writes disabled"));
        }
        let post = PostRecord {
            id: state.allocate_id(),
            text: params.text,
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
            created_at: OffsetDateTime::now_utc(),
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.lock();
        if state.post_writes_fail {
            return Err(RepoError::from_persistence("post writes disabled"));
        }
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        match params.image {
            ImageChange::Keep => {}
            ImageChange::Replace(path) => post.image = Some(path),
            ImageChange::Clear => post.image = None,
        }
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.lock();
        let comment = CommentRecord {
            id: state.allocate_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: OffsetDateTime::now_utc(),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError> {
        let state = self.lock();
        let mut comments: Vec<_> = state
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .filter_map(|comment| {
                let author = state.users.iter().find(|user| user.id == comment.author_id)?;
                Some(CommentEntry {
                    comment: comment.clone(),
                    author: author.summary(),
                })
            })
            .collect();
        comments.sort_by(|a, b| {
            b.comment
                .created_at
                .cmp(&a.comment.created_at)
                .then(b.comment.id.cmp(&a.comment.id))
        });
        Ok(comments)
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn follow(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut state = self.lock();
        if state.follows.contains(&(user_id, author_id)) {
            return Ok(false);
        }
        state.follows.push((user_id, author_id));
        Ok(true)
    }

    async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<u64, RepoError> {
        let mut state = self.lock();
        let before = state.follows.len();
        state.follows.retain(|pair| *pair != (user_id, author_id));
        Ok((before - state.follows.len()) as u64)
    }

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        Ok(self.lock().follows.contains(&(user_id, author_id)))
    }
}

#[async_trait]
impl RecordsRepo for MemoryStore {
    async fn delete_record(&self, entity: Entity, id: i64) -> Result<(), RepoError> {
        let mut state = self.lock();
        match entity {
            Entity::Post => {
                if !state.posts.iter().any(|post| post.id == id) {
                    return Err(RepoError::NotFound);
                }
                state.delete_post_tree(id);
            }
            Entity::Group => {
                if !state.groups.iter().any(|group| group.id == id) {
                    return Err(RepoError::NotFound);
                }
                for post in state.posts.iter_mut() {
                    if post.group_id == Some(id) {
                        post.group_id = None;
                    }
                }
                state.groups.retain(|group| group.id != id);
            }
            Entity::User => {
                if !state.users.iter().any(|user| user.id == id) {
                    return Err(RepoError::NotFound);
                }
                let owned: Vec<i64> = state
                    .posts
                    .iter()
                    .filter(|post| post.author_id == id)
                    .map(|post| post.id)
                    .collect();
                for post_id in owned {
                    state.delete_post_tree(post_id);
                }
                state.comments.retain(|comment| comment.author_id != id);
                state
                    .follows
                    .retain(|(user_id, author_id)| *user_id != id && *author_id != id);
                state.sessions.retain(|_, session| session.user_id != id);
                state.users.retain(|user| user.id != id);
            }
            Entity::Session | Entity::Comment | Entity::Follow => {
                return Err(RepoError::InvalidInput {
                    message: format!("{} records are not deleted directly", entity.as_str()),
                });
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Public and admin routers over one [`MemoryStore`].
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub public: Router,
    pub admin: Router,
    pub cache: ResponseCache,
    pub accounts: Arc<AccountService>,
    pub groups: Arc<AdminGroupService>,
    pub posts: Arc<PostService>,
    media: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache_ttl(Duration::from_secs(20))
    }

    pub fn with_cache_ttl(ttl: Duration) -> Self {
        let store = Arc::new(MemoryStore::default());
        let repos = Repositories::from_shared(store.clone());
        let media = TempDir::new().expect("media dir");
        let images =
            Arc::new(ImageStorage::new(media.path().to_path_buf()).expect("image storage"));
        let cache = ResponseCache::new(NonZeroUsize::new(64).expect("capacity"), ttl);

        let accounts = Arc::new(AccountService::new(
            repos.users.clone(),
            repos.sessions.clone(),
            time::Duration::days(14),
        ));
        let posts = Arc::new(PostService::new(
            repos.posts.clone(),
            repos.posts_write.clone(),
            repos.groups.clone(),
            repos.comments.clone(),
            images.clone(),
        ));
        let groups = Arc::new(AdminGroupService::new(repos.groups.clone()));

        let http_state = HttpState {
            feed: Arc::new(FeedService::new(
                repos.posts.clone(),
                repos.groups.clone(),
                repos.users.clone(),
                repos.follows.clone(),
                10,
            )),
            posts: posts.clone(),
            follows: Arc::new(FollowService::new(
                repos.users.clone(),
                repos.follows.clone(),
            )),
            accounts: accounts.clone(),
            images,
            index_cache: cache.clone(),
            session_cookie: Arc::from(SESSION_COOKIE),
            session_ttl: time::Duration::days(14),
            upload_limit_bytes: 5 * 1024 * 1024,
            display_length: 15,
        };
        let admin_state = AdminState {
            groups: groups.clone(),
            content: Arc::new(AdminContentService::new(
                repos.posts.clone(),
                repos.groups.clone(),
                repos.users.clone(),
                repos.records.clone(),
                10,
                "-пусто-",
            )),
            index_cache: cache.clone(),
            display_length: 15,
        };

        Self {
            store,
            public: build_router(http_state),
            admin: build_admin_router(admin_state),
            cache,
            accounts,
            groups,
            posts,
            media,
        }
    }

    /// Register a user and return the session cookie value.
    pub async fn signup(&self, username: &str) -> (AuthorSummary, String) {
        let form = SignupForm {
            username: username.to_string(),
            password1: PASSWORD.to_string(),
            password2: PASSWORD.to_string(),
            ..SignupForm::default()
        };
        let (user, token) = self.accounts.signup(&form).await.expect("signup");
        (user.summary(), token.into_inner())
    }

    pub async fn create_group(&self, title: &str, slug: &str) -> GroupRecord {
        self.groups
            .create(yatube::application::admin::CreateGroupCommand {
                title: title.to_string(),
                slug: slug.to_string(),
                description: "Тестовое описание".to_string(),
            })
            .await
            .expect("group")
    }

    pub async fn create_post(&self, author: &AuthorSummary, text: &str, group: Option<i64>) -> i64 {
        let principal = yatube::application::accounts::Principal::User(author.clone());
        let form = yatube::application::posts::PostForm {
            text: text.to_string(),
            group: group.map(|id| id.to_string()).unwrap_or_default(),
            ..Default::default()
        };
        self.posts.create(&principal, form).await.expect("post").id
    }

    /// File names currently stored under `media/posts/`.
    pub fn stored_images(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.media.path().join("posts")) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<Body> {
        send(&self.public, request("GET", uri, session, None)).await
    }

    pub async fn post_form(&self, uri: &str, session: Option<&str>, body: &str) -> Response<Body> {
        send(&self.public, request("POST", uri, session, Some(body))).await
    }

    pub async fn admin(&self, method: &str, uri: &str, body: Option<&str>) -> Response<Body> {
        send(&self.admin, request(method, uri, None, body)).await
    }
}

pub fn request(method: &str, uri: &str, session: Option<&str>, form: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
    }
    let request = match form {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    request.expect("request")
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.expect("router response")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub fn assert_redirect(response: &Response<Body>, expected: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response), Some(expected));
}

/// Smallest valid GIF, for image uploads.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x21, 0xf9,
    0x04, 0x01, 0x0a, 0x00, 0x01, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x01, 0x00,
    0x00, 0x02, 0x02, 0x4c, 0x01, 0x00, 0x3b,
];

/// Multipart body for the post form; returns `(content_type, body)`.
pub fn post_multipart(text: &str, group: &str, image: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    multipart_body(&[("text", text), ("group", group)], image)
}

pub fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "yatube-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: image/gif\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn post_multipart_request(
    app: &TestApp,
    uri: &str,
    session: &str,
    text: &str,
    group: &str,
    image: Option<(&str, &[u8])>,
) -> Response<Body> {
    send_multipart(app, uri, session, post_multipart(text, group, image)).await
}

pub async fn send_multipart(
    app: &TestApp,
    uri: &str,
    session: &str,
    (content_type, body): (String, Vec<u8>),
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, format!("{SESSION_COOKIE}={session}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("request");
    send(&app.public, request).await
}
