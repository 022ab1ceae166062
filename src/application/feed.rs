use std::sync::Arc;

use thiserror::Error;

use crate::application::accounts::Principal;
use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostQueryFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, PostEntry, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("{entity} `{key}` not found")]
    NotFound { entity: &'static str, key: String },
    #[error("authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Posts of one group along with the group itself.
#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostEntry>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    pub page: Page<PostEntry>,
    /// Whether the viewer already follows this author.
    pub following: bool,
    /// Authenticated viewers other than the author may follow.
    pub can_follow: bool,
}

impl ProfileFeed {
    pub fn post_count(&self) -> u64 {
        self.page.total_count
    }
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        page_size: u32,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            paginator: Paginator::new(page_size),
        }
    }

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    /// Every post, newest first.
    pub async fn index(&self, page: Option<&str>) -> Result<Page<PostEntry>, FeedError> {
        self.assemble(&PostQueryFilter::default(), page).await
    }

    pub async fn group(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::NotFound {
                entity: "group",
                key: slug.to_string(),
            })?;

        let page = self
            .assemble(&PostQueryFilter::group(group.id), page)
            .await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: &Principal,
        page: Option<&str>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self.find_author(username).await?;
        let page = self
            .assemble(&PostQueryFilter::author(author.id), page)
            .await?;

        let (following, can_follow) = match viewer.user_id() {
            Some(viewer_id) if viewer_id != author.id => (
                self.follows.is_following(viewer_id, author.id).await?,
                true,
            ),
            _ => (false, false),
        };

        Ok(ProfileFeed {
            author,
            page,
            following,
            can_follow,
        })
    }

    /// Posts by the authors `viewer` follows.
    pub async fn follow(
        &self,
        viewer: &Principal,
        page: Option<&str>,
    ) -> Result<Page<PostEntry>, FeedError> {
        let viewer_id = viewer.user_id().ok_or(FeedError::Unauthenticated)?;
        self.assemble(&PostQueryFilter::followed_by(viewer_id), page)
            .await
    }

    /// Count, clamp the requested page and fetch its slice.
    pub async fn assemble(
        &self,
        filter: &PostQueryFilter,
        page: Option<&str>,
    ) -> Result<Page<PostEntry>, FeedError> {
        let total = self.posts.count_posts(filter).await?;
        let window = self.paginator.window(total, page);
        let items = self.posts.list_posts(filter, window).await?;
        Ok(self.paginator.page(items, window, total))
    }

    pub async fn find_author(&self, username: &str) -> Result<UserRecord, FeedError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::NotFound {
                entity: "user",
                key: username.to_string(),
            })
    }
}
