use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{
    GroupsRepo, PostQueryFilter, PostsRepo, RecordsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::PostEntry;
use crate::domain::relations::Entity;

#[derive(Debug, Error)]
pub enum AdminContentError {
    #[error("{entity} `{key}` not found")]
    NotFound { entity: &'static str, key: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One line of the administrative post listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminPostRow {
    pub pk: i64,
    pub text: String,
    pub created_at: OffsetDateTime,
    pub author: String,
    pub group: String,
}

#[derive(Clone)]
pub struct AdminContentService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    records: Arc<dyn RecordsRepo>,
    paginator: Paginator,
    empty_value_display: String,
}

impl AdminContentService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        records: Arc<dyn RecordsRepo>,
        page_size: u32,
        empty_value_display: impl Into<String>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            records,
            paginator: Paginator::new(page_size),
            empty_value_display: empty_value_display.into(),
        }
    }

    /// Posts whose text contains `search`, newest first.
    pub async fn list_posts(
        &self,
        search: Option<&str>,
        page: Option<&str>,
    ) -> Result<Page<AdminPostRow>, AdminContentError> {
        let filter = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(PostQueryFilter::search)
            .unwrap_or_default();

        let total = self.posts.count_posts(&filter).await?;
        let window = self.paginator.window(total, page);
        let items = self.posts.list_posts(&filter, window).await?;
        let page = self.paginator.page(items, window, total);
        Ok(page.map(|entry| self.row(entry)))
    }

    pub async fn delete_group(&self, slug: &str) -> Result<(), AdminContentError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AdminContentError::NotFound {
                entity: "group",
                key: slug.to_string(),
            })?;
        self.delete(Entity::Group, group.id, slug).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<(), AdminContentError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AdminContentError::NotFound {
                entity: "user",
                key: username.to_string(),
            })?;
        self.delete(Entity::User, user.id, username).await
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), AdminContentError> {
        self.delete(Entity::Post, id, &id.to_string()).await
    }

    pub async fn health_check(&self) -> Result<(), AdminContentError> {
        Ok(self.records.health_check().await?)
    }

    async fn delete(&self, entity: Entity, id: i64, key: &str) -> Result<(), AdminContentError> {
        self.records
            .delete_record(entity, id)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => AdminContentError::NotFound {
                    entity: entity.as_str(),
                    key: key.to_string(),
                },
                other => AdminContentError::Repo(other),
            })?;

        info!(
            target = "yatube::admin::content",
            entity = entity.as_str(),
            id,
            "record deleted"
        );
        Ok(())
    }

    fn row(&self, entry: PostEntry) -> AdminPostRow {
        AdminPostRow {
            pk: entry.post.id,
            text: entry.post.text,
            created_at: entry.post.created_at,
            author: entry.author.username,
            group: entry
                .group
                .map(|group| group.title)
                .unwrap_or_else(|| self.empty_value_display.clone()),
        }
    }
}
