use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async};
use crate::domain::validators::{
    FieldErrors, ValidationError, validate_max_chars, validate_not_empty, validate_slug,
};

const TITLE_MAX_CHARS: usize = 200;
pub const DUPLICATE_SLUG_MESSAGE: &str = "Группа с таким Slug уже существует.";

#[derive(Debug, Error)]
pub enum AdminGroupError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct CreateGroupCommand {
    pub title: String,
    /// Derived from the title when blank.
    pub slug: String,
    pub description: String,
}

#[derive(Clone)]
pub struct AdminGroupService {
    groups: Arc<dyn GroupsRepo>,
}

impl AdminGroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>) -> Self {
        Self { groups }
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, AdminGroupError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create(&self, command: CreateGroupCommand) -> Result<GroupRecord, AdminGroupError> {
        let title = command.title.trim().to_string();
        let description = command.description.trim().to_string();
        let requested_slug = command.slug.trim().to_string();

        let mut errors = FieldErrors::new();
        errors.check(validate_not_empty("title", &title));
        errors.check(validate_max_chars("title", &title, TITLE_MAX_CHARS));
        errors.check(validate_not_empty("description", &description));
        if !requested_slug.is_empty() {
            errors.check(validate_slug("slug", &requested_slug));
        }
        errors.into_result()?;

        let slug = if requested_slug.is_empty() {
            self.derive_slug(&title).await?
        } else {
            if self.groups.find_by_slug(&requested_slug).await?.is_some() {
                return Err(duplicate_slug(&requested_slug));
            }
            requested_slug
        };

        let group = self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug: slug.clone(),
                description,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => duplicate_slug(&slug),
                other => AdminGroupError::Repo(other),
            })?;

        info!(
            target = "yatube::admin::groups",
            group_id = group.id,
            slug = %group.slug,
            "group created"
        );
        Ok(group)
    }

    async fn derive_slug(&self, title: &str) -> Result<String, AdminGroupError> {
        let groups = self.groups.clone();
        let outcome = generate_unique_slug_async(title, move |candidate| {
            let groups = groups.clone();
            async move {
                groups
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none())
            }
        })
        .await;

        match outcome {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(SlugError::Exhausted { base })) => Err(duplicate_slug(&base)),
            Err(SlugAsyncError::Slug(err)) => Err(AdminGroupError::Validation(
                ValidationError::new("slug", err.to_string(), title).into(),
            )),
            Err(SlugAsyncError::Predicate(err)) => Err(AdminGroupError::Repo(err)),
        }
    }
}

fn duplicate_slug(slug: &str) -> AdminGroupError {
    AdminGroupError::Validation(ValidationError::new("slug", DUPLICATE_SLUG_MESSAGE, slug).into())
}
