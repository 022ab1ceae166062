use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::accounts::Principal;
use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("user `{username}` not found")]
    NotFound { username: String },
    #[error("authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself changes nothing.
    SelfFollow,
    Removed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        principal: &Principal,
        username: &str,
    ) -> Result<(UserRecord, FollowOutcome), FollowError> {
        let (user_id, author) = self.resolve(principal, username).await?;
        if user_id == author.id {
            debug!(target = "yatube::follows", user_id, "ignored self follow");
            return Ok((author, FollowOutcome::SelfFollow));
        }

        let outcome = if self.follows.follow(user_id, author.id).await? {
            info!(
                target = "yatube::follows",
                user_id,
                author_id = author.id,
                "follow created"
            );
            FollowOutcome::Created
        } else {
            FollowOutcome::AlreadyFollowing
        };
        Ok((author, outcome))
    }

    pub async fn unfollow(
        &self,
        principal: &Principal,
        username: &str,
    ) -> Result<(UserRecord, FollowOutcome), FollowError> {
        let (user_id, author) = self.resolve(principal, username).await?;
        let removed = self.follows.unfollow(user_id, author.id).await?;
        let outcome = if removed > 0 {
            info!(
                target = "yatube::follows",
                user_id,
                author_id = author.id,
                "follow removed"
            );
            FollowOutcome::Removed
        } else {
            FollowOutcome::NotFollowing
        };
        Ok((author, outcome))
    }

    async fn resolve(
        &self,
        principal: &Principal,
        username: &str,
    ) -> Result<(i64, UserRecord), FollowError> {
        let user_id = principal.user_id().ok_or(FollowError::Unauthenticated)?;
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::NotFound {
                username: username.to_string(),
            })?;
        Ok((user_id, author))
    }
}
