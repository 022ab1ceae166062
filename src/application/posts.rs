//! Writing posts and comments, and the post detail view.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::accounts::Principal;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, ImageChange, PostQueryFilter,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentEntry, CommentRecord, GroupRecord, PostEntry, PostRecord};
use crate::domain::validators::{
    FieldErrors, INVALID_CHOICE_MESSAGE, ValidationError, validate_not_empty,
};
use crate::infra::uploads::{ImageStorage, ImageStorageError};

pub const INVALID_IMAGE_MESSAGE: &str = "Загрузите правильное изображение. Файл, который вы загрузили, поврежден или не является изображением.";
pub const EMPTY_FILE_MESSAGE: &str = "Отправленный файл пуст.";
pub const UPLOAD_AND_CLEAR_MESSAGE: &str = "Пожалуйста, загрузите файл или поставьте флажок \"Очистить\", но не оба одновременно.";

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub data: Bytes,
}

/// Raw submission of the post form.
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    /// Selected group id; empty when no group was chosen.
    pub group: String,
    pub image: Option<ImageUpload>,
    /// The "clear" checkbox next to the current image on the edit form.
    pub clear_image: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Validation(#[from] FieldErrors),
    #[error("post {id} not found")]
    NotFound { id: i64 },
    #[error("post {post_id} belongs to another author")]
    AccessDenied { post_id: i64 },
    #[error("authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Image(#[from] ImageStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub entry: PostEntry,
    pub author_post_count: u64,
    pub comments: Vec<CommentEntry>,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    images: Arc<ImageStorage>,
}

struct ValidPost {
    text: String,
    group_id: Option<i64>,
    image: Option<ImageUpload>,
    clear_image: bool,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        images: Arc<ImageStorage>,
    ) -> Self {
        Self {
            posts,
            writer,
            groups,
            comments,
            images,
        }
    }

    /// Groups offered by the post form.
    pub async fn groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create(
        &self,
        principal: &Principal,
        form: PostForm,
    ) -> Result<PostRecord, PostError> {
        let author_id = principal.user_id().ok_or(PostError::Unauthenticated)?;
        let valid = self.validate(form).await?;
        let image = self.store_image(valid.image).await?;

        let created = self
            .writer
            .create_post(CreatePostParams {
                author_id,
                text: valid.text,
                group_id: valid.group_id,
                image: image.clone(),
            })
            .await;
        let post = match created {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                return Err(err.into());
            }
        };

        info!(
            target = "yatube::posts",
            post_id = post.id,
            author_id,
            "post created"
        );
        Ok(post)
    }

    /// The post as it stands, if `principal` may edit it.
    pub async fn editable(&self, principal: &Principal, post_id: i64) -> Result<PostEntry, PostError> {
        let user_id = principal.user_id().ok_or(PostError::Unauthenticated)?;
        let entry = self
            .posts
            .find_entry(post_id)
            .await?
            .ok_or(PostError::NotFound { id: post_id })?;
        if entry.post.author_id != user_id {
            return Err(PostError::AccessDenied { post_id });
        }
        Ok(entry)
    }

    pub async fn edit(
        &self,
        principal: &Principal,
        post_id: i64,
        form: PostForm,
    ) -> Result<PostRecord, PostError> {
        self.editable(principal, post_id).await?;
        let valid = self.validate(form).await?;
        let stored = self.store_image(valid.image).await?;
        let image = match (&stored, valid.clear_image) {
            (Some(path), _) => ImageChange::Replace(path.clone()),
            (None, true) => ImageChange::Clear,
            (None, false) => ImageChange::Keep,
        };

        let updated = self
            .writer
            .update_post(UpdatePostParams {
                id: post_id,
                text: valid.text,
                group_id: valid.group_id,
                image,
            })
            .await;
        let post = match updated {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(stored.as_deref()).await;
                return Err(match err {
                    RepoError::NotFound => PostError::NotFound { id: post_id },
                    other => PostError::Repo(other),
                });
            }
        };

        info!(target = "yatube::posts", post_id, "post edited");
        Ok(post)
    }

    pub async fn detail(&self, post_id: i64) -> Result<PostDetail, PostError> {
        let entry = self
            .posts
            .find_entry(post_id)
            .await?
            .ok_or(PostError::NotFound { id: post_id })?;
        let author_post_count = self
            .posts
            .count_posts(&PostQueryFilter::author(entry.post.author_id))
            .await?;
        let comments = self.comments.list_for_post(post_id).await?;

        Ok(PostDetail {
            entry,
            author_post_count,
            comments,
        })
    }

    pub async fn add_comment(
        &self,
        principal: &Principal,
        post_id: i64,
        form: CommentForm,
    ) -> Result<CommentRecord, PostError> {
        let author_id = principal.user_id().ok_or(PostError::Unauthenticated)?;
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(PostError::NotFound { id: post_id });
        }

        let text = form.text.trim();
        validate_not_empty("text", text).map_err(FieldErrors::from)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text: text.to_string(),
            })
            .await?;

        info!(
            target = "yatube::posts",
            post_id,
            comment_id = comment.id,
            "comment added"
        );
        Ok(comment)
    }

    async fn validate(&self, form: PostForm) -> Result<ValidPost, PostError> {
        let text = form.text.trim().to_string();
        let mut errors = FieldErrors::new();
        errors.check(validate_not_empty("text", &text));

        let group_id = match self.resolve_group(form.group.trim()).await {
            Ok(group_id) => group_id,
            Err(PostError::Validation(group_errors)) => {
                group_errors.iter().cloned().for_each(|err| errors.push(err));
                None
            }
            Err(other) => return Err(other),
        };

        if let Some(image) = &form.image {
            if form.clear_image {
                errors.push(ValidationError::new(
                    "image",
                    UPLOAD_AND_CLEAR_MESSAGE,
                    image.file_name.as_str(),
                ));
            } else {
                errors.check(validate_image(image));
            }
        }

        errors.into_result()?;
        Ok(ValidPost {
            text,
            group_id,
            image: form.image,
            clear_image: form.clear_image,
        })
    }

    async fn resolve_group(&self, raw: &str) -> Result<Option<i64>, PostError> {
        if raw.is_empty() {
            return Ok(None);
        }
        let invalid = || {
            PostError::Validation(
                ValidationError::new("group", INVALID_CHOICE_MESSAGE, raw).into(),
            )
        };
        let id: i64 = raw.parse().map_err(|_| invalid())?;
        match self.groups.find_by_id(id).await? {
            Some(group) => Ok(Some(group.id)),
            None => Err(invalid()),
        }
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, PostError> {
        match image {
            Some(upload) => {
                let stored = self
                    .images
                    .store_post_image(&upload.file_name, upload.data)
                    .await?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    /// Drop a freshly stored image whose post never made it to the database.
    async fn discard_image(&self, stored: Option<&str>) {
        let Some(path) = stored else {
            return;
        };
        if let Err(err) = self.images.remove(path).await {
            warn!(
                target = "yatube::posts",
                path,
                error = %err,
                "failed to remove orphaned image"
            );
        }
    }
}

fn validate_image(image: &ImageUpload) -> Result<(), ValidationError> {
    if image.data.is_empty() {
        return Err(ValidationError::new(
            "image",
            EMPTY_FILE_MESSAGE,
            image.file_name.as_str(),
        ));
    }
    if imagesize::blob_size(&image.data).is_err() {
        return Err(ValidationError::new(
            "image",
            INVALID_IMAGE_MESSAGE,
            image.file_name.as_str(),
        ));
    }
    Ok(())
}
