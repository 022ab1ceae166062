//! Filesystem storage for post images.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

const POST_IMAGE_DIR: &str = "posts";
const MAX_NAME_ATTEMPTS: usize = 16;

/// Errors that can occur while interacting with the image storage backend.
#[derive(Debug, Error)]
pub enum ImageStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("no stored file at this path")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("no free file name for `{name}`")]
    NameExhausted { name: String },
}

/// Images live under a single root; stored paths are relative to it.
#[derive(Debug)]
pub struct ImageStorage {
    root: PathBuf,
}

impl ImageStorage {
    /// Initialise storage rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a post image as `posts/<name>`, picking a fresh name when taken.
    pub async fn store_post_image(
        &self,
        original_name: &str,
        data: Bytes,
    ) -> Result<String, ImageStorageError> {
        if data.is_empty() {
            return Err(ImageStorageError::EmptyPayload);
        }

        let directory = self.root.join(POST_IMAGE_DIR);
        fs::create_dir_all(&directory).await?;

        let file_name = sanitize_filename(original_name);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                file_name.clone()
            } else {
                with_suffix(&file_name)
            };
            let stored_path = format!("{POST_IMAGE_DIR}/{candidate}");
            let absolute = self.resolve(&stored_path)?;

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&absolute)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };

            if let Err(err) = file.write_all(&data).await {
                drop(file);
                let _ = fs::remove_file(&absolute).await;
                return Err(err.into());
            }
            file.flush().await?;
            return Ok(stored_path);
        }

        Err(ImageStorageError::NameExhausted { name: file_name })
    }

    /// Contents of a stored file. Directories and missing paths are [`ImageStorageError::NotFound`].
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, ImageStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::metadata(&absolute).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(ImageStorageError::NotFound),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ImageStorageError::NotFound);
            }
            Err(err) => return Err(err.into()),
        }
        let data = fs::read(absolute).await?;
        Ok(Bytes::from(data))
    }

    /// Delete a stored file; a file that is already gone is not an error.
    pub async fn remove(&self, stored_path: &str) -> Result<(), ImageStorageError> {
        let absolute = self.resolve(stored_path)?;
        match fs::remove_file(absolute).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve the absolute filesystem path for a stored image.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, ImageStorageError> {
        let relative = Path::new(stored_path);
        if stored_path.is_empty()
            || relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(ImageStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

fn sanitize_filename(original: &str) -> String {
    let base_name = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let path = Path::new(base_name);
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("image");
    let mut base = slugify(stem);
    if base.is_empty() {
        base = "image".to_string();
    }

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.trim_matches('.').to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value.chars().all(|ch| ch.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}

fn with_suffix(file_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let suffix = &token[..7];
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{file_name}_{suffix}"),
    }
}
