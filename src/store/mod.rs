//! Storage seams: story rows in Postgres, image blobs behind an HTTP
//! object store. Handlers and services only see the traits, so tests can
//! swap in the in-memory doubles from [`testing`].

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::story::{NewStory, Story, StoryPatch};

pub mod object;
pub mod postgres;
#[cfg(test)]
pub mod testing;

/// Persistence surface for story rows.
#[async_trait]
pub trait StoryStore: Send + Sync + 'static {
    /// Insert a new row for `owner`. The row always starts without an image.
    async fn insert(&self, owner: Uuid, new: NewStory) -> AppResult<Story>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Story>>;

    /// Apply a partial update and return the updated row.
    async fn update(&self, id: Uuid, patch: StoryPatch) -> AppResult<Story>;

    /// Point the row at a blob, or clear it with None.
    async fn set_image_ref(&self, id: Uuid, image_ref: Option<&str>) -> AppResult<Story>;

    /// Delete the row. Returns false when no row matched.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// All stories on a date, ordered by hour then creation time.
    /// `owner` = Some restricts to that author; None returns everyone's.
    async fn list_for_date(&self, date: NaiveDate, owner: Option<Uuid>) -> AppResult<Vec<Story>>;

    /// Distinct dates that have stories, newest first. `owner` = Some lists
    /// that author's dates; None lists dates with stories visible to `viewer`.
    async fn list_dates(&self, owner: Option<Uuid>, viewer: Uuid) -> AppResult<Vec<NaiveDate>>;
}

/// Blob storage surface for story images.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Store a blob and return its public ref.
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> AppResult<String>;

    /// Remove a blob. Removing a blob that is already gone is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Probe whether the configured bucket exists. Transport failures map to
    /// a storage-config error rather than `false`.
    async fn bucket_exists(&self) -> AppResult<bool>;

    fn bucket(&self) -> &str;
}

/// An image payload lifted out of a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Blob key for a story image: story id + upload timestamp + original extension.
pub fn object_key(story_id: Uuid, filename: &str) -> String {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    format!(
        "{}-{}.{}",
        story_id,
        chrono::Utc::now().timestamp_millis(),
        ext
    )
}

/// Extract the blob key from a public ref (the trailing path segment).
pub fn key_from_ref(image_ref: &str) -> Option<&str> {
    image_ref.rsplit('/').next().filter(|k| !k.is_empty())
}
