//! Story lifecycle: create, update, delete, and the image attach/detach
//! flows. A story row never points at a blob that was not written, so every
//! multi-step operation cleans up after the step that failed.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::story::{NewStory, Scope, Story, StoryPatch};
use crate::services::timeline::{self, TimelineDay};
use crate::services::visibility;
use crate::store::{key_from_ref, object_key, ImageUpload, ObjectStore, StoryStore};

pub struct StoryLifecycle {
    store: Arc<dyn StoryStore>,
    objects: Arc<dyn ObjectStore>,
}

impl StoryLifecycle {
    pub fn new(store: Arc<dyn StoryStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// Create a story, optionally with an image. The row is written first;
    /// if the blob upload or the row update that links it fails, the steps
    /// already taken are rolled back and the original error is returned.
    pub async fn create(
        &self,
        owner: Uuid,
        mut new: NewStory,
        image: Option<ImageUpload>,
    ) -> AppResult<Story> {
        new.content = new.content.trim().to_string();
        if new.content.is_empty() {
            return Err(AppError::Validation("Story content is required".into()));
        }
        if !(0..24).contains(&new.story_hour) {
            return Err(AppError::Validation("Hour must be between 0 and 23".into()));
        }

        let story = self.store.insert(owner, new).await?;
        tracing::info!(story_id = %story.id, user_id = %owner, "Story created");

        let Some(image) = image else {
            return Ok(story);
        };

        match self.upload_and_link(&story, image).await {
            Ok(updated) => Ok(updated),
            Err(err) => {
                if let Err(cleanup_err) = self.store.delete(story.id).await {
                    tracing::error!(
                        story_id = %story.id,
                        error = %cleanup_err,
                        "Failed to remove story row after image failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Fetch one story. Hidden stories of other authors read as missing.
    pub async fn get(&self, viewer: Uuid, id: Uuid) -> AppResult<Story> {
        let story = self
            .store
            .get(id)
            .await?
            .ok_or(AppError::NotFound("Story not found".into()))?;

        if story.user_id != viewer && !visibility::is_visible(&story) {
            return Err(AppError::NotFound("Story not found".into()));
        }

        Ok(story)
    }

    pub async fn update(&self, owner: Uuid, id: Uuid, mut patch: StoryPatch) -> AppResult<Story> {
        self.owned(owner, id).await?;

        if let Some(content) = patch.content.as_mut() {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return Err(AppError::Validation("Story content cannot be empty".into()));
            }
            *content = trimmed.to_string();
        }

        self.store.update(id, patch).await
    }

    /// Attach a new image. The old blob is only removed once the new blob is
    /// live and the row points at it; on failure the story keeps its old image.
    pub async fn replace_image(
        &self,
        owner: Uuid,
        id: Uuid,
        image: ImageUpload,
    ) -> AppResult<Story> {
        let story = self.owned(owner, id).await?;
        let old_ref = story.image_ref.clone();

        let updated = self.upload_and_link(&story, image).await?;

        if let Some(old_ref) = old_ref {
            self.discard_blob(&old_ref).await;
        }

        Ok(updated)
    }

    /// Detach the image. The row update is the operation of record; removing
    /// the blob afterwards is best effort.
    pub async fn clear_image(&self, owner: Uuid, id: Uuid) -> AppResult<Story> {
        let story = self.owned(owner, id).await?;

        let updated = self.store.set_image_ref(id, None).await?;

        if let Some(old_ref) = story.image_ref {
            self.discard_blob(&old_ref).await;
        }

        Ok(updated)
    }

    /// Delete a story and its blob. Blob removal runs first and is best
    /// effort; the row delete decides whether the operation succeeded.
    pub async fn delete(&self, owner: Uuid, id: Uuid) -> AppResult<()> {
        let story = self.owned(owner, id).await?;

        if let Some(image_ref) = story.image_ref {
            self.discard_blob(&image_ref).await;
        }

        let deleted = self.store.delete(id).await?;
        if !deleted {
            return Err(AppError::NotFound("Story not found".into()));
        }

        tracing::info!(story_id = %id, user_id = %owner, "Story deleted");
        Ok(())
    }

    /// One day's stories in 24 hour buckets. `Mine` shows only the viewer's
    /// stories; `Plaza` shows everyone's, minus other people's hidden ones.
    pub async fn timeline(
        &self,
        viewer: Uuid,
        scope: Scope,
        date: NaiveDate,
    ) -> AppResult<TimelineDay> {
        let stories = match scope {
            Scope::Mine => self.store.list_for_date(date, Some(viewer)).await?,
            Scope::Plaza => {
                let all = self.store.list_for_date(date, None).await?;
                visibility::filter_for_viewer(all, viewer)
            }
        };

        Ok(timeline::project_day(date, stories))
    }

    /// Dates that have stories, for the calendar pickers.
    pub async fn dates(&self, viewer: Uuid, scope: Scope) -> AppResult<Vec<NaiveDate>> {
        match scope {
            Scope::Mine => self.store.list_dates(Some(viewer), viewer).await,
            Scope::Plaza => self.store.list_dates(None, viewer).await,
        }
    }

    async fn owned(&self, owner: Uuid, id: Uuid) -> AppResult<Story> {
        let story = self
            .store
            .get(id)
            .await?
            .ok_or(AppError::NotFound("Story not found".into()))?;

        if story.user_id != owner {
            return Err(AppError::Forbidden);
        }

        Ok(story)
    }

    /// Upload a blob for `story` and point the row at it. If the row update
    /// fails, the just-written blob is removed before the error surfaces.
    async fn upload_and_link(&self, story: &Story, image: ImageUpload) -> AppResult<Story> {
        if !self.objects.bucket_exists().await? {
            return Err(AppError::StorageConfig(format!(
                "Storage bucket '{}' does not exist. Create it in the storage console and allow public reads.",
                self.objects.bucket()
            )));
        }

        let key = object_key(story.id, &image.filename);
        let image_ref = self
            .objects
            .put(&key, image.bytes.clone(), &image.content_type)
            .await?;

        match self.store.set_image_ref(story.id, Some(&image_ref)).await {
            Ok(updated) => Ok(updated),
            Err(err) => {
                self.discard_blob(&image_ref).await;
                Err(err)
            }
        }
    }

    /// Best-effort blob removal. Failures are logged, never surfaced.
    async fn discard_blob(&self, image_ref: &str) {
        let Some(key) = key_from_ref(image_ref) else {
            tracing::warn!(image_ref = %image_ref, "Could not derive blob key from image ref");
            return;
        };

        if let Err(err) = self.objects.delete(key).await {
            tracing::warn!(image_ref = %image_ref, error = %err, "Failed to delete image blob");
        }
    }
}
