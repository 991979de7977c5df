//! In-memory store doubles with switchable failure points, for exercising
//! the lifecycle's cleanup paths without a database or object store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::story::{NewStory, Story, StoryPatch};
use crate::services::visibility;
use crate::store::{ObjectStore, StoryStore};

/// Bare story row for seeding test stores.
pub fn story(owner: Uuid, date: NaiveDate, hour: i16, content: &str) -> Story {
    let now = Utc::now();
    Story {
        id: Uuid::new_v4(),
        user_id: owner,
        story_date: date,
        story_hour: hour,
        content: content.to_string(),
        mood: None,
        image_ref: None,
        is_public: Some(true),
        created_at: now,
        updated_at: now,
    }
}

fn injected(what: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("injected {} failure", what))
}

#[derive(Default)]
pub struct MemoryStoryStore {
    rows: Mutex<Vec<Story>>,
    pub fail_insert: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_set_image_ref: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, story: Story) {
        self.rows.lock().unwrap().push(story);
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.rows.lock().unwrap().iter().any(|s| s.id == id)
    }

    pub fn story_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl StoryStore for MemoryStoryStore {
    async fn insert(&self, owner: Uuid, new: NewStory) -> AppResult<Story> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(injected("insert"));
        }
        let now = Utc::now();
        let story = Story {
            id: Uuid::new_v4(),
            user_id: owner,
            story_date: new.story_date,
            story_hour: new.story_hour,
            content: new.content,
            mood: new.mood,
            image_ref: None,
            is_public: Some(new.is_public),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(story.clone());
        Ok(story)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Story>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn update(&self, id: Uuid, patch: StoryPatch) -> AppResult<Story> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(injected("update"));
        }
        let mut rows = self.rows.lock().unwrap();
        let story = rows
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound("Story not found".into()))?;
        if let Some(content) = patch.content {
            story.content = content;
        }
        if let Some(mood) = patch.mood {
            story.mood = mood;
        }
        if let Some(is_public) = patch.is_public {
            story.is_public = Some(is_public);
        }
        story.updated_at = Utc::now();
        Ok(story.clone())
    }

    async fn set_image_ref(&self, id: Uuid, image_ref: Option<&str>) -> AppResult<Story> {
        if self.fail_set_image_ref.load(Ordering::SeqCst) {
            return Err(injected("set_image_ref"));
        }
        let mut rows = self.rows.lock().unwrap();
        let story = rows
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound("Story not found".into()))?;
        story.image_ref = image_ref.map(|r| r.to_string());
        story.updated_at = Utc::now();
        Ok(story.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|s| s.id != id);
        Ok(rows.len() < before)
    }

    async fn list_for_date(&self, date: NaiveDate, owner: Option<Uuid>) -> AppResult<Vec<Story>> {
        let mut stories: Vec<Story> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.story_date == date)
            .filter(|s| owner.map_or(true, |uid| s.user_id == uid))
            .cloned()
            .collect();
        stories.sort_by_key(|s| (s.story_hour, s.created_at));
        Ok(stories)
    }

    async fn list_dates(&self, owner: Option<Uuid>, viewer: Uuid) -> AppResult<Vec<NaiveDate>> {
        let rows = self.rows.lock().unwrap();
        let mut dates: Vec<NaiveDate> = rows
            .iter()
            .filter(|s| match owner {
                Some(uid) => s.user_id == uid,
                None => s.user_id == viewer || visibility::is_visible(s),
            })
            .map(|s| s.story_date)
            .collect();
        dates.sort();
        dates.dedup();
        dates.reverse();
        Ok(dates)
    }
}

pub struct MemoryObjectStore {
    blobs: Mutex<HashMap<String, Bytes>>,
    bucket: String,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
    pub bucket_missing: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            bucket: "story-images".into(),
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            bucket_missing: AtomicBool::new(false),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> AppResult<String> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::Upload("Failed to upload image: injected".into()));
        }
        self.blobs.lock().unwrap().insert(key.to_string(), bytes);
        Ok(format!("memory://{}/{}", self.bucket, key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Upload("Failed to delete image: injected".into()));
        }
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }

    async fn bucket_exists(&self) -> AppResult<bool> {
        Ok(!self.bucket_missing.load(Ordering::SeqCst))
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
