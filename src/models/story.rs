use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A journal entry pinned to one hour slot of one day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Story {
    pub id: Uuid,
    pub user_id: Uuid,
    pub story_date: NaiveDate,
    pub story_hour: i16,
    pub content: String,
    pub mood: Option<Mood>,
    pub image_ref: Option<String>,
    /// None on rows written before the sharing flag existed.
    pub is_public: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq)]
#[sqlx(type_name = "mood", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Calm,
    Happy,
    Energetic,
    Peaceful,
    Thoughtful,
    Warm,
}

/// Input for creating a story. Has no image field on purpose: a story row
/// always starts without an image and only gains one once the blob upload
/// has succeeded.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub story_date: NaiveDate,
    pub story_hour: i16,
    pub content: String,
    pub mood: Option<Mood>,
    pub is_public: bool,
}

/// Partial update. `mood` distinguishes "leave alone" (None) from
/// "clear" (Some(None)).
#[derive(Debug, Clone, Default)]
pub struct StoryPatch {
    pub content: Option<String>,
    pub mood: Option<Option<Mood>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStoryRequest {
    #[validate(length(max = 10000, message = "Story must be under 10000 characters"))]
    pub content: String,

    pub story_date: NaiveDate,

    #[validate(range(min = 0, max = 23, message = "Hour must be between 0 and 23"))]
    pub story_hour: i16,

    pub mood: Option<Mood>,

    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

impl CreateStoryRequest {
    pub fn into_new_story(self) -> NewStory {
        NewStory {
            story_date: self.story_date,
            story_hour: self.story_hour,
            content: self.content,
            mood: self.mood,
            is_public: self.is_public,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStoryRequest {
    #[validate(length(max = 10000, message = "Story must be under 10000 characters"))]
    pub content: Option<String>,

    /// Absent = keep, null = clear, value = set.
    #[serde(default, with = "serde_with::rust::double_option")]
    pub mood: Option<Option<Mood>>,

    pub is_public: Option<bool>,
}

impl UpdateStoryRequest {
    pub fn into_patch(self) -> StoryPatch {
        StoryPatch {
            content: self.content,
            mood: self.mood,
            is_public: self.is_public,
        }
    }
}

/// Query params for the timeline endpoints. Date defaults to today (UTC).
#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Mine,
    Plaza,
}

#[derive(Debug, Deserialize)]
pub struct DatesQuery {
    pub scope: Option<Scope>,
}
