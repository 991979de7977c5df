use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::story::{Mood, NewStory, Story, StoryPatch};
use crate::store::StoryStore;

/// SQLSTATE for a query that names a column the schema does not have.
const UNDEFINED_COLUMN: &str = "42703";

pub struct PgStoryStore {
    pool: PgPool,
}

impl PgStoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape on deployments that predate the is_public migration.
#[derive(sqlx::FromRow)]
struct LegacyStoryRow {
    id: Uuid,
    user_id: Uuid,
    story_date: NaiveDate,
    story_hour: i16,
    content: String,
    mood: Option<Mood>,
    image_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LegacyStoryRow> for Story {
    fn from(row: LegacyStoryRow) -> Self {
        Story {
            id: row.id,
            user_id: row.user_id,
            story_date: row.story_date,
            story_hour: row.story_hour,
            content: row.content,
            mood: row.mood,
            image_ref: row.image_ref,
            is_public: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn visibility_column_missing(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNDEFINED_COLUMN),
        sqlx::Error::ColumnNotFound(col) => col == "is_public",
        _ => false,
    }
}

impl PgStoryStore {
    async fn select_story(&self, id: Uuid) -> Result<Option<Story>, sqlx::Error> {
        sqlx::query_as::<_, Story>(
            r#"
            SELECT id, user_id, story_date, story_hour, content, mood, image_ref,
                   is_public, created_at, updated_at
            FROM stories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn select_story_legacy(&self, id: Uuid) -> Result<Option<LegacyStoryRow>, sqlx::Error> {
        sqlx::query_as::<_, LegacyStoryRow>(
            r#"
            SELECT id, user_id, story_date, story_hour, content, mood, image_ref,
                   created_at, updated_at
            FROM stories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn select_for_date(
        &self,
        date: NaiveDate,
        owner: Option<Uuid>,
    ) -> Result<Vec<Story>, sqlx::Error> {
        match owner {
            Some(user_id) => {
                sqlx::query_as::<_, Story>(
                    r#"
                    SELECT id, user_id, story_date, story_hour, content, mood, image_ref,
                           is_public, created_at, updated_at
                    FROM stories
                    WHERE story_date = $1 AND user_id = $2
                    ORDER BY story_hour ASC, created_at ASC
                    "#,
                )
                .bind(date)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Story>(
                    r#"
                    SELECT id, user_id, story_date, story_hour, content, mood, image_ref,
                           is_public, created_at, updated_at
                    FROM stories
                    WHERE story_date = $1
                    ORDER BY story_hour ASC, created_at ASC
                    "#,
                )
                .bind(date)
                .fetch_all(&self.pool)
                .await
            }
        }
    }

    async fn select_for_date_legacy(
        &self,
        date: NaiveDate,
        owner: Option<Uuid>,
    ) -> Result<Vec<LegacyStoryRow>, sqlx::Error> {
        match owner {
            Some(user_id) => {
                sqlx::query_as::<_, LegacyStoryRow>(
                    r#"
                    SELECT id, user_id, story_date, story_hour, content, mood, image_ref,
                           created_at, updated_at
                    FROM stories
                    WHERE story_date = $1 AND user_id = $2
                    ORDER BY story_hour ASC, created_at ASC
                    "#,
                )
                .bind(date)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, LegacyStoryRow>(
                    r#"
                    SELECT id, user_id, story_date, story_hour, content, mood, image_ref,
                           created_at, updated_at
                    FROM stories
                    WHERE story_date = $1
                    ORDER BY story_hour ASC, created_at ASC
                    "#,
                )
                .bind(date)
                .fetch_all(&self.pool)
                .await
            }
        }
    }
}

#[async_trait]
impl StoryStore for PgStoryStore {
    async fn insert(&self, owner: Uuid, new: NewStory) -> AppResult<Story> {
        let story = sqlx::query_as::<_, Story>(
            r#"
            INSERT INTO stories (id, user_id, story_date, story_hour, content, mood, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, story_date, story_hour, content, mood, image_ref,
                      is_public, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(new.story_date)
        .bind(new.story_hour)
        .bind(&new.content)
        .bind(new.mood)
        .bind(new.is_public)
        .fetch_one(&self.pool)
        .await?;

        Ok(story)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Story>> {
        match self.select_story(id).await {
            Ok(story) => Ok(story),
            Err(err) if visibility_column_missing(&err) => {
                tracing::warn!("stories.is_public column is missing; treating stories as shared");
                let row = self.select_story_legacy(id).await?;
                Ok(row.map(Story::from))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, id: Uuid, patch: StoryPatch) -> AppResult<Story> {
        let story = sqlx::query_as::<_, Story>(
            r#"
            UPDATE stories SET
                content = COALESCE($2, content),
                mood = CASE WHEN $3 THEN $4 ELSE mood END,
                is_public = COALESCE($5, is_public),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, story_date, story_hour, content, mood, image_ref,
                      is_public, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.content)
        .bind(patch.mood.is_some())
        .bind(patch.mood.flatten())
        .bind(patch.is_public)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Story not found".into()))?;

        Ok(story)
    }

    async fn set_image_ref(&self, id: Uuid, image_ref: Option<&str>) -> AppResult<Story> {
        let story = sqlx::query_as::<_, Story>(
            r#"
            UPDATE stories SET image_ref = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, story_date, story_hour, content, mood, image_ref,
                      is_public, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(image_ref)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Story not found".into()))?;

        Ok(story)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_date(&self, date: NaiveDate, owner: Option<Uuid>) -> AppResult<Vec<Story>> {
        match self.select_for_date(date, owner).await {
            Ok(stories) => Ok(stories),
            Err(err) if visibility_column_missing(&err) => {
                tracing::warn!("stories.is_public column is missing; treating stories as shared");
                let rows = self.select_for_date_legacy(date, owner).await?;
                Ok(rows.into_iter().map(Story::from).collect())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_dates(&self, owner: Option<Uuid>, viewer: Uuid) -> AppResult<Vec<NaiveDate>> {
        if let Some(user_id) = owner {
            let dates = sqlx::query_scalar::<_, NaiveDate>(
                r#"
                SELECT DISTINCT story_date FROM stories
                WHERE user_id = $1
                ORDER BY story_date DESC
                "#,
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            return Ok(dates);
        }

        // Shared calendar: the viewer's own stories always count, everyone
        // else's unless explicitly hidden.
        let shared = sqlx::query_scalar::<_, NaiveDate>(
            r#"
            SELECT DISTINCT story_date FROM stories
            WHERE user_id = $1 OR is_public IS DISTINCT FROM FALSE
            ORDER BY story_date DESC
            "#,
        )
        .bind(viewer)
        .fetch_all(&self.pool)
        .await;

        match shared {
            Ok(dates) => Ok(dates),
            Err(err) if visibility_column_missing(&err) => {
                tracing::warn!("stories.is_public column is missing; treating stories as shared");
                let dates = sqlx::query_scalar::<_, NaiveDate>(
                    "SELECT DISTINCT story_date FROM stories ORDER BY story_date DESC",
                )
                .fetch_all(&self.pool)
                .await?;
                Ok(dates)
            }
            Err(err) => Err(err.into()),
        }
    }
}
