use axum::{
    extract::{Multipart, Path, Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::story::{
    CreateStoryRequest, DatesQuery, Scope, Story, TimelineQuery, UpdateStoryRequest,
};
use crate::services::timeline::TimelineDay;
use crate::store::ImageUpload;
use crate::AppState;

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", e))
}

async fn image_from_field(field: axum::extract::multipart::Field<'_>) -> AppResult<ImageUpload> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;

    if !content_type.starts_with("image/") {
        return Err(AppError::Validation("Please attach an image file".into()));
    }

    Ok(ImageUpload {
        filename,
        content_type,
        bytes,
    })
}

pub async fn my_timeline(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TimelineQuery>,
) -> AppResult<Json<TimelineDay>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let day = state
        .lifecycle
        .timeline(auth_user.id, Scope::Mine, date)
        .await?;
    Ok(Json(day))
}

pub async fn plaza_timeline(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<TimelineQuery>,
) -> AppResult<Json<TimelineDay>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let day = state
        .lifecycle
        .timeline(auth_user.id, Scope::Plaza, date)
        .await?;
    Ok(Json(day))
}

pub async fn list_dates(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DatesQuery>,
) -> AppResult<Json<Vec<NaiveDate>>> {
    let scope = query.scope.unwrap_or(Scope::Mine);
    let dates = state.lifecycle.dates(auth_user.id, scope).await?;
    Ok(Json(dates))
}

/// POST /api/stories takes multipart: a `story` JSON part plus an optional
/// `image` file part, so the entry and its image land in one operation.
pub async fn create_story(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> AppResult<Json<Story>> {
    let mut draft: Option<CreateStoryRequest> = None;
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("story") => {
                let raw = field.bytes().await.map_err(multipart_error)?;
                let parsed: CreateStoryRequest = serde_json::from_slice(&raw)
                    .map_err(|e| AppError::Validation(format!("Invalid story payload: {}", e)))?;
                draft = Some(parsed);
            }
            Some("image") => {
                image = Some(image_from_field(field).await?);
            }
            _ => {}
        }
    }

    let body = draft.ok_or_else(|| {
        AppError::Validation("Multipart body is missing the story field".into())
    })?;
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let story = state
        .lifecycle
        .create(auth_user.id, body.into_new_story(), image)
        .await?;
    Ok(Json(story))
}

pub async fn get_story(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(story_id): Path<Uuid>,
) -> AppResult<Json<Story>> {
    let story = state.lifecycle.get(auth_user.id, story_id).await?;
    Ok(Json(story))
}

pub async fn update_story(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(story_id): Path<Uuid>,
    Json(body): Json<UpdateStoryRequest>,
) -> AppResult<Json<Story>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let story = state
        .lifecycle
        .update(auth_user.id, story_id, body.into_patch())
        .await?;
    Ok(Json(story))
}

pub async fn delete_story(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(story_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state.lifecycle.delete(auth_user.id, story_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// PUT /api/stories/:id/image takes multipart with an `image` file part.
pub async fn replace_image(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(story_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Story>> {
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(|n| n.to_string());
        if name.as_deref() == Some("image") {
            image = Some(image_from_field(field).await?);
        }
    }

    let image = image.ok_or_else(|| {
        AppError::Validation("Multipart body is missing the image field".into())
    })?;

    let story = state
        .lifecycle
        .replace_image(auth_user.id, story_id, image)
        .await?;
    Ok(Json(story))
}

pub async fn clear_image(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(story_id): Path<Uuid>,
) -> AppResult<Json<Story>> {
    let story = state.lifecycle.clear_image(auth_user.id, story_id).await?;
    Ok(Json(story))
}
