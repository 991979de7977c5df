use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::services::polish::polish_content;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct PolishRequest {
    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PolishResponse {
    pub polished_content: String,
}

/// POST /api/polish rewrites a draft into a warmer version of itself.
/// The draft is never persisted; the caller decides what to keep.
pub async fn polish_story(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<PolishRequest>,
) -> AppResult<Json<PolishResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    if body.content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }

    tracing::info!(user_id = %auth_user.id, "Polishing story draft");
    let polished_content = polish_content(&state.config, &body.content).await?;

    Ok(Json(PolishResponse { polished_content }))
}
