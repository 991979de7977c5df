use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "daybook-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness. The database gates it; storage is only reported, since a
/// missing bucket blocks uploads but not text-only journaling.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let storage = match state.objects.bucket_exists().await {
        Ok(true) => "ok",
        Ok(false) => "missing_bucket",
        Err(_) => "unreachable",
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ready" } else { "not_ready" },
            "checks": {
                "database": if db_ok { "ok" } else { "failed" },
                "storage": storage,
            },
        })),
    )
}
