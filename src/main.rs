use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod store;

use auth::rate_limit::RateLimitState;
use config::Config;
use services::lifecycle::StoryLifecycle;
use store::ObjectStore;

/// Uploaded images ride in multipart bodies, so the default 2 MB axum
/// limit is too small for the protected routes.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub lifecycle: Arc<StoryLifecycle>,
    pub objects: Arc<dyn ObjectStore>,
    pub rate_limiter: RateLimitState,
}

pub fn app(state: AppState) -> Router {
    // Auth routes with rate limiting
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        // Stories
        .route("/api/stories", get(handlers::stories::my_timeline))
        .route("/api/stories", post(handlers::stories::create_story))
        .route("/api/stories/dates", get(handlers::stories::list_dates))
        .route("/api/stories/:id", get(handlers::stories::get_story))
        .route("/api/stories/:id", put(handlers::stories::update_story))
        .route("/api/stories/:id", delete(handlers::stories::delete_story))
        .route(
            "/api/stories/:id/image",
            put(handlers::stories::replace_image),
        )
        .route(
            "/api/stories/:id/image",
            delete(handlers::stories::clear_image),
        )
        // Plaza
        .route("/api/plaza", get(handlers::stories::plaza_timeline))
        // Polish
        .route("/api/polish", post(handlers::polish::polish_story))
        // Auth actions requiring a session
        .route("/api/auth/logout", post(handlers::auth::logout))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let allowed_origins: Vec<axum::http::HeaderValue> = {
        let mut origins = vec![state
            .config
            .frontend_url
            .parse::<axum::http::HeaderValue>()
            .unwrap()];
        // In dev, also allow LAN access (e.g. testing from another device)
        if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
            for o in extra.split(',') {
                if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                    origins.push(hv);
                }
            }
        }
        origins
    };
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daybook_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env();
    let config = Arc::new(config);

    // Database
    let db = db::create_pool(&config.database_url).await;
    db::run_migrations(&db).await;
    tracing::info!("Database migrations applied");

    // Stores behind the lifecycle: Postgres for rows, HTTP for image blobs
    let story_store = Arc::new(store::postgres::PgStoryStore::new(db.clone()));
    let objects: Arc<dyn ObjectStore> = Arc::new(store::object::HttpObjectStore::new(&config));
    let lifecycle = Arc::new(StoryLifecycle::new(story_store, objects.clone()));

    let rate_limiter = RateLimitState::new();
    auth::rate_limit::spawn_cleanup_worker(rate_limiter.clone());

    let state = AppState {
        db,
        config: config.clone(),
        lifecycle,
        objects,
        rate_limiter,
    };

    let app = app(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    // Use into_make_service_with_connect_info to provide client IP for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}
