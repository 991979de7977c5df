use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,
    pub jwt_access_ttl_secs: i64,
    pub jwt_refresh_ttl_secs: i64,

    // Object storage (image blobs)
    pub storage_url: String,
    pub storage_bucket: String,
    pub storage_service_key: String,

    pub claude_api_key: String,
    pub claude_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_access_ttl_secs: env::var("JWT_ACCESS_TTL_SECS")
                .unwrap_or_else(|_| "900".into())
                .parse()
                .expect("JWT_ACCESS_TTL_SECS must be a number"),
            jwt_refresh_ttl_secs: env::var("JWT_REFRESH_TTL_SECS")
                .unwrap_or_else(|_| "604800".into())
                .parse()
                .expect("JWT_REFRESH_TTL_SECS must be a number"),

            storage_url: env::var("STORAGE_URL").unwrap_or_else(|_| String::new()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "story-images".into()),
            storage_service_key: env::var("STORAGE_SERVICE_KEY")
                .unwrap_or_else(|_| String::new()),

            claude_api_key: env::var("CLAUDE_API_KEY").unwrap_or_else(|_| String::new()),
            claude_model: env::var("CLAUDE_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".into()),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/daybook_test".into(),
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        jwt_secret: "test-secret".into(),
        jwt_access_ttl_secs: 900,
        jwt_refresh_ttl_secs: 604800,
        storage_url: "https://files.example.com/storage/v1".into(),
        storage_bucket: "story-images".into(),
        storage_service_key: "service-key".into(),
        claude_api_key: String::new(),
        claude_model: "claude-sonnet-4-20250514".into(),
    }
}
