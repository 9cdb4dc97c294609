use std::path::PathBuf;

use storyplan_core::roles::parse_admin_emails;

use crate::auth::jwt::JwtConfig;
use crate::editor_sessions::{EditorLimits, DEFAULT_IDLE_TTL_MINS, DEFAULT_MAX_PER_USER};

/// Where plans, brands and accounts are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// A single JSON document on local disk.
    Local { path: PathBuf },
    /// A PostgreSQL database.
    Postgres { database_url: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub storage: StorageBackend,
    /// Lowercased admin allow-list, from comma-separated `ADMIN_EMAILS`.
    pub admin_emails: Vec<String>,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Idle lifetime and per-user caps of editor sessions.
    pub editor_limits: EditorLimits,
}

const DEFAULT_LOCAL_STORE_PATH: &str = "data/storyplan.json";

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `STORAGE_BACKEND`              | `local`                 |
    /// | `DATABASE_URL`                 | required for `postgres` |
    /// | `LOCAL_STORE_PATH`             | `data/storyplan.json`   |
    /// | `ADMIN_EMAILS`                 | empty                   |
    /// | `EDITOR_IDLE_TIMEOUT_MINS`     | `120`                   |
    /// | `EDITOR_MAX_SESSIONS_PER_USER` | `8`                     |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values, an unknown `STORAGE_BACKEND`, or a
    /// `postgres` backend without `DATABASE_URL`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        let storage = match backend.trim().to_lowercase().as_str() {
            "local" => StorageBackend::Local {
                path: std::env::var("LOCAL_STORE_PATH")
                    .unwrap_or_else(|_| DEFAULT_LOCAL_STORE_PATH.into())
                    .into(),
            },
            "postgres" => StorageBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .expect("DATABASE_URL must be set when STORAGE_BACKEND=postgres"),
            },
            other => panic!("STORAGE_BACKEND must be 'local' or 'postgres', got '{other}'"),
        };

        let admin_emails = parse_admin_emails(&std::env::var("ADMIN_EMAILS").unwrap_or_default());
        if admin_emails.is_empty() {
            tracing::warn!("ADMIN_EMAILS is empty; nobody can use admin endpoints");
        }

        let jwt = JwtConfig::from_env();

        let idle_mins: i64 = std::env::var("EDITOR_IDLE_TIMEOUT_MINS")
            .unwrap_or_else(|_| DEFAULT_IDLE_TTL_MINS.to_string())
            .parse()
            .expect("EDITOR_IDLE_TIMEOUT_MINS must be a valid i64");
        assert!(idle_mins > 0, "EDITOR_IDLE_TIMEOUT_MINS must be positive");

        let max_per_user: usize = std::env::var("EDITOR_MAX_SESSIONS_PER_USER")
            .unwrap_or_else(|_| DEFAULT_MAX_PER_USER.to_string())
            .parse()
            .expect("EDITOR_MAX_SESSIONS_PER_USER must be a valid usize");
        assert!(max_per_user > 0, "EDITOR_MAX_SESSIONS_PER_USER must be positive");

        let editor_limits = EditorLimits {
            idle_ttl: chrono::Duration::minutes(idle_mins),
            max_per_user,
            ..EditorLimits::default()
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            storage,
            admin_emails,
            jwt,
            editor_limits,
        }
    }
}
