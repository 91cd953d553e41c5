//! Postgres connection pool.
//!
//! The pool is created lazily: nothing connects until the first query, so an
//! unreachable database does not stop the application from composing. A
//! malformed `DATABASE_URL` does.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Settings;
use crate::error::InitError;

const DEFAULT_POOL_SIZE: u64 = 5;

#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Must run inside a Tokio runtime; the pool spawns its maintenance tasks there.
    pub fn init_app(settings: &Settings) -> Result<Self, InitError> {
        let url = settings
            .get_str("DATABASE_URL")
            .ok_or_else(|| InitError::extension("database", "DATABASE_URL is not set"))?;
        let size = settings
            .get_u64("DATABASE_POOL_SIZE")?
            .unwrap_or(DEFAULT_POOL_SIZE);
        let size = u32::try_from(size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| InitError::extension("database", "DATABASE_POOL_SIZE must be between 1 and u32::MAX"))?;

        let pool = PgPoolOptions::new()
            .max_connections(size)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(url)
            .map_err(|e| InitError::extension("database", e))?;

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[actix_rt::test]
    async fn test_lazy_pool_does_not_connect() {
        let settings = Settings::testing().with("DATABASE_URL", json!("postgres://nobody@127.0.0.1:1/none"));
        let db = Database::init_app(&settings).unwrap();
        assert_eq!(db.pool().size(), 0);
    }

    #[actix_rt::test]
    async fn test_malformed_url_fails() {
        let settings = Settings::testing().with("DATABASE_URL", json!("not a url"));
        assert!(matches!(
            Database::init_app(&settings),
            Err(InitError::Extension { name: "database", .. })
        ));
    }

    #[actix_rt::test]
    async fn test_zero_pool_size_fails() {
        let settings = Settings::testing().with("DATABASE_POOL_SIZE", json!(0));
        assert!(Database::init_app(&settings).is_err());
    }
}
