//! SQLite user store
//!
//! All database access goes through this module.
//! Uses SQLx with migrations applied at connect time.

use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::User;
use crate::error::AppError;

/// Database connection pool wrapper
pub struct UserStore {
    pool: Pool<Sqlite>,
}

impl UserStore {
    /// Connect to the database, creating the file and running
    /// migrations if needed.
    ///
    /// # Errors
    /// Returns error if connection or migration fails. Callers treat
    /// this as fatal: the server must not accept requests against an
    /// unreachable store.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create connection string
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Look up a user by provider subject id
    ///
    /// # Returns
    /// The user or None. Absence is not an error.
    pub async fn find_user_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE provider_id = ?")
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Insert a new user record
    ///
    /// The UNIQUE index on `provider_id` is the source of truth for
    /// duplicate detection; a violation surfaces as
    /// [`AppError::DuplicateIdentity`] so callers can resolve the race.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, provider_id, display_name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.provider_id)
        .bind(&user.display_name)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                crate::metrics::USERS_CREATED_TOTAL.inc();
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AppError::DuplicateIdentity(user.provider_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Count stored user records
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
