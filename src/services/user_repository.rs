//! SQLite-backed lookup/update of user records.
//!
//! This is the only place the service remembers which object belongs to
//! which user. Object storage itself knows nothing about users.

use crate::models::user::User;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

const INIT_MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone, Debug)]
pub struct UserRepository {
    /// Shared SQLite connection pool.
    db: Arc<SqlitePool>,
}

impl UserRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Look up a user by id. `None` when no such row exists.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, username, profile_img_name FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&*self.db)
            .await
    }

    /// Record `object_name` as the user's profile image.
    ///
    /// Returns `false` if the user does not exist.
    pub async fn set_profile_img_name(
        &self,
        id: i64,
        object_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET profile_img_name = ? WHERE id = ?")
            .bind(object_name)
            .bind(id)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert `username` if it is not there yet and return the row.
    pub async fn ensure_user(&self, username: &str) -> Result<User, sqlx::Error> {
        sqlx::query("INSERT INTO users (username) VALUES (?) ON CONFLICT(username) DO NOTHING")
            .bind(username)
            .execute(&*self.db)
            .await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, profile_img_name FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&*self.db)
        .await?;

        info!(user_id = user.id, username, "user ready");
        Ok(user)
    }
}

/// Apply the embedded schema. Statements are idempotent, so this is safe to
/// run on every start.
pub async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = INIT_MIGRATION
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let repo = UserRepository::new(memory_pool().await);

        let first = repo.ensure_user("kim").await.unwrap();
        let second = repo.ensure_user("kim").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.profile_img_name, None);
    }

    #[tokio::test]
    async fn find_missing_user_returns_none() {
        let repo = UserRepository::new(memory_pool().await);
        assert!(repo.find_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_image_name_round_trips() {
        let repo = UserRepository::new(memory_pool().await);
        let user = repo.ensure_user("kim").await.unwrap();

        assert!(repo.set_profile_img_name(user.id, "abc_cat.png").await.unwrap());
        let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.profile_img_name.as_deref(), Some("abc_cat.png"));
    }

    #[tokio::test]
    async fn updating_unknown_user_reports_false() {
        let repo = UserRepository::new(memory_pool().await);
        assert!(!repo.set_profile_img_name(7, "abc_cat.png").await.unwrap());
    }

    #[tokio::test]
    async fn migrations_can_run_twice() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn username_lookup_relies_on_unique_index_only() {
        let pool = memory_pool().await;
        let indexes: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'users'",
        )
        .fetch_all(pool.as_ref())
        .await
        .unwrap();
        assert_eq!(indexes, vec!["sqlite_autoindex_users_1".to_string()]);
    }
}
