use async_trait::async_trait;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::auth::repo_types::{NewUser, User};
use crate::error::{AppError, AppResult};

/// Persistence for user credentials.
///
/// Uniqueness of username and email is the store's job: `create` must fail
/// with [`AppError::DuplicateIdentity`] when either is taken.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, user: NewUser) -> AppResult<User>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    async fn record_login(&self, id: i64, at: OffsetDateTime) -> AppResult<()>;
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, created_at, last_login, first_name, last_name";

#[derive(Clone)]
pub struct SqlUserStore {
    db: SqlitePool,
}

impl SqlUserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Map a unique-index violation on `users` to the offending field.
fn duplicate_field(e: &sqlx::Error) -> Option<&'static str> {
    let sqlx::Error::Database(db_err) = e else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    let msg = db_err.message();
    if msg.contains("users.username") {
        Some("username")
    } else {
        Some("email")
    }
}

#[async_trait]
impl CredentialStore for SqlUserStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, created_at) \
             VALUES (?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.db)
            .await
            .map_err(|e| match duplicate_field(&e) {
                Some(field) => AppError::DuplicateIdentity { field },
                None => AppError::Storage(e),
            })
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn record_login(&self, id: i64, at: OffsetDateTime) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
