use crate::domain::error::{AppError, Result};
use crate::domain::user::{NewUser, User};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use super::UserRepository;

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, password_salt) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::ValidationError(
                "A user with that username already exists.".to_string(),
            ),
            _ => AppError::DatabaseError(format!("Failed to insert user: {e}")),
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            password_salt: user.password_salt.clone(),
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserEntity>(
            "SELECT id, username, email, password_hash, password_salt FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(|e| e.into()))
    }

    async fn get_or_create_token(&self, user_id: i64, candidate: &str) -> Result<String> {
        sqlx::query("INSERT OR IGNORE INTO auth_tokens (token_key, user_id) VALUES (?, ?)")
            .bind(candidate)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to store token: {e}")))?;

        sqlx::query_scalar::<_, String>("SELECT token_key FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to fetch token: {e}")))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserEntity>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.password_salt \
             FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.token_key = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to resolve token: {e}")))?;

        Ok(row.map(|e| e.into()))
    }
}

#[derive(sqlx::FromRow)]
struct UserEntity {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    password_salt: String,
}

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        Self {
            id: e.id,
            username: e.username,
            email: e.email,
            password_hash: e.password_hash,
            password_salt: e.password_salt,
        }
    }
}
