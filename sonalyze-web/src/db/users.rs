//! User accounts

use chrono::Utc;
use sonalyze_common::db::User;
use sonalyze_common::password::{hash_password, verify_password};
use sonalyze_common::{Error, Result};
use sqlx::SqlitePool;

/// Create a user and return its id
///
/// A taken username is reported as [`Error::Conflict`] and no row is written.
pub async fn insert_user(pool: &SqlitePool, username: &str, password: &str, email: Option<&str>) -> Result<i64> {
    let hashed = hash_password(password);

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password_hash, password_salt, email, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(&hashed.hash)
    .bind(&hashed.salt)
    .bind(email)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(done) => {
            tracing::info!(username, "User created");
            Ok(done.last_insert_rowid())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(Error::Conflict("Username already exists".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, password_salt, email, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// The user matching both username and password, if any
pub async fn verify_credentials(pool: &SqlitePool, username: &str, password: &str) -> Result<Option<User>> {
    let user = fetch_user_by_username(pool, username).await?;
    Ok(user.filter(|u| verify_password(password, &u.password_hash, &u.password_salt)))
}
