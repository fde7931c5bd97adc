//! Tests for database initialization

use sonalyze_common::db::{init_database, init_schema};
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("db").join("sonalyze.db");

    let pool = init_database(&db_path, false).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
    assert_eq!(table_names(&pool.unwrap()).await, vec!["uploads", "users"]);
}

#[tokio::test]
async fn test_reopen_preserves_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sonalyze.db");

    let pool = init_database(&db_path, false).await.unwrap();
    sqlx::query(
        "INSERT INTO users (username, password_hash, password_salt, created_at) VALUES ('ada', 'h', 's', 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let pool = init_database(&db_path, false).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_reset_drops_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("sonalyze.db");

    let pool = init_database(&db_path, false).await.unwrap();
    sqlx::query(
        "INSERT INTO users (username, password_hash, password_salt, created_at) VALUES ('ada', 'h', 's', 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();

    init_schema(&pool, true).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(table_names(&pool).await, vec!["uploads", "users"]);
}

#[tokio::test]
async fn test_username_is_unique() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("sonalyze.db"), false)
        .await
        .unwrap();

    let insert = "INSERT INTO users (username, password_hash, password_salt, created_at) VALUES ('ada', 'h', 's', 'now')";
    sqlx::query(insert).execute(&pool).await.unwrap();
    assert!(sqlx::query(insert).execute(&pool).await.is_err());
}
