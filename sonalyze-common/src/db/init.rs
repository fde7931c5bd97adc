//! Database initialization
//!
//! Tables are created if absent. With `reset = true` existing tables are
//! dropped first, which wipes every user and upload.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Open (or create) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path, reset: bool) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas on the connect options apply to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool, reset).await?;

    Ok(pool)
}

/// Create the `users` and `uploads` tables
pub async fn init_schema(pool: &SqlitePool, reset: bool) -> Result<()> {
    if reset {
        warn!("Resetting database: dropping users and uploads tables");
        drop_tables(pool).await?;
    }

    create_users_table(pool).await?;
    create_uploads_table(pool).await?;

    Ok(())
}

async fn drop_tables(pool: &SqlitePool) -> Result<()> {
    // uploads references users
    sqlx::query("DROP TABLE IF EXISTS uploads").execute(pool).await?;
    sqlx::query("DROP TABLE IF EXISTS users").execute(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            email TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_uploads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS uploads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            bitrate INTEGER NOT NULL,
            file_size_mb REAL NOT NULL,
            decibel_level REAL NOT NULL,
            loudness_db REAL NOT NULL,
            harmonicity_db REAL NOT NULL,
            tempo_bpm REAL NOT NULL,
            silence_ratio REAL NOT NULL,
            loudness_plot_path TEXT NOT NULL,
            waveform_plot_path TEXT NOT NULL,
            silence_speech_ratio_plot_path TEXT NOT NULL,
            plot_path_decibels TEXT NOT NULL,
            plot_path_sr TEXT NOT NULL,
            harmonicity_plot_path TEXT NOT NULL,
            spectrum_plot_path TEXT NOT NULL,
            user_id INTEGER REFERENCES users(id),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_uploads_user_id ON uploads(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
