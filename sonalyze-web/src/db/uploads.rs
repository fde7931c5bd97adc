//! Upload records

use chrono::Utc;
use sonalyze_common::db::{NewUpload, Upload};
use sonalyze_common::Result;
use sqlx::SqlitePool;

const UPLOAD_COLUMNS: &str = r#"
    id, filename, content_hash, bitrate, file_size_mb, decibel_level, loudness_db,
    harmonicity_db, tempo_bpm, silence_ratio, loudness_plot_path, waveform_plot_path,
    silence_speech_ratio_plot_path, plot_path_decibels, plot_path_sr,
    harmonicity_plot_path, spectrum_plot_path, user_id, created_at
"#;

/// Insert one upload row and return its id
pub async fn insert_upload(pool: &SqlitePool, upload: &NewUpload) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO uploads (
            filename, content_hash, bitrate, file_size_mb, decibel_level, loudness_db,
            harmonicity_db, tempo_bpm, silence_ratio, loudness_plot_path, waveform_plot_path,
            silence_speech_ratio_plot_path, plot_path_decibels, plot_path_sr,
            harmonicity_plot_path, spectrum_plot_path, user_id, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&upload.filename)
    .bind(&upload.content_hash)
    .bind(upload.bitrate)
    .bind(upload.file_size_mb)
    .bind(upload.decibel_level)
    .bind(upload.loudness_db)
    .bind(upload.harmonicity_db)
    .bind(upload.tempo_bpm)
    .bind(upload.silence_ratio)
    .bind(&upload.loudness_plot_path)
    .bind(&upload.waveform_plot_path)
    .bind(&upload.silence_speech_ratio_plot_path)
    .bind(&upload.plot_path_decibels)
    .bind(&upload.plot_path_sr)
    .bind(&upload.harmonicity_plot_path)
    .bind(&upload.spectrum_plot_path)
    .bind(upload.user_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Every upload in insertion order
pub async fn list_uploads(pool: &SqlitePool) -> Result<Vec<Upload>> {
    let query = format!("SELECT {} FROM uploads ORDER BY id ASC", UPLOAD_COLUMNS);
    Ok(sqlx::query_as::<_, Upload>(&query).fetch_all(pool).await?)
}

/// Uploads made by one user, in insertion order
pub async fn list_uploads_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Upload>> {
    let query = format!("SELECT {} FROM uploads WHERE user_id = ? ORDER BY id ASC", UPLOAD_COLUMNS);
    Ok(sqlx::query_as::<_, Upload>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await?)
}

pub async fn count_uploads(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM uploads")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
