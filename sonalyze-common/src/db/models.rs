//! Database models

use serde::{Deserialize, Serialize};

/// Row of the `users` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub email: Option<String>,
    pub created_at: String,
}

/// Row of the `uploads` table
///
/// Chart paths are relative to the root folder (e.g.
/// `static/charts/<hash>/loudness.png`) so they double as URL paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Upload {
    pub id: i64,
    pub filename: String,
    pub content_hash: String,
    /// Bits per second
    pub bitrate: i64,
    pub file_size_mb: f64,
    pub decibel_level: f64,
    pub loudness_db: f64,
    pub harmonicity_db: f64,
    pub tempo_bpm: f64,
    /// Silent frames as a fraction of all frames, 0.0..=1.0
    pub silence_ratio: f64,
    pub loudness_plot_path: String,
    pub waveform_plot_path: String,
    pub silence_speech_ratio_plot_path: String,
    pub plot_path_decibels: String,
    pub plot_path_sr: String,
    pub harmonicity_plot_path: String,
    pub spectrum_plot_path: String,
    pub user_id: Option<i64>,
    pub created_at: String,
}

/// Values for inserting an upload row
#[derive(Debug, Clone, PartialEq)]
pub struct NewUpload {
    pub filename: String,
    pub content_hash: String,
    pub bitrate: i64,
    pub file_size_mb: f64,
    pub decibel_level: f64,
    pub loudness_db: f64,
    pub harmonicity_db: f64,
    pub tempo_bpm: f64,
    pub silence_ratio: f64,
    pub loudness_plot_path: String,
    pub waveform_plot_path: String,
    pub silence_speech_ratio_plot_path: String,
    pub plot_path_decibels: String,
    pub plot_path_sr: String,
    pub harmonicity_plot_path: String,
    pub spectrum_plot_path: String,
    pub user_id: Option<i64>,
}
