//! Upload form, validation and analysis

use std::io::Write;
use std::path::{Path, PathBuf};

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use axum::body::Bytes;
use sha2::{Digest, Sha256};
use sonalyze_common::config::{CHARTS_DIR, STATIC_DIR};
use sonalyze_common::db::NewUpload;
use tempfile::TempPath;

use super::pages::{escape_html, redirect_with_flash, render_page};
use crate::analysis::bitrate::to_kbps;
use crate::analysis::pipeline::AudioMetrics;
use crate::analysis::{AnalysisError, AnalysisPipeline, AnalysisReport};
use crate::charts::ChartPaths;
use crate::db::insert_upload;
use crate::error::{ApiError, ApiResult};
use crate::session::current_user;
use crate::validator::{validate_upload, UploadRejection};
use crate::AppState;

/// Multipart field carrying the audio file
pub const FILE_FIELD: &str = "file";

/// Name prefix of the per-request files analysed before they are kept
pub const INCOMING_PREFIX: &str = ".incoming-";

pub const TIMEOUT_MESSAGE: &str = "Analysis timed out. Try a shorter file.";

pub const UNDECODABLE_MESSAGE: &str = "The file could not be decoded as audio.";

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload", get(upload_page).post(upload_submit))
}

const UPLOAD_FORM: &str = r#"<form method="post" action="/upload" enctype="multipart/form-data">
    <label for="file">Audio file (.mp3 or .wav)</label>
    <input id="file" name="file" type="file" accept=".mp3,.wav">
    <p><button class="button" type="submit">Analyse</button></p>
</form>"#;

/// GET /upload
async fn upload_page(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    render_page(&state, &headers, "Upload audio", UPLOAD_FORM).await
}

/// Lowercase hex SHA-256 of the uploaded bytes
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Chart path as stored in the database and served under `/static`
fn chart_record_path(content_hash: &str, chart: &Path) -> String {
    let file = chart.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
    format!("{}/{}/{}/{}", STATIC_DIR, CHARTS_DIR, content_hash, file)
}

/// POST /upload
async fn upload_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let user = current_user(&state.db, &state.session_key, &headers).await?;

    let mut file_part = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let filename = field.file_name().map(str::to_string);
            let data = field.bytes().await?;
            file_part = Some((filename, data));
            break;
        }
    }

    let Some((filename, data)) = file_part else {
        return Ok(reject(UploadRejection::NoFilePart, None));
    };

    let stored_name = match validate_upload(filename.as_deref(), data.len()) {
        Ok(name) => name,
        Err(rejection) => return Ok(reject(rejection, filename.as_deref())),
    };

    let hash = content_hash(&data);
    let audio_path = state.paths.uploads_dir().join(&stored_name);
    let chart_dir = state.paths.charts_dir().join(&hash);
    let charts_existed = chart_dir.exists();

    tracing::info!(
        filename = %stored_name,
        bytes = data.len(),
        content_hash = %hash,
        "Upload received, starting analysis"
    );

    let job = AnalysisJob {
        uploads_dir: state.paths.uploads_dir(),
        extension: extension_of(&stored_name),
        data,
        chart_dir: chart_dir.clone(),
    };

    let (report, incoming) = match run_analysis(&state, job).await? {
        Ok(done) => done,
        Err(message) => {
            if !charts_existed && chart_dir.exists() {
                if let Err(e) = tokio::fs::remove_dir_all(&chart_dir).await {
                    tracing::warn!(dir = %chart_dir.display(), error = %e, "Failed to remove partial charts");
                }
            }
            return Ok(redirect_with_flash("/upload", &message));
        }
    };

    // The analysed bytes replace any earlier upload with the same name
    incoming
        .persist(&audio_path)
        .map_err(|e| ApiError::Io(e.error))?;

    let new_upload = new_upload_record(&stored_name, &hash, &report, user.as_ref().map(|u| u.id));
    let upload_id = insert_upload(&state.db, &new_upload).await?;
    tracing::info!(upload_id, filename = %stored_name, "Upload recorded");

    let body = format!(
        r#"<div class="flash">File uploaded successfully with bitrate: {:.0} kbps</div>
{}
{}
<h2>Analyse another file</h2>
{}"#,
        to_kbps(report.metrics.bitrate_bps),
        metrics_table(&stored_name, &report.metrics),
        chart_gallery(&new_upload),
        UPLOAD_FORM
    );
    render_page(&state, &headers, "Analysis results", &body).await
}

/// Bytes of one upload and where its analysis output goes
struct AnalysisJob {
    uploads_dir: PathBuf,
    extension: String,
    data: Bytes,
    chart_dir: PathBuf,
}

impl AnalysisJob {
    /// Write the bytes to a file private to this request and analyse that
    /// file. The file is deleted when the returned path is dropped unless it
    /// is persisted.
    fn run(self, pipeline: &AnalysisPipeline) -> Result<(AnalysisReport, TempPath), AnalysisError> {
        let mut incoming = tempfile::Builder::new()
            .prefix(INCOMING_PREFIX)
            .suffix(&self.extension)
            .tempfile_in(&self.uploads_dir)?;
        incoming.write_all(&self.data)?;
        incoming.flush()?;

        let incoming = incoming.into_temp_path();
        let report = pipeline.run(&incoming, &self.chart_dir)?;
        Ok((report, incoming))
    }
}

/// Run the blocking pipeline off the async runtime, bounded by the
/// configured timeout. The inner `Err` is a message for the user.
async fn run_analysis(
    state: &AppState,
    job: AnalysisJob,
) -> ApiResult<Result<(AnalysisReport, TempPath), String>> {
    let pipeline = state.pipeline.clone();
    let task = tokio::task::spawn_blocking(move || job.run(&pipeline));

    match tokio::time::timeout(state.settings.analysis_timeout, task).await {
        Ok(Ok(Ok(done))) => Ok(Ok(done)),
        Ok(Ok(Err(err))) => {
            tracing::warn!(error = %err, "Analysis failed");
            Ok(Err(analysis_failure_message(&err)))
        }
        Ok(Err(join_err)) => Err(ApiError::Internal(format!("Analysis task failed: {}", join_err))),
        Err(_) => {
            tracing::warn!(
                timeout_secs = state.settings.analysis_timeout.as_secs_f64(),
                "Analysis timed out"
            );
            Ok(Err(TIMEOUT_MESSAGE.to_string()))
        }
    }
}

/// `.wav` / `.mp3` suffix kept on the private file so the decoder can use it
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn analysis_failure_message(err: &AnalysisError) -> String {
    match err {
        AnalysisError::Decode(_) | AnalysisError::EmptyAudio => UNDECODABLE_MESSAGE.to_string(),
        other => format!("Analysis failed: {}", other),
    }
}

fn reject(rejection: UploadRejection, filename: Option<&str>) -> Response {
    tracing::info!(filename = filename.unwrap_or(""), reason = %rejection, "Upload rejected");
    redirect_with_flash("/upload", &rejection.to_string())
}

fn new_upload_record(filename: &str, hash: &str, report: &AnalysisReport, user_id: Option<i64>) -> NewUpload {
    let metrics = &report.metrics;
    let ChartPaths {
        waveform_sr,
        decibels,
        loudness,
        peak_waveform,
        silence_speech,
        harmonicity,
        spectrum,
    } = &report.charts;

    NewUpload {
        filename: filename.to_string(),
        content_hash: hash.to_string(),
        bitrate: metrics.bitrate_bps as i64,
        file_size_mb: metrics.file_size_mb,
        decibel_level: metrics.decibels.mean_dbfs as f64,
        loudness_db: metrics.loudness.integrated,
        harmonicity_db: metrics.harmonicity.mean_hnr_db,
        tempo_bpm: metrics.tempo_bpm,
        silence_ratio: metrics.silence.silence_ratio(),
        loudness_plot_path: chart_record_path(hash, loudness),
        waveform_plot_path: chart_record_path(hash, peak_waveform),
        silence_speech_ratio_plot_path: chart_record_path(hash, silence_speech),
        plot_path_decibels: chart_record_path(hash, decibels),
        plot_path_sr: chart_record_path(hash, waveform_sr),
        harmonicity_plot_path: chart_record_path(hash, harmonicity),
        spectrum_plot_path: chart_record_path(hash, spectrum),
        user_id,
    }
}

fn metrics_table(filename: &str, m: &AudioMetrics) -> String {
    let rows = [
        ("File", escape_html(filename)),
        ("File size", format!("{:.2} MB", m.file_size_mb)),
        ("Duration", format!("{:.2} s", m.duration_seconds)),
        ("Sample rate", format!("{} Hz, {} channel(s)", m.sample_rate, m.channels)),
        ("Bitrate", format!("{:.0} kbps", to_kbps(m.bitrate_bps))),
        (
            "Decibel level",
            format!(
                "{:.1} dBFS mean, {:.1} dBFS peak, {:.1} dB range",
                m.decibels.mean_dbfs, m.decibels.peak_dbfs, m.decibels.dynamic_range_db
            ),
        ),
        ("Loudness", format!("{:.1} dB", m.loudness.integrated)),
        (
            "Peak",
            format!("{:.3} at {:.2} s ({:.1} dBFS)", m.peak.amplitude, m.peak.time_seconds, m.peak.dbfs),
        ),
        (
            "Silence / speech",
            format!("{:.1} % / {:.1} %", m.silence.silence_percentage(), m.silence.speech_percentage()),
        ),
        ("Harmonicity", format!("{:.1} dB HNR", m.harmonicity.mean_hnr_db)),
        ("Tempo", format!("{:.1} BPM", m.tempo_bpm)),
    ];

    let body: String = rows
        .iter()
        .map(|(name, value)| format!("<tr><th>{}</th><td>{}</td></tr>\n", name, value))
        .collect();
    format!("<table>\n{}</table>", body)
}

fn chart_gallery(upload: &NewUpload) -> String {
    [
        ("Waveform and sample rate", &upload.plot_path_sr),
        ("Decibel level", &upload.plot_path_decibels),
        ("Loudness", &upload.loudness_plot_path),
        ("Waveform peak", &upload.waveform_plot_path),
        ("Silence vs speech", &upload.silence_speech_ratio_plot_path),
        ("Harmonicity", &upload.harmonicity_plot_path),
        ("Frequency spectrum", &upload.spectrum_plot_path),
    ]
    .iter()
    .map(|(title, path)| {
        format!(
            r#"<h2>{title}</h2><img class="chart" src="/{src}" alt="{title}">"#,
            title = title,
            src = escape_html(path)
        )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_chart_record_path() {
        let path = chart_record_path("ab12", Path::new("/data/static/charts/ab12/loudness.png"));
        assert_eq!(path, "static/charts/ab12/loudness.png");
    }

    #[test]
    fn test_decode_failure_message() {
        let msg = analysis_failure_message(&AnalysisError::Decode("bad header".to_string()));
        assert_eq!(msg, UNDECODABLE_MESSAGE);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("take.WAV"), ".wav");
        assert_eq!(extension_of("a.b.mp3"), ".mp3");
        assert_eq!(extension_of("noext"), "");
    }
}
