//! Upload history

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use sonalyze_common::db::Upload;

use super::pages::{escape_html, redirect_with_flash, render_page};
use crate::analysis::bitrate::to_kbps;
use crate::db::{list_uploads, list_uploads_for_user};
use crate::error::ApiResult;
use crate::session::current_user;
use crate::AppState;

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new().route("/history", get(history_page))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// `mine` limits the list to the logged-in user's uploads
    pub scope: Option<String>,
}

/// GET /history
async fn history_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Response> {
    let only_mine = query.scope.as_deref() == Some("mine");

    let uploads = if only_mine {
        match current_user(&state.db, &state.session_key, &headers).await? {
            Some(user) => list_uploads_for_user(&state.db, user.id).await?,
            None => return Ok(redirect_with_flash("/login", "Log in to see your own uploads")),
        }
    } else {
        list_uploads(&state.db).await?
    };

    let scope_links = if only_mine {
        r#"<p>Showing your uploads. <a href="/history">Show all</a></p>"#
    } else {
        r#"<p>Showing all uploads. <a href="/history?scope=mine">Show mine</a></p>"#
    };

    let body = format!("{}\n{}", scope_links, history_table(&uploads));
    render_page(&state, &headers, "Upload history", &body).await
}

fn chart_link(label: &str, path: &str) -> String {
    format!(r#"<a href="/{}">{}</a>"#, escape_html(path), label)
}

/// Table of uploads in the order given
pub fn history_table(uploads: &[Upload]) -> String {
    if uploads.is_empty() {
        return "<p>No uploads yet.</p>".to_string();
    }

    let rows: String = uploads
        .iter()
        .map(|u| {
            let charts = [
                chart_link("waveform", &u.plot_path_sr),
                chart_link("decibels", &u.plot_path_decibels),
                chart_link("loudness", &u.loudness_plot_path),
                chart_link("peak", &u.waveform_plot_path),
                chart_link("silence", &u.silence_speech_ratio_plot_path),
                chart_link("harmonicity", &u.harmonicity_plot_path),
                chart_link("spectrum", &u.spectrum_plot_path),
            ]
            .join(" ");

            format!(
                "<tr><td>{}</td><td>{}</td><td>{:.0}</td><td>{:.2}</td><td>{:.1}</td><td>{:.1}</td>\
                 <td>{:.1}</td><td>{:.1}</td><td>{:.1}</td><td>{}</td><td>{}</td></tr>\n",
                u.id,
                escape_html(&u.filename),
                to_kbps(u.bitrate.max(0) as u64),
                u.file_size_mb,
                u.decibel_level,
                u.loudness_db,
                u.harmonicity_db,
                u.tempo_bpm,
                u.silence_ratio * 100.0,
                escape_html(&u.created_at),
                charts
            )
        })
        .collect();

    format!(
        "<table>\n<tr><th>#</th><th>File</th><th>Bitrate (kbps)</th><th>Size (MB)</th>\
         <th>Level (dBFS)</th><th>Loudness (dB)</th><th>HNR (dB)</th><th>Tempo (BPM)</th>\
         <th>Silence (%)</th><th>Uploaded</th><th>Charts</th></tr>\n{}</table>",
        rows
    )
}
