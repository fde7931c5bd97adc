//! HTML page layout, flash handling and the index page

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use sonalyze_common::db::User;

use crate::db::count_uploads;
use crate::error::ApiResult;
use crate::session::{clear_flash_cookie, current_user, flash_cookie, read_flash};
use crate::AppState;

const STYLE: &str = r#"
        body {
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 1100px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
        }
        nav a { margin-right: 14px; color: #0066cc; }
        .flash {
            padding: 10px 14px;
            background: #fff4e5;
            border-left: 4px solid #ff9800;
            margin: 16px 0;
        }
        .button {
            display: inline-block;
            padding: 8px 18px;
            background: #0066cc;
            color: white;
            border: none;
            border-radius: 4px;
            cursor: pointer;
        }
        table { border-collapse: collapse; width: 100%; }
        th, td { border-bottom: 1px solid #ddd; padding: 6px 8px; text-align: left; }
        img.chart { max-width: 100%; border: 1px solid #eee; margin: 8px 0; }
        form label { display: block; margin: 8px 0 2px; }
"#;

/// Build index route
pub fn page_routes() -> Router<AppState> {
    Router::new().route("/", get(index_page))
}

/// Escape text for inclusion in HTML element content or attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap `body` (already-escaped HTML) in the site layout
pub fn layout(title: &str, user: Option<&User>, flash: Option<&str>, body: &str) -> String {
    let nav_user = match user {
        Some(u) => format!(
            r#"<span>Signed in as <strong>{}</strong></span> <a href="/logout">Log out</a>"#,
            escape_html(&u.username)
        ),
        None => r#"<a href="/login">Log in</a><a href="/signup">Sign up</a>"#.to_string(),
    };
    let flash_html = flash
        .map(|msg| format!(r#"<div class="flash">{}</div>"#, escape_html(msg)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Sonalyze</title>
    <style>{style}</style>
</head>
<body>
    <nav><a href="/">Home</a><a href="/upload">Upload</a><a href="/history">History</a> {nav_user}</nav>
    <h1>{title}</h1>
    {flash_html}
    {body}
</body>
</html>
"#,
        title = escape_html(title),
        style = STYLE,
    )
}

/// Render a page, consuming any pending flash message from the request
pub async fn render_page(state: &AppState, headers: &HeaderMap, title: &str, body: &str) -> ApiResult<Response> {
    render_page_with_status(state, headers, StatusCode::OK, title, body).await
}

pub async fn render_page_with_status(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    title: &str,
    body: &str,
) -> ApiResult<Response> {
    let user = current_user(&state.db, &state.session_key, headers).await?;
    let flash = read_flash(headers);
    let html = layout(title, user.as_ref(), flash.as_deref(), body);

    let mut response = (status, Html(html)).into_response();
    if flash.is_some() {
        response
            .headers_mut()
            .append(header::SET_COOKIE, clear_flash_cookie());
    }
    Ok(response)
}

/// 303 redirect to `location` carrying a flash message
pub fn redirect_with_flash(location: &str, message: &str) -> Response {
    let mut response = Redirect::to(location).into_response();
    if let Some(cookie) = flash_cookie(message) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// GET /
async fn index_page(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let total = count_uploads(&state.db).await?;
    let body = format!(
        r#"<p>Upload an <code>.mp3</code> or <code>.wav</code> file to measure its bitrate, loudness,
decibel range, harmonicity, tempo and silence/speech ratio, with a chart for each.</p>
<p><a class="button" href="/upload">Upload audio</a></p>
<p>{} file(s) analysed so far. See the <a href="/history">upload history</a>.</p>"#,
        total
    );
    render_page(&state, &headers, "Audio analysis", &body).await
}

/// Fallback for unknown paths
pub async fn not_found_page(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    render_page_with_status(
        &state,
        &headers,
        StatusCode::NOT_FOUND,
        "Not found",
        r#"<p>No such page. Go back <a href="/">home</a>.</p>"#,
    )
    .await
}
