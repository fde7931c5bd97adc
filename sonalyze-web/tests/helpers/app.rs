//! Test application setup and request helpers

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use sonalyze_common::config::RootFolderInitializer;
use sonalyze_web::config::ServerSettings;
use sonalyze_web::session::{read_flash, SESSION_COOKIE};
use sonalyze_web::{build_router, AppState};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "sonalyze-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub paths: RootFolderInitializer,
    /// Keeps the root folder alive for the test's duration
    pub root: TempDir,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn uploads_dir_entries(&self) -> usize {
        std::fs::read_dir(self.paths.uploads_dir()).unwrap().count()
    }

    /// File names currently in the uploads directory
    pub fn uploads_dir_names(&self) -> Vec<String> {
        std::fs::read_dir(self.paths.uploads_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

/// App backed by a fresh root folder and database file
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Like [`create_test_app`], with settings adjusted by `configure`
pub async fn create_test_app_with(configure: impl FnOnce(&mut ServerSettings)) -> TestApp {
    let root = TempDir::new().unwrap();
    let paths = RootFolderInitializer::new(root.path().to_path_buf());
    paths.ensure_directory_exists().unwrap();

    let pool = sonalyze_common::db::init_database(&paths.database_path(), false)
        .await
        .unwrap();

    let mut settings = ServerSettings {
        root_folder: root.path().to_path_buf(),
        bind_address: "127.0.0.1:0".to_string(),
        max_upload_bytes: 50 * 1024 * 1024,
        analysis_timeout: Duration::from_secs(120),
        silence_threshold_db: -40.0,
        reset_database: false,
        log_level: "info".to_string(),
    };
    configure(&mut settings);

    let state = AppState::new(pool.clone(), settings).unwrap();
    TestApp {
        router: build_router(state),
        pool,
        paths,
        root,
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `application/x-www-form-urlencoded` POST; values must not need escaping
pub fn post_form(uri: &str, fields: &[(&str, &str)], cookie: Option<&str>) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Multipart POST to /upload with one file part named `field`
pub fn multipart_upload(field: &str, filename: &str, bytes: &[u8], cookie: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `name=value` pair of a Set-Cookie header for `name`, if present
fn set_cookie_pair(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

/// Flash message set by a redirect response
pub fn flash_from(response: &Response<Body>) -> Option<String> {
    let pair = set_cookie_pair(response, sonalyze_web::session::FLASH_COOKIE)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(&pair).ok()?);
    read_flash(&headers)
}

/// Non-empty session cookie pair (`sonalyze_session=...`) set by a response
pub fn session_cookie_from(response: &Response<Body>) -> Option<String> {
    set_cookie_pair(response, SESSION_COOKIE).filter(|pair| pair.len() > SESSION_COOKIE.len() + 1)
}
