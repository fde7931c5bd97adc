//! Signup, login and logout

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use sonalyze_common::Error;

use super::pages::{redirect_with_flash, render_page};
use crate::db::{insert_user, verify_credentials};
use crate::error::ApiResult;
use crate::session::{clear_session_cookie, session_cookie};
use crate::AppState;

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const USERNAME_TAKEN: &str = "Username already exists";
pub const MISSING_FIELDS: &str = "Username and password are required";
pub const ACCOUNT_CREATED: &str = "Account created. Please log in.";

/// Build authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/signup", get(signup_page).post(signup_submit))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

fn credentials_form(action: &str, submit: &str, with_email: bool) -> String {
    let email = if with_email {
        r#"<label for="email">Email (optional)</label><input id="email" name="email" type="email">"#
    } else {
        ""
    };
    format!(
        r#"<form method="post" action="{action}">
    <label for="username">Username</label><input id="username" name="username" required>
    <label for="password">Password</label><input id="password" name="password" type="password" required>
    {email}
    <p><button class="button" type="submit">{submit}</button></p>
</form>"#
    )
}

/// GET /login
async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let body = format!(
        r#"{}<p>No account yet? <a href="/signup">Sign up</a>.</p>"#,
        credentials_form("/login", "Log in", false)
    );
    render_page(&state, &headers, "Log in", &body).await
}

/// POST /login
async fn login_submit(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> ApiResult<Response> {
    let username = form.username.trim();

    match verify_credentials(&state.db, username, &form.password).await? {
        Some(user) => {
            tracing::info!(username = %user.username, "User logged in");
            let mut response = Redirect::to("/").into_response();
            if let Some(cookie) = session_cookie(&state.session_key, &user.username) {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Ok(response)
        }
        None => {
            tracing::info!(username, "Login failed");
            Ok(redirect_with_flash("/login", INVALID_CREDENTIALS))
        }
    }
}

/// GET /signup
async fn signup_page(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let body = format!(
        r#"{}<p>Already registered? <a href="/login">Log in</a>.</p>"#,
        credentials_form("/signup", "Sign up", true)
    );
    render_page(&state, &headers, "Sign up", &body).await
}

/// POST /signup
async fn signup_submit(State(state): State<AppState>, Form(form): Form<CredentialsForm>) -> ApiResult<Response> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(redirect_with_flash("/signup", MISSING_FIELDS));
    }

    let email = form.email.as_deref().map(str::trim).filter(|e| !e.is_empty());

    match insert_user(&state.db, username, &form.password, email).await {
        Ok(_) => Ok(redirect_with_flash("/login", ACCOUNT_CREATED)),
        Err(Error::Conflict(_)) => {
            tracing::info!(username, "Signup rejected: username taken");
            Ok(redirect_with_flash("/signup", USERNAME_TAKEN))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /logout
async fn logout() -> Response {
    let mut response = Redirect::to("/").into_response();
    response
        .headers_mut()
        .append(header::SET_COOKIE, clear_session_cookie());
    response
}
