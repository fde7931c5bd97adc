//! Signed session cookie and one-shot flash messages
//!
//! Session cookie: `sonalyze_session=<base64url username>.<hex HMAC-SHA256(secret, username)>`.
//! The secret is generated per process, so restarting the server logs
//! everyone out.
//!
//! Flash cookie: `sonalyze_flash=<base64url message>`, set on a redirect and
//! cleared by the next rendered page.

use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use sonalyze_common::db::User;
use sonalyze_common::password::constant_time_eq;
use sqlx::SqlitePool;

use crate::db::users::fetch_user_by_username;

pub const SESSION_COOKIE: &str = "sonalyze_session";
pub const FLASH_COOKIE: &str = "sonalyze_flash";

type HmacSha256 = Hmac<Sha256>;

/// Per-process signing secret for session cookies
#[derive(Clone)]
pub struct SessionKey {
    secret: [u8; 32],
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

impl SessionKey {
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self { secret }
    }

    /// Hex HMAC-SHA256 of `username`; `None` only if the key is rejected,
    /// which HMAC never does for a 32-byte key
    fn signature(&self, username: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(username.as_bytes());
        Some(format!("{:x}", mac.finalize().into_bytes()))
    }

    /// Cookie value identifying `username`
    pub fn sign(&self, username: &str) -> Option<String> {
        let signature = self.signature(username)?;
        Some(format!("{}.{}", URL_SAFE_NO_PAD.encode(username), signature))
    }

    /// Username carried by a cookie value, if the signature matches
    pub fn verify(&self, value: &str) -> Option<String> {
        let (encoded, signature) = value.split_once('.')?;
        let username = String::from_utf8(URL_SAFE_NO_PAD.decode(encoded).ok()?).ok()?;

        if constant_time_eq(self.signature(&username)?.as_bytes(), signature.as_bytes()) {
            Some(username)
        } else {
            None
        }
    }
}

/// Value of the named cookie from the request's `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn cookie_header(value: String) -> Option<HeaderValue> {
    HeaderValue::from_str(&value).ok()
}

/// `Set-Cookie` value logging `username` in
pub fn session_cookie(key: &SessionKey, username: &str) -> Option<HeaderValue> {
    cookie_header(format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        key.sign(username)?
    ))
}

/// `Set-Cookie` value logging the current user out
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("sonalyze_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// `Set-Cookie` value carrying a flash message to the next page
pub fn flash_cookie(message: &str) -> Option<HeaderValue> {
    cookie_header(format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        URL_SAFE_NO_PAD.encode(message)
    ))
}

/// `Set-Cookie` value removing a displayed flash message
pub fn clear_flash_cookie() -> HeaderValue {
    HeaderValue::from_static("sonalyze_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Pending flash message, if any
pub fn read_flash(headers: &HeaderMap) -> Option<String> {
    let encoded = read_cookie(headers, FLASH_COOKIE)?;
    if encoded.is_empty() {
        return None;
    }
    String::from_utf8(URL_SAFE_NO_PAD.decode(encoded).ok()?).ok()
}

/// Username of a valid session cookie
pub fn session_username(key: &SessionKey, headers: &HeaderMap) -> Option<String> {
    key.verify(&read_cookie(headers, SESSION_COOKIE)?)
}

/// Logged-in user, if the session cookie is valid and the user still exists
pub async fn current_user(
    pool: &SqlitePool,
    key: &SessionKey,
    headers: &HeaderMap,
) -> sonalyze_common::Result<Option<User>> {
    match session_username(key, headers) {
        Some(username) => fetch_user_by_username(pool, &username).await,
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_sign_and_verify() {
        let key = SessionKey::generate();
        let value = key.sign("alice").unwrap();

        assert_eq!(key.verify(&value).as_deref(), Some("alice"));
        assert_eq!(key.verify("YWxpY2U.deadbeef"), None);
        assert_eq!(key.verify("garbage"), None);
    }

    #[test]
    fn test_signature_is_hmac_sha256_hex() {
        let value = SessionKey::generate().sign("alice").unwrap();
        let (_, signature) = value.split_once('.').unwrap();

        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_extended_username_rejected() {
        let key = SessionKey::generate();
        let value = key.sign("alice").unwrap();
        let (_, signature) = value.split_once('.').unwrap();
        let extended = format!("{}.{}", URL_SAFE_NO_PAD.encode("alice\u{80}admin"), signature);

        assert_eq!(key.verify(&extended), None);
    }

    #[test]
    fn test_other_process_key_rejected() {
        let value = SessionKey::generate().sign("alice").unwrap();
        assert_eq!(SessionKey::generate().verify(&value), None);
    }

    #[test]
    fn test_tampered_username_rejected() {
        let key = SessionKey::generate();
        let value = key.sign("alice").unwrap();
        let (_, signature) = value.split_once('.').unwrap();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode("mallory"), signature);

        assert_eq!(key.verify(&forged), None);
    }

    #[test]
    fn test_read_cookie_among_many() {
        let headers = headers_with_cookie("a=1; sonalyze_flash=SGk; b=2");
        assert_eq!(read_cookie(&headers, "b").as_deref(), Some("2"));
        assert_eq!(read_flash(&headers).as_deref(), Some("Hi"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_session_username_from_headers() {
        let key = SessionKey::generate();
        let headers = headers_with_cookie(&format!("{}={}", SESSION_COOKIE, key.sign("bob").unwrap()));
        assert_eq!(session_username(&key, &headers).as_deref(), Some("bob"));
    }

    #[test]
    fn test_flash_cookie_encodes_message() {
        let header = flash_cookie("Unsupported file format. Only .mp3 and .wav are allowed.").unwrap();
        let pair = header.to_str().unwrap().split(';').next().unwrap().to_string();
        assert!(pair.starts_with("sonalyze_flash="));

        assert_eq!(
            read_flash(&headers_with_cookie(&pair)).as_deref(),
            Some("Unsupported file format. Only .mp3 and .wav are allowed.")
        );
    }
}
