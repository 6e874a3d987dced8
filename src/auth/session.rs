//! Cookie-backed session.
//!
//! The session payload is JSON, base64url encoded so it stays within the cookie
//! value alphabet, and signed by `SignedCookieJar` with a key derived from
//! `SECRET_KEY`. Anything that fails verification or decoding loads as an
//! empty (unauthenticated) session.

use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, CookieJar, Key, SameSite, SignedCookieJar};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::AppConfig, state::AppState};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl Session {
    pub fn for_user(user_id: i64, user_email: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            user_email: Some(user_email.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn load(jar: &SignedCookieJar) -> Self {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Self::default();
        };
        match decode(cookie.value()) {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "discarding undecodable session cookie");
                Self::default()
            }
        }
    }

    /// Writes the session into `jar`; the jar emits the `Set-Cookie` header.
    pub fn save(&self, jar: SignedCookieJar, secure: bool) -> anyhow::Result<SignedCookieJar> {
        let value = encode(self)?;
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure);
        Ok(jar.add(cookie))
    }

    /// Expires any `session` cookie the request carried, whether or not it
    /// still verifies.
    pub fn clear(jar: CookieJar) -> CookieJar {
        if jar.get(SESSION_COOKIE).is_none() {
            return jar;
        }
        let mut removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
        removal.make_removal();
        jar.add(removal)
    }
}

fn encode(session: &Session) -> anyhow::Result<String> {
    let json = serde_json::to_vec(session)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn decode(value: &str) -> anyhow::Result<Session> {
    let json = Base64UrlUnpadded::decode_vec(value).map_err(|e| anyhow::anyhow!("base64: {e}"))?;
    Ok(serde_json::from_slice(&json)?)
}

/// Signing key for the session cookie.
pub fn cookie_key(config: &AppConfig) -> Key {
    match &config.secret_key {
        Some(secret) => Key::derive_from(secret.as_bytes()),
        None => {
            warn!("SECRET_KEY not set; using a random key, sessions will not survive a restart");
            Key::generate()
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
