//! Firebase Realtime Database over REST
//!
//! Request bodies, response parsing and URL construction for email/password
//! sign-in, ID token refresh and push. The HTTP transport itself is the
//! firmware's concern; everything here works on byte slices so it can be
//! tested on the host.

use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{RecordId, TransportError};

/// Firebase ID tokens are JWTs of roughly 900-1200 bytes
pub const ID_TOKEN_LEN: usize = 1280;
pub const REFRESH_TOKEN_LEN: usize = 384;
pub const URL_LEN: usize = 1536;

/// Tokens are renewed this long before they expire
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse<'a> {
    id_token: &'a str,
    refresh_token: &'a str,
    expires_in: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse<'a> {
    id_token: &'a str,
    refresh_token: &'a str,
    expires_in: &'a str,
}

#[derive(Deserialize)]
struct PushResponse<'a> {
    name: &'a str,
}

/// Identity Toolkit errors: `{"error":{"code":400,"message":"INVALID_PASSWORD"}}`
#[derive(Deserialize)]
struct ApiErrorResponse<'a> {
    #[serde(borrow)]
    error: ApiError<'a>,
}

#[derive(Deserialize)]
struct ApiError<'a> {
    code: i32,
    message: &'a str,
}

/// Realtime Database errors: `{"error":"Permission denied"}`
#[derive(Deserialize)]
struct DatabaseErrorResponse<'a> {
    error: &'a str,
}

/// ID token plus what is needed to renew it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id_token: String<ID_TOKEN_LEN>,
    pub refresh_token: String<REFRESH_TOKEN_LEN>,
    pub expires_in: Duration,
}

impl Token {
    fn from_parts(
        id_token: &str,
        refresh_token: &str,
        expires_in: &str,
    ) -> Result<Self, TransportError> {
        let expires_in = expires_in
            .parse::<u64>()
            .map_err(|_| TransportError::new(TransportError::RESPONSE, "Bad token lifetime"))?;
        Ok(Self {
            id_token: String::try_from(id_token)
                .map_err(|_| TransportError::new(TransportError::RESPONSE, "ID token too long"))?,
            refresh_token: String::try_from(refresh_token).map_err(|_| {
                TransportError::new(TransportError::RESPONSE, "Refresh token too long")
            })?,
            expires_in: Duration::from_secs(expires_in),
        })
    }
}

pub fn sign_in_url(api_key: &str) -> Result<String<URL_LEN>, TransportError> {
    let mut url = String::new();
    write!(
        url,
        "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key={}",
        api_key
    )
    .map_err(|_| url_too_long())?;
    Ok(url)
}

pub fn refresh_url(api_key: &str) -> Result<String<URL_LEN>, TransportError> {
    let mut url = String::new();
    write!(url, "https://securetoken.googleapis.com/v1/token?key={}", api_key)
        .map_err(|_| url_too_long())?;
    Ok(url)
}

/// `POST` target that appends a child under `path`.
pub fn push_url(
    database_url: &str,
    path: &str,
    id_token: &str,
) -> Result<String<URL_LEN>, TransportError> {
    let mut url = String::new();
    write!(
        url,
        "{}/{}.json?auth={}",
        database_url.trim_end_matches('/'),
        path.trim_matches('/'),
        id_token
    )
    .map_err(|_| url_too_long())?;
    Ok(url)
}

fn url_too_long() -> TransportError {
    TransportError::new(TransportError::RESPONSE, "URL too long")
}

pub fn sign_in_body(email: &str, password: &str, buf: &mut [u8]) -> Result<usize, TransportError> {
    serde_json_core::to_slice(
        &SignInRequest {
            email,
            password,
            return_secure_token: true,
        },
        buf,
    )
    .map_err(|_| TransportError::new(TransportError::RESPONSE, "Sign-in request too large"))
}

pub fn refresh_body(refresh_token: &str, buf: &mut [u8]) -> Result<usize, TransportError> {
    serde_json_core::to_slice(
        &RefreshRequest {
            grant_type: "refresh_token",
            refresh_token,
        },
        buf,
    )
    .map_err(|_| TransportError::new(TransportError::RESPONSE, "Refresh request too large"))
}

pub fn parse_sign_in(status: u16, body: &[u8]) -> Result<Token, TransportError> {
    if status != 200 {
        return Err(parse_error(status, body));
    }
    let (response, _) = serde_json_core::from_slice::<SignInResponse>(body)
        .map_err(|_| TransportError::new(TransportError::RESPONSE, "Malformed sign-in response"))?;
    Token::from_parts(response.id_token, response.refresh_token, response.expires_in)
}

pub fn parse_refresh(status: u16, body: &[u8]) -> Result<Token, TransportError> {
    if status != 200 {
        return Err(parse_error(status, body));
    }
    let (response, _) = serde_json_core::from_slice::<RefreshResponse>(body)
        .map_err(|_| TransportError::new(TransportError::RESPONSE, "Malformed refresh response"))?;
    Token::from_parts(response.id_token, response.refresh_token, response.expires_in)
}

/// The generated key of a pushed child, e.g. `-NxYz...`.
pub fn parse_push(status: u16, body: &[u8]) -> Result<RecordId, TransportError> {
    if status != 200 {
        return Err(parse_error(status, body));
    }
    let (response, _) = serde_json_core::from_slice::<PushResponse>(body)
        .map_err(|_| TransportError::new(TransportError::RESPONSE, "Malformed push response"))?;
    RecordId::try_from(response.name)
        .map_err(|_| TransportError::new(TransportError::RESPONSE, "Record id too long"))
}

/// Best description of a failed response. Falls back to the HTTP status.
pub fn parse_error(status: u16, body: &[u8]) -> TransportError {
    if let Ok((response, _)) = serde_json_core::from_slice::<ApiErrorResponse>(body) {
        return TransportError::new(response.error.code, response.error.message);
    }
    if let Ok((response, _)) = serde_json_core::from_slice::<DatabaseErrorResponse>(body) {
        return TransportError::new(status as i32, response.error);
    }
    TransportError::new(status as i32, "Unexpected HTTP status")
}

/// What a session should do on its next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    SignIn,
    Refresh,
    /// Token valid, or a failed attempt is waiting out its retry interval
    Idle,
}

/// When to sign in, when to refresh, and whether the held token is usable.
///
/// All times are uptime. A failed attempt is not repeated before
/// `retry_interval` has passed; a failed refresh falls back to a full sign-in.
#[derive(Debug)]
pub struct TokenLifecycle {
    token: Option<Token>,
    expires_at: Duration,
    retry_at: Duration,
    retry_interval: Duration,
    refresh_failed: bool,
}

impl TokenLifecycle {
    pub const fn new(retry_interval: Duration) -> Self {
        Self {
            token: None,
            expires_at: Duration::from_ticks(0),
            retry_at: Duration::from_ticks(0),
            retry_interval,
            refresh_failed: false,
        }
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// True while the token is held and outside the refresh margin.
    pub fn is_ready(&self, now: Duration) -> bool {
        self.token.is_some() && now + REFRESH_MARGIN < self.expires_at
    }

    pub fn next_step(&self, now: Duration) -> AuthStep {
        if self.is_ready(now) || now < self.retry_at {
            AuthStep::Idle
        } else if self.token.is_some() && !self.refresh_failed {
            AuthStep::Refresh
        } else {
            AuthStep::SignIn
        }
    }

    pub fn on_token(&mut self, token: Token, now: Duration) {
        debug!("Token valid for {}s", token.expires_in.as_secs());
        self.expires_at = now + token.expires_in;
        self.token = Some(token);
        self.refresh_failed = false;
        self.retry_at = Duration::from_ticks(0);
    }

    pub fn on_failure(&mut self, step: AuthStep, error: &TransportError, now: Duration) {
        warn!("{:?} failed: {}", step, error);
        if step == AuthStep::Refresh {
            self.refresh_failed = true;
        }
        self.retry_at = now + self.retry_interval;
    }
}
