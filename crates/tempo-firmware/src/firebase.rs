use embassy_time::Duration;
use log::info;
use tempo_core::cloud::firebase::{self, AuthStep, Token, TokenLifecycle};
use tempo_core::cloud::{CloudSession, RecordId, TransportError};
use tempo_core::config::CloudConfig;
use tempo_core::platform::Clock;

use crate::clock::EmbassyClock;
use crate::https::SharedHttps;

/// Minimum spacing between two failed sign-in or refresh attempts
const AUTH_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Sign-in and token requests are small
const AUTH_BODY_LEN: usize = 512;

/// Firebase Realtime Database session authenticated as an email/password user.
pub struct FirebaseSession {
    http: &'static SharedHttps,
    cloud: CloudConfig<'static>,
    auth: TokenLifecycle,
    clock: EmbassyClock,
}

impl FirebaseSession {
    pub fn new(http: &'static SharedHttps, cloud: CloudConfig<'static>) -> Self {
        Self {
            http,
            cloud,
            auth: TokenLifecycle::new(AUTH_RETRY_INTERVAL),
            clock: EmbassyClock,
        }
    }

    async fn sign_in(&mut self) -> Result<Token, TransportError> {
        let url = firebase::sign_in_url(self.cloud.api_key)?;
        let mut body = [0u8; AUTH_BODY_LEN];
        let len =
            firebase::sign_in_body(self.cloud.user_email, self.cloud.user_password, &mut body)?;

        let mut http = self.http.lock().await;
        http.post_json(&url, &body[..len], firebase::parse_sign_in).await?
    }

    async fn refresh(&mut self) -> Result<Token, TransportError> {
        let Some(refresh_token) = self.auth.token().map(|t| t.refresh_token.clone()) else {
            return Err(TransportError::new(
                TransportError::NOT_AUTHENTICATED,
                "No refresh token",
            ));
        };
        let url = firebase::refresh_url(self.cloud.api_key)?;
        let mut body = [0u8; AUTH_BODY_LEN];
        let len = firebase::refresh_body(&refresh_token, &mut body)?;

        let mut http = self.http.lock().await;
        http.post_json(&url, &body[..len], firebase::parse_refresh).await?
    }
}

impl CloudSession for FirebaseSession {
    fn is_initialized(&self) -> bool {
        self.cloud.has_credentials()
    }

    fn is_ready(&self) -> bool {
        self.auth.is_ready(self.clock.uptime())
    }

    async fn poll(&mut self) {
        let step = self.auth.next_step(self.clock.uptime());
        let result = match step {
            AuthStep::Idle => return,
            AuthStep::SignIn => {
                info!("Signing in as {}", self.cloud.user_email);
                self.sign_in().await
            }
            AuthStep::Refresh => {
                info!("Refreshing ID token");
                self.refresh().await
            }
        };

        let now = self.clock.uptime();
        match result {
            Ok(token) => self.auth.on_token(token, now),
            Err(e) => self.auth.on_failure(step, &e, now),
        }
    }

    async fn push(&mut self, path: &str, body: &[u8]) -> Result<RecordId, TransportError> {
        let token = self.auth.token().ok_or(TransportError::new(
            TransportError::NOT_AUTHENTICATED,
            "Not signed in",
        ))?;
        let url = firebase::push_url(self.cloud.database_url, path, &token.id_token)?;

        let mut http = self.http.lock().await;
        http.post_json(&url, body, firebase::parse_push).await?
    }
}
