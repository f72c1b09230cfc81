use std::time::{Duration, SystemTime, UNIX_EPOCH};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    strava_config::DEFAULT_CALLBACK_PORT,
};

/// Authorization request options appended to the authorization URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationOptions {
    pub redirect_uri: String,
    pub response_type: String,
    pub approval_prompt: String,
    pub scope: String,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            redirect_uri: format!("http://localhost:{DEFAULT_CALLBACK_PORT}"),
            response_type: "code".into(),
            approval_prompt: "auto".into(),
            scope: "read,activity:read_all".into(),
        }
    }
}

impl AuthorizationOptions {
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn with_approval_prompt(mut self, approval_prompt: impl Into<String>) -> Self {
        self.approval_prompt = approval_prompt.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

/// Tokens returned by the token endpoint.
///
/// Field names are the wire contract of the token endpoint and of the
/// persisted credential file. Every field is required: a body missing any of
/// them fails to parse instead of producing zero values.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    token_type: String,
    #[serde(serialize_with = "serialize_secret")]
    access_token: Secret<String>,
    #[serde(serialize_with = "serialize_secret")]
    refresh_token: Secret<String>,
    /// Seconds until expiry, as reported at issue time.
    expires_in: u64,
    /// Unix timestamp when the access token expires.
    expires_at: u64,
}

impl TokenSet {
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn access_token(&self) -> &Secret<String> {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &Secret<String> {
        &self.refresh_token
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Time left before the access token expires, `None` once expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .checked_sub(unix_now())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }

    /// True if the access token expires within `window` from now.
    pub fn expires_within(&self, window: Duration) -> bool {
        expires_within_from(self.expires_at, unix_now(), window)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("token_type", &self.token_type)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn expires_within_from(expires_at: u64, now: u64, window: Duration) -> bool {
    expires_at <= now.saturating_add(window.as_secs())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Query parameters carried by the authorization redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    #[serde(default)]
    pub state: String,
    /// Set by the provider when the user denies access.
    pub error: Option<String>,
}

/// Serialize a `Secret<String>` by exposing its inner value.
/// Use only for fields that must round-trip through storage.
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
