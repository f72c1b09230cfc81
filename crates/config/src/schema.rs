use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    url::{Host, Url},
};

use crate::error::{Error, Result};

/// Port of the default `redirect_uri`.
pub const DEFAULT_CALLBACK_PORT: u16 = 8080;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StravaConfig {
    pub client: ClientConfig,
    pub oauth: OAuthSettings,
}

/// Registered application credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub client_id: Option<String>,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_secret: Option<Secret<String>>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Endpoints and authorization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scope: String,
    pub approval_prompt: String,
    /// How long to wait for the browser redirect before giving up.
    pub timeout_secs: u64,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            auth_url: "https://www.strava.com/oauth/authorize".into(),
            token_url: "https://www.strava.com/oauth/token".into(),
            redirect_uri: format!("http://localhost:{DEFAULT_CALLBACK_PORT}"),
            scope: "read,activity:read_all".into(),
            approval_prompt: "auto".into(),
            timeout_secs: 5,
        }
    }
}

impl OAuthSettings {
    /// The callback port, parsed from `redirect_uri`.
    ///
    /// The listener serves only `GET /` on `127.0.0.1`, so the redirect must
    /// be a plain `http` URL on `localhost` or `127.0.0.1` with the root path.
    /// A URL without a port uses the scheme default (80).
    pub fn callback_port(&self) -> Result<u16> {
        let invalid = |reason: &str| Error::InvalidRedirectUri {
            uri: self.redirect_uri.clone(),
            reason: reason.to_string(),
        };

        let url = Url::parse(&self.redirect_uri).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid("scheme must be http"));
        }
        let loopback = match url.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(ip)) => ip == std::net::Ipv4Addr::LOCALHOST,
            _ => false,
        };
        if !loopback {
            return Err(invalid("host must be localhost or 127.0.0.1"));
        }
        if url.path() != "/" {
            return Err(invalid("path must be /"));
        }
        url.port_or_known_default().ok_or_else(|| invalid("no port"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_strava() {
        let settings = OAuthSettings::default();
        assert_eq!(settings.auth_url, "https://www.strava.com/oauth/authorize");
        assert_eq!(settings.token_url, "https://www.strava.com/oauth/token");
        assert_eq!(settings.redirect_uri, "http://localhost:8080");
        assert_eq!(settings.scope, "read,activity:read_all");
        assert_eq!(settings.timeout(), Duration::from_secs(5));
    }

    fn with_redirect(uri: &str) -> OAuthSettings {
        OAuthSettings {
            redirect_uri: uri.into(),
            ..Default::default()
        }
    }

    #[test]
    fn callback_port_from_redirect_uri() {
        assert_eq!(
            OAuthSettings::default().callback_port().unwrap(),
            DEFAULT_CALLBACK_PORT
        );
        assert_eq!(
            with_redirect("http://127.0.0.1:9123").callback_port().unwrap(),
            9123
        );
        assert_eq!(
            with_redirect("http://LOCALHOST:9123/").callback_port().unwrap(),
            9123
        );
    }

    #[test]
    fn callback_port_uses_scheme_default() {
        assert_eq!(with_redirect("http://localhost").callback_port().unwrap(), 80);
        assert_eq!(with_redirect("http://localhost:80").callback_port().unwrap(), 80);
    }

    #[test]
    fn unreachable_redirect_uris_are_rejected() {
        let cases = [
            ("http://127.0.0.1:9123/callback", "path"),
            ("https://localhost:8443", "scheme"),
            ("http://example.com:8080", "host"),
            ("http://[::1]:8080", "host"),
            ("", "relative URL"),
        ];
        for (uri, reason_part) in cases {
            let err = with_redirect(uri).callback_port().unwrap_err();
            match err {
                Error::InvalidRedirectUri { uri: got, reason } => {
                    assert_eq!(got, uri);
                    assert!(reason.contains(reason_part), "{uri}: {reason}");
                },
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: StravaConfig = toml::from_str(
            r#"
            [oauth]
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.oauth.timeout_secs, 30);
        assert_eq!(cfg.oauth.approval_prompt, "auto");
        assert!(cfg.client.client_id.is_none());
    }

    #[test]
    fn client_secret_is_redacted_in_debug() {
        let client = ClientConfig {
            client_id: Some("123".into()),
            client_secret: Some(Secret::new("shh".into())),
        };
        let debug = format!("{client:?}");
        assert!(debug.contains("123"));
        assert!(!debug.contains("shh"));
    }
}
