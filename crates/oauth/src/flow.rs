use std::{sync::Arc, time::Duration};

use {
    secrecy::{ExposeSecret, Secret},
    strava_config::DEFAULT_CALLBACK_PORT,
    tracing::{debug, error, info, warn},
};

use crate::{
    Error, Result,
    browser::{self, BrowserOpener, SystemBrowser},
    callback_server::CallbackServer,
    state::generate_state,
    types::{AuthorizationOptions, CallbackParams, TokenSet},
};

/// How long to wait for the browser redirect.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single token endpoint request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// State owned by a single authorization attempt.
///
/// The anti-forgery `state` is generated on construction and lives only as
/// long as this value.
pub struct AuthorizationRequest {
    auth_url: String,
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
    expected_state: String,
    options: AuthorizationOptions,
}

impl AuthorizationRequest {
    /// Validate the parameters and generate a fresh state token.
    pub fn new(
        auth_url: &str,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        options: Option<AuthorizationOptions>,
    ) -> Result<Self> {
        require("auth_url", auth_url)?;
        require("token_url", token_url)?;
        require("client_id", client_id)?;
        require("client_secret", client_secret)?;

        Ok(Self {
            auth_url: auth_url.to_string(),
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: Secret::new(client_secret.to_string()),
            expected_state: generate_state(),
            options: options.unwrap_or_default(),
        })
    }

    pub fn expected_state(&self) -> &str {
        &self.expected_state
    }

    pub fn options(&self) -> &AuthorizationOptions {
        &self.options
    }

    /// The URL the user opens to grant access.
    ///
    /// Only `redirect_uri` is escaped; providers expect the remaining values
    /// verbatim (e.g. a comma-separated scope list).
    pub fn authorization_url(&self) -> String {
        let separator = if self.auth_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{separator}client_id={}&redirect_uri={}&response_type={}&approval_prompt={}&scope={}&state={}",
            self.auth_url,
            self.client_id,
            urlencoding::encode(&self.options.redirect_uri),
            self.options.response_type,
            self.options.approval_prompt,
            self.options.scope,
            self.expected_state,
        )
    }

    /// Check the redirect against this attempt and return the authorization code.
    pub fn verify(&self, params: CallbackParams) -> Result<String> {
        if params.state != self.expected_state {
            return Err(Error::StateMismatch {
                received: params.state,
            });
        }
        if let Some(reason) = params.error {
            return Err(Error::AuthorizationDenied { reason });
        }
        params
            .code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::AuthorizationDenied {
                reason: "redirect carried no authorization code".into(),
            })
    }
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("expected_state", &self.expected_state)
            .field("options", &self.options)
            .finish()
    }
}

/// Drives the OAuth 2.0 authorization code grant and the refresh-token grant.
///
/// Attempts must not overlap: every attempt binds the same callback port.
pub struct OAuthFlow {
    client: reqwest::Client,
    browser: Arc<dyn BrowserOpener>,
    callback_port: u16,
    timeout: Duration,
}

impl Default for OAuthFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthFlow {
    pub fn new() -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            browser: Arc::new(SystemBrowser),
            callback_port: DEFAULT_CALLBACK_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_browser(mut self, browser: impl BrowserOpener + 'static) -> Self {
        self.browser = Arc::new(browser);
        self
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound each token endpoint request by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Run the full browser authorization and exchange the code for tokens.
    ///
    /// The callback listener is bound before the browser opens and is shut
    /// down before this returns, whatever the outcome.
    pub async fn authorize(
        &self,
        auth_url: &str,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        options: Option<AuthorizationOptions>,
    ) -> Result<TokenSet> {
        let request =
            AuthorizationRequest::new(auth_url, token_url, client_id, client_secret, options)
                .inspect_err(|e| error!(error = %e, "authorization not started"))?;

        let url = request.authorization_url();
        debug!(url = %url, "authorization URL");

        let mut server = CallbackServer::bind(self.callback_port)
            .await
            .inspect_err(|e| error!(error = %e, "callback listener unavailable"))?;
        browser::launch(self.browser.as_ref(), &url);

        let result = self.complete(&request, &mut server).await;
        server.shutdown().await;

        if let Err(e) = &result {
            error!(error = %e, "authorization failed");
        }
        result
    }

    async fn complete(
        &self,
        request: &AuthorizationRequest,
        server: &mut CallbackServer,
    ) -> Result<TokenSet> {
        let params = server.wait(self.timeout).await?;
        let code = request.verify(params)?;

        self.request_token(&request.token_url, "authorization_code", &[
            ("client_id", request.client_id.as_str()),
            ("client_secret", request.client_secret.expose_secret().as_str()),
            ("code", code.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Exchange a refresh token for a new token set.
    pub async fn refresh_token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenSet> {
        require("token_url", token_url)?;
        require("client_id", client_id)?;
        require("client_secret", client_secret)?;
        require("refresh_token", refresh_token)?;

        self.request_token(token_url, "refresh_token", &[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
        .inspect_err(|e| error!(error = %e, "token refresh failed"))
    }

    async fn request_token(
        &self,
        token_url: &str,
        grant_type: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenSet> {
        debug!(token_url, grant_type, "requesting token");

        let resp = self
            .client
            .post(token_url)
            .form(form)
            .send()
            .await
            .map_err(Error::TokenRequestFailed)?;
        let status = resp.status();
        let body = resp.text().await.map_err(Error::TokenRequestFailed)?;

        if !status.is_success() {
            return Err(Error::TokenEndpointRejected { status, body });
        }

        let tokens: TokenSet = serde_json::from_str(&body).map_err(Error::TokenResponseParseError)?;
        info!(
            grant_type,
            token_type = tokens.token_type(),
            expires_in = tokens.expires_in(),
            expires_at = tokens.expires_at(),
            "token response received"
        );
        Ok(tokens)
    }
}

/// Authorize with the default flow: system browser, port 8080, 5 second timeout.
pub async fn authorize(
    auth_url: &str,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    options: Option<AuthorizationOptions>,
) -> Result<TokenSet> {
    OAuthFlow::new()
        .authorize(auth_url, token_url, client_id, client_secret, options)
        .await
}

/// Refresh with the default flow.
pub async fn refresh_token(
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenSet> {
    OAuthFlow::new()
        .refresh_token(token_url, client_id, client_secret, refresh_token)
        .await
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}

fn require(name: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidParameter { name });
    }
    Ok(())
}
