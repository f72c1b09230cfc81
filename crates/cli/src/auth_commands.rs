use std::time::Duration;

use {
    anyhow::Result,
    secrecy::{ExposeSecret, Secret},
    strava_config::StravaConfig,
    strava_oauth::{AuthorizationOptions, BrowserOpener, CredentialStore, OAuthFlow},
};

/// Tokens expiring sooner than this are refreshed by `refresh`.
const REFRESH_WINDOW: Duration = Duration::from_secs(10 * 60);

/// Prints the authorization URL before handing it to the system browser, so
/// the user can copy it when no browser opens.
struct ConsoleBrowser;

impl BrowserOpener for ConsoleBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        print_console(&format!(
            "Please authorize this application in your web browser from the following URL\n{url}"
        ));
        open::that(url).inspect_err(|_| {
            println!("Could not open browser. Please visit the URL above.");
        })
    }
}

fn print_console(message: &str) {
    println!("🏃 {message}");
}

fn client_credentials(config: &StravaConfig) -> Result<(String, Secret<String>)> {
    let client_id = config
        .client
        .client_id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("STRAVA_CLIENT_ID is not set"))?;
    let client_secret = config
        .client
        .client_secret
        .clone()
        .ok_or_else(|| anyhow::anyhow!("STRAVA_CLIENT_SECRET is not set"))?;
    Ok((client_id, client_secret))
}

fn authorization_options(config: &StravaConfig) -> AuthorizationOptions {
    AuthorizationOptions::default()
        .with_redirect_uri(config.oauth.redirect_uri.clone())
        .with_scope(config.oauth.scope.clone())
        .with_approval_prompt(config.oauth.approval_prompt.clone())
}

pub async fn login(config: &StravaConfig) -> Result<()> {
    let (client_id, client_secret) = client_credentials(config)?;
    let callback_port = config.oauth.callback_port()?;
    let flow = OAuthFlow::new()
        .with_browser(ConsoleBrowser)
        .with_callback_port(callback_port)
        .with_timeout(config.oauth.timeout());

    let tokens = flow
        .authorize(
            &config.oauth.auth_url,
            &config.oauth.token_url,
            &client_id,
            client_secret.expose_secret(),
            Some(authorization_options(config)),
        )
        .await?;

    CredentialStore::new().save(&tokens)?;
    print_console("Successfully logged in to Strava");
    Ok(())
}

pub async fn refresh(config: &StravaConfig, force: bool) -> Result<()> {
    let store = CredentialStore::new();
    let Some(current) = store.load()? else {
        anyhow::bail!("not logged in; run `strava-cli login` first");
    };

    if !needs_refresh(force, current.expires_within(REFRESH_WINDOW)) {
        println!("Token still valid ({}), nothing to do.", describe_expiry(current.remaining()));
        return Ok(());
    }

    let (client_id, client_secret) = client_credentials(config)?;
    let tokens = OAuthFlow::new()
        .refresh_token(
            &config.oauth.token_url,
            &client_id,
            client_secret.expose_secret(),
            current.refresh_token().expose_secret(),
        )
        .await?;

    store.save(&tokens)?;
    println!("Token refreshed ({}).", describe_expiry(tokens.remaining()));
    Ok(())
}

pub fn status() -> Result<()> {
    let store = CredentialStore::new();
    match store.load()? {
        Some(tokens) => println!(
            "Logged in [{}] ({})",
            describe_expiry(tokens.remaining()),
            store.path().display()
        ),
        None => println!("Not logged in."),
    }
    Ok(())
}

pub fn logout() -> Result<()> {
    CredentialStore::new().delete()?;
    println!("Logged out from Strava");
    Ok(())
}

fn needs_refresh(force: bool, expiring: bool) -> bool {
    force || expiring
}

fn describe_expiry(remaining: Option<Duration>) -> String {
    match remaining {
        Some(remaining) => {
            let secs = remaining.as_secs();
            let hours = secs / 3600;
            let mins = (secs % 3600) / 60;
            format!("valid, {hours}h {mins}m remaining")
        },
        None => "expired".to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_description() {
        assert_eq!(
            describe_expiry(Some(Duration::from_secs(2 * 3600 + 5 * 60 + 7))),
            "valid, 2h 5m remaining"
        );
        assert_eq!(describe_expiry(None), "expired");
    }

    #[test]
    fn refresh_decision() {
        assert!(needs_refresh(true, false));
        assert!(needs_refresh(false, true));
        assert!(!needs_refresh(false, false));
    }

    #[test]
    fn missing_client_credentials_are_reported() {
        let err = client_credentials(&StravaConfig::default()).unwrap_err();
        assert!(err.to_string().contains("STRAVA_CLIENT_ID"));
    }

    #[tokio::test]
    async fn login_rejects_redirect_the_listener_cannot_serve() {
        let mut config = StravaConfig::default();
        config.client.client_id = Some("4242".into());
        config.client.client_secret = Some(Secret::new("shh".into()));
        config.oauth.redirect_uri = "http://localhost:8080/callback".into();

        let err = login(&config).await.unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<strava_config::Error>(),
                Some(strava_config::Error::InvalidRedirectUri { .. })
            ),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn options_follow_config() {
        let mut config = StravaConfig::default();
        config.oauth.scope = "read".into();
        config.oauth.redirect_uri = "http://localhost:9999".into();

        let options = authorization_options(&config);
        assert_eq!(options.scope, "read");
        assert_eq!(options.redirect_uri, "http://localhost:9999");
        assert_eq!(options.response_type, "code");
        assert_eq!(options.approval_prompt, "auto");
    }
}
