use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    schema::StravaConfig,
};

/// Project-local config file, checked before the user-global one.
const LOCAL_CONFIG_FILENAME: &str = "strava-cli.toml";
const CONFIG_FILENAME: &str = "config.toml";

static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Override the config directory for this process (e.g. `--config-dir`).
pub fn set_config_dir(path: PathBuf) {
    let mut guard = CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner());
    *guard = Some(path);
}

pub fn clear_config_dir() {
    let mut guard = CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

/// Returns the config directory.
///
/// Resolution order:
/// 1. programmatic override (`set_config_dir`)
/// 2. `STRAVA_CLI_CONFIG_DIR`
/// 3. `~/.config/strava-cli`
pub fn config_dir() -> Option<PathBuf> {
    let guard = CONFIG_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner());
    if let Some(dir) = guard.as_ref() {
        return Some(dir.clone());
    }
    if let Ok(dir) = std::env::var("STRAVA_CLI_CONFIG_DIR")
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("", "", "strava-cli").map(|d| d.config_dir().to_path_buf())
}

/// Load config from the given TOML file.
pub fn load_config(path: &Path) -> Result<StravaConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./strava-cli.toml`
/// 2. `<config_dir>/config.toml`
///
/// Falls back to `StravaConfig::default()` when no file is found or the file
/// is invalid.
pub fn discover_and_load() -> StravaConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                StravaConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            StravaConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    let global = config_dir()?.join(CONFIG_FILENAME);
    global.exists().then_some(global)
}

/// Apply `STRAVA_*` environment variables on top of `config`.
pub fn apply_env_overrides(config: &mut StravaConfig) {
    apply_env_overrides_from(config, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with an injectable lookup, so tests need
/// not touch the process environment.
pub fn apply_env_overrides_from(
    config: &mut StravaConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = get("STRAVA_CLIENT_ID") {
        config.client.client_id = Some(v);
    }
    if let Some(v) = get("STRAVA_CLIENT_SECRET") {
        config.client.client_secret = Some(Secret::new(v));
    }
    if let Some(v) = get("STRAVA_AUTH_URL") {
        config.oauth.auth_url = v;
    }
    if let Some(v) = get("STRAVA_TOKEN_URL") {
        config.oauth.token_url = v;
    }
    if let Some(v) = get("STRAVA_REDIRECT_URI") {
        config.oauth.redirect_uri = v;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::collections::HashMap};

    #[test]
    fn load_config_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [client]
            client_id = "4242"
            client_secret = "file-secret"

            [oauth]
            redirect_uri = "http://localhost:9090"
            "#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.client.client_id.as_deref(), Some("4242"));
        assert_eq!(
            cfg.client.client_secret.as_ref().unwrap().expose_secret(),
            "file-secret"
        );
        assert_eq!(cfg.oauth.callback_port().unwrap(), 9090);
        assert_eq!(cfg.oauth.token_url, "https://www.strava.com/oauth/token");
    }

    #[test]
    fn load_config_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[oauth\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn config_dir_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path().to_path_buf());
        assert_eq!(config_dir().as_deref(), Some(dir.path()));
        clear_config_dir();
        assert_ne!(config_dir().as_deref(), Some(dir.path()));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("STRAVA_CLIENT_ID", "env-id"),
            ("STRAVA_CLIENT_SECRET", "env-secret"),
            ("STRAVA_TOKEN_URL", "http://127.0.0.1:1/token"),
            ("STRAVA_AUTH_URL", ""),
        ]);
        let mut cfg = StravaConfig::default();
        apply_env_overrides_from(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.client.client_id.as_deref(), Some("env-id"));
        assert_eq!(
            cfg.client.client_secret.as_ref().unwrap().expose_secret(),
            "env-secret"
        );
        assert_eq!(cfg.oauth.token_url, "http://127.0.0.1:1/token");
        // Empty values are ignored.
        assert_eq!(cfg.oauth.auth_url, "https://www.strava.com/oauth/authorize");
    }
}
