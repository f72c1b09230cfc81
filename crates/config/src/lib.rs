//! Configuration loading for strava-cli.
//!
//! Config files: `strava-cli.toml` in the working directory, then
//! `config.toml` under the user config dir (`~/.config/strava-cli/`).
//!
//! Environment variables (`STRAVA_CLIENT_ID`, `STRAVA_CLIENT_SECRET`, ...)
//! override file values.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, apply_env_overrides_from, clear_config_dir, config_dir,
        discover_and_load, load_config, set_config_dir,
    },
    schema::{ClientConfig, DEFAULT_CALLBACK_PORT, OAuthSettings, StravaConfig},
};
