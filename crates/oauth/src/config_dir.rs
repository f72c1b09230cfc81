use std::path::PathBuf;

/// Returns the strava-cli config directory.
///
/// Resolution order comes from `strava_config::config_dir()`:
/// 1. programmatic override (`set_config_dir`)
/// 2. `STRAVA_CLI_CONFIG_DIR`
/// 3. `~/.config/strava-cli`
pub fn strava_config_dir() -> PathBuf {
    strava_config::config_dir().unwrap_or_else(|| PathBuf::from(".config/strava-cli"))
}
