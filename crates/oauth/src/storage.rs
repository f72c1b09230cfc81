use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{Result, config_dir::strava_config_dir, types::TokenSet};

/// File-based credential for the current user at
/// `~/.config/strava-cli/credential.json`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new() -> Self {
        let path = strava_config_dir().join("credential.json");
        Self { path }
    }

    /// Create a store at a specific path (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<TokenSet>> {
        let path = self.path.display().to_string();
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path, "credential not found");
                return Ok(None);
            },
            Err(e) => {
                warn!(path = %path, error = %e, "credential read failed");
                return Err(e.into());
            },
        };

        let tokens: TokenSet = serde_json::from_str(&data).inspect_err(|e| {
            warn!(path = %path, error = %e, "credential parse failed");
        })?;
        debug!(path = %path, "credential loaded");
        Ok(Some(tokens))
    }

    pub fn save(&self, tokens: &TokenSet) -> Result<()> {
        let path = self.path.display().to_string();
        info!(path = %path, "saving credential");

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(tokens)?;

        // Open as 0600 so the tokens are never readable by others.
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // The mode above only applies to new files.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(data.as_bytes())?;

        info!(path = %path, "credential saved");
        Ok(())
    }

    /// Remove the stored credential. Deleting a missing credential is a no-op.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "credential deleted");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use {super::*, std::os::unix::fs::PermissionsExt};

    const TOKEN_BODY: &str = r#"{"token_type":"Bearer","access_token":"AT1","refresh_token":"RT1","expires_in":21600,"expires_at":1700000000}"#;

    fn mode(path: &Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn save_creates_private_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_path(dir.path().join("credential.json"));
        let tokens: TokenSet = serde_json::from_str(TOKEN_BODY).unwrap();

        store.save(&tokens).unwrap();
        assert_eq!(mode(store.path()), 0o600);
    }

    #[test]
    fn save_tightens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credential.json");
        std::fs::write(&path, "leftover credential body ".repeat(40)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = CredentialStore::with_path(path);
        let tokens: TokenSet = serde_json::from_str(TOKEN_BODY).unwrap();
        store.save(&tokens).unwrap();

        assert_eq!(mode(store.path()), 0o600);
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.expires_at(), 1_700_000_000);
    }
}
