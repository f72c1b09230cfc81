use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("redirect_uri {uri:?} cannot reach the callback listener: {reason}")]
    InvalidRedirectUri { uri: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
