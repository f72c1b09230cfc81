//! OAuth 2.0 authorization code grant for command-line clients.
//!
//! [`OAuthFlow::authorize`] opens the user's browser, captures the redirect
//! on a loopback [`CallbackServer`], checks the anti-forgery state and
//! exchanges the code for a [`TokenSet`]. [`OAuthFlow::refresh_token`] runs
//! the refresh-token grant against the same token endpoint.

pub mod browser;
pub mod callback_server;
mod config_dir;
pub mod error;
pub mod flow;
pub mod state;
pub mod storage;
pub mod types;

pub use {
    browser::{BrowserOpener, SystemBrowser},
    callback_server::{CallbackServer, ListenerState},
    flow::{
        AuthorizationRequest, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TIMEOUT, OAuthFlow, authorize,
        refresh_token,
    },
    storage::CredentialStore,
    strava_config::DEFAULT_CALLBACK_PORT,
    types::{AuthorizationOptions, CallbackParams, TokenSet},
};

pub use error::{Error, Result};
