use tracing::{debug, warn};

/// Opens the authorization URL for the user.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Open `url` with `browser`. A failure only means the user has to copy the
/// URL by hand, so it is logged and swallowed.
pub(crate) fn launch(browser: &dyn BrowserOpener, url: &str) {
    match browser.open(url) {
        Ok(()) => debug!("browser launched for authorization"),
        Err(e) => warn!(error = %e, "failed to open web browser"),
    }
}
