use url::Url;

use crate::{Result, output::Output};

/// How the authorization URL reaches the user.
pub trait Browser: Send + Sync {
    fn open(&self, url: &Url) -> Result<()>;
}

/// Opens the system browser, printing the URL as a fallback.
pub struct SystemBrowser {
    output: Output,
}

impl SystemBrowser {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &Url) -> Result<()> {
        match open::that(url.as_str()) {
            Ok(_) => {
                tracing::debug!("opened authorization URL in the default browser");
                self.output
                    .text("Your browser has been opened to complete the login.")?;
            }
            Err(e) => {
                self.output
                    .warn(format!("Could not open browser automatically: {e}"))?;
                self.output
                    .notice("Open the following URL in your browser to log in:")?;
                self.output.notice("")?;
                self.output.notice(url.as_str())?;
                self.output.notice("")?;
            }
        }
        Ok(())
    }
}

/// Prints the URL for the user to open, e.g. on a remote host.
pub struct PrintUrl {
    output: Output,
}

impl PrintUrl {
    pub fn new(output: Output) -> Self {
        Self { output }
    }
}

impl Browser for PrintUrl {
    fn open(&self, url: &Url) -> Result<()> {
        self.output
            .notice("Open the following URL in your browser to log in:")?;
        self.output.notice("")?;
        self.output.notice(url.as_str())?;
        self.output.notice("")?;
        Ok(())
    }
}
