mod browser;
mod callback;
mod grant;
mod refresh;
mod sso;
pub mod token;

pub use browser::{Browser, PrintUrl, SystemBrowser};
pub use callback::{CallbackListener, CallbackParams};
pub use grant::{AuthorizationCodeGrant, validate_callback};
pub use refresh::refresh_tokens;
pub use sso::{ProviderMetadata, SsoConfig, discover, discovery_url, token_endpoint};

use std::time::Duration;

use oauth2::basic::BasicErrorResponse;
use oauth2::{RequestTokenError, TokenResponse};

use crate::{Error, Result};

/// Tokens returned by a successful grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<Duration>,
}

impl Tokens {
    fn from_response(response: &impl TokenResponse) -> Self {
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .unwrap_or_default(),
            expires_in: response.expires_in(),
        }
    }
}

/// HTTP client for all outbound calls. Redirects are not followed, as the
/// token endpoint must answer directly.
pub fn http_client(insecure: bool) -> Result<reqwest::Client> {
    if insecure {
        tracing::warn!("TLS certificate verification is disabled");
    }
    reqwest::Client::builder()
        .danger_accept_invalid_certs(insecure)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))
}

fn describe_token_error<RE>(e: RequestTokenError<RE, BasicErrorResponse>) -> String
where
    RE: std::error::Error + 'static,
{
    match e {
        RequestTokenError::ServerResponse(response) => {
            let kind: &str = response.error().as_ref();
            match response.error_description() {
                Some(description) => format!("{kind}: {description}"),
                None => kind.to_string(),
            }
        }
        RequestTokenError::Request(e) => format!("request error: {e}"),
        RequestTokenError::Parse(e, _) => format!("invalid token response: {e}"),
        RequestTokenError::Other(e) => e,
    }
}
