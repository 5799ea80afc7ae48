//! OpenID provider discovery.

use serde::Deserialize;
use url::Url;

use crate::{Error, Result};

/// One SSO domain to log in to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoConfig {
    /// Issuer URL; discovery appends `/.well-known/openid-configuration`.
    pub auth_url: Url,
    /// Path of the loopback redirect, without leading slash.
    pub redirect_path: String,
}

impl SsoConfig {
    pub fn new(auth_url: Url, redirect_path: impl Into<String>) -> Self {
        Self {
            auth_url,
            redirect_path: redirect_path.into(),
        }
    }
}

/// The subset of the discovery document we use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

/// Append `suffix` to the path of `base` without dropping its last segment.
pub(crate) fn join_path(base: &Url, suffix: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        suffix.trim_start_matches('/')
    )
}

pub fn discovery_url(auth_url: &Url) -> String {
    join_path(auth_url, ".well-known/openid-configuration")
}

/// The Keycloak token endpoint of a realm URL, used for refreshes where no
/// discovery round trip is wanted.
pub fn token_endpoint(auth_url: &Url) -> String {
    join_path(auth_url, "protocol/openid-connect/token")
}

/// Fetch the provider metadata of `auth_url`.
pub async fn discover(http: &reqwest::Client, auth_url: &Url) -> Result<ProviderMetadata> {
    let url = discovery_url(auth_url);
    tracing::debug!(url = %url, "fetching OpenID configuration");

    let response = http.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Remote(format!(
            "OpenID discovery at {url} failed ({status}): {body}"
        )));
    }

    response.json::<ProviderMetadata>().await.map_err(|e| {
        Error::Remote(format!("invalid OpenID configuration from {url}: {e}"))
    })
}
