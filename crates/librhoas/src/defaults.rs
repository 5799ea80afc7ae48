//! Built-in endpoints and identifiers.

use std::time::Duration;

pub const PRODUCTION_API_URL: &str = "https://api.openshift.com";
pub const STAGING_API_URL: &str = "https://api.stage.openshift.com";

pub const PRODUCTION_AUTH_URL: &str = "https://sso.redhat.com/auth/realms/redhat-external";
pub const STAGING_AUTH_URL: &str = "https://sso.stage.redhat.com/auth/realms/redhat-external";

pub const PRODUCTION_MAS_AUTH_URL: &str = "https://identity.api.openshift.com/auth/realms/rhoas";
pub const STAGING_MAS_AUTH_URL: &str =
    "https://identity.api.stage.openshift.com/auth/realms/rhoas";

/// Where users obtain an offline token for `rhoas login --token`.
pub const OFFLINE_TOKEN_URL: &str = "https://console.redhat.com/openshift/token";

pub const DEFAULT_CLIENT_ID: &str = "rhoas-cli-prod";
/// Offline tokens are issued to this client, so refreshes must use it too.
pub const DEFAULT_OFFLINE_TOKEN_CLIENT_ID: &str = "cloud-services";

pub const DEFAULT_SCOPES: &[&str] = &["openid"];

pub const SSO_REDIRECT_PATH: &str = "sso-redhat-callback";
pub const MAS_SSO_REDIRECT_PATH: &str = "mas-sso-callback";

/// Upper bound for the whole interactive login, both domains included.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}
