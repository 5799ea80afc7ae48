//! Resolution of the short endpoint aliases accepted by `rhoas login`.
//!
//! Each URL family (API gateway, SSO, MAS-SSO) has its own table. A value that
//! is not a key of the table is taken literally, so users can always pass a
//! full URL instead of an alias.

use std::collections::HashMap;

use thiserror::Error;
use url::Url;

use crate::defaults::{
    PRODUCTION_API_URL, PRODUCTION_AUTH_URL, PRODUCTION_MAS_AUTH_URL, STAGING_API_URL,
    STAGING_AUTH_URL,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid URL '{input}': {reason}")]
    Invalid { input: String, reason: String },

    #[error("the URL '{0}' is missing a scheme, it must start with http:// or https://")]
    MissingScheme(String),
}

/// Mapping from alias to full URL for one URL family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Table with `production`/`prod` and `staging`/`stage` entries.
    pub fn environments(production: &str, staging: &str) -> Self {
        Self::new([
            ("production", production),
            ("prod", production),
            ("staging", staging),
            ("stage", staging),
        ])
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias).map(String::as_str)
    }
}

/// The three alias tables used by `rhoas login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlAliases {
    pub api_gateway: AliasTable,
    pub auth: AliasTable,
    pub mas_auth: AliasTable,
}

impl Default for UrlAliases {
    fn default() -> Self {
        Self {
            api_gateway: AliasTable::environments(PRODUCTION_API_URL, STAGING_API_URL),
            auth: AliasTable::environments(PRODUCTION_AUTH_URL, STAGING_AUTH_URL),
            // Staging points at the production MAS-SSO realm as well. Pass
            // STAGING_MAS_AUTH_URL literally to reach the staging realm.
            mas_auth: AliasTable::environments(PRODUCTION_MAS_AUTH_URL, PRODUCTION_MAS_AUTH_URL),
        }
    }
}

/// Replace `url_or_alias` by its table entry if it has one, then check that the
/// result is an absolute http(s) URL.
pub fn resolve(url_or_alias: &str, table: &AliasTable) -> Result<Url, UrlError> {
    let raw = table.get(url_or_alias).unwrap_or(url_or_alias);

    let url = Url::parse(raw).map_err(|e| UrlError::Invalid {
        input: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(UrlError::MissingScheme(raw.to_string())),
    }
}
